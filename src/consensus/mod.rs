// Consensus - scheduling, slashing and reward components

pub mod credit;
pub mod epoch;
pub mod ports;
pub mod slashing;
pub mod validator_set;
pub mod vesting;

pub use credit::CreditScoreBook;
pub use epoch::EpochSchedule;
pub use ports::{SlashingPort, StakingPort};
pub use slashing::{JailRecord, SlashError, SlashIndicator, SlashOutcome};
pub use validator_set::{ValidatorSetError, ValidatorSetManager};
pub use vesting::{BonusGrant, StakingVesting};
