// Narrow one-directional seams between the engine's components.
//
// The slashing engine and the scheduler never hold references into the
// ledger or into each other; the engine passes these capabilities in per
// call, which keeps every dependency explicit and one-way.
use crate::consensus::slashing::SlashIndicator;
use crate::staking::StakingLedger;
use crate::types::{Address, Balance, BlockNumber};

/// What the slashing engine may do to stakes
pub trait StakingPort {
    /// Take up to `amount` from the pool's self-stake; returns the amount
    /// actually deducted
    fn deduct_self_stake(&mut self, consensus: Address, amount: Balance) -> Balance;

    fn is_validator_candidate(&self, consensus: &Address) -> bool;
}

impl StakingPort for StakingLedger {
    fn deduct_self_stake(&mut self, consensus: Address, amount: Balance) -> Balance {
        StakingLedger::deduct_self_stake(self, consensus, amount)
    }

    fn is_validator_candidate(&self, consensus: &Address) -> bool {
        StakingLedger::is_validator_candidate(self, consensus)
    }
}

/// What the scheduler may ask the slashing engine at wrap-up
pub trait SlashingPort {
    fn is_jailed_at(&self, validator: &Address, block: BlockNumber) -> bool;
}

impl SlashingPort for SlashIndicator {
    fn is_jailed_at(&self, validator: &Address, block: BlockNumber) -> bool {
        SlashIndicator::is_jailed_at(self, validator, block)
    }
}
