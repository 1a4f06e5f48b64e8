// dpos-core
//
// Validator lifecycle and staking economics for a delegated-proof-of-stake
// chain: candidate registration and delegation, epoch/period scheduling,
// unavailability and double-sign slashing with credit-score bail-outs,
// block reward distribution, and weighted multi-sig governance with a
// cross-chain relay mirror.
//
// The crate is a pure state machine: no networking, no storage, no ambient
// clock. A host drives `DposEngine` once per block with an explicit
// `BlockContext` and drains the emitted events after each transition.

pub mod config;
pub mod consensus;
pub mod engine;
pub mod error;
pub mod events;
pub mod governance;
pub mod staking;
pub mod types;

#[cfg(test)]
mod tests;

pub use config::EngineConfig;
pub use engine::{DposEngine, EngineError};
pub use error::ErrorKind;
pub use events::{Event, EventSink, RewardDeprecationKind, SlashKind};
