// Events - Notifications emitted by state transitions
//
// Operations push into an event sink owned by the engine; callers drain it
// after each transition. Nothing here drives control flow.
use crate::types::{Address, Balance, BlockNumber, EpochNumber, PeriodNumber};
use serde::{Deserialize, Serialize};

/// Why a submitted block reward was not (fully) accrued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardDeprecationKind {
    /// Producer was slashed during the current period
    Unavailability,
    /// Producer is in its post-bail-out grace; reward halved
    AfterBailout,
}

/// Kind of a successful slash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlashKind {
    UnavailabilityTier1,
    UnavailabilityTier2,
    DoubleSigning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    // --- Staking ledger ---
    PoolApproved {
        pool: Address,
        admin: Address,
    },
    Staked {
        pool: Address,
        amount: Balance,
    },
    Unstaked {
        pool: Address,
        amount: Balance,
    },
    Delegated {
        delegator: Address,
        pool: Address,
        amount: Balance,
    },
    Undelegated {
        delegator: Address,
        pool: Address,
        amount: Balance,
    },
    RenounceRequested {
        pool: Address,
        effective_at: u64,
    },
    CandidateRevoked {
        pool: Address,
        refunded_self_stake: Balance,
    },

    // --- Scheduler / validator set ---
    WrappedUpEpoch {
        period: PeriodNumber,
        epoch: EpochNumber,
        period_ending: bool,
    },
    ValidatorSetUpdated {
        period: PeriodNumber,
        validators: Vec<Address>,
    },
    BlockProducerSetUpdated {
        period: PeriodNumber,
        producers: Vec<Address>,
    },

    // --- Rewards ---
    BlockRewardSubmitted {
        producer: Address,
        submitted: Balance,
        bonus: Balance,
    },
    BlockRewardDeprecated {
        producer: Address,
        amount: Balance,
        kind: RewardDeprecationKind,
    },
    BonusTransferFailed {
        producer: Address,
        producer_bonus: Balance,
        bridge_bonus: Balance,
        vault_balance: Balance,
    },
    MiningRewardDistributed {
        consensus: Address,
        treasury: Address,
        amount: Balance,
    },
    StakingRewardDistributed {
        pool: Address,
        amount: Balance,
    },
    BridgeOperatorRewardDistributed {
        consensus: Address,
        bridge_operator: Address,
        treasury: Address,
        amount: Balance,
    },

    // --- Slashing ---
    Slashed {
        validator: Address,
        kind: SlashKind,
        period: PeriodNumber,
    },
    ValidatorPunished {
        validator: Address,
        jailed_until: Option<BlockNumber>,
        deducted_stake: Balance,
    },
    BailedOut {
        validator: Address,
        period: PeriodNumber,
    },
    ValidatorUnjailed {
        validator: Address,
    },
}

/// Append-only sink drained by the caller after each operation
#[derive(Debug, Default)]
pub struct EventSink {
    events: Vec<Event>,
}

impl EventSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Peek without draining (test helper, but harmless in general)
    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }
}
