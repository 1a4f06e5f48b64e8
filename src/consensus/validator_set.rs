// Validator set manager - epoch/period scheduler, ranking, reward accrual
//
// Epochs are counted in blocks, periods in wall-clock seconds. The set of
// validators is re-ranked from stakes only at period boundaries; producer
// membership (jail exclusions) is refreshed at every epoch wrap.
use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::consensus::epoch::EpochSchedule;
use crate::consensus::ports::SlashingPort;
use crate::consensus::vesting::BonusGrant;
use crate::error::ErrorKind;
use crate::events::{Event, EventSink, RewardDeprecationKind};
use crate::staking::StakingLedger;
use crate::types::{
    Address, Balance, BlockContext, BlockNumber, PeriodNumber, Timestamp, MAX_COMMISSION_BPS,
};

#[derive(Debug, thiserror::Error)]
pub enum ValidatorSetError {
    #[error("{0} is not a current block producer")]
    NotBlockProducer(Address),

    #[error("block {0} does not end an epoch")]
    NotEpochEnding(BlockNumber),

    #[error("epoch already wrapped up in block {0}")]
    AlreadyWrappedUp(BlockNumber),
}

impl ValidatorSetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotBlockProducer(_) => ErrorKind::Authorization,
            Self::NotEpochEnding(_) => ErrorKind::Timing,
            Self::AlreadyWrappedUp(_) => ErrorKind::Ordering,
        }
    }
}

/// How a producer's submitted rewards are treated for the rest of the period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RewardStatus {
    /// Slashed this period: nothing accrues
    Deprecated,
    /// Bailed out this period: accruals are halved
    Halved,
}

#[derive(Debug)]
pub struct ValidatorSetManager {
    max_validator_number: usize,
    schedule: EpochSchedule,
    period_duration_secs: Timestamp,

    current_period: PeriodNumber,
    /// Ranked at the last period boundary, jailed members included
    validators: Vec<Address>,
    /// Current validators minus the jailed ones
    producers: Vec<Address>,
    /// Everyone who held producer status at some point in the period. The
    /// bridge pool splits over this set; being jailed mid-period does not
    /// forfeit the bridge share, only the mining portion.
    period_producers: BTreeSet<Address>,
    last_wrap_block: Option<BlockNumber>,

    accrued_reward: HashMap<Address, Balance>,
    reward_status: HashMap<Address, RewardStatus>,
    bridge_pool: Balance,
}

impl ValidatorSetManager {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_validator_number: config.max_validator_number,
            schedule: EpochSchedule::new(config.blocks_per_epoch),
            period_duration_secs: config.period_duration_secs,
            current_period: 0,
            validators: Vec::new(),
            producers: Vec::new(),
            period_producers: BTreeSet::new(),
            last_wrap_block: None,
            accrued_reward: HashMap::new(),
            reward_status: HashMap::new(),
            bridge_pool: 0,
        }
    }

    // --- Scheduling ---

    pub fn period_of(&self, timestamp: Timestamp) -> PeriodNumber {
        timestamp / self.period_duration_secs
    }

    pub fn current_period(&self) -> PeriodNumber {
        self.current_period
    }

    pub fn is_period_ending(&self, ctx: &BlockContext) -> bool {
        self.period_of(ctx.timestamp) > self.current_period
    }

    /// Gate for wrap-up: the caller must be the block's producer, the block
    /// must end an epoch, and an epoch wraps at most once per block.
    pub fn assert_can_wrap_up(
        &self,
        ctx: &BlockContext,
        caller: Address,
    ) -> Result<(), ValidatorSetError> {
        if caller != ctx.producer {
            return Err(ValidatorSetError::NotBlockProducer(caller));
        }
        // the bootstrap wrap-up runs before any producer exists
        if !self.producers.is_empty() && !self.producers.contains(&caller) {
            return Err(ValidatorSetError::NotBlockProducer(caller));
        }
        if !self.schedule.is_epoch_ending(ctx.number) {
            return Err(ValidatorSetError::NotEpochEnding(ctx.number));
        }
        if self.last_wrap_block == Some(ctx.number) {
            return Err(ValidatorSetError::AlreadyWrappedUp(ctx.number));
        }
        Ok(())
    }

    // --- Reward accrual ---

    /// Accrue one block's reward for the producing validator. The bonus
    /// grant was already drawn from the vault by the caller.
    pub fn submit_block_reward(
        &mut self,
        ctx: &BlockContext,
        caller: Address,
        value: Balance,
        grant: BonusGrant,
        sink: &mut EventSink,
    ) -> Result<(), ValidatorSetError> {
        if caller != ctx.producer || !self.producers.contains(&caller) {
            return Err(ValidatorSetError::NotBlockProducer(caller));
        }
        // the bridge pool accrues for every produced block, deprecated or not
        self.bridge_pool += grant.bridge_operator_bonus;

        match self.reward_status.get(&caller) {
            Some(RewardStatus::Deprecated) => {
                sink.push(Event::BlockRewardDeprecated {
                    producer: caller,
                    amount: value + grant.producer_bonus,
                    kind: RewardDeprecationKind::Unavailability,
                });
            }
            Some(RewardStatus::Halved) => {
                let full = value + grant.producer_bonus;
                let kept = full / 2;
                *self.accrued_reward.entry(caller).or_insert(0) += kept;
                sink.push(Event::BlockRewardDeprecated {
                    producer: caller,
                    amount: full - kept,
                    kind: RewardDeprecationKind::AfterBailout,
                });
            }
            None => {
                *self.accrued_reward.entry(caller).or_insert(0) += value + grant.producer_bonus;
                sink.push(Event::BlockRewardSubmitted {
                    producer: caller,
                    submitted: value,
                    bonus: grant.producer_bonus,
                });
            }
        }
        Ok(())
    }

    /// A tier-crossing slash this period forfeits everything the target
    /// accrued and stops further accrual.
    pub fn deprecate_reward(&mut self, validator: Address) {
        self.accrued_reward.remove(&validator);
        self.reward_status.insert(validator, RewardStatus::Deprecated);
        debug!(%validator, "mining reward deprecated for the period");
    }

    /// After a bail-out the validator accrues again, at half rate, for the
    /// remainder of the period.
    pub fn halve_reward(&mut self, validator: Address) {
        self.reward_status.insert(validator, RewardStatus::Halved);
    }

    // --- Period settlement and set update ---

    /// Pay out the period's accrued rewards: commission to each treasury,
    /// the remainder pro-rata into the staking pool, and the bridge bonus
    /// pool split evenly across everyone who produced during the period,
    /// jailed members included. Division dust carries into the next
    /// period's pool, mirroring the dust rule of the staking split.
    pub fn settle_period_rewards(
        &mut self,
        ledger: &mut StakingLedger,
        sink: &mut EventSink,
    ) {
        let mut validators = self.validators.clone();
        validators.sort();
        for consensus in &validators {
            let accrued = self.accrued_reward.remove(consensus).unwrap_or(0);
            if accrued == 0 {
                continue;
            }
            let Some(candidate) = ledger.candidate(consensus) else { continue };
            let commission =
                accrued * Balance::from(candidate.commission_bps) / Balance::from(MAX_COMMISSION_BPS);
            let pool_share = accrued - commission;
            if commission > 0 {
                sink.push(Event::MiningRewardDistributed {
                    consensus: *consensus,
                    treasury: candidate.treasury,
                    amount: commission,
                });
            }
            if pool_share > 0 {
                ledger.credit_pool_reward(*consensus, pool_share);
                sink.push(Event::StakingRewardDistributed {
                    pool: *consensus,
                    amount: pool_share,
                });
            }
        }
        self.accrued_reward.clear();
        self.reward_status.clear();

        let count = self.period_producers.len() as Balance;
        if self.bridge_pool > 0 && count > 0 {
            let share = self.bridge_pool / count;
            if share > 0 {
                for consensus in &self.period_producers {
                    let Some(candidate) = ledger.candidate(consensus) else { continue };
                    sink.push(Event::BridgeOperatorRewardDistributed {
                        consensus: *consensus,
                        bridge_operator: candidate.bridge_operator,
                        treasury: candidate.treasury,
                        amount: share,
                    });
                }
                self.bridge_pool -= share * count;
            }
        }
        info!(period = self.current_period, "period rewards settled");
    }

    /// Re-rank (at period boundaries) and refresh the producer subset, then
    /// emit the wrap-up notifications.
    pub fn update_sets(
        &mut self,
        ctx: &BlockContext,
        period_ending: bool,
        ledger: &StakingLedger,
        slashing: &impl SlashingPort,
        sink: &mut EventSink,
    ) {
        self.last_wrap_block = Some(ctx.number);
        let epoch = self.schedule.epoch_of(ctx.number);
        let wrapped_period = self.current_period;

        if period_ending {
            self.current_period = self.period_of(ctx.timestamp);
            let ranked = Self::rank(ledger.active_candidates(), self.max_validator_number);
            if ranked != self.validators {
                info!(period = self.current_period, count = ranked.len(), "validator set updated");
                self.validators = ranked;
                sink.push(Event::ValidatorSetUpdated {
                    period: self.current_period,
                    validators: self.validators.clone(),
                });
            }
        }

        let next_block = ctx.number + 1;
        let producers: Vec<Address> = self
            .validators
            .iter()
            .copied()
            .filter(|v| !slashing.is_jailed_at(v, next_block))
            .collect();
        if producers != self.producers {
            self.producers = producers;
            sink.push(Event::BlockProducerSetUpdated {
                period: self.current_period,
                producers: self.producers.clone(),
            });
        }
        if period_ending {
            self.period_producers = self.producers.iter().copied().collect();
        } else {
            self.period_producers.extend(self.producers.iter().copied());
        }

        sink.push(Event::WrappedUpEpoch { period: wrapped_period, epoch, period_ending });
    }

    /// Highest total stake first; ties broken by ascending address so the
    /// ranking is a total order.
    fn rank(mut candidates: Vec<(Address, Balance)>, limit: usize) -> Vec<Address> {
        candidates.sort_by(|(addr_a, stake_a), (addr_b, stake_b)| {
            stake_b.cmp(stake_a).then(addr_a.cmp(addr_b))
        });
        candidates.truncate(limit);
        candidates.into_iter().map(|(addr, _)| addr).collect()
    }

    // --- Queries ---

    pub fn validators(&self) -> &[Address] {
        &self.validators
    }

    pub fn block_producers(&self) -> &[Address] {
        &self.producers
    }

    pub fn is_validator(&self, addr: &Address) -> bool {
        self.validators.contains(addr)
    }

    pub fn is_block_producer(&self, addr: &Address) -> bool {
        self.producers.contains(addr)
    }

    pub fn reward_of(&self, addr: &Address) -> Balance {
        self.accrued_reward.get(addr).copied().unwrap_or(0)
    }

    pub fn bridge_pool_balance(&self) -> Balance {
        self.bridge_pool
    }
}
