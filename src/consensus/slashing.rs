// Slashing - unavailability indicators, double-sign evidence, jail terms
//
// Slashes are reported by the current block producer. Indicator slashes
// escalate through two tiers; both tiers zero the target's mining reward
// for the period and the second tier also deducts stake and jails. Credit
// scores let a jailed validator buy its way out once per period.
use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::consensus::credit::CreditScoreBook;
use crate::consensus::epoch::EpochSchedule;
use crate::consensus::ports::StakingPort;
use crate::error::ErrorKind;
use crate::events::{Event, EventSink, SlashKind};
use crate::types::{Address, Balance, BlockContext, BlockNumber, PeriodNumber, Signature64};

#[derive(Debug, thiserror::Error)]
pub enum SlashError {
    #[error("{0} is not the producer of this block")]
    NotBlockProducer(Address),

    #[error("a slash was already recorded in block {0}")]
    AlreadySlashedInBlock(BlockNumber),

    #[error("double-sign evidence is malformed or not signed by the accused")]
    InvalidEvidence,

    #[error("{0} is not a validator candidate")]
    UnknownValidator(Address),

    #[error("{0} is not jailed")]
    NotJailed(Address),

    #[error("{0} already bailed out this period")]
    AlreadyBailedOut(Address),

    #[error("credit score {score} cannot cover the {cost} bail-out cost")]
    InsufficientCredit { score: u64, cost: u64 },
}

impl SlashError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotBlockProducer(_) => ErrorKind::Authorization,
            Self::AlreadySlashedInBlock(_) => ErrorKind::Ordering,
            Self::NotJailed(_) => ErrorKind::Timing,
            Self::InsufficientCredit { .. } => ErrorKind::InsufficientResource,
            Self::InvalidEvidence | Self::UnknownValidator(_) | Self::AlreadyBailedOut(_) => {
                ErrorKind::State
            }
        }
    }
}

/// Current jail term of a validator. `jailed_until` is the first block at
/// which the validator is free again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct JailRecord {
    pub jailed_until: BlockNumber,
}

/// What a slash call did, reported upward so the scheduler can adjust
/// reward accrual for the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashOutcome {
    /// Indicator moved but stayed under every threshold
    Recorded,
    /// A tier threshold was crossed (or a double-sign was proven); the
    /// target's mining reward for this period is forfeit
    Punished(SlashKind),
}

#[derive(Debug)]
pub struct SlashIndicator {
    tier1_threshold: u64,
    tier2_threshold: u64,
    slash_felony_amount: Balance,
    felony_jail_blocks: BlockNumber,
    double_sign_slash_amount: Balance,
    double_sign_jail_blocks: BlockNumber,
    bail_out_cost_multiplier: u64,
    schedule: EpochSchedule,

    indicators: HashMap<Address, u64>,
    jail: HashMap<Address, JailRecord>,
    /// Block of the last accepted slash; at most one slash lands per block
    last_slash_block: Option<BlockNumber>,
    /// Validators that were jailed at any point in the current period
    jailed_in_period: HashSet<Address>,
    /// Validators that already spent their one bail-out this period
    bailed_out_in_period: HashSet<Address>,
    credit: CreditScoreBook,
}

impl SlashIndicator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            tier1_threshold: config.unavailability_tier1_threshold,
            tier2_threshold: config.unavailability_tier2_threshold,
            slash_felony_amount: config.slash_felony_amount,
            felony_jail_blocks: config.felony_jail_blocks,
            double_sign_slash_amount: config.double_sign_slash_amount,
            double_sign_jail_blocks: config.double_sign_jail_blocks,
            bail_out_cost_multiplier: config.bail_out_cost_multiplier,
            schedule: EpochSchedule::new(config.blocks_per_epoch),
            indicators: HashMap::new(),
            jail: HashMap::new(),
            last_slash_block: None,
            jailed_in_period: HashSet::new(),
            bailed_out_in_period: HashSet::new(),
            credit: CreditScoreBook::new(config),
        }
    }

    /// Report one missed-duty observation against `target`. Self-reports
    /// are silently ignored; only the first slash per block is accepted.
    pub fn slash_unavailability(
        &mut self,
        ctx: &BlockContext,
        caller: Address,
        target: Address,
        period: PeriodNumber,
        staking: &mut impl StakingPort,
        sink: &mut EventSink,
    ) -> Result<SlashOutcome, SlashError> {
        if caller != ctx.producer {
            return Err(SlashError::NotBlockProducer(caller));
        }
        if target == caller {
            return Ok(SlashOutcome::Recorded);
        }
        if !staking.is_validator_candidate(&target) {
            return Err(SlashError::UnknownValidator(target));
        }
        if self.last_slash_block == Some(ctx.number) {
            return Err(SlashError::AlreadySlashedInBlock(ctx.number));
        }
        self.last_slash_block = Some(ctx.number);

        let indicator = self.indicators.entry(target).or_insert(0);
        *indicator += 1;
        let indicator = *indicator;
        debug!(validator = %target, indicator, "unavailability recorded");

        if indicator == self.tier2_threshold {
            let deducted = staking.deduct_self_stake(target, self.slash_felony_amount);
            let jailed_until = ctx.number + self.felony_jail_blocks;
            self.jail_until(target, jailed_until);
            warn!(validator = %target, deducted, jailed_until, "tier-2 unavailability slash");
            sink.push(Event::Slashed {
                validator: target,
                kind: SlashKind::UnavailabilityTier2,
                period,
            });
            sink.push(Event::ValidatorPunished {
                validator: target,
                jailed_until: Some(jailed_until),
                deducted_stake: deducted,
            });
            Ok(SlashOutcome::Punished(SlashKind::UnavailabilityTier2))
        } else if indicator == self.tier1_threshold {
            info!(validator = %target, "tier-1 unavailability slash");
            sink.push(Event::Slashed {
                validator: target,
                kind: SlashKind::UnavailabilityTier1,
                period,
            });
            sink.push(Event::ValidatorPunished {
                validator: target,
                jailed_until: None,
                deducted_stake: 0,
            });
            Ok(SlashOutcome::Punished(SlashKind::UnavailabilityTier1))
        } else {
            Ok(SlashOutcome::Recorded)
        }
    }

    /// Punish a proven double-sign: two distinct headers for the same
    /// height, each carrying the target's signature. Fixed penalty,
    /// immediate jail, no tiers involved.
    #[allow(clippy::too_many_arguments)]
    pub fn slash_double_sign(
        &mut self,
        ctx: &BlockContext,
        caller: Address,
        target: Address,
        header_a: &[u8],
        sig_a: &Signature64,
        header_b: &[u8],
        sig_b: &Signature64,
        period: PeriodNumber,
        staking: &mut impl StakingPort,
        sink: &mut EventSink,
    ) -> Result<SlashOutcome, SlashError> {
        if caller != ctx.producer {
            return Err(SlashError::NotBlockProducer(caller));
        }
        if target == caller {
            return Ok(SlashOutcome::Recorded);
        }
        if header_a.is_empty() || header_b.is_empty() || header_a == header_b {
            return Err(SlashError::InvalidEvidence);
        }
        if !target.verify(header_a, sig_a.as_bytes()) || !target.verify(header_b, sig_b.as_bytes())
        {
            return Err(SlashError::InvalidEvidence);
        }
        if !staking.is_validator_candidate(&target) {
            return Err(SlashError::UnknownValidator(target));
        }
        if self.last_slash_block == Some(ctx.number) {
            return Err(SlashError::AlreadySlashedInBlock(ctx.number));
        }
        self.last_slash_block = Some(ctx.number);

        let deducted = staking.deduct_self_stake(target, self.double_sign_slash_amount);
        let jailed_until = ctx.number + self.double_sign_jail_blocks;
        self.jail_until(target, jailed_until);
        warn!(validator = %target, deducted, jailed_until, "double-sign slash");
        sink.push(Event::Slashed { validator: target, kind: SlashKind::DoubleSigning, period });
        sink.push(Event::ValidatorPunished {
            validator: target,
            jailed_until: Some(jailed_until),
            deducted_stake: deducted,
        });
        Ok(SlashOutcome::Punished(SlashKind::DoubleSigning))
    }

    /// Spend credit score to end a jail term early. The cost scales with
    /// the epochs left to serve; only one bail-out is allowed per period.
    pub fn bail_out(
        &mut self,
        ctx: &BlockContext,
        validator: Address,
        period: PeriodNumber,
        sink: &mut EventSink,
    ) -> Result<(), SlashError> {
        let record = match self.jail.get(&validator) {
            Some(record) if ctx.number < record.jailed_until => *record,
            _ => return Err(SlashError::NotJailed(validator)),
        };
        if self.bailed_out_in_period.contains(&validator) {
            return Err(SlashError::AlreadyBailedOut(validator));
        }
        let blocks_left = record.jailed_until - ctx.number;
        let cost = self.bail_out_cost_multiplier * self.schedule.epochs_covering(blocks_left);
        let score = self.credit.score_of(&validator);
        if !self.credit.try_spend(&validator, cost) {
            return Err(SlashError::InsufficientCredit { score, cost });
        }

        self.jail.remove(&validator);
        self.indicators.remove(&validator);
        self.bailed_out_in_period.insert(validator);
        info!(%validator, cost, "bailed out of jail");
        sink.push(Event::BailedOut { validator, period });
        sink.push(Event::ValidatorUnjailed { validator });
        Ok(())
    }

    /// Period-boundary settlement: accrue credit for the period's
    /// validators, then reset indicators and the per-period flags.
    pub fn on_period_end(&mut self, ctx: &BlockContext, validators: &[Address]) {
        for validator in validators {
            let indicator = self.indicator_of(validator);
            let was_jailed = self.jailed_in_period.contains(validator)
                || self.is_jailed_at(validator, ctx.number);
            self.credit.settle_period(*validator, indicator, was_jailed);
        }
        self.indicators.clear();
        self.bailed_out_in_period.clear();
        self.jail.retain(|_, record| ctx.number < record.jailed_until);
        self.jailed_in_period = self.jail.keys().copied().collect();
    }

    fn jail_until(&mut self, validator: Address, jailed_until: BlockNumber) {
        let record = self.jail.entry(validator).or_insert(JailRecord { jailed_until });
        record.jailed_until = record.jailed_until.max(jailed_until);
        self.jailed_in_period.insert(validator);
    }

    // --- Queries ---

    pub fn is_jailed_at(&self, validator: &Address, block: BlockNumber) -> bool {
        self.jail
            .get(validator)
            .map(|record| block < record.jailed_until)
            .unwrap_or(false)
    }

    /// Blocks left to serve, if currently jailed
    pub fn jailed_time_left(&self, validator: &Address, block: BlockNumber) -> Option<BlockNumber> {
        self.jail.get(validator).and_then(|record| {
            (block < record.jailed_until).then(|| record.jailed_until - block)
        })
    }

    pub fn indicator_of(&self, validator: &Address) -> u64 {
        self.indicators.get(validator).copied().unwrap_or(0)
    }

    pub fn credit_score(&self, validator: &Address) -> u64 {
        self.credit.score_of(validator)
    }

    pub fn was_bailed_out_in_period(&self, validator: &Address) -> bool {
        self.bailed_out_in_period.contains(validator)
    }
}
