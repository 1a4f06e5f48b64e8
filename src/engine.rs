// DposEngine - the single entry point for all block-driven transitions
//
// Owns the ledger, the slashing engine, the scheduler and the bonus vault,
// and sequences every cross-component interaction. Callers drive it once
// per block with an explicit BlockContext and drain the event sink after
// each call.
use tracing::info;

use crate::config::EngineConfig;
use crate::consensus::{
    SlashError, SlashIndicator, SlashOutcome, StakingVesting, ValidatorSetError,
    ValidatorSetManager,
};
use crate::error::ErrorKind;
use crate::events::{Event, EventSink};
use crate::governance::GovernanceError;
use crate::staking::{StakingError, StakingLedger};
use crate::types::{
    Address, Balance, BlockContext, BlockNumber, EpochNumber, PeriodNumber, Signature64,
};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Staking(#[from] StakingError),

    #[error(transparent)]
    Slashing(#[from] SlashError),

    #[error(transparent)]
    ValidatorSet(#[from] ValidatorSetError),

    #[error(transparent)]
    Governance(#[from] GovernanceError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Staking(e) => e.kind(),
            Self::Slashing(e) => e.kind(),
            Self::ValidatorSet(e) => e.kind(),
            Self::Governance(e) => e.kind(),
        }
    }
}

pub struct DposEngine {
    config: EngineConfig,
    ledger: StakingLedger,
    slashing: SlashIndicator,
    validator_set: ValidatorSetManager,
    vesting: StakingVesting,
    events: EventSink,
}

impl DposEngine {
    pub fn new(config: EngineConfig, vault_balance: Balance) -> Self {
        info!(
            max_validators = config.max_validator_number,
            blocks_per_epoch = config.blocks_per_epoch,
            "engine initialized"
        );
        Self {
            ledger: StakingLedger::new(&config),
            slashing: SlashIndicator::new(&config),
            validator_set: ValidatorSetManager::new(&config),
            vesting: StakingVesting::new(&config, vault_balance),
            config,
            events: EventSink::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn fund_bonus_vault(&mut self, amount: Balance) {
        self.vesting.fund(amount);
    }

    // --- Staking entry points ---

    #[allow(clippy::too_many_arguments)]
    pub fn apply_candidate(
        &mut self,
        ctx: &BlockContext,
        caller: Address,
        consensus: Address,
        admin: Address,
        treasury: Address,
        bridge_operator: Address,
        commission_bps: u32,
        amount: Balance,
    ) -> Result<(), EngineError> {
        self.ledger
            .apply_candidate(
                ctx,
                caller,
                consensus,
                admin,
                treasury,
                bridge_operator,
                commission_bps,
                amount,
                &mut self.events,
            )
            .map_err(Into::into)
    }

    pub fn stake(
        &mut self,
        ctx: &BlockContext,
        caller: Address,
        pool: Address,
        amount: Balance,
    ) -> Result<(), EngineError> {
        self.ledger.stake(ctx, caller, pool, amount, &mut self.events).map_err(Into::into)
    }

    pub fn unstake(
        &mut self,
        ctx: &BlockContext,
        caller: Address,
        pool: Address,
        amount: Balance,
    ) -> Result<(), EngineError> {
        self.ledger.unstake(ctx, caller, pool, amount, &mut self.events).map_err(Into::into)
    }

    pub fn delegate(
        &mut self,
        ctx: &BlockContext,
        caller: Address,
        pool: Address,
        amount: Balance,
    ) -> Result<(), EngineError> {
        self.ledger.delegate(ctx, caller, pool, amount, &mut self.events).map_err(Into::into)
    }

    pub fn undelegate(
        &mut self,
        ctx: &BlockContext,
        caller: Address,
        pool: Address,
        amount: Balance,
    ) -> Result<(), EngineError> {
        self.ledger
            .undelegate(ctx, caller, pool, amount, &mut self.events)
            .map_err(Into::into)
    }

    pub fn request_renounce(
        &mut self,
        ctx: &BlockContext,
        caller: Address,
        pool: Address,
    ) -> Result<(), EngineError> {
        self.ledger.request_renounce(ctx, caller, pool, &mut self.events).map_err(Into::into)
    }

    // --- Block-driven entry points ---

    /// The producing validator reports the block's transaction-fee reward.
    /// The vault bonus is drawn only after the caller is authorized, so a
    /// rejected submission never touches the vault.
    pub fn submit_block_reward(
        &mut self,
        ctx: &BlockContext,
        caller: Address,
        value: Balance,
    ) -> Result<(), EngineError> {
        if caller != ctx.producer || !self.validator_set.is_block_producer(&caller) {
            return Err(ValidatorSetError::NotBlockProducer(caller).into());
        }
        let grant = self.vesting.request_bonus(ctx, &mut self.events);
        self.validator_set
            .submit_block_reward(ctx, caller, value, grant, &mut self.events)
            .map_err(Into::into)
    }

    /// Close the epoch ending at this block. At a period boundary this also
    /// settles rewards, accrues credit, resets indicators, finalizes exits
    /// and re-ranks the validator set; every wrap refreshes the producer
    /// subset from the current jail states.
    pub fn wrap_up_epoch(&mut self, ctx: &BlockContext, caller: Address) -> Result<(), EngineError> {
        self.validator_set.assert_can_wrap_up(ctx, caller)?;
        let period_ending = self.validator_set.is_period_ending(ctx);

        if period_ending {
            self.validator_set.settle_period_rewards(&mut self.ledger, &mut self.events);
            let validators = self.validator_set.validators().to_vec();
            self.slashing.on_period_end(ctx, &validators);
            self.ledger.sweep_at_period_end(ctx, &mut self.events);
        }
        self.validator_set.update_sets(
            ctx,
            period_ending,
            &self.ledger,
            &self.slashing,
            &mut self.events,
        );
        Ok(())
    }

    // --- Slashing entry points ---

    pub fn slash_unavailability(
        &mut self,
        ctx: &BlockContext,
        caller: Address,
        target: Address,
    ) -> Result<(), EngineError> {
        self.require_producer(ctx, caller)?;
        let period = self.validator_set.current_period();
        let outcome = self.slashing.slash_unavailability(
            ctx,
            caller,
            target,
            period,
            &mut self.ledger,
            &mut self.events,
        )?;
        if let SlashOutcome::Punished(_) = outcome {
            self.validator_set.deprecate_reward(target);
        }
        Ok(())
    }

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
    ) -> Result<(), EngineError> {
        self.require_producer(ctx, caller)?;
        let period = self.validator_set.current_period();
        let outcome = self.slashing.slash_double_sign(
            ctx,
            caller,
            target,
            header_a,
            sig_a,
            header_b,
            sig_b,
            period,
            &mut self.ledger,
            &mut self.events,
        )?;
        if let SlashOutcome::Punished(_) = outcome {
            self.validator_set.deprecate_reward(target);
        }
        Ok(())
    }

    /// Pool-admin-only early release from jail, paid in credit score. The
    /// released validator rejoins the producer set at the next epoch wrap
    /// and accrues halved rewards until the period ends.
    pub fn bail_out(
        &mut self,
        ctx: &BlockContext,
        caller: Address,
        consensus: Address,
    ) -> Result<(), EngineError> {
        let admin = self
            .ledger
            .candidate(&consensus)
            .map(|c| c.admin)
            .ok_or(StakingError::UnknownPool(consensus))?;
        if caller != admin {
            return Err(StakingError::NotPoolAdmin { caller, pool: consensus }.into());
        }
        let period = self.validator_set.current_period();
        self.slashing.bail_out(ctx, consensus, period, &mut self.events)?;
        self.validator_set.halve_reward(consensus);
        Ok(())
    }

    // --- Events ---

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }

    // --- Queries ---

    pub fn validators(&self) -> &[Address] {
        self.validator_set.validators()
    }

    pub fn block_producers(&self) -> &[Address] {
        self.validator_set.block_producers()
    }

    pub fn is_validator(&self, addr: &Address) -> bool {
        self.validator_set.is_validator(addr)
    }

    pub fn is_block_producer(&self, addr: &Address) -> bool {
        self.validator_set.is_block_producer(addr)
    }

    pub fn is_validator_candidate(&self, addr: &Address) -> bool {
        self.ledger.is_validator_candidate(addr)
    }

    pub fn current_period(&self) -> PeriodNumber {
        self.validator_set.current_period()
    }

    pub fn epoch_of(&self, block: BlockNumber) -> EpochNumber {
        crate::consensus::EpochSchedule::new(self.config.blocks_per_epoch).epoch_of(block)
    }

    pub fn staking_total(&self, pool: &Address) -> Balance {
        self.ledger.total_stake_of(pool)
    }

    /// Stake held by `staker` in `pool`: the self-stake for the pool admin,
    /// the delegation otherwise
    pub fn staking_amount_of(&self, pool: &Address, staker: &Address) -> Balance {
        match self.ledger.candidate(pool) {
            Some(candidate) if candidate.admin == *staker => self.ledger.self_stake_of(pool),
            Some(_) => self.ledger.delegation_of(pool, staker),
            None => 0,
        }
    }

    pub fn reward_of(&self, addr: &Address) -> Balance {
        self.validator_set.reward_of(addr)
    }

    /// Settled staking rewards awaiting claim by `staker`
    pub fn pending_reward_of(&self, staker: &Address) -> Balance {
        self.ledger.pending_reward_of(staker)
    }

    pub fn credit_score(&self, addr: &Address) -> u64 {
        self.slashing.credit_score(addr)
    }

    pub fn unavailability_indicator(&self, addr: &Address) -> u64 {
        self.slashing.indicator_of(addr)
    }

    pub fn jailed_time_left(&self, addr: &Address, at_block: BlockNumber) -> Option<BlockNumber> {
        self.slashing.jailed_time_left(addr, at_block)
    }

    pub fn bonus_vault_balance(&self) -> Balance {
        self.vesting.balance()
    }

    fn require_producer(&self, ctx: &BlockContext, caller: Address) -> Result<(), EngineError> {
        if caller != ctx.producer || !self.validator_set.is_block_producer(&caller) {
            return Err(ValidatorSetError::NotBlockProducer(caller).into());
        }
        Ok(())
    }
}
