// Staking ledger - candidate pools, self-stakes, delegations, cooldowns
//
// The ledger is pure bookkeeping: it never decides who validates. The
// scheduler reads stake totals out of it at period boundaries and the
// slashing engine deducts penalties through it.
use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::ErrorKind;
use crate::events::{Event, EventSink};
use crate::staking::candidate::{CandidateStatus, ValidatorCandidate};
use crate::types::{Address, Balance, BlockContext, Timestamp, MAX_COMMISSION_BPS};

#[derive(Debug, thiserror::Error)]
pub enum StakingError {
    #[error("no candidate pool registered under {0}")]
    UnknownPool(Address),

    #[error("{0} is already an active validator candidate")]
    AlreadyCandidate(Address),

    #[error("{0} already administers another pool")]
    AdminAlreadyInUse(Address),

    #[error("{caller} is not the admin of pool {pool}")]
    NotPoolAdmin { caller: Address, pool: Address },

    #[error("pool admin {0} may not delegate")]
    AdminCannotDelegate(Address),

    #[error("commission {0} exceeds {MAX_COMMISSION_BPS} basis points")]
    InvalidCommission(u32),

    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("self-stake would drop to {remaining}, below the {minimum} minimum")]
    InsufficientStake { remaining: Balance, minimum: Balance },

    #[error("delegation holds {available}, cannot release {requested}")]
    InsufficientDelegation { available: Balance, requested: Balance },

    #[error("funds locked until {available_at}")]
    CooldownActive { available_at: Timestamp },

    #[error("candidate roster is full ({0} pools)")]
    ExceedsMaxCandidates(usize),

    #[error("pool {0} is renouncing or revoked")]
    PoolNotActive(Address),
}

impl StakingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotPoolAdmin { .. } | Self::AdminCannotDelegate(_) => ErrorKind::Authorization,
            Self::CooldownActive { .. } => ErrorKind::Timing,
            Self::InsufficientStake { .. } | Self::InsufficientDelegation { .. } => {
                ErrorKind::InsufficientResource
            }
            _ => ErrorKind::State,
        }
    }
}

/// A delegator's position in one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DelegationRecord {
    pub amount: Balance,
    /// Last delegate/undelegate touch, for the cooldown
    pub last_action: Timestamp,
}

/// One candidate pool: identity, self-stake and delegated stake
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CandidatePool {
    pub candidate: ValidatorCandidate,
    pub self_stake: Balance,
    /// Last stake/unstake touch by the admin, for the cooldown
    pub last_self_action: Timestamp,
    /// Ordered so iteration (reward pro-rata) is deterministic
    pub delegations: BTreeMap<Address, DelegationRecord>,
    pub total_delegated: Balance,
}

impl CandidatePool {
    pub fn total_stake(&self) -> Balance {
        self.self_stake + self.total_delegated
    }
}

#[derive(Debug)]
pub struct StakingLedger {
    min_validator_stake: Balance,
    max_validator_candidate: usize,
    cooldown_secs_to_undelegate: Timestamp,
    waiting_secs_to_revoke: Timestamp,
    /// Keyed by consensus address; revoked pools stay here so surviving
    /// delegations can still be withdrawn
    pools: HashMap<Address, CandidatePool>,
    /// admin -> consensus, for the non-revoked pools only
    admin_index: HashMap<Address, Address>,
    /// Settled but unclaimed staking rewards per staker, across all pools
    pending_rewards: HashMap<Address, Balance>,
}

impl StakingLedger {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            min_validator_stake: config.min_validator_stake,
            max_validator_candidate: config.max_validator_candidate,
            cooldown_secs_to_undelegate: config.cooldown_secs_to_undelegate,
            waiting_secs_to_revoke: config.waiting_secs_to_revoke,
            pools: HashMap::new(),
            admin_index: HashMap::new(),
            pending_rewards: HashMap::new(),
        }
    }

    /// Register a new candidate pool, or reactivate a fully revoked one.
    /// Delegations left behind in a revoked pool survive the rejoin.
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
        sink: &mut EventSink,
    ) -> Result<(), StakingError> {
        if caller != admin {
            return Err(StakingError::NotPoolAdmin { caller, pool: consensus });
        }
        if commission_bps > MAX_COMMISSION_BPS {
            return Err(StakingError::InvalidCommission(commission_bps));
        }
        if amount < self.min_validator_stake {
            return Err(StakingError::InsufficientStake {
                remaining: amount,
                minimum: self.min_validator_stake,
            });
        }
        if let Some(existing) = self.pools.get(&consensus) {
            if !matches!(existing.candidate.status, CandidateStatus::Revoked) {
                return Err(StakingError::AlreadyCandidate(consensus));
            }
        }
        if let Some(other) = self.admin_index.get(&admin) {
            if *other != consensus {
                return Err(StakingError::AdminAlreadyInUse(admin));
            }
        }
        let registered = self.registered_count();
        if registered >= self.max_validator_candidate {
            return Err(StakingError::ExceedsMaxCandidates(registered));
        }

        let candidate = ValidatorCandidate {
            consensus,
            admin,
            treasury,
            bridge_operator,
            commission_bps,
            status: CandidateStatus::Active,
        };
        let pool = self.pools.entry(consensus).or_insert_with(|| CandidatePool {
            candidate: candidate.clone(),
            self_stake: 0,
            last_self_action: ctx.timestamp,
            delegations: BTreeMap::new(),
            total_delegated: 0,
        });
        pool.candidate = candidate;
        pool.self_stake = amount;
        pool.last_self_action = ctx.timestamp;
        self.admin_index.insert(admin, consensus);

        info!(pool = %consensus, %admin, stake = amount, "candidate pool approved");
        sink.push(Event::PoolApproved { pool: consensus, admin });
        sink.push(Event::Staked { pool: consensus, amount });
        Ok(())
    }

    /// Admin adds to the pool's self-stake
    pub fn stake(
        &mut self,
        ctx: &BlockContext,
        caller: Address,
        pool: Address,
        amount: Balance,
        sink: &mut EventSink,
    ) -> Result<(), StakingError> {
        if amount == 0 {
            return Err(StakingError::ZeroAmount);
        }
        let record = self.active_pool_of_admin(caller, pool)?;
        record.self_stake += amount;
        record.last_self_action = ctx.timestamp;
        debug!(%pool, amount, "self-stake increased");
        sink.push(Event::Staked { pool, amount });
        Ok(())
    }

    /// Admin withdraws part of the self-stake. The remainder must stay at
    /// or above the candidacy minimum and the cooldown must have expired.
    pub fn unstake(
        &mut self,
        ctx: &BlockContext,
        caller: Address,
        pool: Address,
        amount: Balance,
        sink: &mut EventSink,
    ) -> Result<(), StakingError> {
        if amount == 0 {
            return Err(StakingError::ZeroAmount);
        }
        let minimum = self.min_validator_stake;
        let cooldown = self.cooldown_secs_to_undelegate;
        let record = self.active_pool_of_admin(caller, pool)?;

        let available_at = record.last_self_action + cooldown;
        if ctx.timestamp < available_at {
            return Err(StakingError::CooldownActive { available_at });
        }
        let remaining = record.self_stake.saturating_sub(amount);
        if amount > record.self_stake || remaining < minimum {
            return Err(StakingError::InsufficientStake { remaining, minimum });
        }
        record.self_stake = remaining;
        record.last_self_action = ctx.timestamp;
        debug!(%pool, amount, remaining, "self-stake decreased");
        sink.push(Event::Unstaked { pool, amount });
        Ok(())
    }

    /// Third-party delegation into an active pool
    pub fn delegate(
        &mut self,
        ctx: &BlockContext,
        caller: Address,
        pool: Address,
        amount: Balance,
        sink: &mut EventSink,
    ) -> Result<(), StakingError> {
        if amount == 0 {
            return Err(StakingError::ZeroAmount);
        }
        if self.admin_index.contains_key(&caller) {
            return Err(StakingError::AdminCannotDelegate(caller));
        }
        let record = self.pools.get_mut(&pool).ok_or(StakingError::UnknownPool(pool))?;
        if !record.candidate.is_active() {
            return Err(StakingError::PoolNotActive(pool));
        }
        let entry = record
            .delegations
            .entry(caller)
            .or_insert(DelegationRecord { amount: 0, last_action: ctx.timestamp });
        entry.amount += amount;
        entry.last_action = ctx.timestamp;
        record.total_delegated += amount;
        debug!(delegator = %caller, %pool, amount, "delegated");
        sink.push(Event::Delegated { delegator: caller, pool, amount });
        Ok(())
    }

    /// Withdraw delegated stake. The cooldown applies only while the pool is
    /// still active; funds in a revoked pool are released immediately.
    pub fn undelegate(
        &mut self,
        ctx: &BlockContext,
        caller: Address,
        pool: Address,
        amount: Balance,
        sink: &mut EventSink,
    ) -> Result<(), StakingError> {
        if amount == 0 {
            return Err(StakingError::ZeroAmount);
        }
        let cooldown = self.cooldown_secs_to_undelegate;
        let record = self.pools.get_mut(&pool).ok_or(StakingError::UnknownPool(pool))?;
        let entry = match record.delegations.get_mut(&caller) {
            Some(entry) if entry.amount >= amount => entry,
            Some(entry) => {
                return Err(StakingError::InsufficientDelegation {
                    available: entry.amount,
                    requested: amount,
                })
            }
            None => {
                return Err(StakingError::InsufficientDelegation {
                    available: 0,
                    requested: amount,
                })
            }
        };
        if record.candidate.is_active() {
            let available_at = entry.last_action + cooldown;
            if ctx.timestamp < available_at {
                return Err(StakingError::CooldownActive { available_at });
            }
        }
        entry.amount -= amount;
        entry.last_action = ctx.timestamp;
        if entry.amount == 0 {
            record.delegations.remove(&caller);
        }
        record.total_delegated -= amount;
        debug!(delegator = %caller, %pool, amount, "undelegated");
        sink.push(Event::Undelegated { delegator: caller, pool, amount });
        Ok(())
    }

    /// First half of the two-phase exit: mark the pool as renouncing. The
    /// revocation itself happens at the first period boundary past the
    /// waiting window.
    pub fn request_renounce(
        &mut self,
        ctx: &BlockContext,
        caller: Address,
        pool: Address,
        sink: &mut EventSink,
    ) -> Result<(), StakingError> {
        let waiting = self.waiting_secs_to_revoke;
        let record = self.active_pool_of_admin(caller, pool)?;
        let effective_at = ctx.timestamp + waiting;
        record.candidate.status = CandidateStatus::RenounceRequested { effective_at };
        info!(%pool, effective_at, "renounce requested");
        sink.push(Event::RenounceRequested { pool, effective_at });
        Ok(())
    }

    /// Period-boundary sweep: finalize matured renounces and evict pools
    /// whose self-stake fell below the minimum (slashing can push it there).
    /// Returns the consensus addresses revoked in this sweep.
    pub fn sweep_at_period_end(
        &mut self,
        ctx: &BlockContext,
        sink: &mut EventSink,
    ) -> Vec<Address> {
        let due: Vec<Address> = self
            .pools
            .iter()
            .filter(|(_, p)| match p.candidate.status {
                CandidateStatus::RenounceRequested { effective_at } => {
                    effective_at <= ctx.timestamp
                }
                CandidateStatus::Active => p.self_stake < self.min_validator_stake,
                CandidateStatus::Revoked => false,
            })
            .map(|(addr, _)| *addr)
            .collect();
        let mut revoked = due;
        revoked.sort();
        for consensus in &revoked {
            self.revoke_pool(*consensus, sink);
        }
        revoked
    }

    fn revoke_pool(&mut self, consensus: Address, sink: &mut EventSink) {
        if let Some(record) = self.pools.get_mut(&consensus) {
            let refunded = record.self_stake;
            record.self_stake = 0;
            record.candidate.status = CandidateStatus::Revoked;
            self.admin_index.remove(&record.candidate.admin);
            info!(pool = %consensus, refunded, "candidate revoked");
            sink.push(Event::CandidateRevoked { pool: consensus, refunded_self_stake: refunded });
        }
    }

    /// Period settlement: split a pool's staking reward over its members
    /// in proportion to their stake. The admin's share covers the
    /// self-stake plus any integer-division dust, so the full amount is
    /// always credited.
    pub fn credit_pool_reward(&mut self, consensus: Address, amount: Balance) {
        let Some(record) = self.pools.get(&consensus) else { return };
        let total = record.total_stake();
        if amount == 0 || total == 0 {
            return;
        }
        let mut distributed = 0;
        let shares: Vec<(Address, Balance)> = record
            .delegations
            .iter()
            .map(|(delegator, d)| (*delegator, amount * d.amount / total))
            .collect();
        for (delegator, share) in shares {
            if share > 0 {
                distributed += share;
                *self.pending_rewards.entry(delegator).or_insert(0) += share;
            }
        }
        let admin = self.pools[&consensus].candidate.admin;
        *self.pending_rewards.entry(admin).or_insert(0) += amount - distributed;
    }

    /// Slashing penalty: take up to `amount` from the pool's self-stake.
    /// Returns what was actually deducted.
    pub fn deduct_self_stake(&mut self, consensus: Address, amount: Balance) -> Balance {
        match self.pools.get_mut(&consensus) {
            Some(record) => {
                let deducted = amount.min(record.self_stake);
                record.self_stake -= deducted;
                deducted
            }
            None => 0,
        }
    }

    // --- Queries ---

    pub fn pool(&self, consensus: &Address) -> Option<&CandidatePool> {
        self.pools.get(consensus)
    }

    pub fn candidate(&self, consensus: &Address) -> Option<&ValidatorCandidate> {
        self.pools.get(consensus).map(|p| &p.candidate)
    }

    /// Candidates eligible for ranking, with their total stake
    pub fn active_candidates(&self) -> Vec<(Address, Balance)> {
        self.pools
            .iter()
            .filter(|(_, p)| p.candidate.is_active())
            .map(|(addr, p)| (*addr, p.total_stake()))
            .collect()
    }

    pub fn is_validator_candidate(&self, consensus: &Address) -> bool {
        self.pools
            .get(consensus)
            .map(|p| !matches!(p.candidate.status, CandidateStatus::Revoked))
            .unwrap_or(false)
    }

    pub fn total_stake_of(&self, consensus: &Address) -> Balance {
        self.pools.get(consensus).map(|p| p.total_stake()).unwrap_or(0)
    }

    pub fn self_stake_of(&self, consensus: &Address) -> Balance {
        self.pools.get(consensus).map(|p| p.self_stake).unwrap_or(0)
    }

    pub fn pending_reward_of(&self, staker: &Address) -> Balance {
        self.pending_rewards.get(staker).copied().unwrap_or(0)
    }

    pub fn delegation_of(&self, consensus: &Address, delegator: &Address) -> Balance {
        self.pools
            .get(consensus)
            .and_then(|p| p.delegations.get(delegator))
            .map(|d| d.amount)
            .unwrap_or(0)
    }

    fn registered_count(&self) -> usize {
        self.pools
            .values()
            .filter(|p| !matches!(p.candidate.status, CandidateStatus::Revoked))
            .count()
    }

    fn active_pool_of_admin(
        &mut self,
        caller: Address,
        pool: Address,
    ) -> Result<&mut CandidatePool, StakingError> {
        let record = self.pools.get_mut(&pool).ok_or(StakingError::UnknownPool(pool))?;
        if record.candidate.admin != caller {
            return Err(StakingError::NotPoolAdmin { caller, pool });
        }
        if !record.candidate.is_active() {
            return Err(StakingError::PoolNotActive(pool));
        }
        Ok(record)
    }
}
