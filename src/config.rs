// EngineConfig - All economic and scheduling parameters in one place
//
// Governance proposals are the sole path that changes these values at
// runtime; the engine itself only reads them.
use crate::types::{Balance, BlockNumber, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // --- Staking ---
    /// Minimum self-stake to apply as a validator candidate and to stay one
    pub min_validator_stake: Balance,

    /// Maximum number of registered candidates
    pub max_validator_candidate: usize,

    /// Cooldown after the last stake/delegation change before funds can move
    pub cooldown_secs_to_undelegate: Timestamp,

    /// Waiting time between `requestRenounce` and the actual revocation
    pub waiting_secs_to_revoke: Timestamp,

    // --- Scheduler ---
    /// Number of validators picked at each period boundary
    pub max_validator_number: usize,

    /// Fixed epoch length in blocks
    pub blocks_per_epoch: BlockNumber,

    /// Period length in seconds (time-based boundary, not block count)
    pub period_duration_secs: Timestamp,

    // --- Slashing ---
    /// Indicator value that triggers a tier-1 (misdemeanor) slash
    pub unavailability_tier1_threshold: u64,

    /// Indicator value that triggers a tier-2 (felony) slash
    pub unavailability_tier2_threshold: u64,

    /// Self-stake deducted on a tier-2 slash
    pub slash_felony_amount: Balance,

    /// Jail term length for a tier-2 slash, in blocks
    pub felony_jail_blocks: BlockNumber,

    /// Self-stake deducted on a proven double-sign
    pub double_sign_slash_amount: Balance,

    /// Jail term length for a double-sign, in blocks
    pub double_sign_jail_blocks: BlockNumber,

    // --- Credit score ---
    /// Score gained per clean period (reduced by the period's indicator)
    pub gain_credit_score: u64,

    /// Upper bound of any credit score
    pub max_credit_score: u64,

    /// Bail-out cost = multiplier x epochs remaining in jail
    pub bail_out_cost_multiplier: u64,

    // --- Reward bonuses ---
    /// Vault bonus paid on top of each submitted block reward
    pub block_producer_bonus_per_block: Balance,

    /// Per-block contribution to the bridge-operator bonus pool
    pub bridge_operator_bonus_per_block: Balance,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_validator_stake: 250_000,
            max_validator_candidate: 100,
            cooldown_secs_to_undelegate: 3 * 86_400,
            waiting_secs_to_revoke: 7 * 86_400,
            max_validator_number: 21,
            blocks_per_epoch: 600,
            period_duration_secs: 86_400,
            unavailability_tier1_threshold: 50,
            unavailability_tier2_threshold: 150,
            slash_felony_amount: 10_000,
            felony_jail_blocks: 2 * 28_800,
            double_sign_slash_amount: 10_000,
            double_sign_jail_blocks: 2 * 28_800,
            gain_credit_score: 50,
            max_credit_score: 600,
            bail_out_cost_multiplier: 5,
            block_producer_bonus_per_block: 5_000,
            bridge_operator_bonus_per_block: 37,
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a JSON document; absent fields fall back
    /// to the defaults
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
