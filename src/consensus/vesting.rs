// Bonus vault - tops up block rewards from a pre-funded balance
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::events::{Event, EventSink};
use crate::types::{Balance, BlockContext};

/// Funds granted on top of one submitted block reward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BonusGrant {
    /// Added straight to the producer's reward for the block
    pub producer_bonus: Balance,
    /// Accrued into the period's bridge-operator pool
    pub bridge_operator_bonus: Balance,
}

/// Pre-funded vault paying fixed per-block bonuses. An underfunded vault
/// never blocks reward submission; the grant is simply skipped and a
/// notification emitted.
#[derive(Debug)]
pub struct StakingVesting {
    balance: Balance,
    block_producer_bonus_per_block: Balance,
    bridge_operator_bonus_per_block: Balance,
}

impl StakingVesting {
    pub fn new(config: &EngineConfig, initial_balance: Balance) -> Self {
        Self {
            balance: initial_balance,
            block_producer_bonus_per_block: config.block_producer_bonus_per_block,
            bridge_operator_bonus_per_block: config.bridge_operator_bonus_per_block,
        }
    }

    pub fn fund(&mut self, amount: Balance) {
        self.balance += amount;
    }

    pub fn balance(&self) -> Balance {
        self.balance
    }

    /// Draw the per-block bonuses for one submitted reward. Returns a zero
    /// grant (and emits `BonusTransferFailed`) when the vault cannot cover
    /// both bonuses in full.
    pub fn request_bonus(&mut self, ctx: &BlockContext, sink: &mut EventSink) -> BonusGrant {
        let producer_bonus = self.block_producer_bonus_per_block;
        let bridge_bonus = self.bridge_operator_bonus_per_block;
        let total = producer_bonus + bridge_bonus;
        if self.balance < total {
            warn!(balance = self.balance, needed = total, "bonus vault underfunded");
            sink.push(Event::BonusTransferFailed {
                producer: ctx.producer,
                producer_bonus,
                bridge_bonus,
                vault_balance: self.balance,
            });
            return BonusGrant { producer_bonus: 0, bridge_operator_bonus: 0 };
        }
        self.balance -= total;
        debug!(producer_bonus, bridge_bonus, "bonus granted");
        BonusGrant { producer_bonus, bridge_operator_bonus: bridge_bonus }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::test_keys;

    fn config() -> EngineConfig {
        EngineConfig {
            block_producer_bonus_per_block: 100,
            bridge_operator_bonus_per_block: 7,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_bonus_drawn_from_balance() {
        let mut vault = StakingVesting::new(&config(), 250);
        let mut sink = EventSink::new();
        let ctx = BlockContext::new(1, 1, test_keys::address(1));

        let grant = vault.request_bonus(&ctx, &mut sink);
        assert_eq!(grant, BonusGrant { producer_bonus: 100, bridge_operator_bonus: 7 });
        assert_eq!(vault.balance(), 143);
        assert!(sink.as_slice().is_empty());
    }

    #[test]
    fn test_underfunded_vault_soft_fails() {
        let mut vault = StakingVesting::new(&config(), 50);
        let mut sink = EventSink::new();
        let ctx = BlockContext::new(1, 1, test_keys::address(1));

        let grant = vault.request_bonus(&ctx, &mut sink);
        assert_eq!(grant, BonusGrant { producer_bonus: 0, bridge_operator_bonus: 0 });
        assert_eq!(vault.balance(), 50);
        assert!(matches!(sink.as_slice()[0], Event::BonusTransferFailed { vault_balance: 50, .. }));
    }
}
