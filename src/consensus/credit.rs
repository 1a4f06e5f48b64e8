// Credit scores - earned by clean periods, spent on bail-outs
use std::collections::HashMap;

use tracing::debug;

use crate::config::EngineConfig;
use crate::types::Address;

/// Per-validator credit balance, bounded by `max_credit_score`.
///
/// The book only knows how to accrue and spend; when a score may be spent
/// (jail state, once-per-period rules) is the slashing engine's business.
#[derive(Debug)]
pub struct CreditScoreBook {
    gain_credit_score: u64,
    max_credit_score: u64,
    scores: HashMap<Address, u64>,
}

impl CreditScoreBook {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            gain_credit_score: config.gain_credit_score,
            max_credit_score: config.max_credit_score,
            scores: HashMap::new(),
        }
    }

    pub fn score_of(&self, validator: &Address) -> u64 {
        self.scores.get(validator).copied().unwrap_or(0)
    }

    /// Period-boundary accrual. A validator jailed at any point during the
    /// period gains nothing; otherwise the gain is the configured amount
    /// reduced by the period's unavailability indicator, floored at zero.
    pub fn settle_period(&mut self, validator: Address, indicator: u64, was_jailed: bool) {
        let gain = if was_jailed {
            0
        } else {
            self.gain_credit_score.saturating_sub(indicator)
        };
        if gain == 0 {
            return;
        }
        let score = self.scores.entry(validator).or_insert(0);
        *score = (*score + gain).min(self.max_credit_score);
        debug!(%validator, gain, score = *score, "credit score settled");
    }

    /// Spend `cost` from the validator's score. Returns false (and changes
    /// nothing) if the balance is short; scores never go negative.
    pub fn try_spend(&mut self, validator: &Address, cost: u64) -> bool {
        match self.scores.get_mut(validator) {
            Some(score) if *score >= cost => {
                *score -= cost;
                true
            }
            _ => cost == 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::test_keys;

    fn book() -> CreditScoreBook {
        CreditScoreBook::new(&EngineConfig {
            gain_credit_score: 50,
            max_credit_score: 120,
            ..EngineConfig::default()
        })
    }

    #[test]
    fn test_gain_reduced_by_indicator() {
        let mut book = book();
        let v = test_keys::address(1);
        book.settle_period(v, 10, false);
        assert_eq!(book.score_of(&v), 40);
        book.settle_period(v, 60, false);
        assert_eq!(book.score_of(&v), 40);
    }

    #[test]
    fn test_no_gain_while_jailed() {
        let mut book = book();
        let v = test_keys::address(1);
        book.settle_period(v, 0, true);
        assert_eq!(book.score_of(&v), 0);
    }

    #[test]
    fn test_score_capped_at_maximum() {
        let mut book = book();
        let v = test_keys::address(1);
        for _ in 0..5 {
            book.settle_period(v, 0, false);
        }
        assert_eq!(book.score_of(&v), 120);
    }

    #[test]
    fn test_spend_never_overdraws() {
        let mut book = book();
        let v = test_keys::address(1);
        book.settle_period(v, 0, false);
        assert!(!book.try_spend(&v, 51));
        assert_eq!(book.score_of(&v), 50);
        assert!(book.try_spend(&v, 50));
        assert_eq!(book.score_of(&v), 0);
    }
}
