//! Position-based wait model
//!
//! ```text
//! batches = ceil(customers_ahead / concurrent_capacity)
//! minutes = batches * avg_service_minutes + party adjustment
//! priority tiers: ceil(minutes * 0.8)
//! clamp to [min_wait, max_wait]
//! ```

use super::{EstimateContext, EstimateResult, EstimateSource, WaitEstimate, WaitTimeStrategy};
use crate::core::QueueConfig;
use shared::models::PriorityTier;

/// Extra minutes for parties of 6 or more
const LARGE_PARTY_EXTRA: u32 = 5;
/// Extra minutes for parties of 4 or 5
const MEDIUM_PARTY_EXTRA: u32 = 3;

#[derive(Debug, Clone)]
pub struct SimpleEstimator {
    config: QueueConfig,
}

impl SimpleEstimator {
    pub fn new(config: QueueConfig) -> Self {
        Self { config }
    }

    /// Estimated minutes for a party with `customers_ahead` waiting before it
    pub fn minutes(&self, customers_ahead: u32, party_size: u32, priority: PriorityTier) -> u32 {
        if customers_ahead == 0 {
            return self.config.min_wait_minutes;
        }

        let capacity = self.config.concurrent_capacity.max(1);
        let batches = customers_ahead.div_ceil(capacity);
        let mut minutes = batches.saturating_mul(self.config.avg_service_minutes);
        minutes = minutes.saturating_add(party_adjustment(party_size));

        // 优先顾客按 80% 计算，向上取整
        if priority.is_priority() {
            minutes = minutes.saturating_mul(4).div_ceil(5);
        }

        self.config.clamp_wait(minutes)
    }
}

fn party_adjustment(party_size: u32) -> u32 {
    if party_size >= 6 {
        LARGE_PARTY_EXTRA
    } else if party_size >= 4 {
        MEDIUM_PARTY_EXTRA
    } else {
        0
    }
}

impl WaitTimeStrategy for SimpleEstimator {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn estimate(&self, ctx: &EstimateContext<'_>) -> EstimateResult<WaitEstimate> {
        Ok(WaitEstimate::new(
            self.minutes(ctx.customers_ahead(), ctx.party_size, ctx.priority),
            EstimateSource::Simple,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> SimpleEstimator {
        SimpleEstimator::new(QueueConfig::default())
    }

    #[test]
    fn test_empty_queue_returns_floor() {
        assert_eq!(estimator().minutes(0, 2, PriorityTier::Normal), 5);
        assert_eq!(estimator().minutes(0, 8, PriorityTier::Normal), 5);
    }

    #[test]
    fn test_senior_with_25_ahead() {
        // ceil(25/10)=3 batches -> 15 min -> ceil(15*0.8)=12
        assert_eq!(estimator().minutes(25, 2, PriorityTier::Senior), 12);
    }

    #[test]
    fn test_party_size_adjustment() {
        assert_eq!(estimator().minutes(10, 3, PriorityTier::Normal), 5);
        assert_eq!(estimator().minutes(10, 4, PriorityTier::Normal), 8);
        assert_eq!(estimator().minutes(10, 6, PriorityTier::Normal), 10);
    }

    #[test]
    fn test_priority_never_slower_than_normal() {
        let e = estimator();
        for ahead in 0..300 {
            for party in 1..=10 {
                let normal = e.minutes(ahead, party, PriorityTier::Normal);
                for tier in [PriorityTier::Pregnant, PriorityTier::Pwd, PriorityTier::Senior] {
                    assert!(
                        e.minutes(ahead, party, tier) <= normal,
                        "ahead={ahead} party={party} tier={tier}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_always_within_bounds() {
        let e = estimator();
        for ahead in [0, 1, 9, 10, 11, 100, 239, 240, 10_000, u32::MAX] {
            for tier in PriorityTier::ALL {
                let m = e.minutes(ahead, 12, tier);
                assert!((5..=120).contains(&m), "ahead={ahead} tier={tier} -> {m}");
            }
        }
    }

    #[test]
    fn test_zero_capacity_is_treated_as_one() {
        let config = QueueConfig {
            concurrent_capacity: 0,
            ..QueueConfig::default()
        };
        assert_eq!(SimpleEstimator::new(config).minutes(3, 2, PriorityTier::Normal), 15);
    }
}
