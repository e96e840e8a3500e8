//! Queue Query Facade
//!
//! Read-only operations for the kiosk, staff dashboard and public
//! display. Nothing here takes the manager's write lock or writes to
//! the store.

use super::estimator::{EstimateContext, WaitEstimate, WaitTimeEstimator};
use super::ranking::RankedQueue;
use crate::core::QueueConfig;
use crate::store::{CustomerStore, StoreResult};
use shared::models::{Customer, PriorityTier};
use shared::queue::{QueuePosition, QueueStats, TierCount};
use shared::util::now_millis;
use std::sync::Arc;

#[derive(Clone)]
pub struct QueueQuery {
    store: Arc<dyn CustomerStore>,
    estimator: Arc<WaitTimeEstimator>,
    config: QueueConfig,
}

impl std::fmt::Debug for QueueQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueQuery")
            .field("store", &"<dyn CustomerStore>")
            .field("estimator", &self.estimator)
            .finish()
    }
}

impl QueueQuery {
    pub fn new(
        store: Arc<dyn CustomerStore>,
        estimator: Arc<WaitTimeEstimator>,
        config: QueueConfig,
    ) -> Self {
        Self {
            store,
            estimator,
            config,
        }
    }

    /// Current waiting set in serving order
    pub fn ranked(&self) -> StoreResult<RankedQueue> {
        Ok(RankedQueue::new(self.store.list_waiting()?))
    }

    /// 1-based live position of a customer
    ///
    /// Customers outside the waiting set (or unknown ids) get a
    /// `QueuePosition` with `position = None` and a status message.
    pub fn get_queue_position(&self, customer_id: i64) -> StoreResult<QueuePosition> {
        let Some(customer) = self.store.get(customer_id)? else {
            return Ok(QueuePosition::not_waiting(
                customer_id,
                None,
                "Customer not found",
            ));
        };
        if !customer.is_waiting() {
            return Ok(QueuePosition::not_waiting(
                customer_id,
                Some(customer.status),
                customer.status.describe(),
            ));
        }

        let queue = self.ranked()?;
        let Some(position) = queue.position_of(customer_id) else {
            // 状态刚变化，排名快照里已经没有该顾客
            return Ok(QueuePosition::not_waiting(
                customer_id,
                Some(customer.status),
                customer.status.describe(),
            ));
        };

        let minutes = match customer.estimated_wait_minutes {
            Some(m) => m,
            None => {
                self.estimator
                    .estimate(&EstimateContext::for_customer(&queue, &customer, now_millis()))
                    .minutes
            }
        };
        let message = if position == 1 {
            "You are next in line".to_string()
        } else {
            format!("You are number {} in line", position)
        };

        Ok(QueuePosition {
            customer_id,
            status: Some(customer.status),
            position: Some(position),
            customers_ahead: Some(position - 1),
            estimated_wait_minutes: Some(minutes),
            estimated_wait_display: Some(format_wait_time(minutes)),
            message,
        })
    }

    /// Aggregate statistics over the waiting set
    pub fn get_queue_stats(&self) -> StoreResult<QueueStats> {
        let queue = self.ranked()?;
        let waiting = queue.customers();
        let since = now_millis() - self.config.turnover_window_millis();

        let total_waiting = waiting.len() as u32;
        let priority_waiting = waiting.iter().filter(|c| c.priority.is_priority()).count() as u32;
        let by_tier = PriorityTier::ALL
            .iter()
            .map(|&tier| TierCount {
                tier,
                waiting: waiting.iter().filter(|c| c.priority == tier).count() as u32,
            })
            .collect();

        let all: Vec<&Customer> = waiting.iter().collect();
        let priority: Vec<&Customer> = waiting.iter().filter(|c| c.priority.is_priority()).collect();
        let normal: Vec<&Customer> = waiting.iter().filter(|c| !c.priority.is_priority()).collect();

        let capacity = self.config.concurrent_capacity.max(1);
        let efficiency_percent =
            ((f64::from(total_waiting) / f64::from(capacity)) * 100.0).round() as u32;

        Ok(QueueStats {
            total_waiting,
            priority_waiting,
            normal_waiting: total_waiting - priority_waiting,
            by_tier,
            called: self.store.count_called()?,
            average_wait_minutes: average_estimate(&all),
            average_wait_priority_minutes: average_estimate(&priority),
            average_wait_normal_minutes: average_estimate(&normal),
            longest_wait_minutes: waiting
                .iter()
                .filter_map(|c| c.estimated_wait_minutes)
                .max()
                .unwrap_or(0),
            efficiency_percent,
            seated_recent: self.store.count_seated_since(since)?,
            completed_recent: self.store.count_completed_since(since)?,
        })
    }

    /// Estimate for a party, optionally as an existing waiting customer
    ///
    /// With `exclude_customer_id` set to a waiting customer, only people
    /// registered before that customer count as ahead; otherwise the
    /// whole waiting set does.
    pub fn calculate_wait_time(
        &self,
        party_size: u32,
        priority: PriorityTier,
        exclude_customer_id: Option<i64>,
    ) -> StoreResult<u32> {
        Ok(self
            .estimate(party_size, priority, exclude_customer_id)?
            .minutes)
    }

    /// Estimate for someone about to register
    pub fn calculate_wait_time_for_new(
        &self,
        party_size: u32,
        priority: PriorityTier,
    ) -> StoreResult<u32> {
        self.calculate_wait_time(party_size, priority, None)
    }

    /// Estimate with provenance
    pub fn estimate(
        &self,
        party_size: u32,
        priority: PriorityTier,
        exclude_customer_id: Option<i64>,
    ) -> StoreResult<WaitEstimate> {
        let queue = self.ranked()?;
        let now = now_millis();
        let customer = exclude_customer_id.and_then(|id| queue.get(id));
        let ctx = EstimateContext {
            queue: &queue,
            party_size,
            priority,
            customer,
            now,
            floor: None,
        };
        Ok(self.estimator.estimate(&ctx))
    }
}

fn average_estimate(customers: &[&Customer]) -> f64 {
    let estimates: Vec<u32> = customers
        .iter()
        .filter_map(|c| c.estimated_wait_minutes)
        .collect();
    if estimates.is_empty() {
        return 0.0;
    }
    let sum: u64 = estimates.iter().map(|&m| u64::from(m)).sum();
    let avg = sum as f64 / estimates.len() as f64;
    (avg * 10.0).round() / 10.0
}

/// Coarse display bucket for a wait in minutes
///
/// | Minutes | Display |
/// |---------|---------|
/// | ≤ 5 | ~5 minutes |
/// | 6–15 | 10-15 minutes |
/// | 16–30 | 15-30 minutes |
/// | 31–45 | 30-45 minutes |
/// | 46–60 | 45-60 minutes |
/// | 61–90 | 1-1.5 hours |
/// | > 90 | Xh Ym |
pub fn format_wait_time(minutes: u32) -> String {
    match minutes {
        0..=5 => "~5 minutes".to_string(),
        6..=15 => "10-15 minutes".to_string(),
        16..=30 => "15-30 minutes".to_string(),
        31..=45 => "30-45 minutes".to_string(),
        46..=60 => "45-60 minutes".to_string(),
        61..=90 => "1-1.5 hours".to_string(),
        _ => format!("{}h {}m", minutes / 60, minutes % 60),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_wait_time_boundaries() {
        let cases = [
            (0, "~5 minutes"),
            (5, "~5 minutes"),
            (6, "10-15 minutes"),
            (7, "10-15 minutes"),
            (15, "10-15 minutes"),
            (16, "15-30 minutes"),
            (30, "15-30 minutes"),
            (31, "30-45 minutes"),
            (45, "30-45 minutes"),
            (46, "45-60 minutes"),
            (60, "45-60 minutes"),
            (61, "1-1.5 hours"),
            (90, "1-1.5 hours"),
            (91, "1h 31m"),
            (120, "2h 0m"),
            (135, "2h 15m"),
        ];
        for (minutes, expected) in cases {
            assert_eq!(format_wait_time(minutes), expected, "minutes={minutes}");
        }
    }

    #[test]
    fn test_average_estimate_skips_missing() {
        let mut a = Customer::new(1, "a", 2, PriorityTier::Normal, 0);
        a.estimated_wait_minutes = Some(10);
        let mut b = Customer::new(2, "b", 2, PriorityTier::Normal, 1);
        b.estimated_wait_minutes = Some(15);
        let c = Customer::new(3, "c", 2, PriorityTier::Normal, 2);
        assert_eq!(average_estimate(&[&a, &b, &c]), 12.5);
        assert_eq!(average_estimate(&[&c]), 0.0);
        assert_eq!(average_estimate(&[]), 0.0);
    }
}
