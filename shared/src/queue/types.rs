//! Queue query results

use crate::models::{CustomerStatus, PriorityTier};
use serde::{Deserialize, Serialize};

/// Position of one customer in the live queue
///
/// `position` is `None` whenever the customer is not waiting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueuePosition {
    pub customer_id: i64,
    /// `None` when the customer does not exist
    pub status: Option<CustomerStatus>,
    pub position: Option<u32>,
    pub customers_ahead: Option<u32>,
    pub estimated_wait_minutes: Option<u32>,
    /// Display string produced by `format_wait_time`
    pub estimated_wait_display: Option<String>,
    pub message: String,
}

impl QueuePosition {
    /// Result for a customer outside the waiting set
    pub fn not_waiting(
        customer_id: i64,
        status: Option<CustomerStatus>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            customer_id,
            status,
            position: None,
            customers_ahead: None,
            estimated_wait_minutes: None,
            estimated_wait_display: None,
            message: message.into(),
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.position.is_some()
    }
}

/// Waiting count for one tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierCount {
    pub tier: PriorityTier,
    pub waiting: u32,
}

/// Aggregate queue statistics for the staff dashboard
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueueStats {
    pub total_waiting: u32,
    pub priority_waiting: u32,
    pub normal_waiting: u32,
    pub by_tier: Vec<TierCount>,
    /// Called but not yet seated
    pub called: u32,
    pub average_wait_minutes: f64,
    pub average_wait_priority_minutes: f64,
    pub average_wait_normal_minutes: f64,
    pub longest_wait_minutes: u32,
    /// total_waiting / concurrent_capacity, as a percentage (may exceed 100)
    pub efficiency_percent: u32,
    /// Seatings within the turnover window
    pub seated_recent: u32,
    /// Completions within the turnover window
    pub completed_recent: u32,
}

/// Outcome of a re-rank pass
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RerankOutcome {
    pub waiting: u32,
    /// Customers whose queue number changed
    pub updated: u32,
}

/// Outcome of a bulk wait-time refresh
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WaitTimeRefresh {
    pub evaluated: u32,
    /// Customers whose stored estimate changed
    pub updated: u32,
    pub average_minutes: f64,
    pub min_minutes: u32,
    pub max_minutes: u32,
    /// Estimates that had to fall back to the simple model
    pub fallbacks: u32,
}
