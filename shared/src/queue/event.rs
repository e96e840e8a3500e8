//! Queue events - broadcast after every committed mutation

use crate::models::{CustomerStatus, PriorityTier};
use serde::{Deserialize, Serialize};

/// Queue change notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueEvent {
    CustomerRegistered {
        customer_id: i64,
        priority: PriorityTier,
        party_size: u32,
        queue_number: u32,
        estimated_wait_minutes: u32,
        timestamp: i64,
    },
    StatusChanged {
        customer_id: i64,
        from: CustomerStatus,
        to: CustomerStatus,
        /// 叫号时显示的号码
        queue_number: Option<u32>,
        timestamp: i64,
    },
    /// Queue numbers or estimates of waiting customers changed
    QueueRefreshed {
        waiting: u32,
        renumbered: u32,
        reestimated: u32,
        timestamp: i64,
    },
}

impl QueueEvent {
    pub fn timestamp(&self) -> i64 {
        match self {
            QueueEvent::CustomerRegistered { timestamp, .. }
            | QueueEvent::StatusChanged { timestamp, .. }
            | QueueEvent::QueueRefreshed { timestamp, .. } => *timestamp,
        }
    }
}
