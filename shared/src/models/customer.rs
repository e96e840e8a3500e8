//! Customer Model

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Priority Tier
// ============================================================================

/// 排队优先级 (pregnant > pwd > senior > normal)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityTier {
    /// 孕妇
    Pregnant,
    /// Person with disability
    Pwd,
    /// 老年人
    Senior,
    #[default]
    Normal,
}

impl PriorityTier {
    pub const ALL: [PriorityTier; 4] = [
        PriorityTier::Pregnant,
        PriorityTier::Pwd,
        PriorityTier::Senior,
        PriorityTier::Normal,
    ];

    /// Sort rank, lower is served first
    pub fn rank(self) -> u8 {
        match self {
            PriorityTier::Pregnant => 1,
            PriorityTier::Pwd => 2,
            PriorityTier::Senior => 3,
            PriorityTier::Normal => 4,
        }
    }

    pub fn is_priority(self) -> bool {
        self != PriorityTier::Normal
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PriorityTier::Pregnant => "pregnant",
            PriorityTier::Pwd => "pwd",
            PriorityTier::Senior => "senior",
            PriorityTier::Normal => "normal",
        }
    }
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Customer Status
// ============================================================================

/// 顾客状态
///
/// ```text
/// Waiting ──► Called ──► Seated ──► Completed
///    │
///    ├──► Cancelled
///    └──► NoShow
/// ```
///
/// All transitions are one-way. Nothing re-enters `Waiting`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerStatus {
    #[default]
    Waiting,
    Called,
    Seated,
    Completed,
    Cancelled,
    NoShow,
}

impl CustomerStatus {
    /// Whether `self -> next` is an edge of the lifecycle graph
    pub fn can_transition_to(self, next: CustomerStatus) -> bool {
        use CustomerStatus::*;
        matches!(
            (self, next),
            (Waiting, Called)
                | (Waiting, Cancelled)
                | (Waiting, NoShow)
                | (Called, Seated)
                | (Seated, Completed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CustomerStatus::Waiting => "waiting",
            CustomerStatus::Called => "called",
            CustomerStatus::Seated => "seated",
            CustomerStatus::Completed => "completed",
            CustomerStatus::Cancelled => "cancelled",
            CustomerStatus::NoShow => "no_show",
        }
    }

    /// Human readable message for kiosk / display screens
    pub fn describe(self) -> &'static str {
        match self {
            CustomerStatus::Waiting => "Waiting in queue",
            CustomerStatus::Called => "Your table is ready, please proceed to the host stand",
            CustomerStatus::Seated => "Already seated",
            CustomerStatus::Completed => "Visit completed",
            CustomerStatus::Cancelled => "Registration cancelled",
            CustomerStatus::NoShow => "Marked as no-show",
        }
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Customer
// ============================================================================

/// Walk-in customer entity (排队顾客)
///
/// `queue_number` and `estimated_wait_minutes` are only meaningful while
/// `status == Waiting`; both are rewritten on every re-rank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub party_size: u32,
    pub priority: PriorityTier,
    pub status: CustomerStatus,
    /// Unix millis, immutable after creation
    pub registered_at: i64,
    pub queue_number: Option<u32>,
    pub estimated_wait_minutes: Option<u32>,
    pub table_id: Option<i64>,
    pub called_at: Option<i64>,
    pub seated_at: Option<i64>,
    pub completed_at: Option<i64>,
    /// 取消或未到场的时间
    pub left_at: Option<i64>,
}

impl Customer {
    /// New customer in `Waiting` status
    pub fn new(
        id: i64,
        name: impl Into<String>,
        party_size: u32,
        priority: PriorityTier,
        registered_at: i64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            party_size,
            priority,
            status: CustomerStatus::Waiting,
            registered_at,
            queue_number: None,
            estimated_wait_minutes: None,
            table_id: None,
            called_at: None,
            seated_at: None,
            completed_at: None,
            left_at: None,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.status == CustomerStatus::Waiting
    }

    /// Apply a partial update in place
    pub fn apply(&mut self, update: &CustomerUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(n) = update.queue_number {
            self.queue_number = Some(n);
        }
        if let Some(m) = update.estimated_wait_minutes {
            self.estimated_wait_minutes = Some(m);
        }
        if let Some(t) = update.table_id {
            self.table_id = Some(t);
        }
        if let Some(ts) = update.called_at {
            self.called_at = Some(ts);
        }
        if let Some(ts) = update.seated_at {
            self.seated_at = Some(ts);
        }
        if let Some(ts) = update.completed_at {
            self.completed_at = Some(ts);
        }
        if let Some(ts) = update.left_at {
            self.left_at = Some(ts);
        }
    }
}

/// Registration payload from the kiosk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterCustomer {
    pub name: String,
    pub party_size: u32,
    #[serde(default)]
    pub priority: PriorityTier,
}

/// Partial customer update, `None` leaves the field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CustomerUpdate {
    pub status: Option<CustomerStatus>,
    pub queue_number: Option<u32>,
    pub estimated_wait_minutes: Option<u32>,
    pub table_id: Option<i64>,
    pub called_at: Option<i64>,
    pub seated_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub left_at: Option<i64>,
}

impl CustomerUpdate {
    pub fn is_empty(&self) -> bool {
        *self == CustomerUpdate::default()
    }

    /// Merge `other` into `self`, fields set in `other` win
    pub fn merge(&mut self, other: CustomerUpdate) {
        self.status = other.status.or(self.status);
        self.queue_number = other.queue_number.or(self.queue_number);
        self.estimated_wait_minutes = other.estimated_wait_minutes.or(self.estimated_wait_minutes);
        self.table_id = other.table_id.or(self.table_id);
        self.called_at = other.called_at.or(self.called_at);
        self.seated_at = other.seated_at.or(self.seated_at);
        self.completed_at = other.completed_at.or(self.completed_at);
        self.left_at = other.left_at.or(self.left_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_rank_order() {
        let ranks: Vec<u8> = PriorityTier::ALL.iter().map(|t| t.rank()).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
        assert!(PriorityTier::Senior.is_priority());
        assert!(!PriorityTier::Normal.is_priority());
    }

    #[test]
    fn test_no_transition_reenters_waiting() {
        let all = [
            CustomerStatus::Waiting,
            CustomerStatus::Called,
            CustomerStatus::Seated,
            CustomerStatus::Completed,
            CustomerStatus::Cancelled,
            CustomerStatus::NoShow,
        ];
        for from in all {
            assert!(!from.can_transition_to(CustomerStatus::Waiting), "{from} -> waiting");
        }
        assert!(CustomerStatus::Waiting.can_transition_to(CustomerStatus::Called));
        assert!(!CustomerStatus::Waiting.can_transition_to(CustomerStatus::Seated));
        assert!(!CustomerStatus::Completed.can_transition_to(CustomerStatus::Seated));
    }

    #[test]
    fn test_status_serde_format() {
        let json = serde_json::to_string(&CustomerStatus::NoShow).unwrap();
        assert_eq!(json, "\"NO_SHOW\"");
        let tier: PriorityTier = serde_json::from_str("\"PWD\"").unwrap();
        assert_eq!(tier, PriorityTier::Pwd);
    }

    #[test]
    fn test_update_merge_prefers_newer_fields() {
        let mut base = CustomerUpdate {
            status: Some(CustomerStatus::Called),
            queue_number: Some(3),
            ..Default::default()
        };
        base.merge(CustomerUpdate {
            queue_number: Some(1),
            estimated_wait_minutes: Some(10),
            ..Default::default()
        });
        assert_eq!(base.status, Some(CustomerStatus::Called));
        assert_eq!(base.queue_number, Some(1));
        assert_eq!(base.estimated_wait_minutes, Some(10));
    }
}
