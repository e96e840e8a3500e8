//! Dining Table Model

use serde::{Deserialize, Serialize};

/// 桌台状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    #[default]
    Vacant,
    Occupied,
    /// 已预留给被叫号的顾客
    Reserved,
    Cleaning,
}

/// Seating class, a party only competes with parties of the same class
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapacityClass {
    /// 1-2 seats
    Small,
    /// 3-4 seats
    Medium,
    /// 5-6 seats
    Large,
    /// 7+ seats
    ExtraLarge,
}

impl CapacityClass {
    /// Class of a table seating `seats`, or of a party of that size
    pub fn for_seats(seats: u32) -> Self {
        match seats {
            0..=2 => CapacityClass::Small,
            3..=4 => CapacityClass::Medium,
            5..=6 => CapacityClass::Large,
            _ => CapacityClass::ExtraLarge,
        }
    }
}

/// Dining table entity (桌台)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiningTable {
    pub id: i64,
    pub name: String,
    pub capacity: u32,
    pub status: TableStatus,
    /// Unix millis when the current party sat down
    pub occupied_at: Option<i64>,
    pub is_active: bool,
}

impl DiningTable {
    pub fn new(id: i64, name: impl Into<String>, capacity: u32) -> Self {
        Self {
            id,
            name: name.into(),
            capacity,
            status: TableStatus::Vacant,
            occupied_at: None,
            is_active: true,
        }
    }

    pub fn capacity_class(&self) -> CapacityClass {
        CapacityClass::for_seats(self.capacity)
    }

    /// Whether this table seats a party of `party_size`
    pub fn suits(&self, party_size: u32) -> bool {
        self.is_active && self.capacity_class() == CapacityClass::for_seats(party_size)
    }

    pub fn is_vacant(&self) -> bool {
        self.status == TableStatus::Vacant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_class_boundaries() {
        assert_eq!(CapacityClass::for_seats(1), CapacityClass::Small);
        assert_eq!(CapacityClass::for_seats(2), CapacityClass::Small);
        assert_eq!(CapacityClass::for_seats(3), CapacityClass::Medium);
        assert_eq!(CapacityClass::for_seats(4), CapacityClass::Medium);
        assert_eq!(CapacityClass::for_seats(6), CapacityClass::Large);
        assert_eq!(CapacityClass::for_seats(7), CapacityClass::ExtraLarge);
        assert_eq!(CapacityClass::for_seats(12), CapacityClass::ExtraLarge);
    }

    #[test]
    fn test_inactive_table_never_suits() {
        let mut table = DiningTable::new(1, "T1", 4);
        assert!(table.suits(3));
        assert!(!table.suits(2));
        table.is_active = false;
        assert!(!table.suits(4));
    }
}
