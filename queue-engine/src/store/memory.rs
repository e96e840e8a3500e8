//! In-memory store

use super::{CustomerStore, CustomerWrite, StoreError, StoreResult, TableProvider};
use parking_lot::RwLock;
use shared::models::{Customer, CustomerStatus, DiningTable, TableStatus};
use std::collections::HashMap;

/// Hash-map backed store implementing both collaborator traits
///
/// A commit validates every write first and then applies the whole
/// batch under one write guard.
#[derive(Debug, Default)]
pub struct MemoryStore {
    customers: RwLock<HashMap<i64, Customer>>,
    tables: RwLock<HashMap<i64, DiningTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every customer, any status (dashboard exports, tests)
    pub fn all_customers(&self) -> Vec<Customer> {
        self.customers.read().values().cloned().collect()
    }

    // ========== Table Operations ==========

    pub fn upsert_table(&self, table: DiningTable) {
        self.tables.write().insert(table.id, table);
    }

    /// Mark a table occupied since `at` (Unix millis)
    pub fn occupy_table(&self, table_id: i64, at: i64) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(&table_id)
            .ok_or_else(|| StoreError::Backend(format!("Dining table {} not found", table_id)))?;
        table.status = TableStatus::Occupied;
        table.occupied_at = Some(at);
        Ok(())
    }

    pub fn vacate_table(&self, table_id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(&table_id)
            .ok_or_else(|| StoreError::Backend(format!("Dining table {} not found", table_id)))?;
        table.status = TableStatus::Vacant;
        table.occupied_at = None;
        Ok(())
    }
}

impl CustomerStore for MemoryStore {
    fn list_waiting(&self) -> StoreResult<Vec<Customer>> {
        Ok(self
            .customers
            .read()
            .values()
            .filter(|c| c.is_waiting())
            .cloned()
            .collect())
    }

    fn get(&self, id: i64) -> StoreResult<Option<Customer>> {
        Ok(self.customers.read().get(&id).cloned())
    }

    fn list_registered_since(&self, since: i64) -> StoreResult<Vec<Customer>> {
        Ok(self
            .customers
            .read()
            .values()
            .filter(|c| c.registered_at >= since)
            .cloned()
            .collect())
    }

    fn count_completed_since(&self, since: i64) -> StoreResult<u32> {
        let count = self
            .customers
            .read()
            .values()
            .filter(|c| c.completed_at.is_some_and(|ts| ts >= since))
            .count();
        Ok(count as u32)
    }

    fn count_seated_since(&self, since: i64) -> StoreResult<u32> {
        let count = self
            .customers
            .read()
            .values()
            .filter(|c| c.seated_at.is_some_and(|ts| ts >= since))
            .count();
        Ok(count as u32)
    }

    fn count_called(&self) -> StoreResult<u32> {
        let count = self
            .customers
            .read()
            .values()
            .filter(|c| c.status == CustomerStatus::Called)
            .count();
        Ok(count as u32)
    }

    fn commit(&self, writes: Vec<CustomerWrite>) -> StoreResult<usize> {
        let mut customers = self.customers.write();

        // 先校验整批，失败时不留下半截写入
        let mut inserted = std::collections::HashSet::new();
        for write in &writes {
            match write {
                CustomerWrite::Insert(c) => {
                    if customers.contains_key(&c.id) || !inserted.insert(c.id) {
                        return Err(StoreError::Duplicate(c.id));
                    }
                }
                CustomerWrite::Update { id, .. } => {
                    if !customers.contains_key(id) && !inserted.contains(id) {
                        return Err(StoreError::NotFound(*id));
                    }
                }
            }
        }

        let applied = writes.len();
        for write in writes {
            match write {
                CustomerWrite::Insert(c) => {
                    customers.insert(c.id, c);
                }
                CustomerWrite::Update { id, update } => {
                    if let Some(existing) = customers.get_mut(&id) {
                        existing.apply(&update);
                    }
                }
            }
        }
        Ok(applied)
    }
}

impl TableProvider for MemoryStore {
    fn suitable_tables(&self, party_size: u32) -> StoreResult<Vec<DiningTable>> {
        let mut tables: Vec<DiningTable> = self
            .tables
            .read()
            .values()
            .filter(|t| t.suits(party_size))
            .cloned()
            .collect();
        tables.sort_by_key(|t| t.id);
        Ok(tables)
    }

    fn list_tables(&self) -> StoreResult<Vec<DiningTable>> {
        let mut tables: Vec<DiningTable> = self.tables.read().values().cloned().collect();
        tables.sort_by_key(|t| t.id);
        Ok(tables)
    }
}
