//! Store Module
//!
//! Collaborator contracts consumed by the queue engine and two
//! implementations of them:
//!
//! | Type | Backend | Use |
//! |------|---------|-----|
//! | [`MemoryStore`] | `parking_lot::RwLock` + `HashMap` | tests, single-process kiosks |
//! | [`RedbStore`] | embedded redb | durable storage on the kiosk box |
//!
//! The engine never talks to a database directly; everything goes
//! through [`CustomerStore`] and [`TableProvider`].

pub mod memory;
pub mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use shared::models::{Customer, CustomerUpdate, DiningTable};
use thiserror::Error;

/// Store error types
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Customer not found: {0}")]
    NotFound(i64),

    #[error("Duplicate customer: {0}")]
    Duplicate(i64),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// One write inside an atomic [`CustomerStore::commit`]
#[derive(Debug, Clone, PartialEq)]
pub enum CustomerWrite {
    Insert(Customer),
    Update { id: i64, update: CustomerUpdate },
}

impl CustomerWrite {
    pub fn customer_id(&self) -> i64 {
        match self {
            CustomerWrite::Insert(c) => c.id,
            CustomerWrite::Update { id, .. } => *id,
        }
    }
}

/// Customer record store
///
/// Implementations must apply a [`commit`](CustomerStore::commit) batch
/// atomically: a concurrent reader sees either none or all of it.
pub trait CustomerStore: Send + Sync {
    /// All customers in `Waiting` status, in no particular order
    fn list_waiting(&self) -> StoreResult<Vec<Customer>>;

    fn get(&self, id: i64) -> StoreResult<Option<Customer>>;

    /// Customers with `registered_at >= since` (any status)
    fn list_registered_since(&self, since: i64) -> StoreResult<Vec<Customer>>;

    fn count_completed_since(&self, since: i64) -> StoreResult<u32>;

    fn count_seated_since(&self, since: i64) -> StoreResult<u32>;

    /// Customers in `Called` status
    fn count_called(&self) -> StoreResult<u32>;

    /// Apply all writes in one atomic step, returns the number applied
    fn commit(&self, writes: Vec<CustomerWrite>) -> StoreResult<usize>;

    fn insert(&self, customer: Customer) -> StoreResult<()> {
        self.commit(vec![CustomerWrite::Insert(customer)])?;
        Ok(())
    }

    /// Partial field update, returns the updated row
    fn update(&self, id: i64, update: CustomerUpdate) -> StoreResult<Customer> {
        self.commit(vec![CustomerWrite::Update { id, update }])?;
        self.get(id)?.ok_or(StoreError::NotFound(id))
    }
}

/// Table availability provider (read-only from the engine's side)
pub trait TableProvider: Send + Sync {
    /// Active tables in the same capacity class as `party_size`
    fn suitable_tables(&self, party_size: u32) -> StoreResult<Vec<DiningTable>>;

    fn list_tables(&self) -> StoreResult<Vec<DiningTable>>;
}
