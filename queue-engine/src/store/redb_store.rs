//! redb-based customer and table store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `customers` | `customer_id` | `Customer` (JSON) | Customer rows |
//! | `waiting_customers` | `customer_id` | `()` | Waiting set index |
//! | `called_customers` | `customer_id` | `()` | Called set index |
//! | `registered_at_index` | `(registered_at, customer_id)` | `()` | Registrations by time |
//! | `seated_at_index` | `(seated_at, customer_id)` | `()` | Seatings by time |
//! | `completed_at_index` | `(completed_at, customer_id)` | `()` | Completions by time |
//! | `dining_tables` | `table_id` | `DiningTable` (JSON) | Table availability |
//!
//! The time indexes make the "since" queries range scans instead of a
//! pass over every customer ever stored.
//!
//! # Atomicity
//!
//! Every [`CustomerStore::commit`] is exactly one redb write transaction.
//! A failed batch is dropped before commit, which aborts the transaction,
//! so readers never see a half-applied re-rank.

use super::{CustomerStore, CustomerWrite, StoreError, StoreResult, TableProvider};
use redb::{Database, ReadTransaction, ReadableDatabase, ReadableTable, Table, TableDefinition};
use shared::models::{Customer, CustomerStatus, DiningTable, TableStatus};
use std::path::Path;
use std::sync::Arc;

/// Customer rows: key = customer_id, value = JSON-serialized Customer
const CUSTOMERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("customers");

/// Waiting set index: key = customer_id, value = empty (existence check)
const WAITING_TABLE: TableDefinition<i64, ()> = TableDefinition::new("waiting_customers");

/// Called set index: key = customer_id
const CALLED_TABLE: TableDefinition<i64, ()> = TableDefinition::new("called_customers");

/// Time indexes: key = (timestamp, customer_id)
const REGISTERED_AT_TABLE: TableDefinition<(i64, i64), ()> =
    TableDefinition::new("registered_at_index");
const SEATED_AT_TABLE: TableDefinition<(i64, i64), ()> = TableDefinition::new("seated_at_index");
const COMPLETED_AT_TABLE: TableDefinition<(i64, i64), ()> =
    TableDefinition::new("completed_at_index");

/// Dining tables: key = table_id, value = JSON-serialized DiningTable
const DINING_TABLES_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("dining_tables");

impl From<redb::DatabaseError> for StoreError {
    fn from(err: redb::DatabaseError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<redb::TransactionError> for StoreError {
    fn from(err: redb::TransactionError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<redb::TableError> for StoreError {
    fn from(err: redb::TableError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(err: redb::StorageError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(err: redb::CommitError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Store backed by redb
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").field("db", &"<redb::Database>").finish()
    }
}

impl RedbStore {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StoreResult<Self> {
        // Create all tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CUSTOMERS_TABLE)?;
            let _ = write_txn.open_table(WAITING_TABLE)?;
            let _ = write_txn.open_table(CALLED_TABLE)?;
            let _ = write_txn.open_table(REGISTERED_AT_TABLE)?;
            let _ = write_txn.open_table(SEATED_AT_TABLE)?;
            let _ = write_txn.open_table(COMPLETED_AT_TABLE)?;
            let _ = write_txn.open_table(DINING_TABLES_TABLE)?;
        }
        write_txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Customer ids in a time index with `timestamp >= since`
    fn ids_since(
        read_txn: &ReadTransaction,
        index: TableDefinition<(i64, i64), ()>,
        since: i64,
    ) -> StoreResult<Vec<i64>> {
        let table = read_txn.open_table(index)?;
        let range_start = (since, i64::MIN);
        let range_end = (i64::MAX, i64::MAX);
        let mut ids = Vec::new();
        for result in table.range(range_start..=range_end)? {
            let (key, _value) = result?;
            ids.push(key.value().1);
        }
        Ok(ids)
    }

    fn count_since(&self, index: TableDefinition<(i64, i64), ()>, since: i64) -> StoreResult<u32> {
        let read_txn = self.db.begin_read()?;
        Ok(Self::ids_since(&read_txn, index, since)?.len() as u32)
    }

    // ========== Table Operations ==========

    pub fn upsert_table(&self, table: &DiningTable) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut tables = txn.open_table(DINING_TABLES_TABLE)?;
            let value = serde_json::to_vec(table)?;
            tables.insert(table.id, value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Mark a table occupied since `at` (Unix millis)
    pub fn occupy_table(&self, table_id: i64, at: i64) -> StoreResult<()> {
        self.modify_table(table_id, |t| {
            t.status = TableStatus::Occupied;
            t.occupied_at = Some(at);
        })
    }

    pub fn vacate_table(&self, table_id: i64) -> StoreResult<()> {
        self.modify_table(table_id, |t| {
            t.status = TableStatus::Vacant;
            t.occupied_at = None;
        })
    }

    fn modify_table(&self, table_id: i64, f: impl FnOnce(&mut DiningTable)) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut tables = txn.open_table(DINING_TABLES_TABLE)?;
            let mut table: DiningTable = match tables.get(table_id)? {
                Some(guard) => serde_json::from_slice(guard.value())?,
                None => {
                    return Err(StoreError::Backend(format!(
                        "Dining table {} not found",
                        table_id
                    )));
                }
            };
            f(&mut table);
            let value = serde_json::to_vec(&table)?;
            tables.insert(table_id, value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }
}

impl CustomerStore for RedbStore {
    fn list_waiting(&self) -> StoreResult<Vec<Customer>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(WAITING_TABLE)?;
        let table = read_txn.open_table(CUSTOMERS_TABLE)?;

        let mut customers = Vec::new();
        for result in index.iter()? {
            let (key, _value) = result?;
            let id = key.value();
            match table.get(id)? {
                Some(guard) => {
                    let customer: Customer = serde_json::from_slice(guard.value())?;
                    customers.push(customer);
                }
                None => {
                    tracing::warn!(customer_id = id, "Waiting index points at a missing customer");
                }
            }
        }
        Ok(customers)
    }

    fn get(&self, id: i64) -> StoreResult<Option<Customer>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CUSTOMERS_TABLE)?;
        match table.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    fn list_registered_since(&self, since: i64) -> StoreResult<Vec<Customer>> {
        let read_txn = self.db.begin_read()?;
        let ids = Self::ids_since(&read_txn, REGISTERED_AT_TABLE, since)?;
        let table = read_txn.open_table(CUSTOMERS_TABLE)?;
        let mut customers = Vec::with_capacity(ids.len());
        for id in ids {
            match table.get(id)? {
                Some(guard) => customers.push(serde_json::from_slice(guard.value())?),
                None => {
                    tracing::warn!(
                        customer_id = id,
                        "Registration index points at a missing customer"
                    );
                }
            }
        }
        Ok(customers)
    }

    fn count_completed_since(&self, since: i64) -> StoreResult<u32> {
        self.count_since(COMPLETED_AT_TABLE, since)
    }

    fn count_seated_since(&self, since: i64) -> StoreResult<u32> {
        self.count_since(SEATED_AT_TABLE, since)
    }

    fn count_called(&self) -> StoreResult<u32> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(CALLED_TABLE)?;
        let mut count = 0;
        for result in index.iter()? {
            result?;
            count += 1;
        }
        Ok(count)
    }

    fn commit(&self, writes: Vec<CustomerWrite>) -> StoreResult<usize> {
        let applied = writes.len();
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(CUSTOMERS_TABLE)?;
            let mut waiting = txn.open_table(WAITING_TABLE)?;
            let mut called = txn.open_table(CALLED_TABLE)?;
            let mut registered_at = txn.open_table(REGISTERED_AT_TABLE)?;
            let mut seated_at = txn.open_table(SEATED_AT_TABLE)?;
            let mut completed_at = txn.open_table(COMPLETED_AT_TABLE)?;

            for write in writes {
                let (previous, customer) = match write {
                    CustomerWrite::Insert(customer) => {
                        if table.get(customer.id)?.is_some() {
                            return Err(StoreError::Duplicate(customer.id));
                        }
                        (None, customer)
                    }
                    CustomerWrite::Update { id, update } => {
                        let existing: Customer = match table.get(id)? {
                            Some(guard) => serde_json::from_slice(guard.value())?,
                            None => return Err(StoreError::NotFound(id)),
                        };
                        let mut updated = existing.clone();
                        updated.apply(&update);
                        (Some(existing), updated)
                    }
                };

                let value = serde_json::to_vec(&customer)?;
                table.insert(customer.id, value.as_slice())?;
                if customer.is_waiting() {
                    waiting.insert(customer.id, ())?;
                } else {
                    waiting.remove(customer.id)?;
                }
                if customer.status == CustomerStatus::Called {
                    called.insert(customer.id, ())?;
                } else {
                    called.remove(customer.id)?;
                }

                let id = customer.id;
                let old = previous.as_ref();
                reindex(
                    &mut registered_at,
                    id,
                    old.map(|c| c.registered_at),
                    Some(customer.registered_at),
                )?;
                reindex(
                    &mut seated_at,
                    id,
                    old.and_then(|c| c.seated_at),
                    customer.seated_at,
                )?;
                reindex(
                    &mut completed_at,
                    id,
                    old.and_then(|c| c.completed_at),
                    customer.completed_at,
                )?;
            }
        }
        txn.commit()?;
        Ok(applied)
    }
}

/// Move a customer's entry in a time index from `old` to `new`
fn reindex(
    index: &mut Table<'_, (i64, i64), ()>,
    id: i64,
    old: Option<i64>,
    new: Option<i64>,
) -> StoreResult<()> {
    if old == new {
        return Ok(());
    }
    if let Some(ts) = old {
        index.remove((ts, id))?;
    }
    if let Some(ts) = new {
        index.insert((ts, id), ())?;
    }
    Ok(())
}

impl TableProvider for RedbStore {
    fn suitable_tables(&self, party_size: u32) -> StoreResult<Vec<DiningTable>> {
        Ok(self
            .list_tables()?
            .into_iter()
            .filter(|t| t.suits(party_size))
            .collect())
    }

    fn list_tables(&self) -> StoreResult<Vec<DiningTable>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DINING_TABLES_TABLE)?;
        let mut tables = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let dining_table: DiningTable = serde_json::from_slice(value.value())?;
            tables.push(dining_table);
        }
        Ok(tables)
    }
}
