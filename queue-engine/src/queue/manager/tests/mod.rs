use super::*;
use crate::queue::ranking::ranking_key;
use crate::store::MemoryStore;
use shared::error::ErrorCode;
use shared::models::DiningTable;

fn simple_config() -> QueueConfig {
    QueueConfig {
        table_aware_enabled: false,
        ..QueueConfig::default()
    }
}

fn create_test_manager() -> (QueueManager, Arc<MemoryStore>) {
    create_test_manager_with(simple_config())
}

fn create_test_manager_with(config: QueueConfig) -> (QueueManager, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let manager = QueueManager::new(config, store.clone(), store.clone());
    (manager, store)
}

fn register(manager: &QueueManager, name: &str, party_size: u32, priority: PriorityTier) -> Customer {
    manager
        .register(RegisterCustomer {
            name: name.to_string(),
            party_size,
            priority,
        })
        .unwrap()
}

// ========================================================================
// Helper: insert a waiting row with a fixed registration time
// ========================================================================

/// `offset_ms` is relative to a base one hour in the past
fn seed(
    manager: &QueueManager,
    store: &MemoryStore,
    id: i64,
    priority: PriorityTier,
    offset_ms: i64,
) -> Customer {
    let base = now_millis() - 3_600_000;
    store
        .insert(Customer::new(id, format!("Guest {id}"), 2, priority, base + offset_ms))
        .unwrap();
    manager.on_customer_created(id).unwrap()
}

fn number_of(store: &MemoryStore, id: i64) -> Option<u32> {
    store.get(id).unwrap().unwrap().queue_number
}

/// Waiting numbers are exactly 1..=N and follow the ranking order
fn assert_dense_and_ordered(store: &MemoryStore) {
    let mut waiting = store.list_waiting().unwrap();
    waiting.sort_by_key(ranking_key);
    for (idx, customer) in waiting.iter().enumerate() {
        assert_eq!(
            customer.queue_number,
            Some(idx as u32 + 1),
            "customer {} out of place",
            customer.id
        );
    }
}
