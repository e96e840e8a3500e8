//! 持久化流程测试 - redb 文件库
//!
//! 登记、叫号、入座、取消后关闭数据库，重新打开验证队号与状态都已落盘。

use anyhow::Result;
use queue_engine::{CustomerStore, QueueConfig, QueueManager, RedbStore, init_logger};
use shared::models::{CustomerStatus, DiningTable, PriorityTier, RegisterCustomer};
use std::sync::Arc;

fn register(manager: &QueueManager, name: &str, party_size: u32, priority: PriorityTier) -> Result<i64> {
    let customer = manager.register(RegisterCustomer {
        name: name.to_string(),
        party_size,
        priority,
    })?;
    Ok(customer.id)
}

#[test]
fn test_queue_survives_reopen() -> Result<()> {
    init_logger();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("queue.redb");

    let (ana, ben, carla, dina) = {
        let store = Arc::new(RedbStore::open(&path)?);
        store.upsert_table(&DiningTable::new(1, "A1", 2))?;
        store.upsert_table(&DiningTable::new(2, "B1", 4))?;
        let manager = QueueManager::new(QueueConfig::default(), store.clone(), store.clone());

        let ana = register(&manager, "Ana", 2, PriorityTier::Normal)?;
        let ben = register(&manager, "Ben", 4, PriorityTier::Normal)?;
        let carla = register(&manager, "Carla", 2, PriorityTier::Senior)?;
        let dina = register(&manager, "Dina", 3, PriorityTier::Pregnant)?;

        // pregnant, senior, then FIFO normals
        let order: Vec<Option<u32>> = [dina, carla, ana, ben]
            .iter()
            .map(|id| store.get(*id).map(|c| c.and_then(|c| c.queue_number)))
            .collect::<Result<_, _>>()?;
        assert_eq!(order, vec![Some(1), Some(2), Some(3), Some(4)]);

        let called = manager.call_next()?.expect("queue is not empty");
        assert_eq!(called.id, dina);
        manager.seat_customer(dina, 2)?;
        store.occupy_table(2, called.called_at.unwrap_or_default())?;
        manager.cancel_customer(ana)?;

        (ana, ben, carla, dina)
    };

    // all handles dropped, reopen the same file
    let store = Arc::new(RedbStore::open(&path)?);

    let mut waiting = store.list_waiting()?;
    waiting.sort_by_key(|c| c.queue_number);
    let ids: Vec<i64> = waiting.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![carla, ben]);
    assert_eq!(waiting[0].queue_number, Some(1));
    assert_eq!(waiting[1].queue_number, Some(2));
    assert!(waiting.iter().all(|c| c.estimated_wait_minutes.is_some()));

    let seated = store.get(dina)?.expect("seated customer persisted");
    assert_eq!(seated.status, CustomerStatus::Seated);
    assert_eq!(seated.table_id, Some(2));
    let cancelled = store.get(ana)?.expect("cancelled customer persisted");
    assert_eq!(cancelled.status, CustomerStatus::Cancelled);
    assert!(cancelled.left_at.is_some());

    // numbers on disk are already final
    let manager = QueueManager::new(QueueConfig::default(), store.clone(), store.clone());
    assert_eq!(manager.reassign_queue_numbers()?.updated, 0);

    let position = manager.get_queue_position(ben)?;
    assert_eq!(position.position, Some(2));
    let position = manager.get_queue_position(dina)?;
    assert_eq!(position.position, None);
    assert_eq!(position.status, Some(CustomerStatus::Seated));

    manager.complete_customer(dina)?;
    let stats = manager.get_queue_stats()?;
    assert_eq!(stats.total_waiting, 2);
    assert_eq!(stats.priority_waiting, 1);
    assert_eq!(stats.completed_recent, 1);
    Ok(())
}
