//! QueueManager - serialised lifecycle commands over the waiting set
//!
//! This module handles:
//! - Registration and status transitions
//! - Re-rank (queue numbers) and bulk re-estimate (wait times)
//! - Atomic persistence of both through one store commit
//! - Event broadcasting
//!
//! # Command Flow
//!
//! ```text
//! transition(id, next)
//!     ├─ 1. Take the waiting-set lock
//!     ├─ 2. Load customer, validate the lifecycle edge
//!     ├─ 3. Build the status write
//!     ├─ 4. Load waiting set, apply the change in memory
//!     ├─ 5. Re-rank → queue number writes
//!     ├─ 6. Re-estimate → wait time writes
//!     ├─ 7. Commit all writes in one batch
//!     ├─ 8. Release lock
//!     └─ 9. Broadcast events
//! ```
//!
//! Leaving `Waiting` and the matching renumbering land in the same
//! commit, so a reader never sees one without the other.

mod error;
pub use error::*;

#[cfg(test)]
mod tests;

use super::estimator::{EstimateContext, EstimateSource, WaitTimeEstimator};
use super::query::QueueQuery;
use super::ranking::{self, RankedQueue};
use crate::core::QueueConfig;
use crate::store::{CustomerStore, CustomerWrite, TableProvider};
use crate::utils::time;
use parking_lot::Mutex;
use shared::models::{Customer, CustomerStatus, CustomerUpdate, PriorityTier, RegisterCustomer};
use shared::queue::{QueueEvent, QueuePosition, QueueStats, RerankOutcome, WaitTimeRefresh};
use shared::util::{now_millis, snowflake_id};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Event broadcast channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 1024;

pub struct QueueManager {
    store: Arc<dyn CustomerStore>,
    estimator: Arc<WaitTimeEstimator>,
    query: QueueQuery,
    config: QueueConfig,
    /// Held for the whole read-plan-commit cycle of every mutation
    write_lock: Mutex<()>,
    event_tx: broadcast::Sender<QueueEvent>,
}

impl std::fmt::Debug for QueueManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueManager")
            .field("store", &"<dyn CustomerStore>")
            .field("estimator", &self.estimator)
            .field("event_tx", &"<broadcast::Sender>")
            .finish()
    }
}

impl QueueManager {
    /// Manager with the standard estimator chain
    pub fn new(
        config: QueueConfig,
        store: Arc<dyn CustomerStore>,
        tables: Arc<dyn TableProvider>,
    ) -> Self {
        let estimator = WaitTimeEstimator::new(config.clone(), store.clone(), tables);
        Self::with_estimator(config, store, estimator)
    }

    /// Manager with a custom estimator chain
    pub fn with_estimator(
        config: QueueConfig,
        store: Arc<dyn CustomerStore>,
        estimator: WaitTimeEstimator,
    ) -> Self {
        let estimator = Arc::new(estimator);
        let query = QueueQuery::new(store.clone(), estimator.clone(), config.clone());
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        tracing::info!(
            concurrent_capacity = config.concurrent_capacity,
            table_aware = config.table_aware_enabled,
            "QueueManager started"
        );
        Self {
            store,
            estimator,
            query,
            config,
            write_lock: Mutex::new(()),
            event_tx,
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Read-only facade sharing this manager's store and estimator
    pub fn query(&self) -> &QueueQuery {
        &self.query
    }

    /// Subscribe to queue events
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.event_tx.subscribe()
    }

    // ========== Commands ==========

    /// Register a walk-in customer
    ///
    /// Returns the stored customer with its final queue number and estimate.
    pub fn register(&self, input: RegisterCustomer) -> ManagerResult<Customer> {
        if input.party_size == 0 || input.party_size > self.config.max_party_size {
            return Err(ManagerError::InvalidPartySize(input.party_size));
        }

        let _guard = self.write_lock.lock();
        let now = now_millis();

        let provisional = self.next_queue_number_locked(input.priority, now)?;
        let mut customer = Customer::new(
            snowflake_id(),
            input.name.trim(),
            input.party_size,
            input.priority,
            now,
        );
        customer.queue_number = Some(provisional);
        let id = customer.id;

        let mut waiting = self.store.list_waiting()?;
        waiting.push(customer.clone());
        let mut writes = vec![CustomerWrite::Insert(customer)];
        let (rerank, refresh) = self.plan_refresh(waiting, now, &mut writes);
        self.store.commit(writes)?;

        let saved = self.store.get(id)?.ok_or(ManagerError::CustomerNotFound(id))?;
        tracing::info!(
            customer_id = id,
            priority = %saved.priority,
            party_size = saved.party_size,
            provisional,
            queue_number = ?saved.queue_number,
            estimated_wait_minutes = ?saved.estimated_wait_minutes,
            "Customer registered"
        );

        self.broadcast(QueueEvent::CustomerRegistered {
            customer_id: id,
            priority: saved.priority,
            party_size: saved.party_size,
            queue_number: saved.queue_number.unwrap_or(provisional),
            estimated_wait_minutes: saved.estimated_wait_minutes.unwrap_or(0),
            timestamp: now,
        });
        self.broadcast_refresh(rerank, &refresh, now);
        Ok(saved)
    }

    /// Hook for customers created outside [`register`](Self::register)
    ///
    /// The row must already be in the store; the waiting set is re-ranked
    /// and re-estimated around it.
    pub fn on_customer_created(&self, customer_id: i64) -> ManagerResult<Customer> {
        let _guard = self.write_lock.lock();
        let now = now_millis();
        if self.store.get(customer_id)?.is_none() {
            return Err(ManagerError::CustomerNotFound(customer_id));
        }

        let waiting = self.store.list_waiting()?;
        let mut writes = Vec::new();
        let (rerank, refresh) = self.plan_refresh(waiting, now, &mut writes);
        if !writes.is_empty() {
            self.store.commit(writes)?;
        }
        self.broadcast_refresh(rerank, &refresh, now);

        self.store
            .get(customer_id)?
            .ok_or(ManagerError::CustomerNotFound(customer_id))
    }

    /// Hook for every lifecycle transition
    ///
    /// Seating through this hook requires the table to be assigned on the
    /// customer row already; use [`seat_customer`](Self::seat_customer) otherwise.
    pub fn on_customer_status_changed(
        &self,
        customer_id: i64,
        new_status: CustomerStatus,
    ) -> ManagerResult<Customer> {
        let _guard = self.write_lock.lock();
        self.transition_locked(customer_id, new_status, None)
    }

    pub fn call_customer(&self, customer_id: i64) -> ManagerResult<Customer> {
        self.on_customer_status_changed(customer_id, CustomerStatus::Called)
    }

    /// Call whoever holds queue number 1, `None` on an empty queue
    pub fn call_next(&self) -> ManagerResult<Option<Customer>> {
        let _guard = self.write_lock.lock();
        let queue = RankedQueue::new(self.store.list_waiting()?);
        let Some(head) = queue.head() else {
            tracing::debug!("call_next on empty queue");
            return Ok(None);
        };
        let id = head.id;
        self.transition_locked(id, CustomerStatus::Called, None)
            .map(Some)
    }

    pub fn seat_customer(&self, customer_id: i64, table_id: i64) -> ManagerResult<Customer> {
        let _guard = self.write_lock.lock();
        self.transition_locked(customer_id, CustomerStatus::Seated, Some(table_id))
    }

    pub fn complete_customer(&self, customer_id: i64) -> ManagerResult<Customer> {
        self.on_customer_status_changed(customer_id, CustomerStatus::Completed)
    }

    pub fn cancel_customer(&self, customer_id: i64) -> ManagerResult<Customer> {
        self.on_customer_status_changed(customer_id, CustomerStatus::Cancelled)
    }

    pub fn mark_no_show(&self, customer_id: i64) -> ManagerResult<Customer> {
        self.on_customer_status_changed(customer_id, CustomerStatus::NoShow)
    }

    /// Recompute queue numbers for the waiting set
    ///
    /// Writes only changed numbers; a second call without intervening
    /// mutation writes nothing.
    pub fn reassign_queue_numbers(&self) -> ManagerResult<RerankOutcome> {
        let _guard = self.write_lock.lock();
        let queue = RankedQueue::new(self.store.list_waiting()?);
        let writes = queue.number_updates();
        let outcome = RerankOutcome {
            waiting: queue.len() as u32,
            updated: writes.len() as u32,
        };
        if !writes.is_empty() {
            self.store.commit(writes)?;
        }
        tracing::debug!(
            waiting = outcome.waiting,
            updated = outcome.updated,
            "Queue numbers reassigned"
        );
        Ok(outcome)
    }

    /// Recompute and persist the estimate of every waiting customer
    pub fn update_all_wait_times(&self) -> ManagerResult<WaitTimeRefresh> {
        let _guard = self.write_lock.lock();
        let now = now_millis();
        let queue = RankedQueue::new(self.store.list_waiting()?);
        let mut writes = Vec::new();
        let refresh = self.plan_estimates(&queue, now, &mut writes);
        if !writes.is_empty() {
            self.store.commit(writes)?;
        }
        tracing::debug!(
            evaluated = refresh.evaluated,
            updated = refresh.updated,
            fallbacks = refresh.fallbacks,
            "Wait times updated"
        );
        Ok(refresh)
    }

    /// Re-rank and re-estimate as one serialised step
    ///
    /// For callers reacting to table occupancy changes made outside the
    /// customer lifecycle.
    pub fn refresh(&self) -> ManagerResult<(RerankOutcome, WaitTimeRefresh)> {
        let _guard = self.write_lock.lock();
        let now = now_millis();
        let waiting = self.store.list_waiting()?;
        let mut writes = Vec::new();
        let (rerank, refresh) = self.plan_refresh(waiting, now, &mut writes);
        if !writes.is_empty() {
            self.store.commit(writes)?;
        }
        self.broadcast_refresh(rerank, &refresh, now);
        Ok((rerank, refresh))
    }

    /// Provisional number to show before registration completes
    pub fn get_next_queue_number(&self, priority: PriorityTier) -> ManagerResult<u32> {
        self.next_queue_number_locked(priority, now_millis())
    }

    // ========== Queries ==========

    pub fn get_queue_position(&self, customer_id: i64) -> ManagerResult<QueuePosition> {
        Ok(self.query.get_queue_position(customer_id)?)
    }

    pub fn get_queue_stats(&self) -> ManagerResult<QueueStats> {
        Ok(self.query.get_queue_stats()?)
    }

    pub fn calculate_wait_time(
        &self,
        party_size: u32,
        priority: PriorityTier,
        exclude_customer_id: Option<i64>,
    ) -> ManagerResult<u32> {
        Ok(self
            .query
            .calculate_wait_time(party_size, priority, exclude_customer_id)?)
    }

    pub fn calculate_wait_time_for_new(
        &self,
        party_size: u32,
        priority: PriorityTier,
    ) -> ManagerResult<u32> {
        Ok(self
            .query
            .calculate_wait_time_for_new(party_size, priority)?)
    }

    // ========== Internals ==========

    /// Caller must hold `write_lock`
    fn transition_locked(
        &self,
        customer_id: i64,
        next: CustomerStatus,
        table_id: Option<i64>,
    ) -> ManagerResult<Customer> {
        let customer = self
            .store
            .get(customer_id)?
            .ok_or(ManagerError::CustomerNotFound(customer_id))?;
        let from = customer.status;
        if !from.can_transition_to(next) {
            return Err(ManagerError::InvalidTransition {
                id: customer_id,
                from,
                to: next,
            });
        }

        let now = now_millis();
        let mut update = CustomerUpdate {
            status: Some(next),
            ..Default::default()
        };
        match next {
            CustomerStatus::Called => update.called_at = Some(now),
            CustomerStatus::Seated => {
                let table = table_id
                    .or(customer.table_id)
                    .ok_or(ManagerError::TableRequired(customer_id))?;
                update.table_id = Some(table);
                update.seated_at = Some(now);
            }
            CustomerStatus::Completed => update.completed_at = Some(now),
            CustomerStatus::Cancelled | CustomerStatus::NoShow => update.left_at = Some(now),
            CustomerStatus::Waiting => {}
        }
        let status_write = CustomerWrite::Update {
            id: customer_id,
            update,
        };

        let mut waiting = self.store.list_waiting()?;
        waiting.retain(|c| c.id != customer_id);

        let (rerank, refresh) = if from == CustomerStatus::Waiting {
            // 离开等待队列：状态与重新编号同一批提交
            let mut writes = vec![status_write];
            let plan = self.plan_refresh(waiting, now, &mut writes);
            self.store.commit(writes)?;
            plan
        } else {
            // 等待集合不变；先落状态，翻台数据才能反映到预估里
            self.store.commit(vec![status_write])?;
            let mut writes = Vec::new();
            let plan = self.plan_refresh(waiting, now, &mut writes);
            if !writes.is_empty() {
                self.store.commit(writes)?;
            }
            plan
        };

        let saved = self
            .store
            .get(customer_id)?
            .ok_or(ManagerError::CustomerNotFound(customer_id))?;
        tracing::info!(
            customer_id,
            from = %from,
            to = %next,
            queue_number = ?saved.queue_number,
            table_id = ?saved.table_id,
            "Customer status changed"
        );

        self.broadcast(QueueEvent::StatusChanged {
            customer_id,
            from,
            to: next,
            queue_number: saved.queue_number,
            timestamp: now,
        });
        self.broadcast_refresh(rerank, &refresh, now);
        Ok(saved)
    }

    fn next_queue_number_locked(&self, priority: PriorityTier, now: i64) -> ManagerResult<u32> {
        let day_start =
            time::business_day_start_millis(now, self.config.business_day_cutoff, self.config.timezone);
        let today = self.store.list_registered_since(day_start)?;
        Ok(ranking::provisional_queue_number(&today, priority))
    }

    /// Re-rank then re-estimate `waiting`, appending writes
    fn plan_refresh(
        &self,
        waiting: Vec<Customer>,
        now: i64,
        writes: &mut Vec<CustomerWrite>,
    ) -> (RerankOutcome, WaitTimeRefresh) {
        let mut queue = RankedQueue::new(waiting);
        let number_writes = queue.number_updates();
        let rerank = RerankOutcome {
            waiting: queue.len() as u32,
            updated: number_writes.len() as u32,
        };
        for write in number_writes {
            push_write(writes, write);
        }
        queue.apply_numbers();

        let refresh = self.plan_estimates(&queue, now, writes);
        tracing::debug!(
            waiting = rerank.waiting,
            renumbered = rerank.updated,
            reestimated = refresh.updated,
            "Queue refresh planned"
        );
        (rerank, refresh)
    }

    fn plan_estimates(
        &self,
        queue: &RankedQueue,
        now: i64,
        writes: &mut Vec<CustomerWrite>,
    ) -> WaitTimeRefresh {
        let mut refresh = WaitTimeRefresh::default();
        let mut total: u64 = 0;
        if queue.is_empty() {
            return refresh;
        }

        // 桌台与翻台数据每次刷新只读一次
        let floor = self.estimator.capture_floor(now);
        for customer in queue.customers() {
            let ctx = EstimateContext::for_customer(queue, customer, now).with_floor(floor.as_ref());
            let estimate = self.estimator.estimate(&ctx);
            let minutes = estimate.minutes;

            if estimate.source == EstimateSource::Fallback {
                refresh.fallbacks += 1;
            }
            if refresh.evaluated == 0 {
                refresh.min_minutes = minutes;
            }
            refresh.evaluated += 1;
            refresh.min_minutes = refresh.min_minutes.min(minutes);
            refresh.max_minutes = refresh.max_minutes.max(minutes);
            total += u64::from(minutes);

            if customer.estimated_wait_minutes != Some(minutes) {
                refresh.updated += 1;
                push_write(
                    writes,
                    CustomerWrite::Update {
                        id: customer.id,
                        update: CustomerUpdate {
                            estimated_wait_minutes: Some(minutes),
                            ..Default::default()
                        },
                    },
                );
            }
        }

        if refresh.evaluated > 0 {
            refresh.average_minutes = total as f64 / f64::from(refresh.evaluated);
        }
        refresh
    }

    fn broadcast(&self, event: QueueEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::trace!("Queue event dropped: no active receivers");
        }
    }

    fn broadcast_refresh(&self, rerank: RerankOutcome, refresh: &WaitTimeRefresh, now: i64) {
        if rerank.updated == 0 && refresh.updated == 0 {
            return;
        }
        self.broadcast(QueueEvent::QueueRefreshed {
            waiting: rerank.waiting,
            renumbered: rerank.updated,
            reestimated: refresh.updated,
            timestamp: now,
        });
    }
}

/// Append a write, folding updates for the same customer into one
fn push_write(writes: &mut Vec<CustomerWrite>, write: CustomerWrite) {
    if let CustomerWrite::Update { id, update } = write {
        for existing in writes.iter_mut() {
            match existing {
                CustomerWrite::Update {
                    id: existing_id,
                    update: existing_update,
                } if *existing_id == id => {
                    existing_update.merge(update);
                    return;
                }
                CustomerWrite::Insert(customer) if customer.id == id => {
                    customer.apply(&update);
                    return;
                }
                _ => {}
            }
        }
        writes.push(CustomerWrite::Update { id, update });
    } else {
        writes.push(write);
    }
}
