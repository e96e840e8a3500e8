//! Table-aware wait model
//!
//! 1. No suitable table at all → error (chain falls back).
//! 2. A suitable table is vacant and the customer is first in its
//!    capacity class → immediate seating.
//! 3. Completions in the turnover window → `(queue position - 1) / rate`.
//!    The rate counts every table, so the position is the overall one.
//! 4. Otherwise project free times of the suitable tables
//!    (`occupied_at + dining time`, vacant tables free now) and take the
//!    slot matching the class position, adding one dining time per
//!    table needed beyond those observed.
//!
//! When the context carries a [`FloorSnapshot`] the tables and the
//! completion count come from it instead of the store.
//!
//! Normal-tier customers get a 20% buffer. The result is rounded up to
//! a multiple of 5 and capped; above the sanity threshold the simple
//! model acts as a ceiling.

use super::{
    EstimateContext, EstimateError, EstimateResult, EstimateSource, FloorSnapshot,
    SimpleEstimator, WaitEstimate, WaitTimeStrategy,
};
use crate::core::QueueConfig;
use crate::store::{CustomerStore, TableProvider};
use shared::models::{DiningTable, TableStatus};
use std::sync::Arc;

const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Buffer applied to normal-tier estimates
const NORMAL_TIER_BUFFER: f64 = 1.2;

pub struct TableAwareEstimator {
    config: QueueConfig,
    store: Arc<dyn CustomerStore>,
    tables: Arc<dyn TableProvider>,
    simple: SimpleEstimator,
}

impl TableAwareEstimator {
    pub fn new(
        config: QueueConfig,
        store: Arc<dyn CustomerStore>,
        tables: Arc<dyn TableProvider>,
    ) -> Self {
        let simple = SimpleEstimator::new(config.clone());
        Self {
            config,
            store,
            tables,
            simple,
        }
    }

    fn completed_recent(&self, now: i64) -> EstimateResult<u32> {
        let since = now - self.config.turnover_window_millis();
        Ok(self.store.count_completed_since(since)?)
    }

    /// Completions per minute over the trailing window
    fn turnover_rate(&self, completed: u32) -> f64 {
        f64::from(completed) / f64::from(self.config.turnover_window_minutes.max(1))
    }

    /// Minutes until the `position`-th suitable table frees up
    fn project_from_tables(
        &self,
        tables: &[DiningTable],
        position: u32,
        party_size: u32,
        now: i64,
    ) -> EstimateResult<f64> {
        let dining_minutes = self.config.dining_times.minutes_for(party_size);
        let dining_millis = i64::from(dining_minutes) * 60_000;

        let mut free_at = Vec::with_capacity(tables.len());
        for table in tables {
            match table.status {
                TableStatus::Vacant => free_at.push(now),
                TableStatus::Occupied => {
                    let occupied_at = table.occupied_at.ok_or_else(|| {
                        EstimateError::InvalidTableData(format!(
                            "table {} is occupied without occupied_at",
                            table.id
                        ))
                    })?;
                    // 超时未离座的桌按"即将空出"处理
                    free_at.push((occupied_at + dining_millis).max(now));
                }
                TableStatus::Reserved | TableStatus::Cleaning => {}
            }
        }
        free_at.sort_unstable();

        let needed = position.max(1) as usize;
        let minutes = if needed <= free_at.len() {
            (free_at[needed - 1] - now) as f64 / MILLIS_PER_MINUTE
        } else {
            let last = free_at.last().copied().unwrap_or(now);
            let extra_tables = (needed - free_at.len()) as f64;
            (last - now) as f64 / MILLIS_PER_MINUTE + extra_tables * f64::from(dining_minutes)
        };
        Ok(minutes)
    }
}

/// Round up to the next multiple of 5 minutes
fn round_up_to_five(minutes: f64) -> u32 {
    if minutes.is_nan() || minutes <= 0.0 {
        return 0;
    }
    let whole = minutes.ceil().min(f64::from(u32::MAX - 5)) as u32;
    whole.div_ceil(5) * 5
}

impl WaitTimeStrategy for TableAwareEstimator {
    fn name(&self) -> &'static str {
        "table_aware"
    }

    fn capture_floor(&self, now: i64) -> EstimateResult<Option<FloorSnapshot>> {
        Ok(Some(FloorSnapshot {
            completed_recent: self.completed_recent(now)?,
            tables: self.tables.list_tables()?,
        }))
    }

    fn estimate(&self, ctx: &EstimateContext<'_>) -> EstimateResult<WaitEstimate> {
        let tables = match ctx.floor {
            Some(floor) => floor.suitable_tables(ctx.party_size),
            None => self.tables.suitable_tables(ctx.party_size)?,
        };
        if tables.is_empty() {
            return Err(EstimateError::NoSuitableTables {
                party_size: ctx.party_size,
            });
        }

        let position = ctx.class_position();
        if position == 1 && tables.iter().any(|t| t.is_vacant()) {
            return Ok(WaitEstimate::new(0, EstimateSource::Immediate));
        }

        let completed = match ctx.floor {
            Some(floor) => floor.completed_recent,
            None => self.completed_recent(ctx.now)?,
        };
        let rate = self.turnover_rate(completed);
        let raw = if rate > 0.0 {
            f64::from(ctx.queue_position().saturating_sub(1)) / rate
        } else {
            self.project_from_tables(&tables, position, ctx.party_size, ctx.now)?
        };

        let buffered = if ctx.priority.is_priority() {
            raw
        } else {
            raw * NORMAL_TIER_BUFFER
        };
        let minutes = round_up_to_five(buffered).min(self.config.table_aware_cap_minutes);

        if minutes > self.config.sanity_threshold_minutes {
            let simple = self
                .simple
                .minutes(ctx.customers_ahead(), ctx.party_size, ctx.priority);
            if simple < minutes {
                tracing::debug!(
                    table_aware = minutes,
                    simple,
                    "Table-aware estimate above threshold, using simple model"
                );
                return Ok(WaitEstimate::new(simple, EstimateSource::Simple));
            }
        }

        Ok(WaitEstimate::new(minutes, EstimateSource::TableAware))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::ranking::RankedQueue;
    use crate::store::{CustomerWrite, MemoryStore};
    use shared::models::{Customer, CustomerStatus, CustomerUpdate, PriorityTier};

    const NOW: i64 = 10_000_000_000;
    const MIN: i64 = 60_000;

    fn setup() -> (Arc<MemoryStore>, TableAwareEstimator) {
        let store = Arc::new(MemoryStore::new());
        let estimator = TableAwareEstimator::new(
            QueueConfig::default(),
            store.clone(),
            store.clone(),
        );
        (store, estimator)
    }

    fn queue_of(n: i64, party_size: u32) -> RankedQueue {
        RankedQueue::new(
            (1..=n)
                .map(|i| Customer::new(i, "g", party_size, PriorityTier::Normal, i))
                .collect(),
        )
    }

    fn completed(store: &MemoryStore, id: i64, at: i64) {
        store
            .commit(vec![
                CustomerWrite::Insert(Customer::new(id, "done", 2, PriorityTier::Normal, 0)),
                CustomerWrite::Update {
                    id,
                    update: CustomerUpdate {
                        status: Some(CustomerStatus::Completed),
                        completed_at: Some(at),
                        ..Default::default()
                    },
                },
            ])
            .unwrap();
    }

    #[test]
    fn test_round_up_to_five() {
        assert_eq!(round_up_to_five(0.0), 0);
        assert_eq!(round_up_to_five(0.1), 5);
        assert_eq!(round_up_to_five(5.0), 5);
        assert_eq!(round_up_to_five(5.01), 10);
        assert_eq!(round_up_to_five(f64::NAN), 0);
        assert!(round_up_to_five(f64::INFINITY) > 120);
    }

    #[test]
    fn test_no_suitable_tables_is_error() {
        let (store, estimator) = setup();
        store.upsert_table(DiningTable::new(1, "A1", 8));
        let queue = queue_of(0, 2);
        let ctx = EstimateContext::for_new(&queue, 2, PriorityTier::Normal, NOW);
        assert!(matches!(
            estimator.estimate(&ctx),
            Err(EstimateError::NoSuitableTables { party_size: 2 })
        ));
    }

    #[test]
    fn test_vacant_table_and_first_in_class_is_immediate() {
        let (store, estimator) = setup();
        store.upsert_table(DiningTable::new(1, "A1", 2));
        let queue = queue_of(0, 2);
        let ctx = EstimateContext::for_new(&queue, 2, PriorityTier::Normal, NOW);
        assert_eq!(
            estimator.estimate(&ctx).unwrap(),
            WaitEstimate::new(0, EstimateSource::Immediate)
        );
    }

    #[test]
    fn test_turnover_rate_drives_estimate() {
        let (store, estimator) = setup();
        store.upsert_table(DiningTable::new(1, "A1", 2));
        store.occupy_table(1, NOW - 5 * MIN).unwrap();
        // 6 completions in the last hour -> 0.1 per minute
        for id in 100..106 {
            completed(&store, id, NOW - 10 * MIN);
        }
        // a completion outside the window does not count
        completed(&store, 200, NOW - 90 * MIN);

        // new customer behind 2 waiting -> position 3 -> 2 / 0.1 = 20 min * 1.2 = 24 -> 25
        let queue = queue_of(2, 2);
        let ctx = EstimateContext::for_new(&queue, 2, PriorityTier::Normal, NOW);
        assert_eq!(
            estimator.estimate(&ctx).unwrap(),
            WaitEstimate::new(25, EstimateSource::TableAware)
        );

        // pwd ranks ahead of both normals -> position 1, no vacancy -> 0 min
        let ctx = EstimateContext::for_new(&queue, 2, PriorityTier::Pwd, NOW);
        assert_eq!(estimator.estimate(&ctx).unwrap().minutes, 0);
    }

    #[test]
    fn test_projection_from_occupied_tables() {
        let (store, estimator) = setup();
        // couples dine 20 min; tables seated 15 and 5 minutes ago
        store.upsert_table(DiningTable::new(1, "A1", 2));
        store.upsert_table(DiningTable::new(2, "A2", 2));
        store.occupy_table(1, NOW - 15 * MIN).unwrap();
        store.occupy_table(2, NOW - 5 * MIN).unwrap();

        // position 2 -> second table frees in 15 min -> *1.2 = 18 -> 20
        let queue = queue_of(1, 2);
        let ctx = EstimateContext::for_new(&queue, 2, PriorityTier::Normal, NOW);
        assert_eq!(
            estimator.estimate(&ctx).unwrap(),
            WaitEstimate::new(20, EstimateSource::TableAware)
        );

        // position 4 -> beyond 2 tables: 15 + 2 * 20 = 55 -> *1.2 = 66 -> cap 60
        // above threshold 45, simple: 3 ahead -> 5 min wins
        let queue = queue_of(3, 2);
        let ctx = EstimateContext::for_new(&queue, 2, PriorityTier::Normal, NOW);
        assert_eq!(
            estimator.estimate(&ctx).unwrap(),
            WaitEstimate::new(5, EstimateSource::Simple)
        );
    }

    #[test]
    fn test_occupied_without_timestamp_is_invalid() {
        let (store, estimator) = setup();
        let mut table = DiningTable::new(1, "A1", 2);
        table.status = TableStatus::Occupied;
        store.upsert_table(table);
        let queue = queue_of(1, 2);
        let ctx = EstimateContext::for_new(&queue, 2, PriorityTier::Normal, NOW);
        assert!(matches!(
            estimator.estimate(&ctx),
            Err(EstimateError::InvalidTableData(_))
        ));
    }

    #[test]
    fn test_overstaying_table_counts_as_freeing_now() {
        let (store, estimator) = setup();
        store.upsert_table(DiningTable::new(1, "A1", 2));
        store.occupy_table(1, NOW - 90 * MIN).unwrap();
        // position 1 but no vacancy, table overdue -> 0 min
        let queue = queue_of(0, 2);
        let ctx = EstimateContext::for_new(&queue, 2, PriorityTier::Normal, NOW);
        assert_eq!(
            estimator.estimate(&ctx).unwrap(),
            WaitEstimate::new(0, EstimateSource::TableAware)
        );
    }

    #[test]
    fn test_projection_counts_vacant_tables_as_free_now() {
        let (store, estimator) = setup();
        store.upsert_table(DiningTable::new(1, "A1", 2));
        store.upsert_table(DiningTable::new(2, "A2", 2));
        let mut cleaning = DiningTable::new(3, "A3", 2);
        cleaning.status = TableStatus::Cleaning;
        store.upsert_table(cleaning);
        store.occupy_table(2, NOW - 5 * MIN).unwrap();

        // slots: vacant now, occupied in 15 min, cleaning ignored
        // position 3 -> 15 + 20 = 35 * 1.2 = 42 -> 45
        let queue = queue_of(2, 2);
        let ctx = EstimateContext::for_new(&queue, 2, PriorityTier::Normal, NOW);
        assert_eq!(
            estimator.estimate(&ctx).unwrap(),
            WaitEstimate::new(45, EstimateSource::TableAware)
        );
    }

    #[test]
    fn test_turnover_uses_overall_position() {
        let (store, estimator) = setup();
        store.upsert_table(DiningTable::new(1, "B1", 4));
        store.occupy_table(1, NOW - 5 * MIN).unwrap();
        for id in 100..106 {
            completed(&store, id, NOW - 10 * MIN);
        }

        // two couples, then a party of 4: first of its class, third overall
        let four = Customer::new(3, "four", 4, PriorityTier::Normal, 3);
        let queue = RankedQueue::new(vec![
            Customer::new(1, "a", 2, PriorityTier::Normal, 1),
            Customer::new(2, "b", 2, PriorityTier::Normal, 2),
            four.clone(),
        ]);
        let ctx = EstimateContext::for_customer(&queue, &four, NOW);
        assert_eq!(ctx.class_position(), 1);
        assert_eq!(ctx.queue_position(), 3);

        // 2 / 0.1 = 20 min * 1.2 = 24 -> 25
        assert_eq!(
            estimator.estimate(&ctx).unwrap(),
            WaitEstimate::new(25, EstimateSource::TableAware)
        );
    }

    #[test]
    fn test_floor_snapshot_replaces_store_reads() {
        let (store, estimator) = setup();
        store.upsert_table(DiningTable::new(1, "A1", 2));
        store.occupy_table(1, NOW - 5 * MIN).unwrap();
        for id in 100..106 {
            completed(&store, id, NOW - 10 * MIN);
        }

        let floor = estimator.capture_floor(NOW).unwrap().unwrap();
        assert_eq!(floor.completed_recent, 6);
        assert_eq!(floor.tables.len(), 1);

        let queue = queue_of(2, 2);
        let ctx = EstimateContext::for_new(&queue, 2, PriorityTier::Normal, NOW);
        let live = estimator.estimate(&ctx).unwrap();
        assert_eq!(estimator.estimate(&ctx.with_floor(Some(&floor))).unwrap(), live);

        // later store changes are not seen through the captured floor
        store.upsert_table(DiningTable::new(2, "A2", 2));
        assert_eq!(estimator.estimate(&ctx.with_floor(Some(&floor))).unwrap(), live);

        // a floor with no completions switches to projection
        let quiet = FloorSnapshot {
            completed_recent: 0,
            tables: floor.tables.clone(),
        };
        // position 3 beyond 1 table: 15 + 2 * 20 = 55 -> 66 -> cap 60, simple 5 wins
        assert_eq!(
            estimator.estimate(&ctx.with_floor(Some(&quiet))).unwrap(),
            WaitEstimate::new(5, EstimateSource::Simple)
        );
    }
}
