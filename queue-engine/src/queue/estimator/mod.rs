//! Wait-Time Estimator
//!
//! Two strategies behind one trait, tried in order:
//!
//! ```text
//! estimate(ctx)
//!     ├─ TableAwareEstimator   (preferred: tables + recent turnover)
//!     │      └─ Err → warn, next
//!     └─ SimpleEstimator       (always succeeds: queue position only)
//! ```
//!
//! The chain never fails. Whatever strategy answers, the result is
//! clamped to `[min_wait_minutes, max_wait_minutes]`.

mod simple;
mod table_aware;

pub use simple::SimpleEstimator;
pub use table_aware::TableAwareEstimator;

use super::ranking::RankedQueue;
use crate::core::QueueConfig;
use crate::store::{CustomerStore, StoreError, TableProvider};
use serde::{Deserialize, Serialize};
use shared::models::{Customer, DiningTable, PriorityTier};
use std::sync::Arc;
use thiserror::Error;

/// Estimator errors, always handled inside the chain
#[derive(Debug, Error)]
pub enum EstimateError {
    #[error("No suitable tables for a party of {party_size}")]
    NoSuitableTables { party_size: u32 },

    #[error("Invalid table data: {0}")]
    InvalidTableData(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type EstimateResult<T> = Result<T, EstimateError>;

/// Which model produced an estimate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EstimateSource {
    /// A suitable table is vacant and the customer is first in line
    Immediate,
    TableAware,
    Simple,
    /// Preferred strategies failed, simple model used instead
    Fallback,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WaitEstimate {
    pub minutes: u32,
    pub source: EstimateSource,
}

impl WaitEstimate {
    pub fn new(minutes: u32, source: EstimateSource) -> Self {
        Self { minutes, source }
    }
}

/// Floor state read once per refresh and shared by every estimate in it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloorSnapshot {
    /// Completions inside the turnover window
    pub completed_recent: u32,
    /// Every table, any class
    pub tables: Vec<DiningTable>,
}

impl FloorSnapshot {
    /// Tables suiting a party of `party_size`
    pub fn suitable_tables(&self, party_size: u32) -> Vec<DiningTable> {
        self.tables
            .iter()
            .filter(|t| t.suits(party_size))
            .cloned()
            .collect()
    }
}

/// Everything a strategy may look at for one estimate
#[derive(Debug, Clone, Copy)]
pub struct EstimateContext<'a> {
    /// Current waiting set in serving order
    pub queue: &'a RankedQueue,
    pub party_size: u32,
    pub priority: PriorityTier,
    /// The waiting customer being estimated, `None` for a new registration
    pub customer: Option<&'a Customer>,
    /// Unix millis
    pub now: i64,
    /// Pre-read floor state, `None` means strategies read it themselves
    pub floor: Option<&'a FloorSnapshot>,
}

impl<'a> EstimateContext<'a> {
    /// Estimate for a customer already in the queue
    pub fn for_customer(queue: &'a RankedQueue, customer: &'a Customer, now: i64) -> Self {
        Self {
            queue,
            party_size: customer.party_size,
            priority: customer.priority,
            customer: Some(customer),
            now,
            floor: None,
        }
    }

    /// Estimate for someone about to register
    pub fn for_new(queue: &'a RankedQueue, party_size: u32, priority: PriorityTier, now: i64) -> Self {
        Self {
            queue,
            party_size,
            priority,
            customer: None,
            now,
            floor: None,
        }
    }

    pub fn with_floor(mut self, floor: Option<&'a FloorSnapshot>) -> Self {
        self.floor = floor;
        self
    }

    /// Waiting customers registered strictly before the target
    ///
    /// A new registration has the whole waiting set ahead of it.
    pub fn customers_ahead(&self) -> u32 {
        match self.customer {
            Some(c) => self.queue.registered_before(c.registered_at, Some(c.id)),
            None => self.queue.len() as u32,
        }
    }

    /// 1-based position in the whole ranked queue
    pub fn queue_position(&self) -> u32 {
        self.customer
            .and_then(|c| self.queue.position_of(c.id))
            .unwrap_or_else(|| self.queue.position_for_new(self.priority))
    }

    /// 1-based position among waiters of the same capacity class
    pub fn class_position(&self) -> u32 {
        self.customer
            .and_then(|c| self.queue.class_position(c.id))
            .unwrap_or_else(|| {
                self.queue
                    .class_position_for_new(self.party_size, self.priority)
            })
    }
}

/// One wait-time model
pub trait WaitTimeStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn estimate(&self, ctx: &EstimateContext<'_>) -> EstimateResult<WaitEstimate>;

    /// Read the floor state this strategy needs, once per refresh
    fn capture_floor(&self, _now: i64) -> EstimateResult<Option<FloorSnapshot>> {
        Ok(None)
    }
}

/// Ordered fallback chain of strategies ending in the simple model
pub struct WaitTimeEstimator {
    strategies: Vec<Box<dyn WaitTimeStrategy>>,
    fallback: SimpleEstimator,
    config: QueueConfig,
}

impl std::fmt::Debug for WaitTimeEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("WaitTimeEstimator")
            .field("strategies", &names)
            .field("fallback", &self.fallback.name())
            .finish()
    }
}

impl WaitTimeEstimator {
    /// Standard chain: table-aware (when enabled) then simple
    pub fn new(
        config: QueueConfig,
        store: Arc<dyn CustomerStore>,
        tables: Arc<dyn TableProvider>,
    ) -> Self {
        let mut strategies: Vec<Box<dyn WaitTimeStrategy>> = Vec::new();
        if config.table_aware_enabled {
            strategies.push(Box::new(TableAwareEstimator::new(
                config.clone(),
                store,
                tables,
            )));
        }
        Self::with_strategies(config, strategies)
    }

    /// Custom chain, the simple model is always appended as last resort
    pub fn with_strategies(config: QueueConfig, strategies: Vec<Box<dyn WaitTimeStrategy>>) -> Self {
        Self {
            strategies,
            fallback: SimpleEstimator::new(config.clone()),
            config,
        }
    }

    /// Floor state for a batch of estimates
    ///
    /// `None` when no strategy needs one or reading it failed; the
    /// strategies then read per estimate and fall back as usual.
    pub fn capture_floor(&self, now: i64) -> Option<FloorSnapshot> {
        for strategy in &self.strategies {
            match strategy.capture_floor(now) {
                Ok(Some(floor)) => return Some(floor),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        error = %e,
                        "Failed to capture floor state"
                    );
                }
            }
        }
        None
    }

    /// Estimate through the chain, never fails
    pub fn estimate(&self, ctx: &EstimateContext<'_>) -> WaitEstimate {
        let mut degraded = false;
        for strategy in &self.strategies {
            match strategy.estimate(ctx) {
                Ok(estimate) => {
                    return WaitEstimate::new(self.config.clamp_wait(estimate.minutes), estimate.source);
                }
                Err(e) => {
                    degraded = true;
                    tracing::warn!(
                        strategy = strategy.name(),
                        party_size = ctx.party_size,
                        error = %e,
                        "Wait-time strategy failed, trying next"
                    );
                }
            }
        }

        let minutes = self
            .fallback
            .minutes(ctx.customers_ahead(), ctx.party_size, ctx.priority);
        let source = if degraded {
            EstimateSource::Fallback
        } else {
            EstimateSource::Simple
        };
        WaitEstimate::new(self.config.clamp_wait(minutes), source)
    }
}
