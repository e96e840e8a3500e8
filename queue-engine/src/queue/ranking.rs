//! Queue Ranking Engine
//!
//! Total order over the waiting set: priority rank ascending, then
//! `registered_at` ascending (FIFO inside a tier), then id as a final
//! tie-break for registrations within the same millisecond.
//!
//! Queue numbers are recomputed from scratch on every membership change,
//! never patched incrementally, so the waiting set always holds exactly
//! `1..=N`.

use crate::store::CustomerWrite;
use shared::models::{CapacityClass, Customer, CustomerUpdate, PriorityTier};

/// Composite sort key of a waiting customer
pub fn ranking_key(customer: &Customer) -> (u8, i64, i64) {
    (customer.priority.rank(), customer.registered_at, customer.id)
}

/// Waiting customers in serving order
#[derive(Debug, Clone, Default)]
pub struct RankedQueue {
    customers: Vec<Customer>,
}

impl RankedQueue {
    /// Rank a waiting set, non-waiting rows are dropped
    pub fn new(waiting: Vec<Customer>) -> Self {
        let mut customers: Vec<Customer> = waiting.into_iter().filter(|c| c.is_waiting()).collect();
        customers.sort_by_key(ranking_key);
        Self { customers }
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }

    /// Customer currently at the head of the queue
    pub fn head(&self) -> Option<&Customer> {
        self.customers.first()
    }

    pub fn get(&self, id: i64) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == id)
    }

    /// 1-based position, `None` if not waiting
    pub fn position_of(&self, id: i64) -> Option<u32> {
        self.customers
            .iter()
            .position(|c| c.id == id)
            .map(|idx| idx as u32 + 1)
    }

    /// Writes for every customer whose stored number differs from its rank
    ///
    /// Empty when the stored numbers already match, which makes a repeated
    /// re-rank a no-op.
    pub fn number_updates(&self) -> Vec<CustomerWrite> {
        self.customers
            .iter()
            .enumerate()
            .filter_map(|(idx, c)| {
                let number = idx as u32 + 1;
                (c.queue_number != Some(number)).then(|| CustomerWrite::Update {
                    id: c.id,
                    update: CustomerUpdate {
                        queue_number: Some(number),
                        ..Default::default()
                    },
                })
            })
            .collect()
    }

    /// Overwrite the in-memory numbers with the ranked ones
    pub fn apply_numbers(&mut self) {
        for (idx, c) in self.customers.iter_mut().enumerate() {
            c.queue_number = Some(idx as u32 + 1);
        }
    }

    /// Position among waiters of the same capacity class
    pub fn class_position(&self, id: i64) -> Option<u32> {
        let target = self.get(id)?;
        let class = CapacityClass::for_seats(target.party_size);
        let ahead = self
            .customers
            .iter()
            .take_while(|c| c.id != id)
            .filter(|c| CapacityClass::for_seats(c.party_size) == class)
            .count();
        Some(ahead as u32 + 1)
    }

    /// Position a brand-new registration would take among its class
    ///
    /// A new customer ranks behind everyone of the same or higher tier.
    pub fn class_position_for_new(&self, party_size: u32, tier: PriorityTier) -> u32 {
        let class = CapacityClass::for_seats(party_size);
        let ahead = self
            .customers
            .iter()
            .filter(|c| CapacityClass::for_seats(c.party_size) == class)
            .filter(|c| c.priority.rank() <= tier.rank())
            .count();
        ahead as u32 + 1
    }

    /// Overall position a brand-new registration would take
    pub fn position_for_new(&self, tier: PriorityTier) -> u32 {
        let ahead = self
            .customers
            .iter()
            .filter(|c| c.priority.rank() <= tier.rank())
            .count();
        ahead as u32 + 1
    }

    /// Waiting customers registered strictly before `registered_at`
    pub fn registered_before(&self, registered_at: i64, exclude: Option<i64>) -> u32 {
        self.customers
            .iter()
            .filter(|c| Some(c.id) != exclude && c.registered_at < registered_at)
            .count() as u32
    }
}

/// Provisional display number for a new registration
///
/// One more than the highest number handed out today at the same or a
/// higher tier. If that collides with a number already held today, falls
/// back to one more than today's overall maximum. Always superseded by
/// the next re-rank.
pub fn provisional_queue_number(today: &[Customer], tier: PriorityTier) -> u32 {
    let candidate = today
        .iter()
        .filter(|c| c.priority.rank() <= tier.rank())
        .filter_map(|c| c.queue_number)
        .max()
        .unwrap_or(0)
        + 1;

    if today.iter().any(|c| c.queue_number == Some(candidate)) {
        today.iter().filter_map(|c| c.queue_number).max().unwrap_or(0) + 1
    } else {
        candidate
    }
}
