use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::order::{CustomerOrder, NewCustomerOrder, Reseller};
use super::outbox::OutboxItem;
use super::submission::{SubmissionError, SubmissionReceipt, SubmissionRequest};

pub trait OrderRepository: Send + Sync + 'static {
    fn create(&self, order: NewCustomerOrder) -> Result<CustomerOrder, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<CustomerOrder>, DomainError>;
    fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<CustomerOrder>, DomainError>;
    /// Pending or Retry orders of one reseller.
    fn get_pending_by_reseller(&self, reseller_id: Uuid) -> Result<Vec<CustomerOrder>, DomainError>;
    /// Pending or Retry orders of every reseller.
    fn get_pending(&self) -> Result<Vec<CustomerOrder>, DomainError>;
    /// Item quantity summed over the reseller's Pending or Retry orders.
    fn total_pending_quantity(&self, reseller_id: Uuid) -> Result<i64, DomainError>;
    /// Persists `status` and `external_order_number`.
    fn update(&self, order: &CustomerOrder) -> Result<CustomerOrder, DomainError>;
}

pub trait ResellerRepository: Send + Sync + 'static {
    fn get_by_id(&self, id: Uuid) -> Result<Option<Reseller>, DomainError>;
}

/// Durable queue of outbox items.
///
/// Every method commits before returning.
pub trait OutboxStore: Send + Sync + 'static {
    /// Stores `item` as Pending with `created_at` set to now.
    fn enqueue(&self, item: OutboxItem) -> Result<OutboxItem, DomainError>;

    /// Pending items, oldest `created_at` first.
    fn fetch_pending_batch(&self, limit: i64) -> Result<Vec<OutboxItem>, DomainError>;

    /// Retry items with `next_retry_at <= now` and budget left, oldest
    /// `next_retry_at` first.
    fn fetch_due_retry_batch(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OutboxItem>, DomainError>;

    /// Atomically moves a Pending or Retry item to Processing on behalf of
    /// `instance_id`. `None` when the item is no longer claimable.
    fn claim(
        &self,
        id: Uuid,
        instance_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<OutboxItem>, DomainError>;

    /// Replaces every mutable field of the stored item.
    fn update(&self, item: &OutboxItem) -> Result<(), DomainError>;

    /// Pending items plus Retry items whose `next_retry_at <= now`.
    fn count_pending(&self, now: DateTime<Utc>) -> Result<i64, DomainError>;

    fn find_by_correlation_id(&self, correlation_id: &str) -> Result<Vec<OutboxItem>, DomainError>;

    /// Deletes Completed items processed before `cutoff`; returns how many.
    fn purge_completed_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError>;
}

/// Upstream ordering API.
pub trait SubmissionClient: Send + Sync + 'static {
    fn submit(&self, request: &SubmissionRequest) -> Result<SubmissionReceipt, SubmissionError>;
}
