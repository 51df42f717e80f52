use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::outbox::{BulkOrderSubmission, OutboxItem, OutboxMessage};
use crate::domain::ports::{OrderRepository, OutboxStore};

pub const DEFAULT_CONSOLIDATION_THRESHOLD: i64 = 1000;

/// Enqueues a bulk submission once a reseller's pending quantity reaches the
/// threshold.
///
/// Nothing is locked and no order changes status here: two orders created
/// concurrently for the same reseller can both pass the check and enqueue
/// overlapping batches.
pub struct ConsolidationTrigger {
    orders: Arc<dyn OrderRepository>,
    outbox: Arc<dyn OutboxStore>,
    threshold: i64,
    max_retries: i32,
}

impl ConsolidationTrigger {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        outbox: Arc<dyn OutboxStore>,
        threshold: i64,
        max_retries: i32,
    ) -> Self {
        Self {
            orders,
            outbox,
            threshold,
            max_retries,
        }
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// Returns the correlation id of the enqueued item, if one was enqueued.
    pub fn try_consolidate(&self, reseller_id: Uuid) -> Result<Option<String>, DomainError> {
        let total = self.orders.total_pending_quantity(reseller_id)?;
        if total < self.threshold {
            log::info!(
                "Reseller {} has {} pending units, below the {} unit threshold",
                reseller_id,
                total,
                self.threshold
            );
            return Ok(None);
        }

        let order_ids: Vec<Uuid> = self
            .orders
            .get_pending_by_reseller(reseller_id)?
            .into_iter()
            .map(|o| o.id)
            .collect();
        if order_ids.is_empty() {
            return Ok(None);
        }

        let correlation_id = Uuid::new_v4().to_string();
        let message = OutboxMessage::BulkOrderSubmission(BulkOrderSubmission {
            reseller_id,
            order_ids,
            enqueued_at: Utc::now(),
        });
        let item = self
            .outbox
            .enqueue(OutboxItem::new(&message, correlation_id.clone(), self.max_retries)?)?;

        log::info!(
            "Enqueued bulk submission {} for reseller {} ({} units, correlation {})",
            item.id,
            reseller_id,
            total,
            correlation_id
        );

        Ok(Some(correlation_id))
    }
}
