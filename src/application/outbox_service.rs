use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::outbox::OutboxItem;
use crate::domain::ports::OutboxStore;

use super::consolidation::ConsolidationTrigger;
use super::processor::{MessageProcessor, ProcessOutcome};

pub const DEFAULT_BATCH_SIZE: i64 = 10;

/// Tally of one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub fetched: usize,
    pub completed: usize,
    pub retried: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Items whose status could not be persisted.
    pub errored: usize,
}

impl BatchReport {
    fn record(&mut self, outcome: ProcessOutcome) {
        match outcome {
            ProcessOutcome::Completed => self.completed += 1,
            ProcessOutcome::Retry => self.retried += 1,
            ProcessOutcome::Failed => self.failed += 1,
            ProcessOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn merge(self, other: BatchReport) -> BatchReport {
        BatchReport {
            fetched: self.fetched + other.fetched,
            completed: self.completed + other.completed,
            retried: self.retried + other.retried,
            failed: self.failed + other.failed,
            skipped: self.skipped + other.skipped,
            errored: self.errored + other.errored,
        }
    }
}

/// Entry point of the dispatch core for the HTTP layer and the dispatcher.
///
/// Every method blocks until its work is done.
pub struct OutboxService {
    store: Arc<dyn OutboxStore>,
    trigger: ConsolidationTrigger,
    processor: MessageProcessor,
    batch_size: i64,
}

impl OutboxService {
    pub fn new(
        store: Arc<dyn OutboxStore>,
        trigger: ConsolidationTrigger,
        processor: MessageProcessor,
        batch_size: i64,
    ) -> Self {
        Self {
            store,
            trigger,
            processor,
            batch_size,
        }
    }

    pub fn enqueue_if_threshold_met(&self, reseller_id: Uuid) -> Result<Option<String>, DomainError> {
        self.trigger.try_consolidate(reseller_id)
    }

    pub fn process_pending_batch(&self) -> Result<BatchReport, DomainError> {
        let items = self.store.fetch_pending_batch(self.batch_size)?;
        Ok(self.process_items(&items))
    }

    pub fn process_due_retry_batch(&self) -> Result<BatchReport, DomainError> {
        let items = self.store.fetch_due_retry_batch(Utc::now(), self.batch_size)?;
        Ok(self.process_items(&items))
    }

    /// One dispatcher cycle: pending items first, then due retries.
    pub fn run_cycle(&self) -> Result<BatchReport, DomainError> {
        let pending = self.process_pending_batch()?;
        let retries = self.process_due_retry_batch()?;
        Ok(pending.merge(retries))
    }

    pub fn pending_count(&self) -> Result<i64, DomainError> {
        self.store.count_pending(Utc::now())
    }

    pub fn messages_by_correlation_id(
        &self,
        correlation_id: &str,
    ) -> Result<Vec<OutboxItem>, DomainError> {
        self.store.find_by_correlation_id(correlation_id)
    }

    pub fn purge_completed_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        let purged = self.store.purge_completed_older_than(cutoff)?;
        if purged > 0 {
            log::info!("Purged {} completed outbox items older than {}", purged, cutoff);
        }
        Ok(purged)
    }

    fn process_items(&self, items: &[OutboxItem]) -> BatchReport {
        let mut report = BatchReport {
            fetched: items.len(),
            ..BatchReport::default()
        };
        for item in items {
            match self.processor.process(item) {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    report.errored += 1;
                    log::error!("Could not persist outcome of outbox item {}: {}", item.id, e);
                }
            }
        }
        report
    }
}
