use std::sync::Arc;

use chrono::Utc;

use crate::domain::errors::{DomainError, ProcessingError};
use crate::domain::outbox::{OutboxItem, OutboxMessage, OutboxStatus, PayloadRegistry};
use crate::domain::ports::OutboxStore;

use super::bulk_submission::BulkSubmissionHandler;

/// What happened to one item handed to the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Completed,
    Retry,
    Failed,
    /// Another worker claimed the item first, or it is no longer claimable.
    /// A retry item whose backoff has not elapsed is not claimable.
    Skipped,
}

pub struct MessageProcessor {
    outbox: Arc<dyn OutboxStore>,
    registry: PayloadRegistry,
    bulk_submission: BulkSubmissionHandler,
    instance_id: String,
    fail_fast_permanent: bool,
}

impl MessageProcessor {
    pub fn new(
        outbox: Arc<dyn OutboxStore>,
        registry: PayloadRegistry,
        bulk_submission: BulkSubmissionHandler,
        instance_id: impl Into<String>,
        fail_fast_permanent: bool,
    ) -> Self {
        Self {
            outbox,
            registry,
            bulk_submission,
            instance_id: instance_id.into(),
            fail_fast_permanent,
        }
    }

    /// Runs one item through Processing to Completed, Retry or Failed.
    ///
    /// Handler failures are recorded on the item and never returned; an
    /// error here means the store itself could not be read or written.
    pub fn process(&self, item: &OutboxItem) -> Result<ProcessOutcome, DomainError> {
        let Some(mut claimed) = self.outbox.claim(item.id, &self.instance_id, Utc::now())? else {
            log::debug!("Outbox item {} is not claimable, skipping", item.id);
            return Ok(ProcessOutcome::Skipped);
        };

        log::info!(
            "Processing outbox item {} ({}, attempt {})",
            claimed.id,
            claimed.message_type,
            claimed.retry_count + 1
        );

        match self.execute(&claimed) {
            Ok(()) => {
                claimed.mark_completed(Utc::now());
                log::info!("Outbox item {} completed", claimed.id);
            }
            Err(e) => {
                let give_up = self.fail_fast_permanent && e.is_permanent();
                claimed.record_failure(Utc::now(), &e.to_string(), give_up);
                match claimed.status {
                    OutboxStatus::Failed => log::error!(
                        "Outbox item {} failed permanently after {} attempt(s): {}",
                        claimed.id,
                        claimed.retry_count,
                        e
                    ),
                    _ => log::warn!(
                        "Outbox item {} failed (attempt {}), retrying at {:?}: {}",
                        claimed.id,
                        claimed.retry_count,
                        claimed.next_retry_at,
                        e
                    ),
                }
            }
        }

        self.outbox.update(&claimed)?;

        Ok(match claimed.status {
            OutboxStatus::Completed => ProcessOutcome::Completed,
            OutboxStatus::Failed => ProcessOutcome::Failed,
            _ => ProcessOutcome::Retry,
        })
    }

    fn execute(&self, item: &OutboxItem) -> Result<(), ProcessingError> {
        match self.registry.decode(item)? {
            OutboxMessage::BulkOrderSubmission(payload) => {
                self.bulk_submission.handle(&payload).map(|_| ())
            }
        }
    }
}
