use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::errors::{DomainError, ProcessingError};

pub const BULK_ORDER_SUBMISSION: &str = "BulkOrderSubmission";
pub const DEFAULT_MAX_RETRIES: i32 = 3;

const MAX_BACKOFF_MINUTES: i64 = 16;

/// Retry delay after the `retry_count`-th failure: `min(2^n, 16)` minutes.
pub fn backoff_minutes(retry_count: i32) -> i64 {
    if retry_count <= 0 {
        return 1;
    }
    if retry_count >= 4 {
        return MAX_BACKOFF_MINUTES;
    }
    (1_i64 << retry_count).min(MAX_BACKOFF_MINUTES)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutboxStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Retry,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "PENDING",
            OutboxStatus::Processing => "PROCESSING",
            OutboxStatus::Completed => "COMPLETED",
            OutboxStatus::Failed => "FAILED",
            OutboxStatus::Retry => "RETRY",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OutboxStatus::Completed | OutboxStatus::Failed)
    }
}

impl fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutboxStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OutboxStatus::Pending),
            "PROCESSING" => Ok(OutboxStatus::Processing),
            "COMPLETED" => Ok(OutboxStatus::Completed),
            "FAILED" => Ok(OutboxStatus::Failed),
            "RETRY" => Ok(OutboxStatus::Retry),
            other => Err(DomainError::Internal(format!("unknown outbox status '{other}'"))),
        }
    }
}

/// Payload of a [`BULK_ORDER_SUBMISSION`] item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOrderSubmission {
    pub reseller_id: Uuid,
    pub order_ids: Vec<Uuid>,
    pub enqueued_at: DateTime<Utc>,
}

/// Decoded outbox payload, one variant per message type.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboxMessage {
    BulkOrderSubmission(BulkOrderSubmission),
}

impl OutboxMessage {
    pub fn message_type(&self) -> &'static str {
        match self {
            OutboxMessage::BulkOrderSubmission(_) => BULK_ORDER_SUBMISSION,
        }
    }

    pub fn to_payload(&self) -> Result<Value, DomainError> {
        let encoded = match self {
            OutboxMessage::BulkOrderSubmission(p) => serde_json::to_value(p),
        };
        encoded.map_err(|e| DomainError::Internal(format!("failed to encode payload: {e}")))
    }
}

type Decoder = fn(&Value) -> Result<OutboxMessage, serde_json::Error>;

/// Maps a stored `message_type` to the decoder for its payload.
pub struct PayloadRegistry {
    decoders: HashMap<&'static str, Decoder>,
}

impl PayloadRegistry {
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    pub fn register(&mut self, message_type: &'static str, decoder: Decoder) {
        self.decoders.insert(message_type, decoder);
    }

    pub fn decode(&self, item: &OutboxItem) -> Result<OutboxMessage, ProcessingError> {
        let decoder = self
            .decoders
            .get(item.message_type.as_str())
            .ok_or_else(|| ProcessingError::UnsupportedType(item.message_type.clone()))?;
        decoder(&item.payload).map_err(|e| ProcessingError::MalformedPayload {
            message_type: item.message_type.clone(),
            reason: e.to_string(),
        })
    }
}

impl Default for PayloadRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(BULK_ORDER_SUBMISSION, |v| {
            BulkOrderSubmission::deserialize(v).map(OutboxMessage::BulkOrderSubmission)
        });
        registry
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboxItem {
    pub id: Uuid,
    pub message_type: String,
    pub payload: Value,
    pub status: OutboxStatus,
    pub retry_count: i32,
    pub max_retries: i32,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub correlation_id: String,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
}

impl OutboxItem {
    /// A fresh Pending item; the store stamps `created_at` again on enqueue.
    pub fn new(
        message: &OutboxMessage,
        correlation_id: impl Into<String>,
        max_retries: i32,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            id: Uuid::new_v4(),
            message_type: message.message_type().to_string(),
            payload: message.to_payload()?,
            status: OutboxStatus::Pending,
            retry_count: 0,
            max_retries,
            created_at: Utc::now(),
            processed_at: None,
            next_retry_at: None,
            error_message: None,
            correlation_id: correlation_id.into(),
            claimed_by: None,
            claimed_at: None,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn mark_completed(&mut self, now: DateTime<Utc>) {
        self.status = OutboxStatus::Completed;
        self.processed_at = Some(now);
        self.next_retry_at = None;
        self.error_message = None;
    }

    /// Count one failed attempt. `give_up` forces the terminal state even
    /// when retries remain.
    pub fn record_failure(&mut self, now: DateTime<Utc>, error: &str, give_up: bool) {
        self.retry_count += 1;
        self.error_message = Some(error.to_string());

        if give_up || self.retry_count >= self.max_retries {
            self.status = OutboxStatus::Failed;
            self.next_retry_at = None;
        } else {
            self.status = OutboxStatus::Retry;
            self.next_retry_at = Some(now + Duration::minutes(backoff_minutes(self.retry_count)));
        }
    }

    /// `Retry` item whose delay has elapsed and that still has budget.
    pub fn is_due_for_retry(&self, now: DateTime<Utc>) -> bool {
        self.status == OutboxStatus::Retry
            && self.next_retry_at.is_some_and(|at| at <= now)
            && self.retry_count < self.max_retries
    }
}
