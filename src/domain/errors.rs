use thiserror::Error;
use uuid::Uuid;

use super::submission::SubmissionError;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found")]
    NotFound,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of an outbox message handler.
///
/// Every variant is recorded on the item and counted against its retry
/// budget. [`ProcessingError::is_permanent`] tells the processor which ones
/// can never succeed on a later attempt.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("orders not found: {0}")]
    OrdersNotFound(String),
    #[error("reseller not found: {0}")]
    ResellerNotFound(Uuid),
    #[error("total quantity {total} is below the minimum of {threshold} units")]
    BelowThreshold { total: i64, threshold: i64 },
    #[error("unsupported message type: {0}")]
    UnsupportedType(String),
    #[error("malformed payload for {message_type}: {reason}")]
    MalformedPayload {
        message_type: String,
        reason: String,
    },
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Storage(#[from] DomainError),
}

impl ProcessingError {
    /// Business precondition failures and undecodable payloads.
    ///
    /// Unknown message types stay retryable: a newer deployment sharing the
    /// same store may know how to handle them.
    pub fn is_permanent(&self) -> bool {
        match self {
            ProcessingError::OrdersNotFound(_)
            | ProcessingError::ResellerNotFound(_)
            | ProcessingError::BelowThreshold { .. }
            | ProcessingError::MalformedPayload { .. } => true,
            ProcessingError::Submission(e) => !e.is_transient(),
            ProcessingError::UnsupportedType(_) | ProcessingError::Storage(_) => false,
        }
    }
}
