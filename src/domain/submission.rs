use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One consolidated line of an upstream submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionItem {
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    /// Document number of the reseller the batch is submitted for.
    pub reseller_identifier: String,
    pub items: Vec<SubmissionItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub reference_number: String,
    pub items: Vec<SubmissionItem>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream rejected the submission with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),
}

impl SubmissionError {
    /// Network and timeout conditions worth retrying inside the resilience policy.
    pub fn is_transient(&self) -> bool {
        matches!(self, SubmissionError::Unavailable(_) | SubmissionError::Timeout)
    }
}
