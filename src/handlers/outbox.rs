use actix_web::{web, HttpResponse};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::outbox_service::BatchReport;
use crate::domain::outbox::OutboxItem;
use crate::errors::AppError;

use super::{AppState, ResponseMeta};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingCountResponse {
    #[serde(flatten)]
    pub meta: ResponseMeta,
    pub pending_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutboxMessageBody {
    pub id: Uuid,
    pub message_type: String,
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    pub status: String,
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

impl From<OutboxItem> for OutboxMessageBody {
    fn from(item: OutboxItem) -> Self {
        Self {
            id: item.id,
            message_type: item.message_type,
            payload: item.payload,
            status: item.status.as_str().to_string(),
            retry_count: item.retry_count,
            max_retries: item.max_retries,
            created_at: item.created_at,
            processed_at: item.processed_at,
            next_retry_at: item.next_retry_at,
            error_message: item.error_message,
            correlation_id: item.correlation_id,
            claimed_by: item.claimed_by,
            claimed_at: item.claimed_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutboxMessagesResponse {
    #[serde(flatten)]
    pub meta: ResponseMeta,
    pub correlation_id: String,
    pub messages: Vec<OutboxMessageBody>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessBatchResponse {
    #[serde(flatten)]
    pub meta: ResponseMeta,
    pub fetched: usize,
    pub completed: usize,
    pub retried: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errored: usize,
}

impl From<BatchReport> for ProcessBatchResponse {
    fn from(report: BatchReport) -> Self {
        Self {
            meta: ResponseMeta::new(),
            fetched: report.fetched,
            completed: report.completed,
            retried: report.retried,
            failed: report.failed,
            skipped: report.skipped,
            errored: report.errored,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PurgeParams {
    /// Age in hours a completed item must exceed. Defaults to 24.
    #[serde(default = "default_older_than_hours")]
    pub older_than_hours: i64,
}

fn default_older_than_hours() -> i64 {
    24
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurgeResponse {
    #[serde(flatten)]
    pub meta: ResponseMeta,
    pub deleted: usize,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /outbox/pending-count
///
/// Pending items plus retry items that are already due.
#[utoipa::path(
    get,
    path = "/outbox/pending-count",
    responses(
        (status = 200, description = "Number of items awaiting processing", body = PendingCountResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "outbox"
)]
pub async fn pending_count(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let service = state.outbox.clone();

    let pending_count = web::block(move || service.pending_count()).await??;

    Ok(HttpResponse::Ok().json(PendingCountResponse {
        meta: ResponseMeta::new(),
        pending_count,
    }))
}

/// GET /outbox/messages/{correlationId}
#[utoipa::path(
    get,
    path = "/outbox/messages/{correlationId}",
    params(
        ("correlationId" = String, Path, description = "Correlation id returned on enqueue"),
    ),
    responses(
        (status = 200, description = "Items sharing the correlation id, oldest first", body = OutboxMessagesResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "outbox"
)]
pub async fn messages_by_correlation_id(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let correlation_id = path.into_inner();
    let service = state.outbox.clone();
    let lookup = correlation_id.clone();

    let items = web::block(move || service.messages_by_correlation_id(&lookup)).await??;

    Ok(HttpResponse::Ok().json(OutboxMessagesResponse {
        meta: ResponseMeta::new(),
        correlation_id,
        messages: items.into_iter().map(OutboxMessageBody::from).collect(),
    }))
}

/// POST /outbox/process-pending
///
/// Processes one batch of pending items before responding.
#[utoipa::path(
    post,
    path = "/outbox/process-pending",
    responses(
        (status = 200, description = "Batch processed", body = ProcessBatchResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "outbox"
)]
pub async fn process_pending(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let service = state.outbox.clone();

    let report = web::block(move || service.process_pending_batch()).await??;

    Ok(HttpResponse::Ok().json(ProcessBatchResponse::from(report)))
}

/// POST /outbox/process-retry
///
/// Processes one batch of due retry items before responding.
#[utoipa::path(
    post,
    path = "/outbox/process-retry",
    responses(
        (status = 200, description = "Batch processed", body = ProcessBatchResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "outbox"
)]
pub async fn process_retry(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let service = state.outbox.clone();

    let report = web::block(move || service.process_due_retry_batch()).await??;

    Ok(HttpResponse::Ok().json(ProcessBatchResponse::from(report)))
}

/// DELETE /outbox/completed
#[utoipa::path(
    delete,
    path = "/outbox/completed",
    params(PurgeParams),
    responses(
        (status = 200, description = "Old completed items deleted", body = PurgeResponse),
        (status = 400, description = "Invalid age"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "outbox"
)]
pub async fn purge_completed(
    state: web::Data<AppState>,
    query: web::Query<PurgeParams>,
) -> Result<HttpResponse, AppError> {
    let hours = query.into_inner().older_than_hours;
    let age = Duration::try_hours(hours)
        .filter(|age| *age >= Duration::zero())
        .ok_or_else(|| AppError::BadRequest(format!("Invalid olderThanHours '{}'", hours)))?;
    let cutoff = Utc::now() - age;
    let service = state.outbox.clone();

    let deleted = web::block(move || service.purge_completed_older_than(cutoff)).await??;

    Ok(HttpResponse::Ok().json(PurgeResponse {
        meta: ResponseMeta::new(),
        deleted,
    }))
}
