use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::order_service::OrderService;
use crate::application::outbox_service::OutboxService;

pub mod orders;
pub mod outbox;

/// Services shared by every worker of the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderService>,
    pub outbox: Arc<OutboxService>,
}

/// Identifies one response. Embedded in every response body.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub response_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl ResponseMeta {
    pub fn new() -> Self {
        Self {
            response_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }
}

impl Default for ResponseMeta {
    fn default() -> Self {
        Self::new()
    }
}
