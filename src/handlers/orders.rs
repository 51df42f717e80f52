use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::order::{CustomerOrder, NewCustomerOrder, OrderItem};
use crate::errors::AppError;

use super::{AppState, ResponseMeta};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderItemRequest {
    pub sku: String,
    pub name: String,
    pub quantity: i32,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub unit_price: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub reseller_id: Uuid,
    pub customer_identification: String,
    pub items: Vec<CreateOrderItemRequest>,
}

impl CreateOrderRequest {
    fn into_domain(self) -> Result<NewCustomerOrder, AppError> {
        let items = self
            .items
            .into_iter()
            .map(|i| {
                let unit_price = BigDecimal::from_str(&i.unit_price).map_err(|e| {
                    AppError::BadRequest(format!("Invalid unitPrice '{}': {}", i.unit_price, e))
                })?;
                Ok(OrderItem {
                    sku: i.sku,
                    name: i.name,
                    quantity: i.quantity,
                    unit_price,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(NewCustomerOrder {
            reseller_id: self.reseller_id,
            customer_identification: self.customer_identification,
            items,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    #[serde(flatten)]
    pub meta: ResponseMeta,
    pub order_id: Uuid,
    /// Set when this order pushed the reseller over the consolidation threshold.
    pub correlation_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub sku: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderBody {
    pub id: Uuid,
    pub reseller_id: Uuid,
    pub customer_identification: String,
    pub status: String,
    pub external_order_number: Option<String>,
    pub created_at: String,
    pub items: Vec<OrderItemResponse>,
}

impl From<CustomerOrder> for OrderBody {
    fn from(order: CustomerOrder) -> Self {
        Self {
            id: order.id,
            reseller_id: order.reseller_id,
            customer_identification: order.customer_identification,
            status: order.status.as_str().to_string(),
            external_order_number: order.external_order_number,
            created_at: order.created_at.to_rfc3339(),
            items: order
                .items
                .into_iter()
                .map(|i| OrderItemResponse {
                    sku: i.sku,
                    name: i.name,
                    quantity: i.quantity,
                    unit_price: i.unit_price.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(flatten)]
    pub meta: ResponseMeta,
    pub order: OrderBody,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPendingOrdersResponse {
    #[serde(flatten)]
    pub meta: ResponseMeta,
    pub processed_orders: usize,
    pub sent_orders: usize,
    pub failed_orders: usize,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Stores the order, then checks whether the reseller's awaiting orders reach
/// the consolidation threshold. When they do, a bulk submission is enqueued
/// and its correlation id is returned.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created successfully", body = CreateOrderResponse),
        (status = 400, description = "Invalid order"),
        (status = 404, description = "Reseller not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    state: web::Data<AppState>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let new_order = body.into_inner().into_domain()?;
    let service = state.orders.clone();

    let (order, correlation_id) =
        web::block(move || service.create_order(new_order)).await??;

    Ok(HttpResponse::Created().json(CreateOrderResponse {
        meta: ResponseMeta::new(),
        order_id: order.id,
        correlation_id,
    }))
}

/// GET /orders/{id}
///
/// Returns the order together with its items.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let service = state.orders.clone();

    let order = web::block(move || service.get_order(order_id))
        .await??
        .ok_or(AppError::NotFound)?;

    Ok(HttpResponse::Ok().json(OrderResponse {
        meta: ResponseMeta::new(),
        order: order.into(),
    }))
}

/// POST /orders/process-pending
///
/// Submits every reseller's awaiting orders directly, without the outbox.
#[utoipa::path(
    post,
    path = "/orders/process-pending",
    responses(
        (status = 200, description = "Direct submission finished", body = ProcessPendingOrdersResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn process_pending_orders(
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let service = state.orders.clone();

    let report = web::block(move || service.process_pending_orders()).await??;

    Ok(HttpResponse::Ok().json(ProcessPendingOrdersResponse {
        meta: ResponseMeta::new(),
        processed_orders: report.processed_orders,
        sent_orders: report.sent_orders,
        failed_orders: report.failed_orders,
    }))
}
