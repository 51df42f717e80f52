use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{CustomerOrder, OrderItem, Reseller};
use crate::domain::outbox::OutboxItem;
use crate::schema::{order_items, orders, outbox_messages, resellers};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = resellers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ResellerRow {
    pub id: Uuid,
    pub document_number: String,
    pub legal_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = resellers)]
pub struct NewResellerRow {
    pub id: Uuid,
    pub document_number: String,
    pub legal_name: String,
    pub email: String,
}

impl From<ResellerRow> for Reseller {
    fn from(row: ResellerRow) -> Self {
        Reseller {
            id: row.id,
            document_number: row.document_number,
            legal_name: row.legal_name,
            email: row.email,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub reseller_id: Uuid,
    pub customer_identification: String,
    pub status: String,
    pub external_order_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub reseller_id: Uuid,
    pub customer_identification: String,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub sku: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub sku: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

impl OrderRow {
    pub fn into_domain(self, items: Vec<OrderItemRow>) -> Result<CustomerOrder, DomainError> {
        Ok(CustomerOrder {
            id: self.id,
            reseller_id: self.reseller_id,
            customer_identification: self.customer_identification,
            status: self.status.parse()?,
            external_order_number: self.external_order_number,
            created_at: self.created_at,
            items: items
                .into_iter()
                .map(|i| OrderItem {
                    sku: i.sku,
                    name: i.name,
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                })
                .collect(),
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = outbox_messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxRow {
    pub id: Uuid,
    pub message_type: String,
    pub payload: Value,
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

#[derive(Debug, Insertable)]
#[diesel(table_name = outbox_messages)]
pub struct NewOutboxRow {
    pub id: Uuid,
    pub message_type: String,
    pub payload: Value,
    pub status: String,
    pub retry_count: i32,
    pub max_retries: i32,
    pub created_at: DateTime<Utc>,
    pub correlation_id: String,
}

/// Every mutable column; `None` writes NULL.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = outbox_messages)]
#[diesel(treat_none_as_null = true)]
pub struct OutboxChangeset {
    pub status: String,
    pub retry_count: i32,
    pub max_retries: i32,
    pub processed_at: Option<DateTime<Utc>>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
}

impl From<&OutboxItem> for OutboxChangeset {
    fn from(item: &OutboxItem) -> Self {
        OutboxChangeset {
            status: item.status.as_str().to_string(),
            retry_count: item.retry_count,
            max_retries: item.max_retries,
            processed_at: item.processed_at,
            next_retry_at: item.next_retry_at,
            error_message: item.error_message.clone(),
            claimed_by: item.claimed_by.clone(),
            claimed_at: item.claimed_at,
        }
    }
}

impl TryFrom<OutboxRow> for OutboxItem {
    type Error = DomainError;

    fn try_from(row: OutboxRow) -> Result<Self, Self::Error> {
        Ok(OutboxItem {
            id: row.id,
            message_type: row.message_type,
            payload: row.payload,
            status: row.status.parse()?,
            retry_count: row.retry_count,
            max_retries: row.max_retries,
            created_at: row.created_at,
            processed_at: row.processed_at,
            next_retry_at: row.next_retry_at,
            error_message: row.error_message,
            correlation_id: row.correlation_id,
            claimed_by: row.claimed_by,
            claimed_at: row.claimed_at,
        })
    }
}

pub fn into_items(rows: Vec<OutboxRow>) -> Result<Vec<OutboxItem>, DomainError> {
    rows.into_iter().map(OutboxItem::try_from).collect()
}
