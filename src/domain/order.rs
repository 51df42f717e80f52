use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    SentToAmbev,
    Confirmed,
    Failed,
    Retry,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::SentToAmbev => "SENT_TO_AMBEV",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Failed => "FAILED",
            OrderStatus::Retry => "RETRY",
        }
    }

    /// Orders still waiting for consolidation.
    pub fn is_awaiting_submission(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Retry)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "SENT_TO_AMBEV" => Ok(OrderStatus::SentToAmbev),
            "CONFIRMED" => Ok(OrderStatus::Confirmed),
            "FAILED" => Ok(OrderStatus::Failed),
            "RETRY" => Ok(OrderStatus::Retry),
            other => Err(DomainError::Internal(format!("unknown order status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub sku: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerOrder {
    pub id: Uuid,
    pub reseller_id: Uuid,
    pub customer_identification: String,
    pub status: OrderStatus,
    pub external_order_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl CustomerOrder {
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i64::from(i.quantity)).sum()
    }

    pub fn mark_sent(&mut self, reference_number: &str) {
        self.status = OrderStatus::SentToAmbev;
        self.external_order_number = Some(reference_number.to_string());
    }
}

#[derive(Debug, Clone)]
pub struct NewCustomerOrder {
    pub reseller_id: Uuid,
    pub customer_identification: String,
    pub items: Vec<OrderItem>,
}

impl NewCustomerOrder {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.customer_identification.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "customer identification is required".to_string(),
            ));
        }
        if self.items.is_empty() {
            return Err(DomainError::InvalidInput(
                "an order needs at least one item".to_string(),
            ));
        }
        for item in &self.items {
            if item.quantity <= 0 {
                return Err(DomainError::InvalidInput(format!(
                    "quantity for sku '{}' must be positive",
                    item.sku
                )));
            }
            if item.unit_price < BigDecimal::from(0) {
                return Err(DomainError::InvalidInput(format!(
                    "unit price for sku '{}' must not be negative",
                    item.sku
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reseller {
    pub id: Uuid,
    pub document_number: String,
    pub legal_name: String,
    pub email: String,
}

/// Sum of item quantities across `orders`.
pub fn total_quantity(orders: &[CustomerOrder]) -> i64 {
    orders.iter().map(CustomerOrder::total_quantity).sum()
}
