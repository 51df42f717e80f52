//! In-memory implementations of the ports, used by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{CustomerOrder, NewCustomerOrder, OrderItem, OrderStatus, Reseller};
use crate::domain::outbox::{OutboxItem, OutboxStatus};
use crate::domain::ports::{OrderRepository, OutboxStore, ResellerRepository, SubmissionClient};
use crate::domain::submission::{SubmissionError, SubmissionReceipt, SubmissionRequest};

pub fn item(sku: &str, name: &str, quantity: i32, unit_price: i32) -> OrderItem {
    OrderItem {
        sku: sku.to_string(),
        name: name.to_string(),
        quantity,
        unit_price: BigDecimal::from(unit_price),
    }
}

pub fn order_with_items(reseller_id: Uuid, items: Vec<OrderItem>) -> CustomerOrder {
    CustomerOrder {
        id: Uuid::new_v4(),
        reseller_id,
        customer_identification: "customer".to_string(),
        status: OrderStatus::Pending,
        external_order_number: None,
        created_at: Utc::now(),
        items,
    }
}

pub fn order_with_quantity(reseller_id: Uuid, quantity: i32) -> CustomerOrder {
    order_with_items(reseller_id, vec![item("SKU-1", "Pilsen 350ml", quantity, 3)])
}

pub fn reseller(id: Uuid) -> Reseller {
    Reseller {
        id,
        document_number: "12345678000195".to_string(),
        legal_name: "Distribuidora Exemplo".to_string(),
        email: "contato@exemplo.com".to_string(),
    }
}

#[derive(Default)]
pub struct InMemoryOrders {
    orders: Mutex<Vec<CustomerOrder>>,
    /// When set, `update` fails once this many updates have succeeded.
    fail_updates_after: Mutex<Option<usize>>,
}

impl InMemoryOrders {
    pub fn insert(&self, order: CustomerOrder) -> Uuid {
        let id = order.id;
        self.orders.lock().unwrap().push(order);
        id
    }

    pub fn get(&self, id: Uuid) -> CustomerOrder {
        self.orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .expect("order exists")
    }

    pub fn fail_updates_after(&self, successes: usize) {
        *self.fail_updates_after.lock().unwrap() = Some(successes);
    }
}

impl OrderRepository for InMemoryOrders {
    fn create(&self, order: NewCustomerOrder) -> Result<CustomerOrder, DomainError> {
        let created = CustomerOrder {
            id: Uuid::new_v4(),
            reseller_id: order.reseller_id,
            customer_identification: order.customer_identification,
            status: OrderStatus::Pending,
            external_order_number: None,
            created_at: Utc::now(),
            items: order.items,
        };
        self.orders.lock().unwrap().push(created.clone());
        Ok(created)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<CustomerOrder>, DomainError> {
        Ok(self.orders.lock().unwrap().iter().find(|o| o.id == id).cloned())
    }

    fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<CustomerOrder>, DomainError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| ids.contains(&o.id))
            .cloned()
            .collect())
    }

    fn get_pending_by_reseller(&self, reseller_id: Uuid) -> Result<Vec<CustomerOrder>, DomainError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.reseller_id == reseller_id && o.status.is_awaiting_submission())
            .cloned()
            .collect())
    }

    fn get_pending(&self) -> Result<Vec<CustomerOrder>, DomainError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.status.is_awaiting_submission())
            .cloned()
            .collect())
    }

    fn total_pending_quantity(&self, reseller_id: Uuid) -> Result<i64, DomainError> {
        Ok(self
            .get_pending_by_reseller(reseller_id)?
            .iter()
            .map(CustomerOrder::total_quantity)
            .sum())
    }

    fn update(&self, order: &CustomerOrder) -> Result<CustomerOrder, DomainError> {
        {
            let mut budget = self.fail_updates_after.lock().unwrap();
            if let Some(remaining) = budget.as_mut() {
                if *remaining == 0 {
                    return Err(DomainError::Internal("connection lost".to_string()));
                }
                *remaining -= 1;
            }
        }
        let mut orders = self.orders.lock().unwrap();
        let stored = orders
            .iter_mut()
            .find(|o| o.id == order.id)
            .ok_or(DomainError::NotFound)?;
        stored.status = order.status;
        stored.external_order_number = order.external_order_number.clone();
        Ok(stored.clone())
    }
}

#[derive(Default)]
pub struct InMemoryResellers {
    resellers: Mutex<HashMap<Uuid, Reseller>>,
}

impl InMemoryResellers {
    pub fn insert(&self, reseller: Reseller) {
        self.resellers.lock().unwrap().insert(reseller.id, reseller);
    }
}

impl ResellerRepository for InMemoryResellers {
    fn get_by_id(&self, id: Uuid) -> Result<Option<Reseller>, DomainError> {
        Ok(self.resellers.lock().unwrap().get(&id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryOutbox {
    items: Mutex<Vec<OutboxItem>>,
    fail_fetches: Mutex<bool>,
    fail_updates: Mutex<bool>,
    fetches: Mutex<usize>,
}

impl InMemoryOutbox {
    /// Stores `item` exactly as given.
    pub fn put(&self, item: OutboxItem) {
        self.items.lock().unwrap().push(item);
    }

    pub fn all(&self) -> Vec<OutboxItem> {
        self.items.lock().unwrap().clone()
    }

    pub fn get(&self, id: Uuid) -> OutboxItem {
        self.items
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .expect("outbox item exists")
    }

    /// Makes every later pending fetch return an error.
    pub fn fail_fetches(&self) {
        *self.fail_fetches.lock().unwrap() = true;
    }

    /// Makes every later `update` return an error. Claims still succeed.
    pub fn fail_updates(&self) {
        *self.fail_updates.lock().unwrap() = true;
    }

    /// Number of pending fetches so far, failed ones included.
    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

impl OutboxStore for InMemoryOutbox {
    fn enqueue(&self, mut item: OutboxItem) -> Result<OutboxItem, DomainError> {
        item.status = OutboxStatus::Pending;
        item.created_at = Utc::now();
        self.items.lock().unwrap().push(item.clone());
        Ok(item)
    }

    fn fetch_pending_batch(&self, limit: i64) -> Result<Vec<OutboxItem>, DomainError> {
        *self.fetches.lock().unwrap() += 1;
        if *self.fail_fetches.lock().unwrap() {
            return Err(DomainError::Internal("connection refused".to_string()));
        }
        let mut pending: Vec<OutboxItem> = self
            .all()
            .into_iter()
            .filter(|i| i.status == OutboxStatus::Pending)
            .collect();
        pending.sort_by_key(|i| i.created_at);
        pending.truncate(limit.max(0) as usize);
        Ok(pending)
    }

    fn fetch_due_retry_batch(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OutboxItem>, DomainError> {
        let mut due: Vec<OutboxItem> = self
            .all()
            .into_iter()
            .filter(|i| i.is_due_for_retry(now))
            .collect();
        due.sort_by_key(|i| i.next_retry_at);
        due.truncate(limit.max(0) as usize);
        Ok(due)
    }

    fn claim(
        &self,
        id: Uuid,
        instance_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<OutboxItem>, DomainError> {
        let mut items = self.items.lock().unwrap();
        let Some(item) = items.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };
        if item.status != OutboxStatus::Pending && !item.is_due_for_retry(now) {
            return Ok(None);
        }
        item.status = OutboxStatus::Processing;
        item.claimed_by = Some(instance_id.to_string());
        item.claimed_at = Some(now);
        Ok(Some(item.clone()))
    }

    fn update(&self, item: &OutboxItem) -> Result<(), DomainError> {
        if *self.fail_updates.lock().unwrap() {
            return Err(DomainError::Internal("connection lost".to_string()));
        }
        let mut items = self.items.lock().unwrap();
        let stored = items
            .iter_mut()
            .find(|i| i.id == item.id)
            .ok_or(DomainError::NotFound)?;
        *stored = item.clone();
        Ok(())
    }

    fn count_pending(&self, now: DateTime<Utc>) -> Result<i64, DomainError> {
        Ok(self
            .all()
            .iter()
            .filter(|i| {
                i.status == OutboxStatus::Pending
                    || (i.status == OutboxStatus::Retry && i.next_retry_at.is_some_and(|at| at <= now))
            })
            .count() as i64)
    }

    fn find_by_correlation_id(&self, correlation_id: &str) -> Result<Vec<OutboxItem>, DomainError> {
        let mut found: Vec<OutboxItem> = self
            .all()
            .into_iter()
            .filter(|i| i.correlation_id == correlation_id)
            .collect();
        found.sort_by_key(|i| i.created_at);
        Ok(found)
    }

    fn purge_completed_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        let mut items = self.items.lock().unwrap();
        let before = items.len();
        items.retain(|i| {
            !(i.status == OutboxStatus::Completed && i.processed_at.is_some_and(|at| at < cutoff))
        });
        Ok(before - items.len())
    }
}

/// Submission client that fails a fixed number of times, then succeeds.
pub struct FakeSubmissionClient {
    reference_number: String,
    failures_left: Mutex<u32>,
    requests: Mutex<Vec<SubmissionRequest>>,
}

impl FakeSubmissionClient {
    pub fn succeeding(reference_number: &str) -> Self {
        Self::failing_times(0, reference_number)
    }

    pub fn always_failing() -> Self {
        Self::failing_times(u32::MAX, "never")
    }

    pub fn failing_times(failures: u32, reference_number: &str) -> Self {
        Self {
            reference_number: reference_number.to_string(),
            failures_left: Mutex::new(failures),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<SubmissionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl SubmissionClient for FakeSubmissionClient {
    fn submit(&self, request: &SubmissionRequest) -> Result<SubmissionReceipt, SubmissionError> {
        self.requests.lock().unwrap().push(request.clone());
        let mut failures_left = self.failures_left.lock().unwrap();
        if *failures_left > 0 {
            *failures_left -= 1;
            return Err(SubmissionError::Unavailable("connection refused".to_string()));
        }
        Ok(SubmissionReceipt {
            reference_number: self.reference_number.clone(),
            items: request.items.clone(),
            submitted_at: Utc::now(),
        })
    }
}
