use std::collections::BTreeMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{total_quantity, CustomerOrder, NewCustomerOrder, OrderStatus};
use crate::domain::ports::{OrderRepository, ResellerRepository, SubmissionClient};
use crate::domain::submission::SubmissionRequest;

use super::bulk_submission::consolidate_items;
use super::outbox_service::OutboxService;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectSubmissionReport {
    pub processed_orders: usize,
    pub sent_orders: usize,
    pub failed_orders: usize,
}

pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    resellers: Arc<dyn ResellerRepository>,
    client: Arc<dyn SubmissionClient>,
    outbox: Arc<OutboxService>,
    threshold: i64,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        resellers: Arc<dyn ResellerRepository>,
        client: Arc<dyn SubmissionClient>,
        outbox: Arc<OutboxService>,
        threshold: i64,
    ) -> Self {
        Self {
            orders,
            resellers,
            client,
            outbox,
            threshold,
        }
    }

    /// Stores the order, then checks whether the reseller's batch is ready.
    ///
    /// A failed consolidation check is logged and does not undo the order;
    /// the next order for the reseller checks again.
    pub fn create_order(
        &self,
        order: NewCustomerOrder,
    ) -> Result<(CustomerOrder, Option<String>), DomainError> {
        order.validate()?;
        if self.resellers.get_by_id(order.reseller_id)?.is_none() {
            return Err(DomainError::NotFound);
        }

        let created = self.orders.create(order)?;
        log::info!(
            "Created order {} for reseller {} ({} units)",
            created.id,
            created.reseller_id,
            created.total_quantity()
        );

        let correlation_id = match self.outbox.enqueue_if_threshold_met(created.reseller_id) {
            Ok(correlation_id) => correlation_id,
            Err(e) => {
                log::error!(
                    "Consolidation check failed for reseller {}: {}",
                    created.reseller_id,
                    e
                );
                None
            }
        };

        Ok((created, correlation_id))
    }

    pub fn get_order(&self, id: Uuid) -> Result<Option<CustomerOrder>, DomainError> {
        self.orders.find_by_id(id)
    }

    /// Submits every reseller's pending orders synchronously, bypassing the
    /// outbox. Orders of a reseller whose submission fails move to Retry.
    pub fn process_pending_orders(&self) -> Result<DirectSubmissionReport, DomainError> {
        let mut by_reseller: BTreeMap<Uuid, Vec<CustomerOrder>> = BTreeMap::new();
        for order in self.orders.get_pending()? {
            by_reseller.entry(order.reseller_id).or_default().push(order);
        }

        let mut report = DirectSubmissionReport::default();
        for (reseller_id, orders) in by_reseller {
            report.processed_orders += orders.len();

            let total = total_quantity(&orders);
            if total < self.threshold {
                log::info!(
                    "Reseller {} has {} pending units, below the {} unit threshold",
                    reseller_id,
                    total,
                    self.threshold
                );
                continue;
            }

            let Some(reseller) = self.resellers.get_by_id(reseller_id)? else {
                log::warn!("Skipping pending orders of unknown reseller {}", reseller_id);
                continue;
            };

            let request = SubmissionRequest {
                reseller_identifier: reseller.document_number.clone(),
                items: consolidate_items(&orders),
            };

            match self.client.submit(&request) {
                Ok(receipt) => {
                    for mut order in orders {
                        order.mark_sent(&receipt.reference_number);
                        self.orders.update(&order)?;
                        report.sent_orders += 1;
                    }
                    log::info!(
                        "Direct submission for reseller {} accepted as {}",
                        reseller_id,
                        receipt.reference_number
                    );
                }
                Err(e) => {
                    log::error!("Direct submission for reseller {} failed: {}", reseller_id, e);
                    for mut order in orders {
                        order.status = OrderStatus::Retry;
                        self.orders.update(&order)?;
                        report.failed_orders += 1;
                    }
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::bulk_submission::BulkSubmissionHandler;
    use crate::application::consolidation::ConsolidationTrigger;
    use crate::application::processor::MessageProcessor;
    use crate::domain::order::OrderItem;
    use crate::domain::outbox::PayloadRegistry;
    use crate::infrastructure::memory::{
        item, order_with_quantity, reseller, FakeSubmissionClient, InMemoryOrders, InMemoryOutbox,
        InMemoryResellers,
    };

    struct Fixture {
        orders: Arc<InMemoryOrders>,
        resellers: Arc<InMemoryResellers>,
        outbox: Arc<InMemoryOutbox>,
        service: OrderService,
    }

    fn fixture(client: FakeSubmissionClient) -> Fixture {
        let orders = Arc::new(InMemoryOrders::default());
        let resellers = Arc::new(InMemoryResellers::default());
        let outbox = Arc::new(InMemoryOutbox::default());
        let client: Arc<dyn SubmissionClient> = Arc::new(client);
        let trigger = ConsolidationTrigger::new(orders.clone(), outbox.clone(), 1000, 3);
        let handler =
            BulkSubmissionHandler::new(orders.clone(), resellers.clone(), client.clone(), 1000);
        let processor =
            MessageProcessor::new(outbox.clone(), PayloadRegistry::default(), handler, "w", false);
        let outbox_service = Arc::new(OutboxService::new(outbox.clone(), trigger, processor, 10));
        let service = OrderService::new(
            orders.clone(),
            resellers.clone(),
            client,
            outbox_service,
            1000,
        );
        Fixture {
            orders,
            resellers,
            outbox,
            service,
        }
    }

    fn new_order(reseller_id: Uuid, items: Vec<OrderItem>) -> NewCustomerOrder {
        NewCustomerOrder {
            reseller_id,
            customer_identification: "customer-7".to_string(),
            items,
        }
    }

    #[test]
    fn order_crossing_threshold_returns_correlation_id() {
        let f = fixture(FakeSubmissionClient::succeeding("AMB-1"));
        let reseller_id = Uuid::new_v4();
        f.resellers.insert(reseller(reseller_id));
        f.orders.insert(order_with_quantity(reseller_id, 600));
        f.orders.insert(order_with_quantity(reseller_id, 400));

        let (created, correlation_id) = f
            .service
            .create_order(new_order(reseller_id, vec![item("SKU-2", "Guaraná", 1, 2)]))
            .unwrap();

        assert_eq!(created.status, OrderStatus::Pending);
        let correlation_id = correlation_id.expect("threshold crossed");
        let items = f.outbox.all();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].correlation_id, correlation_id);
    }

    #[test]
    fn order_below_threshold_enqueues_nothing() {
        let f = fixture(FakeSubmissionClient::succeeding("AMB-1"));
        let reseller_id = Uuid::new_v4();
        f.resellers.insert(reseller(reseller_id));
        f.orders.insert(order_with_quantity(reseller_id, 300));

        let (_, correlation_id) = f
            .service
            .create_order(new_order(reseller_id, vec![item("SKU-1", "Pilsen", 200, 3)]))
            .unwrap();

        assert!(correlation_id.is_none());
        assert!(f.outbox.all().is_empty());
    }

    #[test]
    fn order_for_unknown_reseller_is_rejected() {
        let f = fixture(FakeSubmissionClient::succeeding("AMB-1"));

        let err = f
            .service
            .create_order(new_order(Uuid::new_v4(), vec![item("SKU-1", "Pilsen", 1, 3)]))
            .unwrap_err();

        assert!(matches!(err, DomainError::NotFound));
    }

    #[test]
    fn direct_submission_sends_resellers_over_threshold() {
        let f = fixture(FakeSubmissionClient::succeeding("AMB-55"));
        let big = Uuid::new_v4();
        let small = Uuid::new_v4();
        f.resellers.insert(reseller(big));
        f.resellers.insert(reseller(small));
        let a = f.orders.insert(order_with_quantity(big, 700));
        let b = f.orders.insert(order_with_quantity(big, 300));
        let c = f.orders.insert(order_with_quantity(small, 10));

        let report = f.service.process_pending_orders().unwrap();

        assert_eq!(
            report,
            DirectSubmissionReport {
                processed_orders: 3,
                sent_orders: 2,
                failed_orders: 0,
            }
        );
        assert_eq!(f.orders.get(a).external_order_number.as_deref(), Some("AMB-55"));
        assert_eq!(f.orders.get(b).status, OrderStatus::SentToAmbev);
        assert_eq!(f.orders.get(c).status, OrderStatus::Pending);
    }

    #[test]
    fn direct_submission_failure_moves_orders_to_retry() {
        let f = fixture(FakeSubmissionClient::always_failing());
        let reseller_id = Uuid::new_v4();
        f.resellers.insert(reseller(reseller_id));
        let a = f.orders.insert(order_with_quantity(reseller_id, 1000));

        let report = f.service.process_pending_orders().unwrap();

        assert_eq!(report.failed_orders, 1);
        assert_eq!(f.orders.get(a).status, OrderStatus::Retry);

        // Retry orders are picked up again on the next run.
        let again = f.service.process_pending_orders().unwrap();
        assert_eq!(again.processed_orders, 1);
    }
}
