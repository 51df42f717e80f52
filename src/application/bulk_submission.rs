use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::errors::ProcessingError;
use crate::domain::order::{total_quantity, CustomerOrder};
use crate::domain::outbox::BulkOrderSubmission;
use crate::domain::ports::{OrderRepository, ResellerRepository, SubmissionClient};
use crate::domain::submission::{SubmissionItem, SubmissionRequest};

/// Groups the items of `orders` by SKU, summing quantities.
///
/// Name and unit price come from the first occurrence of each SKU; later
/// occurrences with different attributes are collapsed into it. SKUs keep
/// the order in which they were first seen.
pub fn consolidate_items(orders: &[CustomerOrder]) -> Vec<SubmissionItem> {
    let mut consolidated: Vec<SubmissionItem> = Vec::new();
    let mut by_sku: HashMap<&str, usize> = HashMap::new();

    for item in orders.iter().flat_map(|o| o.items.iter()) {
        match by_sku.get(item.sku.as_str()) {
            Some(&idx) => consolidated[idx].quantity += i64::from(item.quantity),
            None => {
                by_sku.insert(item.sku.as_str(), consolidated.len());
                consolidated.push(SubmissionItem {
                    sku: item.sku.clone(),
                    name: item.name.clone(),
                    quantity: i64::from(item.quantity),
                    unit_price: item.unit_price.clone(),
                });
            }
        }
    }

    consolidated
}

/// Handles [`BulkOrderSubmission`] outbox items.
pub struct BulkSubmissionHandler {
    orders: Arc<dyn OrderRepository>,
    resellers: Arc<dyn ResellerRepository>,
    client: Arc<dyn SubmissionClient>,
    threshold: i64,
}

impl BulkSubmissionHandler {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        resellers: Arc<dyn ResellerRepository>,
        client: Arc<dyn SubmissionClient>,
        threshold: i64,
    ) -> Self {
        Self {
            orders,
            resellers,
            client,
            threshold,
        }
    }

    /// Submits the batch upstream and marks every order as sent.
    ///
    /// Orders are updated one at a time after the upstream call succeeded.
    /// If an update fails the whole batch is retried, and the retry submits
    /// upstream again.
    ///
    /// Orders are loaded whatever their status, so orders already marked
    /// sent by an earlier attempt are submitted again and their external
    /// order number is replaced by the new reference.
    pub fn handle(&self, payload: &BulkOrderSubmission) -> Result<String, ProcessingError> {
        let orders = self.orders.get_by_ids(&payload.order_ids)?;
        if orders.is_empty() {
            let ids: Vec<String> = payload.order_ids.iter().map(|id| id.to_string()).collect();
            return Err(ProcessingError::OrdersNotFound(ids.join(", ")));
        }

        let reseller = self
            .resellers
            .get_by_id(payload.reseller_id)?
            .ok_or(ProcessingError::ResellerNotFound(payload.reseller_id))?;

        let total = total_quantity(&orders);
        if total < self.threshold {
            return Err(ProcessingError::BelowThreshold {
                total,
                threshold: self.threshold,
            });
        }

        let request = SubmissionRequest {
            reseller_identifier: reseller.document_number.clone(),
            items: consolidate_items(&orders),
        };

        log::info!(
            "Submitting {} orders ({} units, {} skus) for reseller {}",
            orders.len(),
            total,
            request.items.len(),
            reseller.id
        );

        let receipt = self.client.submit(&request)?;

        for mut order in orders {
            order.mark_sent(&receipt.reference_number);
            self.orders.update(&order)?;
        }

        log::info!(
            "Bulk submission for reseller {} accepted as {}",
            reseller.id,
            receipt.reference_number
        );

        Ok(receipt.reference_number)
    }
}
