use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{CustomerOrder, NewCustomerOrder, OrderStatus};
use crate::domain::ports::OrderRepository;
use crate::schema::{order_items, orders};

use super::models::{NewOrderItemRow, NewOrderRow, OrderItemRow, OrderRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

const AWAITING_SUBMISSION: [&str; 2] = ["PENDING", "RETRY"];

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Attaches items to `rows`, keeping the row order.
    fn with_items(
        conn: &mut PgConnection,
        rows: Vec<OrderRow>,
    ) -> Result<Vec<CustomerOrder>, DomainError> {
        let items = OrderItemRow::belonging_to(&rows)
            .select(OrderItemRow::as_select())
            .order(order_items::created_at.asc())
            .load(conn)?
            .grouped_by(&rows);

        rows.into_iter()
            .zip(items)
            .map(|(order, items)| order.into_domain(items))
            .collect()
    }
}

impl OrderRepository for DieselOrderRepository {
    fn create(&self, order: NewCustomerOrder) -> Result<CustomerOrder, DomainError> {
        let mut conn = self.pool.get()?;

        let order_id = conn.transaction::<_, DomainError, _>(|conn| {
            let order_id = Uuid::new_v4();
            diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order_id,
                    reseller_id: order.reseller_id,
                    customer_identification: order.customer_identification.clone(),
                    status: OrderStatus::Pending.as_str().to_string(),
                })
                .execute(conn)?;

            let new_items: Vec<NewOrderItemRow> = order
                .items
                .iter()
                .map(|i| NewOrderItemRow {
                    id: Uuid::new_v4(),
                    order_id,
                    sku: i.sku.clone(),
                    name: i.name.clone(),
                    quantity: i.quantity,
                    unit_price: i.unit_price.clone(),
                })
                .collect();
            diesel::insert_into(order_items::table)
                .values(&new_items)
                .execute(conn)?;

            Ok(order_id)
        })?;

        self.find_by_id(order_id)?.ok_or(DomainError::NotFound)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<CustomerOrder>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .filter(orders::id.eq(id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        Ok(Self::with_items(&mut conn, vec![order])?.pop())
    }

    fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<CustomerOrder>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = orders::table
            .filter(orders::id.eq_any(ids.to_vec()))
            .select(OrderRow::as_select())
            .order(orders::created_at.asc())
            .load(&mut conn)?;

        Self::with_items(&mut conn, rows)
    }

    fn get_pending_by_reseller(&self, reseller_id: Uuid) -> Result<Vec<CustomerOrder>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = orders::table
            .filter(orders::reseller_id.eq(reseller_id))
            .filter(orders::status.eq_any(AWAITING_SUBMISSION))
            .select(OrderRow::as_select())
            .order(orders::created_at.desc())
            .load(&mut conn)?;

        Self::with_items(&mut conn, rows)
    }

    fn get_pending(&self) -> Result<Vec<CustomerOrder>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = orders::table
            .filter(orders::status.eq_any(AWAITING_SUBMISSION))
            .select(OrderRow::as_select())
            .order(orders::created_at.asc())
            .load(&mut conn)?;

        Self::with_items(&mut conn, rows)
    }

    fn total_pending_quantity(&self, reseller_id: Uuid) -> Result<i64, DomainError> {
        let mut conn = self.pool.get()?;

        let total: Option<i64> = order_items::table
            .inner_join(orders::table)
            .filter(orders::reseller_id.eq(reseller_id))
            .filter(orders::status.eq_any(AWAITING_SUBMISSION))
            .select(diesel::dsl::sum(order_items::quantity))
            .get_result(&mut conn)?;

        Ok(total.unwrap_or(0))
    }

    fn update(&self, order: &CustomerOrder) -> Result<CustomerOrder, DomainError> {
        log::debug!("Updating order {} to {}", order.id, order.status);

        let mut conn = self.pool.get()?;
        let updated = diesel::update(orders::table.find(order.id))
            .set((
                orders::status.eq(order.status.as_str()),
                orders::external_order_number.eq(order.external_order_number.as_deref()),
                orders::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(DomainError::NotFound);
        }
        drop(conn);

        self.find_by_id(order.id)?.ok_or(DomainError::NotFound)
    }
}
