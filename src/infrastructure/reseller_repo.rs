use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::Reseller;
use crate::domain::ports::ResellerRepository;
use crate::schema::resellers;

use super::models::ResellerRow;

pub struct DieselResellerRepository {
    pool: DbPool,
}

impl DieselResellerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ResellerRepository for DieselResellerRepository {
    fn get_by_id(&self, id: Uuid) -> Result<Option<Reseller>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = resellers::table
            .filter(resellers::id.eq(id))
            .select(ResellerRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(row.map(Reseller::from))
    }
}
