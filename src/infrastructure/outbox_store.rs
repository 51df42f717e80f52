use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::outbox::{OutboxItem, OutboxStatus};
use crate::domain::ports::OutboxStore;
use crate::schema::outbox_messages;

use super::models::{into_items, NewOutboxRow, OutboxChangeset, OutboxRow};

pub struct DieselOutboxStore {
    pool: DbPool,
}

impl DieselOutboxStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OutboxStore for DieselOutboxStore {
    fn enqueue(&self, item: OutboxItem) -> Result<OutboxItem, DomainError> {
        log::debug!(
            "Enqueuing outbox item {} ({}, correlation {})",
            item.id,
            item.message_type,
            item.correlation_id
        );

        let mut conn = self.pool.get()?;
        let row = diesel::insert_into(outbox_messages::table)
            .values(&NewOutboxRow {
                id: item.id,
                message_type: item.message_type,
                payload: item.payload,
                status: OutboxStatus::Pending.as_str().to_string(),
                retry_count: item.retry_count,
                max_retries: item.max_retries,
                created_at: Utc::now(),
                correlation_id: item.correlation_id,
            })
            .returning(OutboxRow::as_returning())
            .get_result(&mut conn)?;

        OutboxItem::try_from(row)
    }

    fn fetch_pending_batch(&self, limit: i64) -> Result<Vec<OutboxItem>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = outbox_messages::table
            .filter(outbox_messages::status.eq(OutboxStatus::Pending.as_str()))
            .order(outbox_messages::created_at.asc())
            .limit(limit)
            .select(OutboxRow::as_select())
            .load(&mut conn)?;

        into_items(rows)
    }

    fn fetch_due_retry_batch(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OutboxItem>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = outbox_messages::table
            .filter(outbox_messages::status.eq(OutboxStatus::Retry.as_str()))
            .filter(outbox_messages::next_retry_at.le(now))
            .filter(outbox_messages::retry_count.lt(outbox_messages::max_retries))
            .order(outbox_messages::next_retry_at.asc())
            .limit(limit)
            .select(OutboxRow::as_select())
            .load(&mut conn)?;

        into_items(rows)
    }

    fn claim(
        &self,
        id: Uuid,
        instance_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<OutboxItem>, DomainError> {
        let mut conn = self.pool.get()?;

        // Same predicates as the pending and due-retry fetches.
        let claimable = outbox_messages::status
            .eq(OutboxStatus::Pending.as_str())
            .or(outbox_messages::status
                .eq(OutboxStatus::Retry.as_str())
                .and(outbox_messages::next_retry_at.le(now))
                .and(outbox_messages::retry_count.lt(outbox_messages::max_retries)));
        let row = diesel::update(
            outbox_messages::table
                .filter(outbox_messages::id.eq(id))
                .filter(claimable),
        )
        .set((
            outbox_messages::status.eq(OutboxStatus::Processing.as_str()),
            outbox_messages::claimed_by.eq(instance_id),
            outbox_messages::claimed_at.eq(now),
        ))
        .returning(OutboxRow::as_returning())
        .get_result(&mut conn)
        .optional()?;

        row.map(OutboxItem::try_from).transpose()
    }

    fn update(&self, item: &OutboxItem) -> Result<(), DomainError> {
        log::debug!("Updating outbox item {} to {}", item.id, item.status);

        let mut conn = self.pool.get()?;
        let updated = diesel::update(outbox_messages::table.find(item.id))
            .set(&OutboxChangeset::from(item))
            .execute(&mut conn)?;

        if updated == 0 {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    fn count_pending(&self, now: DateTime<Utc>) -> Result<i64, DomainError> {
        let mut conn = self.pool.get()?;

        let count = outbox_messages::table
            .filter(
                outbox_messages::status.eq(OutboxStatus::Pending.as_str()).or(outbox_messages::status
                    .eq(OutboxStatus::Retry.as_str())
                    .and(outbox_messages::next_retry_at.le(now))),
            )
            .count()
            .get_result(&mut conn)?;

        Ok(count)
    }

    fn find_by_correlation_id(&self, correlation_id: &str) -> Result<Vec<OutboxItem>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = outbox_messages::table
            .filter(outbox_messages::correlation_id.eq(correlation_id))
            .order(outbox_messages::created_at.asc())
            .select(OutboxRow::as_select())
            .load(&mut conn)?;

        into_items(rows)
    }

    fn purge_completed_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        let mut conn = self.pool.get()?;

        let deleted = diesel::delete(
            outbox_messages::table
                .filter(outbox_messages::status.eq(OutboxStatus::Completed.as_str()))
                .filter(outbox_messages::processed_at.lt(cutoff)),
        )
        .execute(&mut conn)?;

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::DieselOutboxStore;
    use crate::domain::outbox::{BulkOrderSubmission, OutboxItem, OutboxMessage, OutboxStatus};
    use crate::domain::ports::OutboxStore;
    use crate::infrastructure::test_db::setup_db;

    fn bulk_item(correlation_id: &str) -> OutboxItem {
        let message = OutboxMessage::BulkOrderSubmission(BulkOrderSubmission {
            reseller_id: Uuid::new_v4(),
            order_ids: vec![Uuid::new_v4()],
            enqueued_at: Utc::now(),
        });
        OutboxItem::new(&message, correlation_id, 3).unwrap()
    }

    #[tokio::test]
    async fn enqueue_forces_pending_and_keeps_payload() {
        let (_container, pool) = setup_db().await;
        let store = DieselOutboxStore::new(pool);
        let mut item = bulk_item("corr-1");
        item.status = OutboxStatus::Completed;

        let stored = store.enqueue(item.clone()).unwrap();

        assert_eq!(stored.status, OutboxStatus::Pending);
        assert_eq!(stored.payload, item.payload);
        assert_eq!(stored.max_retries, 3);
        assert_eq!(store.fetch_pending_batch(10).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn pending_batch_is_ordered_and_limited() {
        let (_container, pool) = setup_db().await;
        let store = DieselOutboxStore::new(pool);
        let ids: Vec<Uuid> = (0..3)
            .map(|n| store.enqueue(bulk_item(&format!("c{n}"))).unwrap().id)
            .collect();

        let batch = store.fetch_pending_batch(2).unwrap();

        assert_eq!(batch.iter().map(|i| i.id).collect::<Vec<_>>(), ids[..2].to_vec());
    }

    #[tokio::test]
    async fn claim_succeeds_once() {
        let (_container, pool) = setup_db().await;
        let store = DieselOutboxStore::new(pool);
        let item = store.enqueue(bulk_item("corr")).unwrap();

        let first = store.claim(item.id, "worker-a", Utc::now()).unwrap();
        let second = store.claim(item.id, "worker-b", Utc::now()).unwrap();

        let claimed = first.expect("first claim wins");
        assert_eq!(claimed.status, OutboxStatus::Processing);
        assert_eq!(claimed.claimed_by.as_deref(), Some("worker-a"));
        assert!(second.is_none());
        assert!(store.fetch_pending_batch(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn retry_item_cannot_be_claimed_before_it_is_due() {
        let (_container, pool) = setup_db().await;
        let store = DieselOutboxStore::new(pool);
        let item = store.enqueue(bulk_item("corr")).unwrap();
        let now = Utc::now();
        let mut claimed = store.claim(item.id, "worker-a", now).unwrap().unwrap();
        claimed.record_failure(now, "upstream unavailable", false);
        store.update(&claimed).unwrap();

        assert!(store.claim(item.id, "worker-b", now).unwrap().is_none());
        let stored = store.find_by_correlation_id("corr").unwrap();
        assert_eq!(stored[0].status, OutboxStatus::Retry);
        assert_eq!(stored[0].claimed_by.as_deref(), Some("worker-a"));

        let due = now + Duration::minutes(3);
        assert!(store.claim(item.id, "worker-b", due).unwrap().is_some());
    }

    #[tokio::test]
    async fn retry_lifecycle_through_store() {
        let (_container, pool) = setup_db().await;
        let store = DieselOutboxStore::new(pool);
        let item = store.enqueue(bulk_item("corr")).unwrap();
        let now = Utc::now();

        let mut claimed = store.claim(item.id, "w", now).unwrap().unwrap();
        claimed.record_failure(now, "upstream unavailable", false);
        store.update(&claimed).unwrap();

        assert!(store.fetch_due_retry_batch(now, 10).unwrap().is_empty());
        assert_eq!(store.count_pending(now).unwrap(), 0);

        let later = now + Duration::minutes(3);
        let due = store.fetch_due_retry_batch(later, 10).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].retry_count, 1);
        assert_eq!(due[0].error_message.as_deref(), Some("upstream unavailable"));
        assert_eq!(store.count_pending(later).unwrap(), 1);

        let mut reclaimed = store.claim(item.id, "w", later).unwrap().unwrap();
        reclaimed.mark_completed(later);
        store.update(&reclaimed).unwrap();

        let stored = store.find_by_correlation_id("corr").unwrap();
        assert_eq!(stored[0].status, OutboxStatus::Completed);
        assert!(stored[0].next_retry_at.is_none());
        assert!(stored[0].error_message.is_none());
        assert!(stored[0].processed_at.is_some());
    }

    #[tokio::test]
    async fn correlation_lookup_excludes_other_ids() {
        let (_container, pool) = setup_db().await;
        let store = DieselOutboxStore::new(pool);
        let a = store.enqueue(bulk_item("shared")).unwrap();
        store.enqueue(bulk_item("other")).unwrap();
        let b = store.enqueue(bulk_item("shared")).unwrap();

        let found = store.find_by_correlation_id("shared").unwrap();

        assert_eq!(found.iter().map(|i| i.id).collect::<Vec<_>>(), vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn purge_deletes_old_completed_items_only() {
        let (_container, pool) = setup_db().await;
        let store = DieselOutboxStore::new(pool);
        let now = Utc::now();
        let old = store.enqueue(bulk_item("old")).unwrap();
        let fresh = store.enqueue(bulk_item("fresh")).unwrap();
        store.enqueue(bulk_item("pending")).unwrap();

        let mut old = store.claim(old.id, "w", now).unwrap().unwrap();
        old.mark_completed(now - Duration::days(30));
        store.update(&old).unwrap();
        let mut fresh = store.claim(fresh.id, "w", now).unwrap().unwrap();
        fresh.mark_completed(now);
        store.update(&fresh).unwrap();

        let purged = store.purge_completed_older_than(now - Duration::days(7)).unwrap();

        assert_eq!(purged, 1);
        assert!(store.find_by_correlation_id("old").unwrap().is_empty());
        assert_eq!(store.find_by_correlation_id("fresh").unwrap().len(), 1);
        assert_eq!(store.find_by_correlation_id("pending").unwrap().len(), 1);
    }
}
