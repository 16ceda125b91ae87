//! PostgreSQL-backed [`RecordStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;

use domain::models::{
    Category, CategoryRef, Event, EventChanges, EventFilter, EventId, EventSort, NewCategory,
    NewEvent, NewRsvp, Rsvp,
};
use domain::services::{EventScan, RecordStore, StoreError};

use crate::entities::EventEntity;
use crate::metrics::record_store_error;
use crate::repositories::{CategoryRepository, EventRepository, RsvpInsert, RsvpRepository};

/// Maps a sqlx error onto the store error taxonomy.
///
/// `23505` is a unique violation and `23503` a foreign key violation; the
/// constraint name is kept for logging.
pub fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            match db_err.code().as_deref() {
                Some("23505") => StoreError::UniqueViolation(constraint),
                Some("23503") => StoreError::ForeignKeyViolation(constraint),
                _ => StoreError::Backend(db_err.message().to_string()),
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(err.to_string())
        }
        _ => StoreError::Backend(err.to_string()),
    }
}

fn error_kind(err: &StoreError) -> &'static str {
    match err {
        StoreError::UniqueViolation(_) => "unique_violation",
        StoreError::ForeignKeyViolation(_) => "foreign_key_violation",
        StoreError::CapacityReached(_) => "capacity_reached",
        StoreError::Timeout(_) => "timeout",
        StoreError::Unavailable(_) => "unavailable",
        StoreError::Backend(_) => "backend",
    }
}

/// Converts and counts a repository failure.
fn store_err(operation: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| {
        let mapped = map_sqlx_error(err);
        record_store_error(operation, error_kind(&mapped));
        if !matches!(mapped, StoreError::UniqueViolation(_)) {
            tracing::error!(operation, error = %mapped, "Record store operation failed");
        }
        mapped
    }
}

/// Record store over the events, rsvps and categories tables.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
    events: EventRepository,
    rsvps: RsvpRepository,
    categories: CategoryRepository,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            events: EventRepository::new(pool.clone()),
            rsvps: RsvpRepository::new(pool.clone()),
            categories: CategoryRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Attaches categories to event rows with one extra query.
    async fn hydrate(&self, rows: Vec<EventEntity>) -> Result<Vec<Event>, StoreError> {
        if rows.is_empty() {
            return Ok(vec![]);
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let links = self
            .events
            .categories_for(&ids)
            .await
            .map_err(store_err("find_event_categories"))?;

        let mut by_event: HashMap<i64, Vec<CategoryRef>> = HashMap::new();
        for link in links {
            by_event.entry(link.event_id).or_default().push(link.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let categories = by_event.remove(&row.id).unwrap_or_default();
                row.into_domain(categories)
            })
            .collect())
    }

    async fn hydrate_one(&self, row: EventEntity) -> Result<Event, StoreError> {
        let mut events = self.hydrate(vec![row]).await?;
        events
            .pop()
            .ok_or_else(|| StoreError::Backend("event row vanished during hydration".into()))
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn query_events(
        &self,
        filter: &EventFilter,
        sort: EventSort,
        offset: u64,
        limit: u64,
    ) -> Result<EventScan, StoreError> {
        let (rows, total) = self
            .events
            .list(
                filter,
                sort,
                i64::try_from(offset).unwrap_or(i64::MAX),
                i64::try_from(limit).unwrap_or(i64::MAX),
            )
            .await
            .map_err(store_err("query_events"))?;
        let events = self.hydrate(rows).await?;
        Ok((events, total.max(0) as u64))
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        let row = self
            .events
            .find_by_id(id.0)
            .await
            .map_err(store_err("get_event"))?;
        match row {
            Some(row) => Ok(Some(self.hydrate_one(row).await?)),
            None => Ok(None),
        }
    }

    async fn count_active_rsvps(&self, event_id: EventId) -> Result<u64, StoreError> {
        let count = self
            .rsvps
            .count_active(event_id.0)
            .await
            .map_err(store_err("count_active_rsvps"))?;
        Ok(count.max(0) as u64)
    }

    async fn count_active_rsvps_many(
        &self,
        event_ids: &[EventId],
    ) -> Result<HashMap<EventId, u64>, StoreError> {
        let ids: Vec<i64> = event_ids.iter().map(|id| id.0).collect();
        let rows = self
            .rsvps
            .count_active_many(&ids)
            .await
            .map_err(store_err("count_active_rsvps_many"))?;
        Ok(rows
            .into_iter()
            .map(|r| (EventId(r.event_id), r.count.max(0) as u64))
            .collect())
    }

    async fn find_active_rsvp(
        &self,
        event_id: EventId,
        email: &str,
    ) -> Result<Option<Rsvp>, StoreError> {
        let row = self
            .rsvps
            .find_active_by_email(event_id.0, email)
            .await
            .map_err(store_err("find_active_rsvp"))?;
        Ok(row.map(Into::into))
    }

    async fn insert_rsvp(&self, rsvp: NewRsvp) -> Result<Rsvp, StoreError> {
        let outcome = self
            .rsvps
            .create(rsvp.event_id.0, &rsvp.attendee_name, &rsvp.attendee_email)
            .await
            .map_err(store_err("insert_rsvp"))?;
        match outcome {
            RsvpInsert::Created(row) => Ok(row.into()),
            RsvpInsert::Full => Err(StoreError::CapacityReached(rsvp.event_id)),
        }
    }

    async fn list_rsvps(&self, event_id: EventId) -> Result<Vec<Rsvp>, StoreError> {
        let rows = self
            .rsvps
            .list_active(event_id.0)
            .await
            .map_err(store_err("list_rsvps"))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_event(&self, event: NewEvent) -> Result<Event, StoreError> {
        let row = self
            .events
            .create(&event)
            .await
            .map_err(store_err("insert_event"))?;
        self.hydrate_one(row).await
    }

    async fn update_event(
        &self,
        id: EventId,
        changes: EventChanges,
    ) -> Result<Option<Event>, StoreError> {
        let row = self
            .events
            .update(id.0, &changes)
            .await
            .map_err(store_err("update_event"))?;
        match row {
            Some(row) => Ok(Some(self.hydrate_one(row).await?)),
            None => Ok(None),
        }
    }

    async fn insert_category(&self, category: NewCategory) -> Result<Category, StoreError> {
        let row = self
            .categories
            .create(
                &category.name,
                &category.slug,
                category.parent_id.map(|p| p.0),
            )
            .await
            .map_err(store_err("insert_category"))?;
        Ok(row.into())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let rows = self
            .categories
            .list_all()
            .await
            .map_err(store_err("list_categories"))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(store_err("ping"))?;
        crate::metrics::record_pool_metrics(&self.pool);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_unavailable() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn test_other_errors_are_backend() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            StoreError::Backend(_)
        ));
    }

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(error_kind(&StoreError::Timeout("x")), "timeout");
        assert_eq!(
            error_kind(&StoreError::UniqueViolation("uq".into())),
            "unique_violation"
        );
    }
}
