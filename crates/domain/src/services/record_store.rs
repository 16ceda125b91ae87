//! Record store abstraction.
//!
//! The catalog and admission engine are written against [`RecordStore`] only.
//! Implementations guarantee single-record atomicity plus two checks on
//! `insert_rsvp`, which must hold across every process sharing the store:
//!
//! - uniqueness of `(event_id, attendee_email)` among active RSVPs, a clash
//!   reported as [`StoreError::UniqueViolation`];
//! - the event's capacity (0 is unlimited), checked atomically with the
//!   insert and reported as [`StoreError::CapacityReached`].

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Category, Event, EventChanges, EventFilter, EventId, EventSort, NewCategory, NewEvent,
    NewRsvp, Rsvp,
};

/// Errors reported by a record store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Referenced record does not exist: {0}")]
    ForeignKeyViolation(String),

    #[error("Event {0} is at capacity")]
    CapacityReached(EventId),

    #[error("Store operation '{0}' timed out")]
    Timeout(&'static str),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store error: {0}")]
    Backend(String),
}

/// Result page of a filtered scan: the records plus the count of all matches.
pub type EventScan = (Vec<Event>, u64);

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Filtered, sorted scan. Returns the requested window and the total
    /// number of matches ignoring `offset`/`limit`.
    async fn query_events(
        &self,
        filter: &EventFilter,
        sort: EventSort,
        offset: u64,
        limit: u64,
    ) -> Result<EventScan, StoreError>;

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StoreError>;

    async fn count_active_rsvps(&self, event_id: EventId) -> Result<u64, StoreError>;

    /// Counts for several events at once. Events with no RSVPs may be absent
    /// from the map.
    async fn count_active_rsvps_many(
        &self,
        event_ids: &[EventId],
    ) -> Result<HashMap<EventId, u64>, StoreError> {
        let mut counts = HashMap::with_capacity(event_ids.len());
        for id in event_ids {
            counts.insert(*id, self.count_active_rsvps(*id).await?);
        }
        Ok(counts)
    }

    /// Looks up an active RSVP by normalized email.
    async fn find_active_rsvp(
        &self,
        event_id: EventId,
        email: &str,
    ) -> Result<Option<Rsvp>, StoreError>;

    /// Inserts an RSVP, enforcing the duplicate and capacity checks described
    /// in the module docs.
    async fn insert_rsvp(&self, rsvp: NewRsvp) -> Result<Rsvp, StoreError>;

    /// Active RSVPs for an event, oldest first.
    async fn list_rsvps(&self, event_id: EventId) -> Result<Vec<Rsvp>, StoreError>;

    async fn insert_event(&self, event: NewEvent) -> Result<Event, StoreError>;

    async fn update_event(
        &self,
        id: EventId,
        changes: EventChanges,
    ) -> Result<Option<Event>, StoreError>;

    async fn insert_category(&self, category: NewCategory) -> Result<Category, StoreError>;

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;

    /// Connectivity check used by the readiness endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Runs a store future with a deadline, mapping expiry to
/// [`StoreError::Timeout`].
pub async fn with_timeout<T, F>(
    limit: Duration,
    operation: &'static str,
    fut: F,
) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_ms = limit.as_millis() as u64, "Store call timed out");
            Err(StoreError::Timeout(operation))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let ok = with_timeout(Duration::from_secs(1), "op", async { Ok::<_, StoreError>(3) }).await;
        assert_eq!(ok, Ok(3));

        let err = with_timeout(Duration::from_secs(1), "op", async {
            Err::<u8, _>(StoreError::Backend("boom".into()))
        })
        .await;
        assert_eq!(err, Err(StoreError::Backend("boom".into())));
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result = with_timeout(Duration::from_millis(10), "slow_op", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, StoreError>(())
        })
        .await;
        assert_eq!(result, Err(StoreError::Timeout("slow_op")));
    }

    #[test]
    fn test_store_error_display() {
        assert_eq!(
            StoreError::Timeout("get_event").to_string(),
            "Store operation 'get_event' timed out"
        );
    }
}
