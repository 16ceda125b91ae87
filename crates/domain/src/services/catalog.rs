//! Event catalog: the read path.

use std::sync::Arc;
use std::time::Duration;

use shared::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use thiserror::Error;

use crate::models::{EventId, EventPage, EventView, QuerySpec};
use crate::services::record_store::{with_timeout, RecordStore, StoreError};

/// Catalog settings, injected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub store_timeout: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            store_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Event {0} not found")]
    NotFound(EventId),

    #[error("Event {0} is not published")]
    NotPublished(EventId),

    #[error("Persistence failure: {0}")]
    Persistence(String),
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        CatalogError::Persistence(err.to_string())
    }
}

/// Filtered, paginated, sorted reads over published events.
#[derive(Clone)]
pub struct EventCatalog {
    store: Arc<dyn RecordStore>,
    config: CatalogConfig,
}

impl EventCatalog {
    pub fn new(store: Arc<dyn RecordStore>, config: CatalogConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// A query for the first page with the configured default page size.
    pub fn default_query(&self) -> QuerySpec {
        QuerySpec {
            page_size: self.config.default_page_size,
            ..QuerySpec::default()
        }
    }

    /// Lists published events matching `spec`.
    ///
    /// A page past the end yields an empty item list with correct totals.
    pub async fn list_events(&self, spec: &QuerySpec) -> Result<EventPage, CatalogError> {
        let (filter, sort, page) = spec
            .validate(self.config.max_page_size)
            .map_err(|e| CatalogError::InvalidQuery(e.0))?;

        let (events, total_count) = with_timeout(
            self.config.store_timeout,
            "query_events",
            self.store
                .query_events(&filter, sort, page.offset(), page.limit()),
        )
        .await?;

        let ids: Vec<EventId> = events.iter().map(|e| e.id).collect();
        let counts = if ids.is_empty() {
            Default::default()
        } else {
            with_timeout(
                self.config.store_timeout,
                "count_active_rsvps_many",
                self.store.count_active_rsvps_many(&ids),
            )
            .await?
        };

        let items = events
            .into_iter()
            .map(|event| {
                let count = counts.get(&event.id).copied().unwrap_or(0);
                EventView::new(event, count)
            })
            .collect();

        tracing::debug!(
            total_count,
            page = page.page(),
            page_size = page.page_size(),
            sort_key = %sort.key,
            "Listed events"
        );

        Ok(EventPage::new(items, total_count, page))
    }

    /// Fetches a single event.
    ///
    /// Unpublished (draft or trashed) events are only visible when
    /// `viewer_can_see_unpublished` is set.
    pub async fn get_event(
        &self,
        id: EventId,
        viewer_can_see_unpublished: bool,
    ) -> Result<EventView, CatalogError> {
        let event = with_timeout(self.config.store_timeout, "get_event", self.store.get_event(id))
            .await?
            .ok_or(CatalogError::NotFound(id))?;

        if !event.is_published() && !viewer_can_see_unpublished {
            return Err(CatalogError::NotPublished(id));
        }

        let count = with_timeout(
            self.config.store_timeout,
            "count_active_rsvps",
            self.store.count_active_rsvps(id),
        )
        .await?;

        Ok(EventView::new(event, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AvailableSlots, EventStatus, SortDirection, SortKey};
    use crate::services::test_support::{event, FakeStore};

    fn catalog(store: FakeStore) -> EventCatalog {
        EventCatalog::new(Arc::new(store), CatalogConfig::default())
    }

    #[tokio::test]
    async fn test_list_only_published() {
        let store = FakeStore::new();
        store.add_event(event(1, "Published", EventStatus::Published, 0));
        store.add_event(event(2, "Draft", EventStatus::Draft, 0));
        store.add_event(event(3, "Trashed", EventStatus::Trashed, 0));

        let page = catalog(store).list_events(&QuerySpec::default()).await.unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].id, EventId(1));
    }

    #[tokio::test]
    async fn test_page_beyond_total_is_empty() {
        let store = FakeStore::new();
        for id in 1..=5 {
            store.add_event(event(id, "E", EventStatus::Published, 0));
        }
        let spec = QuerySpec { page: 9, page_size: 2, ..Default::default() };

        let page = catalog(store).list_events(&spec).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, 9);
    }

    #[tokio::test]
    async fn test_equal_keys_are_stable_across_pages() {
        let store = FakeStore::new();
        for id in [4, 1, 3, 2] {
            store.add_event(event(id, "Same title", EventStatus::Published, 0));
        }
        let catalog = catalog(store);

        let mut seen = Vec::new();
        for page in 1..=2 {
            let spec = QuerySpec {
                page,
                page_size: 2,
                sort_key: SortKey::Title,
                sort_direction: SortDirection::Descending,
                ..Default::default()
            };
            let first = catalog.list_events(&spec).await.unwrap();
            let again = catalog.list_events(&spec).await.unwrap();
            let ids: Vec<_> = first.items.iter().map(|e| e.id.0).collect();
            let ids_again: Vec<_> = again.items.iter().map(|e| e.id.0).collect();
            assert_eq!(ids, ids_again);
            seen.extend(ids);
        }
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_list_rejects_invalid_query() {
        let spec = QuerySpec { page_size: 500, ..Default::default() };
        let err = catalog(FakeStore::new()).list_events(&spec).await.unwrap_err();
        assert!(matches!(err, CatalogError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_list_includes_rsvp_counts() {
        let store = FakeStore::new();
        store.add_event(event(1, "Capped", EventStatus::Published, 3));
        store.add_rsvp(1, "a@x.com");
        store.add_rsvp(1, "b@x.com");

        let page = catalog(store).list_events(&QuerySpec::default()).await.unwrap();
        assert_eq!(page.items[0].rsvp_count, 2);
        assert_eq!(page.items[0].available_slots, AvailableSlots::Remaining(1));
    }

    #[tokio::test]
    async fn test_get_event_visibility() {
        let store = FakeStore::new();
        store.add_event(event(1, "Draft", EventStatus::Draft, 0));
        store.add_event(event(2, "Trashed", EventStatus::Trashed, 0));
        let catalog = catalog(store);

        assert_eq!(
            catalog.get_event(EventId(1), false).await.unwrap_err(),
            CatalogError::NotPublished(EventId(1))
        );
        assert_eq!(
            catalog.get_event(EventId(2), false).await.unwrap_err(),
            CatalogError::NotPublished(EventId(2))
        );
        assert!(catalog.get_event(EventId(1), true).await.is_ok());
        assert_eq!(
            catalog.get_event(EventId(99), true).await.unwrap_err(),
            CatalogError::NotFound(EventId(99))
        );
    }

    #[tokio::test]
    async fn test_get_event_unlimited_capacity() {
        let store = FakeStore::new();
        store.add_event(event(1, "Open", EventStatus::Published, 0));
        store.add_rsvp(1, "a@x.com");

        let view = catalog(store).get_event(EventId(1), false).await.unwrap();
        assert_eq!(view.rsvp_count, 1);
        assert_eq!(view.available_slots, AvailableSlots::Unlimited);
    }

    #[tokio::test]
    async fn test_store_timeout_maps_to_persistence() {
        let store = FakeStore::new().with_delay(Duration::from_millis(200));
        store.add_event(event(1, "Slow", EventStatus::Published, 0));
        let catalog = EventCatalog::new(
            Arc::new(store),
            CatalogConfig {
                store_timeout: Duration::from_millis(20),
                ..CatalogConfig::default()
            },
        );

        let err = catalog.get_event(EventId(1), false).await.unwrap_err();
        assert!(matches!(err, CatalogError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_default_query_uses_configured_page_size() {
        let catalog = EventCatalog::new(
            Arc::new(FakeStore::new()),
            CatalogConfig { default_page_size: 25, ..CatalogConfig::default() },
        );
        assert_eq!(catalog.default_query().page_size, 25);
    }
}
