//! In-memory [`RecordStore`] for tests and local development.
//!
//! Enforces the same constraints as the PostgreSQL schema: unique category
//! slugs, existing foreign keys, one active RSVP per `(event, email)` and
//! event capacity on insert.
//! Free-text search is a case-insensitive substring match over title and
//! body.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use domain::models::{
    Category, CategoryId, CategoryRef, Event, EventChanges, EventFilter, EventId, EventSort,
    NewCategory, NewEvent, NewRsvp, Rsvp, RsvpId,
};
use domain::services::{EventScan, RecordStore, StoreError};

#[derive(Debug, Default)]
struct State {
    events: BTreeMap<EventId, Event>,
    categories: BTreeMap<CategoryId, Category>,
    rsvps: Vec<Rsvp>,
    next_event_id: i64,
    next_category_id: i64,
    next_rsvp_id: i64,
}

impl State {
    fn resolve_categories(&self, ids: &[CategoryId]) -> Result<Vec<CategoryRef>, StoreError> {
        let mut refs = Vec::with_capacity(ids.len());
        for id in ids {
            let category = self.categories.get(id).ok_or_else(|| {
                StoreError::ForeignKeyViolation(format!("event_categories.category_id={}", id))
            })?;
            if !refs.iter().any(|r: &CategoryRef| r.id == category.id) {
                refs.push(CategoryRef::from(category));
            }
        }
        refs.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(refs)
    }

    fn active_count(&self, event_id: EventId) -> u64 {
        self.rsvps.iter().filter(|r| r.event_id == event_id).count() as u64
    }
}

fn matches(event: &Event, filter: &EventFilter) -> bool {
    if event.status != filter.status {
        return false;
    }
    if let Some(slug) = &filter.category_slug {
        if !event.has_category(slug) {
            return false;
        }
    }
    if let Some(range) = &filter.date_range {
        if !range.contains(event.date) {
            return false;
        }
    }
    if let Some(needle) = &filter.location_contains {
        if !contains_ignore_case(&event.location, needle) {
            return false;
        }
    }
    if let Some(search) = &filter.search {
        if !contains_ignore_case(&event.title, search) && !contains_ignore_case(&event.body, search)
        {
            return false;
        }
    }
    true
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    state: RwLock<State>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".into()))
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn query_events(
        &self,
        filter: &EventFilter,
        sort: EventSort,
        offset: u64,
        limit: u64,
    ) -> Result<EventScan, StoreError> {
        let state = self.read()?;
        let mut found: Vec<&Event> = state.events.values().filter(|e| matches(e, filter)).collect();
        found.sort_by(|a, b| sort.compare(a, b));

        let total = found.len() as u64;
        let window = found
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok((window, total))
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        Ok(self.read()?.events.get(&id).cloned())
    }

    async fn count_active_rsvps(&self, event_id: EventId) -> Result<u64, StoreError> {
        Ok(self.read()?.active_count(event_id))
    }

    async fn count_active_rsvps_many(
        &self,
        event_ids: &[EventId],
    ) -> Result<HashMap<EventId, u64>, StoreError> {
        let state = self.read()?;
        Ok(event_ids
            .iter()
            .map(|id| (*id, state.active_count(*id)))
            .collect())
    }

    async fn find_active_rsvp(
        &self,
        event_id: EventId,
        email: &str,
    ) -> Result<Option<Rsvp>, StoreError> {
        Ok(self
            .read()?
            .rsvps
            .iter()
            .find(|r| r.event_id == event_id && r.attendee_email == email)
            .cloned())
    }

    async fn insert_rsvp(&self, rsvp: NewRsvp) -> Result<Rsvp, StoreError> {
        let mut state = self.write()?;
        let capacity = match state.events.get(&rsvp.event_id) {
            Some(event) => event.capacity,
            None => {
                return Err(StoreError::ForeignKeyViolation(format!(
                    "rsvps.event_id={}",
                    rsvp.event_id
                )))
            }
        };
        if state
            .rsvps
            .iter()
            .any(|r| r.event_id == rsvp.event_id && r.attendee_email == rsvp.attendee_email)
        {
            return Err(StoreError::UniqueViolation(
                "uq_rsvps_event_email_active".into(),
            ));
        }
        if capacity > 0 && state.active_count(rsvp.event_id) >= u64::from(capacity) {
            return Err(StoreError::CapacityReached(rsvp.event_id));
        }

        state.next_rsvp_id += 1;
        let row = Rsvp {
            id: RsvpId(state.next_rsvp_id),
            event_id: rsvp.event_id,
            attendee_name: rsvp.attendee_name,
            attendee_email: rsvp.attendee_email,
            created_at: Utc::now(),
        };
        state.rsvps.push(row.clone());
        Ok(row)
    }

    async fn list_rsvps(&self, event_id: EventId) -> Result<Vec<Rsvp>, StoreError> {
        Ok(self
            .read()?
            .rsvps
            .iter()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn insert_event(&self, event: NewEvent) -> Result<Event, StoreError> {
        let mut state = self.write()?;
        let categories = state.resolve_categories(&event.category_ids)?;

        state.next_event_id += 1;
        let now = Utc::now();
        let row = Event {
            id: EventId(state.next_event_id),
            title: event.title,
            body: event.body,
            status: event.status,
            author_id: event.author_id,
            date: event.date,
            time: event.time,
            location: event.location,
            capacity: event.capacity,
            categories,
            created_at: now,
            modified_at: now,
        };
        state.events.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_event(
        &self,
        id: EventId,
        changes: EventChanges,
    ) -> Result<Option<Event>, StoreError> {
        let mut state = self.write()?;
        let categories = match &changes.category_ids {
            Some(ids) => Some(state.resolve_categories(ids)?),
            None => None,
        };
        let Some(event) = state.events.get_mut(&id) else {
            return Ok(None);
        };

        changes.apply_to(event);
        if let Some(categories) = categories {
            event.categories = categories;
        }
        event.modified_at = Utc::now();
        Ok(Some(event.clone()))
    }

    async fn insert_category(&self, category: NewCategory) -> Result<Category, StoreError> {
        let mut state = self.write()?;
        if state.categories.values().any(|c| c.slug == category.slug) {
            return Err(StoreError::UniqueViolation("uq_categories_slug".into()));
        }
        if let Some(parent) = category.parent_id {
            if !state.categories.contains_key(&parent) {
                return Err(StoreError::ForeignKeyViolation(format!(
                    "categories.parent_id={}",
                    parent
                )));
            }
        }

        state.next_category_id += 1;
        let row = Category {
            id: CategoryId(state.next_category_id),
            name: category.name,
            slug: category.slug,
            parent_id: category.parent_id,
        };
        state.categories.insert(row.id, row.clone());
        Ok(row)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let mut categories: Vec<Category> = self.read()?.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.read().map(|_| ())
    }
}
