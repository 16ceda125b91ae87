//! Minimal record store used by the domain unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::models::{
    Category, Event, EventChanges, EventFilter, EventId, EventSort, EventStatus, NewCategory,
    NewEvent, NewRsvp, Rsvp, RsvpId,
};
use crate::services::record_store::{EventScan, RecordStore, StoreError};

pub fn event(id: i64, title: &str, status: EventStatus, capacity: u32) -> Event {
    let created = Utc.timestamp_opt(1_700_000_000 + id, 0).unwrap();
    Event {
        id: EventId(id),
        title: title.to_string(),
        body: String::new(),
        status,
        author_id: 1,
        date: None,
        time: None,
        location: String::new(),
        capacity,
        categories: vec![],
        created_at: created,
        modified_at: created,
    }
}

/// Where a slow `insert_rsvp` spends its time.
#[derive(Debug, Clone, Copy)]
pub enum InsertStall {
    /// Nothing is written until the stall ends.
    BeforeCommit(Duration),
    /// The row is written, then the call hangs.
    AfterCommit(Duration),
}

#[derive(Default)]
pub struct FakeStore {
    events: Mutex<Vec<Event>>,
    rsvps: Mutex<Vec<Rsvp>>,
    next_rsvp_id: AtomicI64,
    delay: Option<Duration>,
    insert_stall: Option<InsertStall>,
    fail_inserts: AtomicBool,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps before every call, widening race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_insert_stall(mut self, stall: InsertStall) -> Self {
        self.insert_stall = Some(stall);
        self
    }

    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    pub fn add_event(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    pub fn add_rsvp(&self, event_id: i64, email: &str) {
        let id = self.next_rsvp_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.rsvps.lock().unwrap().push(Rsvp {
            id: RsvpId(id),
            event_id: EventId(event_id),
            attendee_name: email.to_string(),
            attendee_email: email.to_string(),
            created_at: Utc::now(),
        });
    }

    pub fn rsvp_count(&self, event_id: i64) -> usize {
        self.rsvps
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.event_id == EventId(event_id))
            .count()
    }

    fn commit_rsvp(&self, rsvp: NewRsvp) -> Result<Rsvp, StoreError> {
        let capacity = self
            .events
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == rsvp.event_id)
            .map_or(0, |e| e.capacity);
        let mut rsvps = self.rsvps.lock().unwrap();
        if rsvps
            .iter()
            .any(|r| r.event_id == rsvp.event_id && r.attendee_email == rsvp.attendee_email)
        {
            return Err(StoreError::UniqueViolation("rsvps_event_email".into()));
        }
        let taken = rsvps.iter().filter(|r| r.event_id == rsvp.event_id).count();
        if capacity > 0 && taken >= capacity as usize {
            return Err(StoreError::CapacityReached(rsvp.event_id));
        }
        let id = self.next_rsvp_id.fetch_add(1, Ordering::SeqCst) + 1;
        let row = Rsvp {
            id: RsvpId(id),
            event_id: rsvp.event_id,
            attendee_name: rsvp.attendee_name,
            attendee_email: rsvp.attendee_email,
            created_at: Utc::now(),
        };
        rsvps.push(row.clone());
        Ok(row)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RecordStore for FakeStore {
    async fn query_events(
        &self,
        filter: &EventFilter,
        sort: EventSort,
        offset: u64,
        limit: u64,
    ) -> Result<EventScan, StoreError> {
        self.pause().await;
        let mut matches: Vec<Event> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.status == filter.status)
            .cloned()
            .collect();
        matches.sort_by(|a, b| sort.compare(a, b));
        let total = matches.len() as u64;
        let window = matches
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((window, total))
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        self.pause().await;
        Ok(self.events.lock().unwrap().iter().find(|e| e.id == id).cloned())
    }

    async fn count_active_rsvps(&self, event_id: EventId) -> Result<u64, StoreError> {
        self.pause().await;
        Ok(self.rsvp_count(event_id.0) as u64)
    }

    async fn count_active_rsvps_many(
        &self,
        event_ids: &[EventId],
    ) -> Result<HashMap<EventId, u64>, StoreError> {
        self.pause().await;
        Ok(event_ids
            .iter()
            .map(|id| (*id, self.rsvp_count(id.0) as u64))
            .collect())
    }

    async fn find_active_rsvp(
        &self,
        event_id: EventId,
        email: &str,
    ) -> Result<Option<Rsvp>, StoreError> {
        self.pause().await;
        Ok(self
            .rsvps
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.event_id == event_id && r.attendee_email == email)
            .cloned())
    }

    async fn insert_rsvp(&self, rsvp: NewRsvp) -> Result<Rsvp, StoreError> {
        self.pause().await;
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("insert disabled".into()));
        }
        if let Some(InsertStall::BeforeCommit(stall)) = self.insert_stall {
            tokio::time::sleep(stall).await;
        }
        let row = self.commit_rsvp(rsvp)?;
        if let Some(InsertStall::AfterCommit(stall)) = self.insert_stall {
            tokio::time::sleep(stall).await;
        }
        Ok(row)
    }

    async fn list_rsvps(&self, event_id: EventId) -> Result<Vec<Rsvp>, StoreError> {
        Ok(self
            .rsvps
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn insert_event(&self, _event: NewEvent) -> Result<Event, StoreError> {
        Err(StoreError::Backend("not supported".into()))
    }

    async fn update_event(
        &self,
        _id: EventId,
        _changes: EventChanges,
    ) -> Result<Option<Event>, StoreError> {
        Err(StoreError::Backend("not supported".into()))
    }

    async fn insert_category(&self, _category: NewCategory) -> Result<Category, StoreError> {
        Err(StoreError::Backend("not supported".into()))
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(vec![])
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
