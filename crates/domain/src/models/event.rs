//! Event domain model.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};
use validator::Validate;

use super::category::{CategoryId, CategoryRef};

/// Number of words kept in an event excerpt.
pub const EXCERPT_WORDS: usize = 55;

/// Store-assigned event identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub i64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Publication status of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Published,
    Trashed,
}

impl EventStatus {
    /// Converts to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Published => "published",
            EventStatus::Trashed => "trashed",
        }
    }

    /// Parses from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(EventStatus::Draft),
            "published" => Some(EventStatus::Published),
            "trashed" => Some(EventStatus::Trashed),
            _ => None,
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event record as held by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub body: String,
    pub status: EventStatus,
    pub author_id: i64,
    pub date: Option<NaiveDate>,
    /// 24h `HH:MM`.
    pub time: Option<String>,
    pub location: String,
    /// Maximum number of active RSVPs; 0 means unlimited.
    pub capacity: u32,
    pub categories: Vec<CategoryRef>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Event {
    pub fn is_published(&self) -> bool {
        self.status == EventStatus::Published
    }

    /// Remaining slots given the current number of active RSVPs.
    pub fn available_slots(&self, rsvp_count: u64) -> AvailableSlots {
        if self.capacity == 0 {
            AvailableSlots::Unlimited
        } else {
            AvailableSlots::Remaining((self.capacity as u64).saturating_sub(rsvp_count))
        }
    }

    /// True when another admission would exceed capacity.
    pub fn is_full(&self, rsvp_count: u64) -> bool {
        self.capacity > 0 && rsvp_count >= self.capacity as u64
    }

    pub fn has_category(&self, slug: &str) -> bool {
        self.categories.iter().any(|c| c.slug == slug)
    }
}

/// Slots left on an event.
///
/// Serializes as the string `"unlimited"` or a non-negative number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailableSlots {
    Unlimited,
    Remaining(u64),
}

impl Serialize for AvailableSlots {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AvailableSlots::Unlimited => serializer.serialize_str("unlimited"),
            AvailableSlots::Remaining(n) => serializer.serialize_u64(*n),
        }
    }
}

impl fmt::Display for AvailableSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvailableSlots::Unlimited => f.write_str("unlimited"),
            AvailableSlots::Remaining(n) => write!(f, "{}", n),
        }
    }
}

/// Read-only projection of an event returned by the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub id: EventId,
    pub title: String,
    pub body: String,
    pub excerpt: String,
    pub status: EventStatus,
    pub author_id: i64,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub location: String,
    pub capacity: u32,
    pub categories: Vec<CategoryRef>,
    pub rsvp_count: u64,
    pub available_slots: AvailableSlots,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl EventView {
    pub fn new(event: Event, rsvp_count: u64) -> Self {
        let available_slots = event.available_slots(rsvp_count);
        let excerpt = excerpt(&event.body, EXCERPT_WORDS);
        Self {
            id: event.id,
            title: event.title,
            body: event.body,
            excerpt,
            status: event.status,
            author_id: event.author_id,
            date: event.date,
            time: event.time,
            location: event.location,
            capacity: event.capacity,
            categories: event.categories,
            rsvp_count,
            available_slots,
            created_at: event.created_at,
            modified_at: event.modified_at,
        }
    }
}

/// First `max_words` whitespace-separated words of `body`, with an ellipsis
/// when anything was cut.
pub fn excerpt(body: &str, max_words: usize) -> String {
    let mut words = body.split_whitespace();
    let kept: Vec<&str> = words.by_ref().take(max_words).collect();
    let mut out = kept.join(" ");
    if words.next().is_some() {
        out.push_str("...");
    }
    out
}

fn default_author_id() -> i64 {
    1
}

fn default_status() -> EventStatus {
    EventStatus::Draft
}

/// Request payload for creating an event.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[serde(default)]
    pub body: String,

    #[serde(default = "default_status")]
    pub status: EventStatus,

    #[serde(default = "default_author_id")]
    pub author_id: i64,

    pub date: Option<NaiveDate>,

    #[validate(custom(function = "shared::validation::validate_time_of_day"))]
    pub time: Option<String>,

    #[serde(default)]
    #[validate(length(max = 255, message = "Location must be at most 255 characters"))]
    pub location: String,

    #[serde(default)]
    #[validate(range(max = 2147483647, message = "Capacity must be at most 2147483647"))]
    pub capacity: u32,

    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
}

/// Request payload for updating an event (partial update).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    pub body: Option<String>,

    pub status: Option<EventStatus>,

    /// `Some(None)` clears the date.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub date: Option<Option<NaiveDate>>,

    #[validate(custom(function = "shared::validation::validate_time_of_day"))]
    pub time: Option<String>,

    #[validate(length(max = 255, message = "Location must be at most 255 characters"))]
    pub location: Option<String>,

    #[validate(range(max = 2147483647, message = "Capacity must be at most 2147483647"))]
    pub capacity: Option<u32>,

    pub category_ids: Option<Vec<CategoryId>>,
}

fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Validated input for inserting an event into the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub body: String,
    pub status: EventStatus,
    pub author_id: i64,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub location: String,
    pub capacity: u32,
    pub category_ids: Vec<CategoryId>,
}

impl From<CreateEventRequest> for NewEvent {
    fn from(req: CreateEventRequest) -> Self {
        Self {
            title: req.title.trim().to_string(),
            body: req.body,
            status: req.status,
            author_id: req.author_id,
            date: req.date,
            time: req.time.filter(|t| !t.is_empty()),
            location: req.location.trim().to_string(),
            capacity: req.capacity,
            category_ids: req.category_ids,
        }
    }
}

/// Field changes applied by an event update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventChanges {
    pub title: Option<String>,
    pub body: Option<String>,
    pub status: Option<EventStatus>,
    pub date: Option<Option<NaiveDate>>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub capacity: Option<u32>,
    pub category_ids: Option<Vec<CategoryId>>,
}

impl From<UpdateEventRequest> for EventChanges {
    fn from(req: UpdateEventRequest) -> Self {
        Self {
            title: req.title.map(|t| t.trim().to_string()),
            body: req.body,
            status: req.status,
            date: req.date,
            time: req.time,
            location: req.location.map(|l| l.trim().to_string()),
            capacity: req.capacity,
            category_ids: req.category_ids,
        }
    }
}

impl EventChanges {
    /// Applies the changes to `event` in place. Category references are
    /// resolved by the store and are not touched here.
    pub fn apply_to(&self, event: &mut Event) {
        if let Some(title) = &self.title {
            event.title = title.clone();
        }
        if let Some(body) = &self.body {
            event.body = body.clone();
        }
        if let Some(status) = self.status {
            event.status = status;
        }
        if let Some(date) = self.date {
            event.date = date;
        }
        if let Some(time) = &self.time {
            event.time = if time.is_empty() { None } else { Some(time.clone()) };
        }
        if let Some(location) = &self.location {
            event.location = location.clone();
        }
        if let Some(capacity) = self.capacity {
            event.capacity = capacity;
        }
    }
}
