//! Event entity (database row mapping).

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use domain::models::{CategoryRef, Event, EventId, EventStatus};

/// Database row mapping for the events table.
#[derive(Debug, Clone, FromRow)]
pub struct EventEntity {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub status: String,
    pub author_id: i64,
    pub event_date: Option<NaiveDate>,
    pub event_time: Option<String>,
    pub location: String,
    pub capacity: i32,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl EventEntity {
    /// Converts the row into the domain event with its resolved categories.
    ///
    /// An unrecognised status is read as draft so the event stays hidden.
    pub fn into_domain(self, categories: Vec<CategoryRef>) -> Event {
        Event {
            id: EventId(self.id),
            title: self.title,
            body: self.body,
            status: EventStatus::parse(&self.status).unwrap_or(EventStatus::Draft),
            author_id: self.author_id,
            date: self.event_date,
            time: self.event_time,
            location: self.location,
            capacity: self.capacity.max(0) as u32,
            categories,
            created_at: self.created_at,
            modified_at: self.modified_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::CategoryId;

    fn create_test_event_entity() -> EventEntity {
        EventEntity {
            id: 42,
            title: "Community Meetup".to_string(),
            body: "Monthly meetup".to_string(),
            status: "published".to_string(),
            author_id: 3,
            event_date: NaiveDate::from_ymd_opt(2026, 1, 20),
            event_time: Some("18:00".to_string()),
            location: "Library".to_string(),
            capacity: 25,
            created_at: Utc::now(),
            modified_at: Utc::now(),
        }
    }

    #[test]
    fn test_event_entity_into_domain() {
        let categories = vec![CategoryRef {
            id: CategoryId(1),
            name: "Community".to_string(),
            slug: "community".to_string(),
        }];
        let event = create_test_event_entity().into_domain(categories);
        assert_eq!(event.id, EventId(42));
        assert_eq!(event.status, EventStatus::Published);
        assert_eq!(event.capacity, 25);
        assert_eq!(event.time.as_deref(), Some("18:00"));
        assert!(event.has_category("community"));
    }

    #[test]
    fn test_unknown_status_reads_as_draft() {
        let mut entity = create_test_event_entity();
        entity.status = "pending".to_string();
        assert_eq!(entity.into_domain(vec![]).status, EventStatus::Draft);
    }
}
