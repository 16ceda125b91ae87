//! RSVP entities (database row mappings).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use domain::models::{EventId, Rsvp, RsvpId};

/// Database row mapping for the rsvps table.
#[derive(Debug, Clone, FromRow)]
pub struct RsvpEntity {
    pub id: i64,
    pub event_id: i64,
    pub attendee_name: String,
    pub attendee_email: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<RsvpEntity> for Rsvp {
    fn from(entity: RsvpEntity) -> Self {
        Self {
            id: RsvpId(entity.id),
            event_id: EventId(entity.event_id),
            attendee_name: entity.attendee_name,
            attendee_email: entity.attendee_email,
            created_at: entity.created_at,
        }
    }
}

/// Active RSVP count for one event.
#[derive(Debug, Clone, FromRow)]
pub struct RsvpCountEntity {
    pub event_id: i64,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsvp_entity_conversion() {
        let rsvp: Rsvp = RsvpEntity {
            id: 9,
            event_id: 4,
            attendee_name: "Bob".to_string(),
            attendee_email: "bob@x.com".to_string(),
            created_at: Utc::now(),
            deleted_at: None,
        }
        .into();
        assert_eq!(rsvp.id, RsvpId(9));
        assert_eq!(rsvp.event_id, EventId(4));
        assert_eq!(rsvp.attendee_email, "bob@x.com");
    }
}
