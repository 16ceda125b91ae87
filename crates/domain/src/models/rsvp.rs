//! RSVP domain model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::event::EventId;

/// Maximum attendee name length in characters.
pub const MAX_ATTENDEE_NAME_LENGTH: usize = 200;

/// Store-assigned RSVP identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RsvpId(pub i64);

impl fmt::Display for RsvpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A confirmed attendance record. Never updated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rsvp {
    pub id: RsvpId,
    pub event_id: EventId,
    pub attendee_name: String,
    /// Trimmed and lower-cased.
    pub attendee_email: String,
    pub created_at: DateTime<Utc>,
}

/// Input for inserting an RSVP. Built only by the admission engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRsvp {
    pub event_id: EventId,
    pub attendee_name: String,
    pub attendee_email: String,
}

/// JSON body for submitting an RSVP against an event in the path.
///
/// Fields are checked by the admission engine.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRsvpRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Form body for the classic RSVP form post. JSON submissions are folded
/// into the same shape so both paths validate alike.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RsvpFormRequest {
    #[validate(range(min = 1, message = "event_id must be a positive integer"))]
    pub event_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Response for a successful RSVP.
#[derive(Debug, Clone, Serialize)]
pub struct RsvpResponse {
    pub id: RsvpId,
    pub event_id: EventId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub message: String,
}

impl From<Rsvp> for RsvpResponse {
    fn from(rsvp: Rsvp) -> Self {
        Self {
            id: rsvp.id,
            event_id: rsvp.event_id,
            name: rsvp.attendee_name,
            email: rsvp.attendee_email,
            created_at: rsvp.created_at,
            message: "Your RSVP has been confirmed".to_string(),
        }
    }
}
