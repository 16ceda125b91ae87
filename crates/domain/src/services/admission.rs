//! RSVP admission engine: the write path.
//!
//! A submission moves through `Received -> Validated` and ends in exactly one
//! of `DuplicateRejected`, `CapacityRejected` or `Admitted`.
//!
//! Reading the RSVP count and then inserting is not safe on its own: two
//! concurrent submissions can both observe a free slot (or both observe no
//! existing RSVP for an email) and both insert. Two mechanisms close that
//! race:
//!
//! 1. The store enforces uniqueness of `(event_id, normalized email)` among
//!    active RSVPs. A clashing insert surfaces as
//!    [`StoreError::UniqueViolation`] and is reported as
//!    [`AdmissionError::Duplicate`].
//! 2. A per-event admission lock is held from the duplicate check through the
//!    insert, so the capacity check and the insert are a single step for every
//!    submission against that event in this process. Across processes the
//!    store repeats the capacity check atomically with the insert and answers
//!    [`StoreError::CapacityReached`].
//!
//! An insert that times out is re-checked under the same lock before it is
//! reported as a failure, since the row may have been committed.
//!
//! The critical section runs on its own task. A caller that gives up on the
//! request cannot cancel it halfway through.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use shared::validation::{is_valid_email, normalize_email};
use thiserror::Error;

use crate::models::rsvp::MAX_ATTENDEE_NAME_LENGTH;
use crate::models::{EventId, NewRsvp, Rsvp};
use crate::services::admission_lock::AdmissionLocks;
use crate::services::notification::{NotificationQueue, PublishError, RsvpCreated};
use crate::services::record_store::{with_timeout, RecordStore, StoreError};

/// Admission settings, injected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionConfig {
    /// Global switch for accepting RSVPs.
    pub enabled: bool,
    pub store_timeout: Duration,
    pub lock_timeout: Duration,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            store_timeout: Duration::from_secs(5),
            lock_timeout: Duration::from_secs(10),
        }
    }
}

/// Why submitted attendee details were rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidInputReason {
    MissingName,
    MissingEmail,
    NameTooLong,
    InvalidEmail,
}

impl fmt::Display for InvalidInputReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidInputReason::MissingName => write!(f, "Name is required"),
            InvalidInputReason::MissingEmail => write!(f, "Email is required"),
            InvalidInputReason::NameTooLong => write!(
                f,
                "Name must be at most {} characters",
                MAX_ATTENDEE_NAME_LENGTH
            ),
            InvalidInputReason::InvalidEmail => write!(f, "Please enter a valid email address"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("{0}")]
    InvalidInput(InvalidInputReason),

    #[error("Event {0} not found")]
    EventNotFound(EventId),

    #[error("Event {0} is not published")]
    EventNotPublished(EventId),

    #[error("You have already RSVP'd for this event")]
    Duplicate,

    #[error("Sorry, this event has reached its capacity of {capacity}")]
    CapacityExceeded { capacity: u32 },

    #[error("RSVPs are currently disabled")]
    RsvpDisabled,

    /// Retryable. Nothing was written.
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl AdmissionError {
    /// Short label used for logs and the submissions counter.
    pub fn outcome(&self) -> &'static str {
        match self {
            AdmissionError::InvalidInput(_) => "invalid_input",
            AdmissionError::EventNotFound(_) => "event_not_found",
            AdmissionError::EventNotPublished(_) => "event_not_published",
            AdmissionError::Duplicate => "duplicate",
            AdmissionError::CapacityExceeded { .. } => "capacity_exceeded",
            AdmissionError::RsvpDisabled => "rsvp_disabled",
            AdmissionError::PersistenceFailure(_) => "persistence_failure",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AdmissionError::PersistenceFailure(_))
    }
}

impl From<StoreError> for AdmissionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(_) => AdmissionError::Duplicate,
            other => AdmissionError::PersistenceFailure(other.to_string()),
        }
    }
}

/// Lifecycle of a single submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionState {
    Received,
    Validated,
    DuplicateRejected,
    CapacityRejected,
    Admitted,
}

impl AdmissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionState::Received => "received",
            AdmissionState::Validated => "validated",
            AdmissionState::DuplicateRejected => "duplicate_rejected",
            AdmissionState::CapacityRejected => "capacity_rejected",
            AdmissionState::Admitted => "admitted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AdmissionState::DuplicateRejected
                | AdmissionState::CapacityRejected
                | AdmissionState::Admitted
        )
    }
}

/// Accepts RSVPs against per-event capacity, exactly once per email.
#[derive(Clone)]
pub struct AdmissionEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    store: Arc<dyn RecordStore>,
    locks: AdmissionLocks,
    notifications: NotificationQueue,
    config: AdmissionConfig,
}

impl AdmissionEngine {
    pub fn new(
        store: Arc<dyn RecordStore>,
        config: AdmissionConfig,
        notifications: NotificationQueue,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                store,
                locks: AdmissionLocks::new(),
                notifications,
                config,
            }),
        }
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.inner.config
    }

    /// Lock map, exposed for diagnostics.
    pub fn locks(&self) -> &AdmissionLocks {
        &self.inner.locks
    }

    /// Submits an RSVP for `event_id`.
    ///
    /// On success the stored RSVP is returned and an [`RsvpCreated`] event is
    /// queued for notification.
    pub async fn submit_rsvp(
        &self,
        event_id: EventId,
        name: &str,
        email: &str,
    ) -> Result<Rsvp, AdmissionError> {
        if !self.inner.config.enabled {
            return Err(AdmissionError::RsvpDisabled);
        }

        tracing::debug!(%event_id, state = AdmissionState::Received.as_str(), "RSVP submission");
        let (name, email) = validate_attendee(name, email)?;

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.admit(event_id, name, email).await });

        match task.await {
            Ok(result) => result,
            Err(join_error) => {
                tracing::error!(%event_id, error = %join_error, "Admission task failed");
                Err(AdmissionError::PersistenceFailure(
                    "admission task aborted".to_string(),
                ))
            }
        }
    }
}

impl EngineInner {
    async fn admit(
        &self,
        event_id: EventId,
        name: String,
        email: String,
    ) -> Result<Rsvp, AdmissionError> {
        let timeout = self.config.store_timeout;

        let _guard = self
            .locks
            .acquire(event_id, self.config.lock_timeout)
            .await
            .map_err(|e| {
                tracing::warn!(%event_id, "Admission lock acquisition timed out");
                AdmissionError::PersistenceFailure(e.to_string())
            })?;

        let event = with_timeout(timeout, "get_event", self.store.get_event(event_id))
            .await?
            .ok_or(AdmissionError::EventNotFound(event_id))?;
        if !event.is_published() {
            return Err(AdmissionError::EventNotPublished(event_id));
        }
        tracing::debug!(%event_id, state = AdmissionState::Validated.as_str(), "RSVP submission");

        let existing = with_timeout(
            timeout,
            "find_active_rsvp",
            self.store.find_active_rsvp(event_id, &email),
        )
        .await?;
        if existing.is_some() {
            tracing::info!(
                %event_id,
                state = AdmissionState::DuplicateRejected.as_str(),
                "RSVP rejected"
            );
            return Err(AdmissionError::Duplicate);
        }

        if event.capacity > 0 {
            let count = with_timeout(
                timeout,
                "count_active_rsvps",
                self.store.count_active_rsvps(event_id),
            )
            .await?;
            if event.is_full(count) {
                tracing::info!(
                    %event_id,
                    capacity = event.capacity,
                    rsvp_count = count,
                    state = AdmissionState::CapacityRejected.as_str(),
                    "RSVP rejected"
                );
                return Err(AdmissionError::CapacityExceeded {
                    capacity: event.capacity,
                });
            }
        }

        let new_rsvp = NewRsvp {
            event_id,
            attendee_name: name,
            attendee_email: email.clone(),
        };
        let rsvp = match with_timeout(timeout, "insert_rsvp", self.store.insert_rsvp(new_rsvp)).await
        {
            Ok(rsvp) => rsvp,
            Err(StoreError::UniqueViolation(constraint)) => {
                tracing::info!(
                    %event_id,
                    constraint = %constraint,
                    state = AdmissionState::DuplicateRejected.as_str(),
                    "RSVP rejected by store constraint"
                );
                return Err(AdmissionError::Duplicate);
            }
            Err(StoreError::CapacityReached(_)) => {
                tracing::info!(
                    %event_id,
                    capacity = event.capacity,
                    state = AdmissionState::CapacityRejected.as_str(),
                    "RSVP rejected by store capacity check"
                );
                return Err(AdmissionError::CapacityExceeded {
                    capacity: event.capacity,
                });
            }
            Err(err @ StoreError::Timeout(_)) => {
                self.confirm_timed_out_insert(event_id, &email, err).await?
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            %event_id,
            rsvp_id = %rsvp.id,
            state = AdmissionState::Admitted.as_str(),
            "RSVP admitted"
        );

        let created = RsvpCreated {
            rsvp_id: rsvp.id,
            event_id,
            name: rsvp.attendee_name.clone(),
            email: rsvp.attendee_email.clone(),
            occurred_at: Utc::now(),
        };
        if let Err(e) = self.notifications.publish(created) {
            match e {
                PublishError::QueueFull => {
                    tracing::warn!(rsvp_id = %rsvp.id, "Notification queue full, dropping RSVP notification")
                }
                PublishError::Closed => {
                    tracing::warn!(rsvp_id = %rsvp.id, "Notification queue closed, dropping RSVP notification")
                }
            }
        }

        Ok(rsvp)
    }

    /// An insert whose deadline expired may still have committed. The
    /// admission lock is still held, so a row found now belongs to this
    /// submission; only a missing row is reported as a failure.
    async fn confirm_timed_out_insert(
        &self,
        event_id: EventId,
        email: &str,
        timeout_err: StoreError,
    ) -> Result<Rsvp, AdmissionError> {
        let found = with_timeout(
            self.config.store_timeout,
            "find_active_rsvp",
            self.store.find_active_rsvp(event_id, email),
        )
        .await?;
        match found {
            Some(rsvp) => {
                tracing::warn!(
                    %event_id,
                    rsvp_id = %rsvp.id,
                    "RSVP insert timed out after commit"
                );
                Ok(rsvp)
            }
            None => Err(timeout_err.into()),
        }
    }
}

/// Trims and checks attendee details, returning the name and the normalized
/// email.
fn validate_attendee(name: &str, email: &str) -> Result<(String, String), AdmissionError> {
    let name = name.trim();
    let email = normalize_email(email);

    if name.is_empty() {
        return Err(AdmissionError::InvalidInput(InvalidInputReason::MissingName));
    }
    if email.is_empty() {
        return Err(AdmissionError::InvalidInput(InvalidInputReason::MissingEmail));
    }
    if name.chars().count() > MAX_ATTENDEE_NAME_LENGTH {
        return Err(AdmissionError::InvalidInput(InvalidInputReason::NameTooLong));
    }
    if !is_valid_email(&email) {
        return Err(AdmissionError::InvalidInput(InvalidInputReason::InvalidEmail));
    }

    Ok((name.to_string(), email))
}
