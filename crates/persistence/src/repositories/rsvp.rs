//! RSVP repository for database operations.
//!
//! Only active rows (`deleted_at IS NULL`) are ever read back. Inserts rely
//! on the partial unique index `uq_rsvps_event_email_active` for duplicates
//! and on a row lock of the parent event for capacity.

use sqlx::PgPool;

use crate::entities::{RsvpCountEntity, RsvpEntity};
use crate::metrics::QueryTimer;

/// Outcome of [`RsvpRepository::create`].
#[derive(Debug)]
pub enum RsvpInsert {
    Created(RsvpEntity),
    /// The event already holds as many active RSVPs as its capacity.
    Full,
}

/// Repository for RSVP-related database operations.
#[derive(Clone)]
pub struct RsvpRepository {
    pool: PgPool,
}

impl RsvpRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Count active RSVPs for an event.
    pub async fn count_active(&self, event_id: i64) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_active_rsvps");
        let result = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM rsvps WHERE event_id = $1 AND deleted_at IS NULL",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Count active RSVPs for several events. Events without RSVPs are
    /// omitted.
    pub async fn count_active_many(
        &self,
        event_ids: &[i64],
    ) -> Result<Vec<RsvpCountEntity>, sqlx::Error> {
        let timer = QueryTimer::new("count_active_rsvps_many");
        let result = sqlx::query_as::<_, RsvpCountEntity>(
            r#"
            SELECT event_id, COUNT(*) AS count
            FROM rsvps
            WHERE event_id = ANY($1) AND deleted_at IS NULL
            GROUP BY event_id
            "#,
        )
        .bind(event_ids)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find the active RSVP for a normalized email on an event.
    pub async fn find_active_by_email(
        &self,
        event_id: i64,
        email: &str,
    ) -> Result<Option<RsvpEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_active_rsvp_by_email");
        let result = sqlx::query_as::<_, RsvpEntity>(
            r#"
            SELECT * FROM rsvps
            WHERE event_id = $1 AND attendee_email = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(event_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Insert an RSVP unless the event is at capacity.
    ///
    /// The event row is locked for the duration of the transaction, so the
    /// count and the insert are serialized against every other writer on the
    /// same event. A concurrent duplicate fails with a unique violation.
    pub async fn create(
        &self,
        event_id: i64,
        attendee_name: &str,
        attendee_email: &str,
    ) -> Result<RsvpInsert, sqlx::Error> {
        let timer = QueryTimer::new("create_rsvp");
        let mut tx = self.pool.begin().await?;

        let capacity = sqlx::query_scalar::<_, i32>(
            "SELECT capacity FROM events WHERE id = $1 FOR UPDATE",
        )
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(capacity) = capacity.filter(|c| *c > 0) {
            let count = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM rsvps WHERE event_id = $1 AND deleted_at IS NULL",
            )
            .bind(event_id)
            .fetch_one(&mut *tx)
            .await?;
            if count >= i64::from(capacity) {
                tx.rollback().await?;
                timer.record();
                return Ok(RsvpInsert::Full);
            }
        }

        let entity = sqlx::query_as::<_, RsvpEntity>(
            r#"
            INSERT INTO rsvps (event_id, attendee_name, attendee_email)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(event_id)
        .bind(attendee_name)
        .bind(attendee_email)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(RsvpInsert::Created(entity))
    }

    /// List active RSVPs for an event, oldest first.
    pub async fn list_active(&self, event_id: i64) -> Result<Vec<RsvpEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_active_rsvps");
        let result = sqlx::query_as::<_, RsvpEntity>(
            r#"
            SELECT * FROM rsvps
            WHERE event_id = $1 AND deleted_at IS NULL
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
