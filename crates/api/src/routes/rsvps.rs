//! RSVP submission endpoints.

use axum::{
    extract::{Path, State},
    http::{Extensions, StatusCode},
    Form, Json,
};
use domain::models::{EventId, RsvpFormRequest, RsvpResponse, SubmitRsvpRequest};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::get_request_id;
use crate::middleware::metrics::record_rsvp_submission;

/// Submit an RSVP for an event.
///
/// POST /api/v1/events/:event_id/rsvps
pub async fn submit_rsvp(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    extensions: Extensions,
    Json(request): Json<SubmitRsvpRequest>,
) -> Result<(StatusCode, Json<RsvpResponse>), ApiError> {
    let request = RsvpFormRequest {
        event_id,
        name: request.name,
        email: request.email,
    };
    admit(&state, &extensions, request).await
}

/// Submit an RSVP from the classic form post.
///
/// POST /api/v1/rsvp
pub async fn submit_rsvp_form(
    State(state): State<AppState>,
    extensions: Extensions,
    Form(request): Form<RsvpFormRequest>,
) -> Result<(StatusCode, Json<RsvpResponse>), ApiError> {
    admit(&state, &extensions, request).await
}

async fn admit(
    state: &AppState,
    extensions: &Extensions,
    request: RsvpFormRequest,
) -> Result<(StatusCode, Json<RsvpResponse>), ApiError> {
    request.validate()?;
    let request_id = get_request_id(extensions);
    let event_id = EventId(request.event_id);

    match state
        .admission
        .submit_rsvp(event_id, &request.name, &request.email)
        .await
    {
        Ok(rsvp) => {
            record_rsvp_submission("admitted");
            tracing::info!(
                request_id = %request_id,
                event_id = %event_id,
                rsvp_id = %rsvp.id,
                "RSVP admitted"
            );
            Ok((StatusCode::CREATED, Json(RsvpResponse::from(rsvp))))
        }
        Err(err) => {
            record_rsvp_submission(err.outcome());
            if err.is_retryable() {
                tracing::warn!(
                    request_id = %request_id,
                    event_id = %event_id,
                    error = %err,
                    "RSVP admission failed"
                );
            } else {
                tracing::info!(
                    request_id = %request_id,
                    event_id = %event_id,
                    outcome = err.outcome(),
                    "RSVP rejected"
                );
            }
            Err(err.into())
        }
    }
}
