//! Admin endpoints for managing events, categories and attendee lists.
//!
//! All routes here sit behind [`crate::middleware::require_admin`].

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use domain::models::{
    Category, CreateCategoryRequest, CreateEventRequest, EventChanges, EventId, EventView,
    NewCategory, NewEvent, Rsvp, UpdateEventRequest,
};
use domain::services::{with_timeout, StoreError};
use serde::Serialize;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::AdminAccess;

/// Attendee list for one event.
#[derive(Debug, Serialize)]
pub struct EventRsvpsResponse {
    pub event_id: EventId,
    pub count: usize,
    pub rsvps: Vec<Rsvp>,
}

/// Get any event, including drafts and trashed ones.
///
/// GET /api/v1/admin/events/:event_id
pub async fn get_event(
    State(state): State<AppState>,
    Extension(_admin): Extension<AdminAccess>,
    Path(event_id): Path<i64>,
) -> Result<Json<EventView>, ApiError> {
    let event = state.catalog.get_event(EventId(event_id), true).await?;
    Ok(Json(event))
}

/// Create an event.
///
/// POST /api/v1/admin/events
pub async fn create_event(
    State(state): State<AppState>,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventView>), ApiError> {
    request.validate()?;

    let event = with_timeout(
        store_timeout(&state),
        "insert_event",
        state.store.insert_event(NewEvent::from(request)),
    )
    .await
    .map_err(unknown_category)?;

    tracing::info!(event_id = %event.id, status = %event.status, "Event created");

    Ok((StatusCode::CREATED, Json(EventView::new(event, 0))))
}

/// Partially update an event.
///
/// PATCH /api/v1/admin/events/:event_id
pub async fn update_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<Json<EventView>, ApiError> {
    request.validate()?;
    let id = EventId(event_id);
    let timeout = store_timeout(&state);

    let event = with_timeout(
        timeout,
        "update_event",
        state.store.update_event(id, EventChanges::from(request)),
    )
    .await
    .map_err(unknown_category)?
    .ok_or_else(|| ApiError::NotFound(format!("Event {} not found", id)))?;

    let rsvp_count =
        with_timeout(timeout, "count_active_rsvps", state.store.count_active_rsvps(id)).await?;

    tracing::info!(event_id = %id, "Event updated");

    Ok(Json(EventView::new(event, rsvp_count)))
}

/// List the active RSVPs of an event, oldest first.
///
/// GET /api/v1/admin/events/:event_id/rsvps
pub async fn list_event_rsvps(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Json<EventRsvpsResponse>, ApiError> {
    let id = EventId(event_id);
    let timeout = store_timeout(&state);

    if with_timeout(timeout, "get_event", state.store.get_event(id))
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound(format!("Event {} not found", id)));
    }

    let rsvps = with_timeout(timeout, "list_rsvps", state.store.list_rsvps(id)).await?;

    Ok(Json(EventRsvpsResponse {
        event_id: id,
        count: rsvps.len(),
        rsvps,
    }))
}

/// Create a category.
///
/// POST /api/v1/admin/categories
pub async fn create_category(
    State(state): State<AppState>,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    request.validate()?;

    let category = with_timeout(
        store_timeout(&state),
        "insert_category",
        state.store.insert_category(NewCategory::from(request)),
    )
    .await
    .map_err(|e| match e {
        StoreError::UniqueViolation(_) => {
            ApiError::Conflict("A category with this slug already exists".into())
        }
        StoreError::ForeignKeyViolation(_) => {
            ApiError::Validation("Parent category does not exist".into())
        }
        other => other.into(),
    })?;

    tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");

    Ok((StatusCode::CREATED, Json(category)))
}

fn store_timeout(state: &AppState) -> std::time::Duration {
    state.catalog.config().store_timeout
}

fn unknown_category(err: StoreError) -> ApiError {
    match err {
        StoreError::ForeignKeyViolation(_) => {
            ApiError::Validation("One or more categories do not exist".into())
        }
        other => other.into(),
    }
}
