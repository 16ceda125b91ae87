//! Category endpoints.

use axum::{extract::State, Json};
use domain::models::Category;
use domain::services::with_timeout;

use crate::app::AppState;
use crate::error::ApiError;

/// List all categories.
///
/// GET /api/v1/categories
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = with_timeout(
        state.catalog.config().store_timeout,
        "list_categories",
        state.store.list_categories(),
    )
    .await?;
    Ok(Json(categories))
}
