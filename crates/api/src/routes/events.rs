//! Public event catalog endpoints.
//!
//! Query parameters are read leniently: malformed or missing values fall
//! back to defaults, and `per_page` is clamped into the configured range.

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue},
    Json,
};
use domain::models::{
    DateRange, EventId, EventPage, EventView, QuerySpec, SortDirection, SortKey,
};
use serde::Deserialize;
use shared::pagination::PageRequest;
use shared::validation::parse_calendar_date;

use crate::app::AppState;
use crate::error::ApiError;

pub const TOTAL_COUNT_HEADER: &str = "x-total-count";
pub const TOTAL_PAGES_HEADER: &str = "x-total-pages";

/// Raw list parameters. Everything is a string so bad values never fail
/// extraction.
#[derive(Debug, Default, Deserialize)]
pub struct ListEventsQuery {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub orderby: Option<String>,
    pub order: Option<String>,
    pub category: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub location: Option<String>,
    pub search: Option<String>,
}

impl ListEventsQuery {
    /// Normalizes the raw parameters into a catalog query.
    pub fn into_spec(self, default_page_size: u32, max_page_size: u32) -> QuerySpec {
        let page = PageRequest::lenient(
            parse_int(&self.page),
            parse_int(&self.per_page),
            default_page_size,
            max_page_size,
        );

        let sort_key = match lowered(&self.orderby).as_deref() {
            Some("title") => SortKey::Title,
            Some("event_date") => SortKey::EventDate,
            _ => SortKey::CreatedDate,
        };
        let sort_direction = match lowered(&self.order).as_deref() {
            Some("asc") => SortDirection::Ascending,
            _ => SortDirection::Descending,
        };

        let from = self.date_from.as_deref().and_then(parse_calendar_date);
        let to = self.date_to.as_deref().and_then(parse_calendar_date);
        let date_range = DateRange::new(from, to);

        QuerySpec {
            page: page.page(),
            page_size: page.page_size(),
            sort_key,
            sort_direction,
            category_slug: non_blank(self.category),
            date_range: (!date_range.is_open()).then_some(date_range),
            location: non_blank(self.location),
            search: non_blank(self.search),
        }
    }
}

fn parse_int(value: &Option<String>) -> Option<i64> {
    value.as_deref().and_then(|v| v.trim().parse().ok())
}

fn lowered(value: &Option<String>) -> Option<String> {
    value.as_deref().map(|v| v.trim().to_ascii_lowercase())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// List published events.
///
/// GET /api/v1/events
pub async fn list_events(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<ListEventsQuery>,
) -> Result<(HeaderMap, Json<EventPage>), ApiError> {
    let config = state.catalog.config();
    let spec = query.into_spec(config.default_page_size, config.max_page_size);

    let page = state.catalog.list_events(&spec).await?;

    let headers = pagination_headers(uri.path(), uri.query().unwrap_or(""), &page);
    Ok((headers, Json(page)))
}

/// Get a published event.
///
/// GET /api/v1/events/:event_id
pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Json<EventView>, ApiError> {
    let event = state.catalog.get_event(EventId(event_id), false).await?;
    Ok(Json(event))
}

/// Builds `X-Total-Count`, `X-Total-Pages` and a `Link` header with
/// `prev`/`next` relations pointing at the same query on adjacent pages.
pub fn pagination_headers(path: &str, query: &str, page: &EventPage) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(TOTAL_COUNT_HEADER),
        HeaderValue::from(page.total_count),
    );
    headers.insert(
        HeaderName::from_static(TOTAL_PAGES_HEADER),
        HeaderValue::from(page.total_pages),
    );

    let mut links = Vec::new();
    if page.has_prev() {
        let prev = (page.page as u64 - 1).min(page.total_pages.max(1));
        links.push(format!("<{}>; rel=\"prev\"", page_url(path, query, prev)));
    }
    if page.has_next() {
        links.push(format!(
            "<{}>; rel=\"next\"",
            page_url(path, query, page.page as u64 + 1)
        ));
    }
    if !links.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&links.join(", ")) {
            headers.insert(header::LINK, value);
        }
    }

    headers
}

fn page_url(path: &str, query: &str, page: u64) -> String {
    let mut params: Vec<&str> = query
        .split('&')
        .filter(|p| !p.is_empty() && *p != "page" && !p.starts_with("page="))
        .collect();
    let page_param = format!("page={}", page);
    params.push(&page_param);
    format!("{}?{}", path, params.join("&"))
}
