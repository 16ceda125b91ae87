//! Common test utilities for integration tests.
//!
//! Every test builds its own application over a fresh in-memory record
//! store, so tests never share state and need no database.

// Helpers are shared across test binaries; not every binary uses all of them.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use chrono::NaiveDate;
use domain::models::{Category, Event, EventStatus, NewCategory, NewEvent};
use domain::services::{
    spawn_notification_worker, MockNotificationDispatcher, RecordStore,
};
use event_manager_api::{
    app::{create_app, AppState},
    config::Config,
};
use persistence::InMemoryRecordStore;

pub const ADMIN_KEY: &str = "test-admin-key";

/// Create a test configuration with overrides applied.
pub fn test_config(overrides: &[(&str, &str)]) -> Config {
    Config::load_for_test(overrides).expect("Failed to load test config")
}

/// A running application over an in-memory store.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryRecordStore>,
    pub notifications: MockNotificationDispatcher,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config(&[]))
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(InMemoryRecordStore::new());
        let dyn_store: Arc<dyn RecordStore> = store.clone();
        let (state, receiver) = AppState::new(config, dyn_store);

        let notifications = MockNotificationDispatcher::new();
        spawn_notification_worker(receiver, Arc::new(notifications.clone()));

        Self {
            router: create_app(state),
            store,
            notifications,
        }
    }

    /// Send one request through a clone of the router.
    pub async fn send(&self, request: Request<Body>) -> Response {
        use tower::ServiceExt;
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible")
    }

    pub async fn create_category(&self, name: &str, slug: &str) -> Category {
        self.store
            .insert_category(NewCategory {
                name: name.to_string(),
                slug: slug.to_string(),
                parent_id: None,
            })
            .await
            .expect("Failed to insert category")
    }

    pub async fn create_event(&self, event: TestEvent) -> Event {
        self.store
            .insert_event(event.into())
            .await
            .expect("Failed to insert event")
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for seeded events.
#[derive(Debug, Clone)]
pub struct TestEvent {
    pub title: String,
    pub body: String,
    pub status: EventStatus,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub location: String,
    pub capacity: u32,
    pub categories: Vec<Category>,
}

impl TestEvent {
    pub fn published(title: &str) -> Self {
        Self {
            title: title.to_string(),
            body: format!("All about {}", title),
            status: EventStatus::Published,
            date: None,
            time: None,
            location: String::new(),
            capacity: 0,
            categories: vec![],
        }
    }

    pub fn draft(title: &str) -> Self {
        Self {
            status: EventStatus::Draft,
            ..Self::published(title)
        }
    }

    pub fn on(mut self, year: i32, month: u32, day: u32) -> Self {
        self.date = NaiveDate::from_ymd_opt(year, month, day);
        self
    }

    pub fn at(mut self, location: &str) -> Self {
        self.location = location.to_string();
        self
    }

    pub fn capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn in_category(mut self, category: &Category) -> Self {
        self.categories.push(category.clone());
        self
    }
}

impl From<TestEvent> for NewEvent {
    fn from(e: TestEvent) -> Self {
        NewEvent {
            title: e.title,
            body: e.body,
            status: e.status,
            author_id: 1,
            date: e.date,
            time: e.time,
            location: e.location,
            capacity: e.capacity,
            category_ids: e.categories.iter().map(|c| c.id).collect(),
        }
    }
}

/// Build a GET request.
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Build a JSON request.
pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a form-encoded POST request.
pub fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build a GET request with the admin key.
pub fn admin_get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("X-Admin-Key", ADMIN_KEY)
        .body(Body::empty())
        .unwrap()
}

/// Build a JSON request with the admin key.
pub fn admin_json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Admin-Key", ADMIN_KEY)
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Helper to parse JSON response body.
pub async fn parse_response_body(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
}

/// Titles of the `items` array of a list response, in order.
pub fn titles(body: &serde_json::Value) -> Vec<String> {
    body["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|i| i["title"].as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}
