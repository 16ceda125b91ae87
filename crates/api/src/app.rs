use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use domain::services::{
    AdmissionConfig, AdmissionEngine, CatalogConfig, EventCatalog, NotificationQueue,
    RecordStore, RsvpCreated,
};
use tokio::sync::mpsc;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, rate_limit_middleware, require_admin,
    security_headers_middleware, trace_id, RateLimiterState,
};
use crate::routes::{admin, categories, events, health, rsvps};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn RecordStore>,
    pub catalog: EventCatalog,
    pub admission: AdmissionEngine,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
}

impl AppState {
    /// Wires the catalog and admission engine over `store`.
    ///
    /// Returns the receiving end of the notification queue; the caller
    /// decides which dispatcher drains it.
    pub fn new(config: Config, store: Arc<dyn RecordStore>) -> (Self, mpsc::Receiver<RsvpCreated>) {
        let (notifications, receiver) = NotificationQueue::bounded(config.rsvp.queue_capacity);

        let catalog = EventCatalog::new(Arc::clone(&store), CatalogConfig::from(&config.catalog));
        let admission = AdmissionEngine::new(
            Arc::clone(&store),
            AdmissionConfig::from(&config.rsvp),
            notifications,
        );
        let rate_limiter = RateLimiterState::new(
            config.security.rsvp_rate_limit_per_minute,
            config.security.trust_proxy_headers,
        )
        .map(Arc::new);

        let state = Self {
            config: Arc::new(config),
            store,
            catalog,
            admission,
            rate_limiter,
        };
        (state, receiver)
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    let cors = if config.security.cors_origins.is_empty() {
        // Development default: allow any origin
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Public catalog reads
    let catalog_routes = Router::new()
        .route("/api/v1/events", get(events::list_events))
        .route("/api/v1/events/:event_id", get(events::get_event))
        .route("/api/v1/categories", get(categories::list_categories));

    // RSVP submission, rate limited per client
    let rsvp_routes = Router::new()
        .route("/api/v1/events/:event_id/rsvps", post(rsvps::submit_rsvp))
        .route("/api/v1/rsvp", post(rsvps::submit_rsvp_form))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    // Admin routes (require X-Admin-Key)
    let admin_routes = Router::new()
        .route("/api/v1/admin/events", post(admin::create_event))
        .route(
            "/api/v1/admin/events/:event_id",
            get(admin::get_event).patch(admin::update_event),
        )
        .route(
            "/api/v1/admin/events/:event_id/rsvps",
            get(admin::list_event_rsvps),
        )
        .route("/api/v1/admin/categories", post(admin::create_category))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(catalog_routes)
        .merge(rsvp_routes)
        .merge(admin_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
