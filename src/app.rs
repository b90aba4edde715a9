use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::auth::JwksCache;
use crate::config::Settings;
use crate::middleware::request_id_layer;
use crate::procurement::{AwardCoordinator, BidRegistry, RfpLifecycle};
use crate::routes;
use crate::services::EventPublisher;
use crate::store::ProcurementStore;

/// Shared application state.
///
/// The lifecycle, registry and coordinator all hold the same store handle;
/// routes reach the store directly only for plain reads.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProcurementStore>,
    pub lifecycle: RfpLifecycle,
    pub registry: BidRegistry,
    pub coordinator: AwardCoordinator,
    pub settings: Settings,
    pub jwks_cache: JwksCache,
    pub events: EventPublisher,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ProcurementStore>,
        settings: Settings,
        jwks_cache: JwksCache,
        events: EventPublisher,
    ) -> Arc<Self> {
        Arc::new(Self {
            lifecycle: RfpLifecycle::new(store.clone()),
            registry: BidRegistry::new(store.clone()),
            coordinator: AwardCoordinator::new(store.clone()),
            store,
            settings,
            jwks_cache,
            events,
        })
    }
}

/// Assembles the router and middleware stack.
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&state.settings);

    // Spans at DEBUG so request noise stays out of INFO logs
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG));

    let (set_request_id, propagate_request_id) = request_id_layer();

    // Layers apply bottom-up: the request id must exist before tracing runs
    Router::new()
        .merge(routes::api_router())
        .layer(propagate_request_id)
        .layer(trace_layer)
        .layer(set_request_id)
        .layer(cors)
        .with_state(state)
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors_allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    // Longer preflight cache in dev cuts down on OPTIONS requests
    let max_age = if settings.env.is_dev() {
        Duration::from_secs(86400)
    } else {
        Duration::from_secs(3600)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-request-id"),
        ]))
        .allow_credentials(true)
        .max_age(max_age)
}
