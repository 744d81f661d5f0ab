pub mod config;
pub mod db;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod services;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Settings;
use crate::handlers::{health, pages, session_api};
use crate::middleware::{gate, headers, throttle::CheckThrottle};
use crate::services::{CodeLifecycle, CodeStore, SessionValidator, TokenIssuer};

pub const SERVICE_NAME: &str = "access-service";

/// Shared per-request state. All authority lives in the store; the throttle
/// is the only cross-request in-process mutable state and is best-effort.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn CodeStore>,
    pub lifecycle: CodeLifecycle,
    pub validator: SessionValidator,
    pub tokens: TokenIssuer,
    pub throttle: Arc<CheckThrottle>,
}

impl AppState {
    pub fn new(settings: Settings, store: Arc<dyn CodeStore>) -> Self {
        let tokens = TokenIssuer::new(&settings.auth);
        let throttle = Arc::new(CheckThrottle::new(
            Duration::from_secs(settings.gate.min_check_interval_secs),
            settings.gate.throttle_capacity,
        ));

        Self {
            settings: Arc::new(settings),
            lifecycle: CodeLifecycle::new(store.clone()),
            validator: SessionValidator::new(store.clone()),
            tokens,
            throttle,
            store,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    // Cookie-session setup. The cookie only carries a capability reference;
    // the store remains authoritative on every privileged request.
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false) // Set to true in production with HTTPS
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(24)));

    let protected = Router::new()
        .route("/", get(pages::dashboard))
        .route("/dashboard", get(pages::dashboard))
        .route_layer(from_fn_with_state(state.clone(), gate::access_gate));

    Router::new()
        .merge(protected)
        .route("/login", get(pages::login_page).post(pages::web_login))
        .route("/logout", get(pages::logout))
        .route("/api/login", post(session_api::api_login))
        .route("/api/check_session", get(session_api::check_session))
        .route("/api/session_updated", post(session_api::session_updated))
        // Session-bearing responses must never be cached; /health is added
        // after this layer and stays cacheable.
        .layer(from_fn(headers::no_store_middleware))
        .route("/health", get(health::health_check))
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(headers::REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(headers::request_id_middleware))
        .with_state(state)
}
