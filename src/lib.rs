use std::time::Instant;

use axum::{
    http::{header, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use once_cell::sync::Lazy;
use serde_json::json;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::warn;

pub mod config;
pub mod controllers;
pub mod db;
pub mod middleware;
pub mod models;
pub mod polls;
pub mod routes;
pub mod state;
pub mod utils;

use state::AppState;

static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

/// Hardening headers sent outside development. Handlers may override them.
pub const SECURITY_HEADERS: [(&str, &str); 8] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "SAMEORIGIN"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=31536000; includeSubDomains"),
    ("x-dns-prefetch-control", "off"),
    ("x-permitted-cross-domain-policies", "none"),
    ("cross-origin-opener-policy", "same-origin"),
    ("x-xss-protection", "0"),
];

pub fn build_router(state: AppState) -> Router {
    Lazy::force(&START_TIME);

    let mut router = Router::new()
        .route("/", get(root))
        .nest("/api/polls", routes::poll_routes::poll_routes(state.clone()))
        .merge(routes::socket_routes::socket_routes())
        .fallback(not_found);

    if state.config.is_production() {
        for (name, value) in SECURITY_HEADERS {
            router = router.layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            ));
        }
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origin))
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::USER_AGENT,
            header::COOKIE,
            header::HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true);

    match origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            warn!(%origin, error = %e, "unusable CORS origin, cross-origin requests will be refused");
            layer
        }
    }
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "name": "PollVerse API",
        "status": "online",
        "message": format!("Backend is running! Uptime: {}", format_uptime(START_TIME.elapsed().as_secs()))
    }))
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": format!("Route {} not found", uri.path())
        })),
    )
}

fn format_uptime(seconds: u64) -> String {
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours % 24, minutes % 60, seconds % 60)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes % 60, seconds % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}
