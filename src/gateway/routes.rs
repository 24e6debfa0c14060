use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use tower_http::trace::TraceLayer;

use super::manager::RelayAppState;
use super::relay;

/// Bare and namespaced aliases; the CMS editor and the legacy admin page use different ones.
const START_AUTH_PATHS: [&str; 2] = ["/auth", "/oauth/auth"];
const CALLBACK_PATHS: [&str; 2] = ["/callback", "/oauth/callback"];

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    app: &'static str,
    version: &'static str,
    ts: u64,
}

fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        app: "cms-oauth-relay",
        version: env!("CARGO_PKG_VERSION"),
        ts: now_unix_seconds(),
    })
}

async fn root() -> &'static str {
    "CMS OAuth relay is running"
}

pub(super) fn build_router(state: RelayAppState) -> Router {
    let mut router = Router::new()
        .route("/", get(root))
        .route("/health", get(health));

    for path in START_AUTH_PATHS {
        router = router.route(path, get(relay::start_auth));
    }
    for path in CALLBACK_PATHS {
        router = router.route(path, get(relay::handle_callback));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
