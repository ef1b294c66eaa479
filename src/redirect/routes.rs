use axum::{http::StatusCode, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{health_check, redirect_link, RedirectState};
use super::orchestrator::Redirector;

pub fn create_redirect_router(
    redirector: Redirector,
    home_url: impl Into<String>,
    redirect_status: StatusCode,
) -> Router {
    let state = Arc::new(RedirectState {
        redirector,
        home_url: home_url.into(),
        redirect_status,
    });

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/l/{code}", get(redirect_link))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
