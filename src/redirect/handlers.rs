use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use super::orchestrator::Redirector;
use crate::analytics::extract_visit_context;

pub struct RedirectState {
    pub redirector: Redirector,
    pub home_url: String,
    pub redirect_status: StatusCode,
}

/// Resolve a short code and redirect, tracking the click on the way
pub async fn redirect_link(
    State(state): State<Arc<RedirectState>>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Response {
    let visit = extract_visit_context(&headers);
    let target = state.redirector.handle(&code, visit).await;

    redirect_to(
        state.redirect_status,
        target.location(&state.home_url),
        &state.home_url,
    )
}

fn redirect_to(status: StatusCode, location: &str, home_url: &str) -> Response {
    let location = HeaderValue::from_str(location).unwrap_or_else(|_| {
        warn!(location, "destination is not a valid Location header, redirecting home");
        HeaderValue::from_str(home_url).unwrap_or_else(|_| HeaderValue::from_static("/"))
    });

    (status, [(header::LOCATION, location)]).into_response()
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    #[derive(Serialize)]
    struct HealthResponse {
        status: String,
    }

    Json(HealthResponse {
        status: "OK".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_to_sets_location() {
        let response = redirect_to(StatusCode::FOUND, "https://example.com/x", "/");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://example.com/x"
        );
    }

    #[test]
    fn test_invalid_location_falls_back_home() {
        let response = redirect_to(
            StatusCode::TEMPORARY_REDIRECT,
            "https://example.com/\nbad",
            "/home",
        );
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/home");
    }
}
