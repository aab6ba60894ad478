//! CORS layer wrapping `tower_http`, configured from the `FRONTEND_URL`
//! the runtime's config layer validates at startup.

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

/// Builds the CORS layer for the operational surface. A `None` or
/// unparsable `frontend_url` falls back to an any-origin layer: these
/// routes are read-only operational endpoints, not the external REST
/// surface that carries user data.
pub fn create_cors_layer(frontend_url: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    match frontend_url.and_then(|u| u.parse::<HeaderValue>().ok()) {
        Some(origin) => layer.allow_origin(origin),
        None => layer.allow_origin(Any),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_any_origin_without_config() {
        let _layer = create_cors_layer(None);
    }

    #[test]
    fn accepts_a_configured_origin() {
        let _layer = create_cors_layer(Some("https://app.chainguard.example"));
    }
}
