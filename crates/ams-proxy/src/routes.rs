//! Router configuration.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, chat, files, health, upload};
use crate::state::ProxyState;

/// Create the proxy router with all routes and middleware.
///
/// # Routes
///
/// - `GET /health`
/// - `POST /api/v2/chat/stream`, `POST /api/v2/chat` (hotel agent, authenticated)
/// - `POST /api/v2/ds-agent/chat/stream`, `POST /api/v2/ds-agent/chat`
/// - `POST /api/v2/upload/{file,image,pdf}`, `GET /api/v2/upload/file`
/// - `GET /api/v2/files/*path`
/// - `POST /api/v1/auth/logout`
/// - `GET /api/v1/invoice/:booking_id`
pub fn create_router(state: ProxyState) -> Router {
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout();

    Router::new()
        .route("/health", get(health::health))
        // Agent chat
        .route("/api/v2/chat/stream", post(chat::hotel_stream))
        .route("/api/v2/chat", post(chat::hotel_chat))
        .route("/api/v2/ds-agent/chat/stream", post(chat::ds_stream))
        .route("/api/v2/ds-agent/chat", post(chat::ds_chat))
        // Uploads and files
        .route(
            "/api/v2/upload/file",
            post(upload::upload_file).get(upload::upload_config),
        )
        .route("/api/v2/upload/image", post(upload::upload_image))
        .route("/api/v2/upload/pdf", post(upload::upload_pdf))
        .route("/api/v2/files/*path", get(files::get_file))
        // Main API
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/invoice/:booking_id", get(files::get_invoice))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_route() {
        let app = create_router(ProxyState::new(ProxyConfig::default()));
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = create_router(ProxyState::new(ProxyConfig::default()));
        let response = app
            .oneshot(Request::get("/api/v3/nothing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    async fn preflight(app: Router, origin: &str) -> axum::response::Response {
        app.oneshot(
            Request::options("/health")
                .header("origin", origin)
                .header("access-control-request-method", "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn cors_allows_only_configured_origins() {
        let app = create_router(ProxyState::new(ProxyConfig {
            cors_origins: vec!["http://localhost:3000".to_string()],
            ..ProxyConfig::default()
        }));

        let allowed = preflight(app.clone(), "http://localhost:3000").await;
        assert_eq!(
            allowed.headers()["access-control-allow-origin"],
            "http://localhost:3000"
        );

        let denied = preflight(app, "http://evil.example").await;
        assert!(!denied.headers().contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn cors_wildcard_allows_any_origin() {
        let app = create_router(ProxyState::new(ProxyConfig {
            cors_origins: vec!["*".to_string()],
            ..ProxyConfig::default()
        }));

        let response = preflight(app, "http://evil.example").await;
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }
}
