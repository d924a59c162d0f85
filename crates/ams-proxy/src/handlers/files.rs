//! File and invoice routes.

use axum::extract::{Path, State};
use axum::http::HeaderValue;
use axum::http::header::{ACCEPT, CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::ApiError;
use crate::state::ProxyState;

/// `GET /api/v2/files/*path`: serve a stored upload or generated artifact
pub async fn get_file(
    State(state): State<ProxyState>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    if !is_plain_path(&path) {
        return Err(ApiError::Detail {
            status: axum::http::StatusCode::BAD_REQUEST,
            detail: "Invalid file path".to_string(),
        });
    }

    let upstream = state
        .http
        .get(state.llm_url(&format!("/api/v2/files/{}", path)))
        .header(ACCEPT, "*/*")
        .send()
        .await
        .map_err(|e| ApiError::Detail {
            status: axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            detail: format!("Error serving file: {}", e),
        })?;

    if !upstream.status().is_success() {
        return Err(ApiError::from_upstream(upstream, json!({ "detail": "File not found" })).await);
    }

    let content_type = upstream
        .headers()
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    let filename = path.rsplit('/').next().unwrap_or(path.as_str()).to_string();

    let bytes = upstream.bytes().await.map_err(|e| ApiError::Detail {
        status: axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        detail: format!("Error serving file: {}", e),
    })?;

    Ok((
        [
            (CONTENT_TYPE, content_type),
            (CONTENT_DISPOSITION, header_value(&format!("inline; filename=\"{}\"", filename))),
            (CACHE_CONTROL, HeaderValue::from_static("public, max-age=3600")),
        ],
        bytes,
    )
        .into_response())
}

/// `GET /api/v1/invoice/:booking_id`: booking invoice PDF from the main API
pub async fn get_invoice(
    State(state): State<ProxyState>,
    Path(booking_id): Path<String>,
) -> Result<Response, ApiError> {
    if booking_id.contains('/') || !is_plain_path(&booking_id) {
        return Err(ApiError::BadRequest("Invalid booking id".to_string()));
    }

    let failed = |details: String| ApiError::TransferFailed {
        message: "Failed to generate invoice",
        code: "INVOICE_GENERATION_FAILED",
        details,
    };

    let upstream = state
        .http
        .get(state.api_url(&format!("/api/v1/invoice/{}", booking_id)))
        .header(ACCEPT, "application/pdf")
        .send()
        .await
        .map_err(|e| failed(e.to_string()))?;

    if !upstream.status().is_success() {
        return Err(ApiError::from_upstream(
            upstream,
            json!({ "message": "Failed to generate invoice" }),
        )
        .await);
    }

    let pdf = upstream.bytes().await.map_err(|e| failed(e.to_string()))?;

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (
                CONTENT_DISPOSITION,
                header_value(&format!("inline; filename=invoice_{}.pdf", booking_id)),
            ),
        ],
        pdf,
    )
        .into_response())
}

/// Whether a decoded path parameter stays where it is pasted in an upstream
/// URL: no dot or empty segments, no query or fragment.
fn is_plain_path(path: &str) -> bool {
    !path.contains(['?', '#', '\\'])
        && path.split('/').all(|segment| !matches!(segment, "" | "." | ".."))
}

/// Header value from text that may carry characters headers cannot
fn header_value(text: &str) -> HeaderValue {
    HeaderValue::from_str(text).unwrap_or_else(|_| HeaderValue::from_static("inline"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;
    use crate::routes::create_router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn router(upstream: &MockServer) -> axum::Router {
        create_router(ProxyState::new(ProxyConfig {
            llm_api_base_url: upstream.uri(),
            api_base_url: upstream.uri(),
            ..ProxyConfig::default()
        }))
    }

    #[tokio::test]
    async fn file_served_inline_with_cache_headers() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/files/outputs/plots/chart.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(b"PNGDATA".to_vec()),
            )
            .mount(&upstream)
            .await;

        let response = router(&upstream)
            .oneshot(
                Request::get("/api/v2/files/outputs/plots/chart.png")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "image/png");
        assert_eq!(
            response.headers()[CONTENT_DISPOSITION],
            "inline; filename=\"chart.png\""
        );
        assert_eq!(response.headers()[CACHE_CONTROL], "public, max-age=3600");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"PNGDATA");
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_detail() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not json"))
            .mount(&upstream)
            .await;

        let response = router(&upstream)
            .oneshot(Request::get("/api/v2/files/nope.csv").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["detail"], "File not found");
    }

    #[tokio::test]
    async fn invoice_is_pdf() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/invoice/B42"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
            .mount(&upstream)
            .await;

        let response = router(&upstream)
            .oneshot(Request::get("/api/v1/invoice/B42").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[CONTENT_DISPOSITION],
            "inline; filename=invoice_B42.pdf"
        );
    }

    #[tokio::test]
    async fn encoded_dot_segments_never_reach_upstream() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&upstream)
            .await;

        for uri in [
            "/api/v2/files/uploads/%2E%2E/%2E%2E/admin",
            "/api/v2/files/..%2Fsecret",
            "/api/v2/files/report.csv%3Fdownload=1",
            "/api/v1/invoice/..%2F..%2Fadmin",
            "/api/v1/invoice/B42%2Fcancel",
        ] {
            let response = router(&upstream)
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        }
    }

    #[test]
    fn plain_paths() {
        assert!(is_plain_path("outputs/plots/chart.png"));
        assert!(is_plain_path("B42"));
        assert!(!is_plain_path(""));
        assert!(!is_plain_path("a/../b"));
        assert!(!is_plain_path("./a"));
        assert!(!is_plain_path("a//b"));
        assert!(!is_plain_path("a?b=1"));
    }
}
