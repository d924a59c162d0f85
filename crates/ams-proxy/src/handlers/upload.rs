//! Upload routes.
//!
//! The multipart body is forwarded as raw bytes with its original
//! `Content-Type` (boundary included); the proxy never parses it.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::CONTENT_TYPE;
use bytes::Bytes;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::state::ProxyState;

/// `POST /api/v2/upload/file`
pub async fn upload_file(
    State(state): State<ProxyState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    forward_upload(&state, "/api/v2/upload/file", "Failed to upload file", &headers, body).await
}

/// `POST /api/v2/upload/image`
pub async fn upload_image(
    State(state): State<ProxyState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    forward_upload(&state, "/api/v2/upload/image", "Failed to upload image", &headers, body).await
}

/// `POST /api/v2/upload/pdf`
pub async fn upload_pdf(
    State(state): State<ProxyState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    forward_upload(&state, "/api/v2/upload/pdf", "Failed to upload PDF", &headers, body).await
}

/// `GET /api/v2/upload/file`: upload limits and endpoints. Falls back to
/// the built-in defaults when the upstream cannot answer.
pub async fn upload_config(State(state): State<ProxyState>) -> Json<Value> {
    let upstream = state.http.get(state.llm_url("/api/v2/upload/file")).send().await;

    match upstream {
        Ok(response) if response.status().is_success() => match response.json::<Value>().await {
            Ok(body) => Json(body),
            Err(e) => {
                tracing::warn!(error = %e, "Upload configuration unreadable, using defaults");
                Json(default_upload_config())
            }
        },
        Ok(response) => {
            tracing::warn!(status = response.status().as_u16(), "Upload configuration unavailable, using defaults");
            Json(default_upload_config())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Upload configuration unavailable, using defaults");
            Json(default_upload_config())
        }
    }
}

fn default_upload_config() -> Value {
    json!({
        "status": "success",
        "data": {
            "maxFileSizeMB": ams_stream::MAX_ATTACHMENT_BYTES / (1024 * 1024),
            "allowedTypes": ams_stream::upload::ALLOWED_MIME_TYPES,
            "categories": ["images", "documents", "spreadsheets"],
            "endpoints": {
                "image": ams_stream::upload::IMAGE_UPLOAD_PATH,
                "pdf": ams_stream::upload::PDF_UPLOAD_PATH,
                "file": ams_stream::upload::FILE_UPLOAD_PATH,
            }
        }
    })
}

async fn forward_upload(
    state: &ProxyState,
    path: &str,
    failure: &'static str,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .cloned()
        .ok_or_else(|| ApiError::BadRequest("multipart body required".to_string()))?;

    tracing::debug!(path, bytes = body.len(), "Forwarding upload");

    let failed = |details: String| ApiError::TransferFailed {
        message: failure,
        code: "UPLOAD_FAILED",
        details,
    };

    let upstream = state
        .http
        .post(state.llm_url(path))
        .header(CONTENT_TYPE, content_type)
        .body(body)
        .send()
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Upload proxy error");
            failed(e.to_string())
        })?;

    if !upstream.status().is_success() {
        return Err(ApiError::from_upstream(upstream, json!({ "detail": failure })).await);
    }

    upstream
        .json::<Value>()
        .await
        .map(Json)
        .map_err(|e| failed(e.to_string()))
}
