//! Auth routes.

use axum::Json;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::state::ProxyState;

/// `POST /api/v1/auth/logout`
pub async fn logout(
    State(state): State<ProxyState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let auth = headers.get(AUTHORIZATION).cloned().ok_or_else(|| ApiError::Auth {
        status: StatusCode::UNAUTHORIZED,
        message: "No authorization token provided".to_string(),
    })?;

    let upstream = state
        .http
        .post(state.api_url("/api/v1/auth/logout"))
        .header(AUTHORIZATION, auth)
        .json(&json!({}))
        .send()
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Logout request failed");
            ApiError::Auth {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "Internal server error".to_string(),
            }
        })?;

    let status = upstream.status();
    let body = upstream.json::<Value>().await.unwrap_or(Value::Null);

    if !status.is_success() {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Logout failed")
            .to_string();
        return Err(ApiError::Auth { status, message });
    }

    Ok(Json(body))
}
