use super::{error_response, ApiState, ErrorResponse};
use crate::auth::{AuthError, Role};
use axum::{
    extract::Extension,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub user_id: String,
    pub role: Role,
    /// Expiration (unix seconds)
    pub expires_at: i64,
}

#[utoipa::path(
    get,
    path = "/api/v1/session",
    responses (
        (status = 200, description = "Token is valid", body = SessionResponse, content_type = "application/json"),
        (status = 401, description = "Missing, malformed or expired token", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip(state, headers))]
pub async fn session(state: Extension<Arc<ApiState>>, headers: HeaderMap) -> impl IntoResponse {
    let Some(token) = extract_bearer_token(&headers) else {
        debug!("Missing bearer token");
        return error_response(&AuthError::TokenInvalid);
    };

    match state.workflow().verify_token(&token) {
        Ok(claims) => (
            StatusCode::OK,
            Json(SessionResponse {
                user_id: claims.sub,
                role: claims.role,
                expires_at: claims.exp,
            }),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
