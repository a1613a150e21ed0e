use super::{bad_request, error_response, ApiState, ErrorResponse, MessageResponse};
use crate::auth::Candidate;
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use secrecy::SecretString;
use serde::Deserialize;
use std::{fmt, sync::Arc};
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize)]
pub struct UserRegister {
    email: String,
    username: String,
    #[schema(format = Password)]
    password: String,
}

impl fmt::Debug for UserRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRegister")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/register",
    request_body = UserRegister,
    responses (
        (status = 201, description = "User registered", body = MessageResponse, content_type = "application/json"),
        (status = 400, description = "Missing fields, malformed email/username or weak password", body = ErrorResponse),
        (status = 409, description = "Email or username already exists", body = ErrorResponse),
        (status = 503, description = "User directory unavailable", body = ErrorResponse),
        (status = 504, description = "Request timed out", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip(state, payload))]
pub async fn register(
    state: Extension<Arc<ApiState>>,
    payload: Option<Json<UserRegister>>,
) -> impl IntoResponse {
    let user: UserRegister = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("Invalid request body"),
    };

    debug!(email = %user.email, username = %user.username, "Processing registration request");

    let candidate = Candidate {
        email: user.email,
        username: user.username,
        password: SecretString::from(user.password),
    };

    match state.bounded(state.workflow().register(candidate)).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(MessageResponse {
                message: "User registered successfully".to_string(),
            }),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

#[cfg(test)]
mod tests {
    use crate::api::{handlers::test_support, router_with_state};
    use anyhow::Result;
    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn post(app: axum::Router, body: &Value) -> Result<(StatusCode, Value)> {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/register")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body)?))?;
        let response = app.oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        Ok((status, serde_json::from_slice(&bytes)?))
    }

    #[tokio::test]
    async fn creates_user_and_rejects_duplicates() -> Result<()> {
        let (state, directory) = test_support::state();
        let app = router_with_state(Arc::new(state));

        let body = json!({"email": "a@x.com", "username": "alice", "password": "Abc12345!"});
        let (status, value) = post(app.clone(), &body).await?;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(value["message"], "User registered successfully");
        assert!(!value.to_string().contains("Abc12345!"));
        assert_eq!(directory.len().await, 1);

        let body = json!({"email": "a@x.com", "username": "bob", "password": "Abc12345!"});
        let (status, value) = post(app, &body).await?;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(value["error"], "email or username already exists");
        Ok(())
    }

    #[tokio::test]
    async fn weak_password_is_bad_request() -> Result<()> {
        let (state, directory) = test_support::state();
        let app = router_with_state(Arc::new(state));

        let body = json!({"email": "a@x.com", "username": "alice", "password": "password"});
        let (status, value) = post(app, &body).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "password does not meet the password policy");
        assert!(directory.is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn missing_body_is_bad_request() -> Result<()> {
        let (state, _directory) = test_support::state();
        let app = router_with_state(Arc::new(state));

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/register")
            .body(Body::empty())?;
        let response = app.oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
