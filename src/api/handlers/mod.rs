//! API handlers and the shared state they read.
//!
//! Handlers translate JSON bodies into [`AuthWorkflow`] calls, bound each call
//! with the configured timeout and map [`AuthError`] onto HTTP statuses.

pub mod health;
pub mod session;
pub mod user_login;
pub mod user_register;

use crate::auth::{AuthError, AuthWorkflow};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::{future::Future, time::Duration};
use tokio::time::timeout;
use tracing::{debug, error};
use utoipa::ToSchema;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Process-wide state shared by all handlers.
#[derive(Debug, Clone)]
pub struct ApiState {
    workflow: AuthWorkflow,
    request_timeout: Duration,
}

impl ApiState {
    #[must_use]
    pub fn new(workflow: AuthWorkflow) -> Self {
        Self {
            workflow,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    #[must_use]
    pub fn workflow(&self) -> &AuthWorkflow {
        &self.workflow
    }

    /// Run a workflow call, abandoning it once the request timeout elapses.
    pub(crate) async fn bounded<T, F>(&self, call: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, AuthError>>,
    {
        timeout(self.request_timeout, call)
            .await
            .unwrap_or(Err(AuthError::Timeout))
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

pub(crate) const fn status_for(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidInput | AuthError::WeakPassword => StatusCode::BAD_REQUEST,
        AuthError::DuplicateIdentity => StatusCode::CONFLICT,
        AuthError::InvalidCredentials | AuthError::TokenInvalid => StatusCode::UNAUTHORIZED,
        AuthError::AccountInactive => StatusCode::FORBIDDEN,
        AuthError::DependencyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::Timeout => StatusCode::GATEWAY_TIMEOUT,
    }
}

/// Map an auth failure to a JSON error response. Only dependency failures are
/// logged as errors; everything else is an expected user outcome.
pub(crate) fn error_response(err: &AuthError) -> Response {
    if err.is_incident() {
        error!("Auth dependency failure: {}", err);
    } else {
        debug!("Auth request rejected: {}", err);
    }

    (
        status_for(err),
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

pub(crate) fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_classes() {
        assert_eq!(status_for(&AuthError::InvalidInput), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&AuthError::WeakPassword), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&AuthError::DuplicateIdentity), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&AuthError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_for(&AuthError::AccountInactive), StatusCode::FORBIDDEN);
        assert_eq!(
            status_for(&AuthError::DependencyUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(status_for(&AuthError::Timeout), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status_for(&AuthError::TokenInvalid), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bounded_calls_time_out() {
        let (state, _directory) = test_support::state();
        let state = state.with_request_timeout(Duration::from_millis(10));

        let result: Result<(), AuthError> = state
            .bounded(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert_eq!(result, Err(AuthError::Timeout));

        let result = state.bounded(async { Ok::<_, AuthError>(7) }).await;
        assert_eq!(result, Ok(7));
    }
}
