//! HTTP adapter
//!
//! Maps requests onto [`AuthService`] and errors onto status codes.

use std::sync::Arc;

use auth::Principal;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::Utc;
use error::{AppError, ErrorResponse};
use serde::Deserialize;
use serde_json::json;

use crate::policies::Operation;
use crate::service::{AccessToken, AuthService};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub version: String,
}

/// Login form fields.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// [`AppError`] rendered as a JSON response.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl<E: Into<AppError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }

        let mut response = (status, Json(ErrorResponse::from(&self.0))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/token", post(login))
        .route("/users/me", get(me))
        .route("/access/:operation", get(check_access))
        .route("/health", get(health))
        .with_state(state)
}

/// Bearer token from the `Authorization` header, if any.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let token = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .trim();
    (!token.is_empty()).then_some(token)
}

async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<AccessToken>, ApiError> {
    let token = state
        .auth
        .login(&form.username, &form.password, Utc::now())
        .await?;
    Ok(Json(token))
}

async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Principal>, ApiError> {
    let principal = state
        .auth
        .current_user(extract_bearer(&headers), Utc::now())
        .await?;
    Ok(Json(principal))
}

async fn check_access(
    State(state): State<AppState>,
    Path(operation): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let operation: Operation = operation.parse()?;
    state
        .auth
        .authorize_operation(extract_bearer(&headers), operation, Utc::now())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.auth.store_health().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "store": "ok", "version": state.version })),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "store": "unavailable", "version": state.version })),
        ),
    }
}

#[cfg(test)]
mod tests {
    use error::{AccessDenied, AuthError, DatabaseError};

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(extract_bearer(&headers("Bearer   ")), None);
        assert_eq!(extract_bearer(&headers("Basic dXNlcg==")), None);
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (AppError::from(AuthError::Expired), StatusCode::UNAUTHORIZED),
            (AppError::from(AccessDenied::Unauthenticated), StatusCode::UNAUTHORIZED),
            (AppError::from(AccessDenied::Forbidden), StatusCode::FORBIDDEN),
            (AppError::from(AuthError::StoreUnavailable), StatusCode::SERVICE_UNAVAILABLE),
            (
                AppError::from(DatabaseError::ConnectionFailed("down".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_unauthorized_carries_challenge() {
        let response = ApiError(AuthError::InvalidSignature.into()).into_response();
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

        let response = ApiError(AccessDenied::Forbidden.into()).into_response();
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }
}
