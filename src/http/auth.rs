use crate::application::accounts::authenticate_impl;
use crate::application::commands::AppState;
use crate::application::error::ServiceError;
use crate::domain::models::User;
use axum::http::{HeaderMap, header};

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub fn authenticated_user(state: &AppState, headers: &HeaderMap) -> Result<User, ServiceError> {
    let Some(token) = bearer_token(headers) else {
        tracing::warn!("request without bearer token");
        return Err(ServiceError::Unauthorized(
            "missing or malformed Authorization header".to_string(),
        ));
    };
    authenticate_impl(state, token).inspect_err(|error| {
        tracing::warn!(%error, "bearer token rejected");
    })
}
