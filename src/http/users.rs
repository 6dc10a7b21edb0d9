use crate::application::accounts::{
    LoginRequest, LoginResponse, RegisterRequest, UpdateUserRequest, change_avatar_impl,
    delete_user_impl, get_user_by_email_impl, list_users_impl, login_impl, logout_impl,
    register_impl, update_user_by_email_impl, update_user_by_id_impl,
};
use crate::application::error::ServiceError;
use crate::domain::models::PublicUser;
use crate::http::SharedState;
use crate::http::auth::{authenticated_user, bearer_token};
use crate::http::error::ApiError;
use crate::infrastructure::avatar_storage::content_type_for;
use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

const AVATAR_FIELD: &str = "avatar";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEnvelope {
    pub message: String,
    pub user: PublicUser,
}

pub async fn register(
    State(state): State<SharedState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserEnvelope>), ApiError> {
    let user = register_impl(&state, request)?;
    Ok((
        StatusCode::CREATED,
        Json(UserEnvelope {
            message: "User registered successfully".to_string(),
            user,
        }),
    ))
}

pub async fn login(
    State(state): State<SharedState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    Ok(Json(login_impl(&state, request)?))
}

pub async fn logout(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    authenticated_user(&state, &headers)?;
    if let Some(token) = bearer_token(&headers) {
        logout_impl(&state, token)?;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn change_avatar(
    State(state): State<SharedState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UserEnvelope>, ApiError> {
    let user = authenticated_user(&state, &headers)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| ServiceError::InvalidInput(format!("invalid multipart body: {error}")))?
    {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|error| {
                ServiceError::InvalidInput(format!("failed to read avatar: {error}"))
            })?;
        let updated = change_avatar_impl(&state, &user, &file_name, &bytes)?;
        return Ok(Json(UserEnvelope {
            message: "Avatar updated successfully".to_string(),
            user: updated,
        }));
    }

    Err(ServiceError::InvalidInput(format!("multipart field '{AVATAR_FIELD}' is required")).into())
}

pub async fn list_users(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    authenticated_user(&state, &headers)?;
    Ok(Json(list_users_impl(&state)?))
}

pub async fn get_user(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(email): Path<String>,
) -> Result<Json<PublicUser>, ApiError> {
    authenticated_user(&state, &headers)?;
    Ok(Json(get_user_by_email_impl(&state, &email)?))
}

pub async fn update_user_by_id(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    let caller = authenticated_user(&state, &headers)?;
    Ok(Json(update_user_by_id_impl(&state, &caller, &user_id, request)?))
}

pub async fn update_user_by_email(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(email): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    let caller = authenticated_user(&state, &headers)?;
    Ok(Json(update_user_by_email_impl(&state, &caller, &email, request)?))
}

pub async fn delete_user(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(email): Path<String>,
) -> Result<StatusCode, ApiError> {
    let caller = authenticated_user(&state, &headers)?;
    delete_user_impl(&state, &caller, &email)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn serve_upload(
    State(state): State<SharedState>,
    Path(file_name): Path<String>,
) -> Result<Response, ApiError> {
    let Some(path) = state.avatars().resolve(&file_name) else {
        return Err(ServiceError::NotFound(format!("upload {file_name}")).into());
    };
    let bytes = tokio::fs::read(&path).await.map_err(|error| match error.kind() {
        std::io::ErrorKind::NotFound => ServiceError::NotFound(format!("upload {file_name}")),
        _ => ServiceError::Store(error.into()),
    })?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&file_name))], bytes).into_response())
}
