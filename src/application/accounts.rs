use crate::application::commands::{required_id, AppState};
use crate::application::error::ServiceError;
use crate::domain::models::{AuthToken, PublicUser, User};
use crate::infrastructure::ids::next_id;
use crate::infrastructure::password::{hash_password, verify_password};
use chrono::Duration;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

pub fn register_impl(
    state: &AppState,
    request: RegisterRequest,
) -> Result<PublicUser, ServiceError> {
    let username = request.username.trim();
    let email = request.email.trim();
    if username.is_empty() {
        return Err(ServiceError::InvalidInput("username is required".to_string()));
    }
    if !is_valid_email(email) {
        return Err(ServiceError::InvalidInput(format!("invalid email format: {email}")));
    }
    if request.password != request.password_confirmation {
        return Err(ServiceError::InvalidInput("passwords do not match".to_string()));
    }
    validate_password(&request.password)?;

    let user = User {
        id: next_id("usr"),
        username: username.to_string(),
        email: email.to_string(),
        password_hash: hash_password(&request.password)?,
        avatar_url: String::new(),
        created_at: state.clock().now(),
    };
    user.validate().map_err(ServiceError::InvalidInput)?;
    state.user_store().insert(&user)?;

    state.log_info("register", &format!("registered user_id={}", user.id));
    Ok(user.public())
}

pub fn login_impl(state: &AppState, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
    let email = request.email.trim();
    if email.is_empty() || request.password.is_empty() {
        return Err(ServiceError::InvalidInput(
            "email and password are required".to_string(),
        ));
    }

    let user = state
        .user_store()
        .find_by_email(email)?
        .ok_or_else(|| ServiceError::NotFound(format!("user {email}")))?;
    if !verify_password(&request.password, &user.password_hash)? {
        tracing::warn!(user_id = %user.id, "login rejected: wrong password");
        return Err(ServiceError::Unauthorized("invalid password".to_string()));
    }

    let now = state.clock().now();
    let purged = state.sessions().purge_expired(now)?;
    if purged > 0 {
        tracing::debug!(purged, "expired sessions removed");
    }

    let token = AuthToken {
        token: uuid::Uuid::new_v4().simple().to_string(),
        user_id: user.id.clone(),
        issued_at: now,
        expires_at: now + Duration::minutes(i64::from(state.config().session_ttl_minutes)),
    };
    state.sessions().save(&token)?;

    state.log_info("login", &format!("issued session for user_id={}", user.id));
    Ok(LoginResponse {
        message: "Login successful".to_string(),
        token: token.token,
        user: user.public(),
    })
}

/// Resolves a bearer token to its user. Unknown, expired, and orphaned
/// tokens are all `Unauthorized`.
pub fn authenticate_impl(state: &AppState, token: &str) -> Result<User, ServiceError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ServiceError::Unauthorized("missing bearer token".to_string()));
    }
    let session = state
        .sessions()
        .find(token)?
        .ok_or_else(|| ServiceError::Unauthorized("unknown session token".to_string()))?;
    if !session.is_valid_at(state.clock().now()) {
        state.sessions().revoke(token)?;
        return Err(ServiceError::Unauthorized("session expired".to_string()));
    }
    state
        .user_store()
        .find_by_id(&session.user_id)?
        .ok_or_else(|| ServiceError::Unauthorized("session user no longer exists".to_string()))
}

pub fn logout_impl(state: &AppState, token: &str) -> Result<(), ServiceError> {
    state.sessions().revoke(token.trim())?;
    Ok(())
}

pub fn change_avatar_impl(
    state: &AppState,
    caller: &User,
    file_name: &str,
    bytes: &[u8],
) -> Result<PublicUser, ServiceError> {
    let avatar_url = state.avatars().store(file_name, bytes, state.clock().now())?;
    let mut user = caller.clone();
    user.avatar_url = avatar_url;
    state.user_store().update(&user)?;

    state.log_info(
        "change_avatar",
        &format!("user_id={} avatar={}", user.id, user.avatar_url),
    );
    Ok(user.public())
}

pub fn list_users_impl(state: &AppState) -> Result<Vec<PublicUser>, ServiceError> {
    Ok(state
        .user_store()
        .list()?
        .iter()
        .map(User::public)
        .collect())
}

pub fn get_user_by_email_impl(state: &AppState, email: &str) -> Result<PublicUser, ServiceError> {
    let email = email.trim();
    if !is_valid_email(email) {
        return Err(ServiceError::InvalidInput(format!("invalid email format: {email}")));
    }
    state
        .user_store()
        .find_by_email(email)?
        .map(|user| user.public())
        .ok_or_else(|| ServiceError::NotFound(format!("user {email}")))
}

pub fn update_user_by_id_impl(
    state: &AppState,
    caller: &User,
    user_id: &str,
    request: UpdateUserRequest,
) -> Result<PublicUser, ServiceError> {
    let user_id = required_id(user_id, "user_id")?;
    let target = state
        .user_store()
        .find_by_id(user_id)?
        .ok_or_else(|| ServiceError::NotFound(format!("user {user_id}")))?;
    apply_user_update(state, caller, target, request)
}

pub fn update_user_by_email_impl(
    state: &AppState,
    caller: &User,
    email: &str,
    request: UpdateUserRequest,
) -> Result<PublicUser, ServiceError> {
    let email = email.trim();
    let target = state
        .user_store()
        .find_by_email(email)?
        .ok_or_else(|| ServiceError::NotFound(format!("user {email}")))?;
    apply_user_update(state, caller, target, request)
}

pub fn delete_user_impl(state: &AppState, caller: &User, email: &str) -> Result<(), ServiceError> {
    let email = email.trim();
    let target = state
        .user_store()
        .find_by_email(email)?
        .ok_or_else(|| ServiceError::NotFound(format!("user {email}")))?;
    ensure_self(caller, &target)?;

    state.sessions().revoke_for_user(&target.id)?;
    state.user_store().delete(&target.id)?;
    state.log_info("delete_user", &format!("deleted user_id={}", target.id));
    Ok(())
}

fn apply_user_update(
    state: &AppState,
    caller: &User,
    mut target: User,
    request: UpdateUserRequest,
) -> Result<PublicUser, ServiceError> {
    ensure_self(caller, &target)?;

    if let Some(username) = request.username {
        target.username = username.trim().to_string();
    }
    if let Some(email) = request.email {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(ServiceError::InvalidInput(format!("invalid email format: {email}")));
        }
        target.email = email.to_string();
    }
    if let Some(avatar_url) = request.avatar_url {
        target.avatar_url = avatar_url.trim().to_string();
    }
    if let Some(password) = request.password {
        validate_password(&password)?;
        target.password_hash = hash_password(&password)?;
    }
    target.validate().map_err(ServiceError::InvalidInput)?;
    state.user_store().update(&target)?;

    state.log_info("update_user", &format!("updated user_id={}", target.id));
    Ok(target.public())
}

fn ensure_self(caller: &User, target: &User) -> Result<(), ServiceError> {
    if caller.id != target.id {
        tracing::warn!(
            caller = %caller.id,
            target = %target.id,
            "refused to modify another account"
        );
        return Err(ServiceError::Forbidden(
            "users may only modify their own account".to_string(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
