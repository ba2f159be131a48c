//! Registration, login and user listing.
//!
//! # Endpoints
//!
//! - `POST /api/register` - Create an account and receive a token (public)
//! - `POST /api/login` - Exchange email/username and password for a token (public)
//! - `GET /api/users` - List accounts

use std::sync::LazyLock;

use axum::{extract::State, http::StatusCode, Json};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::server::api_error::ApiError;
use crate::server::auth::{hash_password, verify_password};
use crate::server::database::{NewUser, User};
use crate::server::extract::ApiJson;
use crate::server::handlers::AppState;
use crate::server::logging::{log_auth_event, AuthEvent};
use crate::server::validation::{validate_email, validate_length};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Hash checked when a login names no known user, so that case costs the
/// same Argon2 work as a wrong password.
static DUMMY_PASSWORD_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("stockroom-no-such-user").unwrap_or_default());

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request body for login. Either `email` or `username` identifies the user.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// A user as returned by the API. The password hash is never included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: NaiveDateTime,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// Response for a successful registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub token: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

/// Response for a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, ApiError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::missing_field(field))
}

// ============================================================================
// Handlers
// ============================================================================

/// Register a new user.
///
/// `POST /api/register`
///
/// Rejects a username or email that is already taken with 409.
pub async fn register_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let username = required(&payload.username, "username")?.to_string();
    let email = required(&payload.email, "email")?.to_string();
    let password = payload
        .password
        .clone()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::missing_field("password"))?;

    validate_length(&username, 1, 80, "username")?;
    validate_email(&email, "email")?;
    validate_length(&password, MIN_PASSWORD_LEN, 1024, "password")?;

    if state.db.user_exists(&username, &email).await? {
        return Err(ApiError::conflict(
            "A user with that username or email already exists",
        ));
    }

    let password_hash = hash_password(&password)?;

    // A concurrent registration can still win the race; the unique
    // constraints turn that into StockroomError::Duplicate -> 409.
    let user = state
        .db
        .insert_user(NewUser {
            username,
            email,
            password_hash,
        })
        .await?;

    let token = state.auth.validator.create_token(&user.email)?;
    log_auth_event(AuthEvent::Registered, &user.email);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            token,
            expires_in: state.auth.validator.expiration_secs(),
            user: user.into(),
        }),
    ))
}

/// Log in with email (or username) and password.
///
/// `POST /api/login`
///
/// Unknown users and wrong passwords get the same 401 response.
pub async fn login_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let password = payload
        .password
        .clone()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::missing_field("password"))?;

    let (identifier, user) = if let Ok(email) = required(&payload.email, "email") {
        (email, state.db.find_user_by_email(email).await?)
    } else if let Ok(username) = required(&payload.username, "username") {
        (username, state.db.find_user_by_username(username).await?)
    } else {
        return Err(ApiError::missing_field("email"));
    };

    let Some(user) = user else {
        verify_password(&password, &DUMMY_PASSWORD_HASH);
        log_auth_event(AuthEvent::LoginFailed, identifier);
        return Err(ApiError::invalid_credentials());
    };

    if !verify_password(&password, &user.password_hash) {
        log_auth_event(AuthEvent::LoginFailed, identifier);
        return Err(ApiError::invalid_credentials());
    }

    let access_token = state.auth.validator.create_token(&user.email)?;
    log_auth_event(AuthEvent::LoggedIn, &user.email);

    Ok(Json(LoginResponse {
        access_token,
        expires_in: state.auth.validator.expiration_secs(),
        user: user.into(),
    }))
}

/// List all users.
///
/// `GET /api/users`
pub async fn list_users_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.db.list_users().await?;
    info!("Listing {} users", users.len());

    Ok(Json(users.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn user_response_omits_password_hash() {
        let user = User {
            id: 1,
            username: "ann".to_string(),
            email: "ann@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            created_at: Utc::now().naive_utc(),
        };

        let value = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert_eq!(value["username"], "ann");
        assert!(value.get("password_hash").is_none());
        assert!(!value.to_string().contains("argon2"));
    }

    #[test]
    fn dummy_hash_is_a_real_argon2_hash() {
        assert!(DUMMY_PASSWORD_HASH.starts_with("$argon2"));
        assert!(!verify_password("s3cret-pass", &DUMMY_PASSWORD_HASH));
    }

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required(&Some("  ann ".to_string()), "username").unwrap(), "ann");
        assert!(required(&Some("   ".to_string()), "username").is_err());
        assert!(required(&None, "username").is_err());
    }
}
