//! Handlers for the `/auth` resource (register, login, refresh, logout).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use dashlabel_core::error::CoreError;
use dashlabel_core::types::DbId;
use dashlabel_db::models::session::CreateSession;
use dashlabel_db::models::user::{CreateUser, User, UserResponse};
use dashlabel_db::repositories::{SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::jwt::{generate_access_token, generate_refresh_token, hash_refresh_token};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50, message = "username must be 3-50 characters"))]
    pub username: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    pub password: String,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Successful authentication response returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Always `"bearer"`.
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create an account. Duplicate usernames or emails hit a unique constraint
/// and surface as 409.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;
    validate_password_strength(&input.password)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: input.username.trim().to_string(),
            email: normalize_email(&input.email),
            password_hash,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UserResponse::from(user),
        }),
    ))
}

/// POST /api/v1/auth/login
///
/// Authenticate with email and password. Unknown emails and wrong passwords
/// get the same 401.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = UserRepo::find_by_email(&state.pool, &normalize_email(&input.email))
        .await?
        .ok_or_else(invalid_credentials)?;

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        tracing::info!(user_id = %user.id, "Login rejected: bad password");
        return Err(invalid_credentials());
    }
    ensure_active(&user)?;

    let now = Utc::now();
    UserRepo::record_login(&state.pool, user.id, now).await?;

    let tokens = issue_tokens(&state, user.id)?;
    SessionRepo::create(&state.pool, &tokens.session).await?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(tokens.into_response(&state, user)))
}

/// POST /api/v1/auth/refresh
///
/// Trade a refresh token for a new pair. The used token is revoked in the
/// same transaction that stores its successor, so each token works once.
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let now = Utc::now();
    let session = SessionRepo::find_live(&state.pool, &hash_refresh_token(&input.refresh_token), now)
        .await?
        .ok_or_else(invalid_refresh_token)?;

    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(invalid_refresh_token)?;
    ensure_active(&user)?;

    let tokens = issue_tokens(&state, user.id)?;
    SessionRepo::rotate(&state.pool, session.id, &tokens.session, now)
        .await?
        .ok_or_else(|| {
            tracing::info!(user_id = %user.id, session_id = %session.id, "Refresh token reused");
            invalid_refresh_token()
        })?;

    tracing::debug!(user_id = %user.id, "Session rotated");
    Ok(Json(tokens.into_response(&state, user)))
}

/// POST /api/v1/auth/logout
///
/// Revoke every session of the caller. Returns 204.
pub async fn logout(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<StatusCode> {
    let revoked =
        SessionRepo::revoke_all_for_user(&state.pool, auth_user.user_id, Utc::now()).await?;
    tracing::info!(user_id = %auth_user.user_id, revoked, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn invalid_credentials() -> AppError {
    AppError::Core(CoreError::Unauthorized("Invalid email or password".into()))
}

fn invalid_refresh_token() -> AppError {
    AppError::Core(CoreError::Unauthorized(
        "Invalid or expired refresh token".into(),
    ))
}

fn ensure_active(user: &User) -> AppResult<()> {
    if user.is_active {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )))
    }
}

/// A freshly minted token pair and the session row that backs it.
struct IssuedTokens {
    access_token: String,
    refresh_token: String,
    session: CreateSession,
}

impl IssuedTokens {
    fn into_response(self, state: &AppState, user: User) -> AuthResponse {
        AuthResponse {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: "bearer",
            expires_in: state.config.jwt.access_token_expires_in(),
            user: UserResponse::from(user),
        }
    }
}

fn issue_tokens(state: &AppState, user_id: DbId) -> AppResult<IssuedTokens> {
    let access_token = generate_access_token(user_id, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;
    let (refresh_token, refresh_token_hash) = generate_refresh_token();

    Ok(IssuedTokens {
        access_token,
        refresh_token,
        session: CreateSession {
            user_id,
            refresh_token_hash,
            expires_at: Utc::now()
                + chrono::Duration::days(state.config.jwt.refresh_token_expiry_days),
        },
    })
}
