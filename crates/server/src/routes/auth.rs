use axum::{Extension, Json, extract::State, response::Json as ResponseJson};
use db::models::user::{CreateUser, UpdateUser, User, UserSummary};
use serde::{Deserialize, Serialize};
use services::services::auth::{hash_password, verify_password};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError, middleware::RequestContext};

#[derive(Debug, Deserialize, TS)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, TS)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserSummary,
}

const MIN_PASSWORD_LEN: usize = 8;

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<ResponseJson<ApiResponse<AuthResponse>>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }
    if payload.username.trim().is_empty() {
        return Err(ApiError::BadRequest("Username is required".to_string()));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if User::find_by_email(&state.db().pool, &email).await?.is_some() {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let user = User::create(
        &state.db().pool,
        &CreateUser {
            email,
            username: payload.username.trim().to_string(),
            password_hash: hash_password(&payload.password)?,
            avatar_url: payload.avatar_url,
        },
    )
    .await?;

    let token = state.jwt().issue(user.id)?;
    tracing::info!(user_id = %user.id, "registered new user");

    Ok(ResponseJson(ApiResponse::success(AuthResponse {
        token,
        user: user.summary(),
    })))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<ResponseJson<ApiResponse<AuthResponse>>, ApiError> {
    let email = payload.email.trim().to_lowercase();

    // Same error for unknown email and wrong password.
    let user = User::find_by_email(&state.db().pool, &email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    verify_password(&payload.password, &user.password_hash)
        .map_err(|_| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let token = state.jwt().issue(user.id)?;

    Ok(ResponseJson(ApiResponse::success(AuthResponse {
        token,
        user: user.summary(),
    })))
}

/// GET /api/auth/me
pub async fn me(
    Extension(ctx): Extension<RequestContext>,
) -> ResponseJson<ApiResponse<UserSummary>> {
    ResponseJson(ApiResponse::success(ctx.user.summary()))
}

/// PUT /api/auth/me
pub async fn update_me(
    Extension(ctx): Extension<RequestContext>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateUser>,
) -> Result<ResponseJson<ApiResponse<UserSummary>>, ApiError> {
    if let Some(username) = &payload.username
        && username.trim().is_empty()
    {
        return Err(ApiError::BadRequest("Username cannot be empty".to_string()));
    }

    let updated = User::update(&state.db().pool, ctx.user.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated.summary())))
}
