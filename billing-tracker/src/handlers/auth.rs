use crate::dtos::{AuthResponse, ProfileResponse, SigninRequest, SignupRequest, UserResponse};
use crate::middleware::{JwtKeys, Principal};
use crate::models::{AccessUpdate, Resource, Role, User};
use crate::startup::AppState;
use crate::utils::{hash_password, verify_password};
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Duration;
use service_core::error::AppError;
use service_core::utils::{JsonBody, ValidatedJson};

fn signing_keys(state: &AppState) -> Result<&JwtKeys, AppError> {
    state.jwt.as_ref().ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "Authentication is not enabled on this server"
        ))
    })
}

fn session(state: &AppState, keys: &JwtKeys, user: &User) -> Result<AuthResponse, AppError> {
    let ttl = Duration::hours(state.config.auth.token_ttl_hours);
    Ok(AuthResponse {
        token: keys.issue(&user.id, &user.email, ttl)?,
        user: UserResponse::from(user),
    })
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized(anyhow::anyhow!("Invalid email or password"))
}

/// Create a plain user with no grants and sign them in.
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = signing_keys(&state)?;

    let password_hash = hash_password(&req.password)?;
    let full_name = req.full_name.map(|n| n.trim().to_string()).unwrap_or_default();
    let user = state
        .users
        .insert(User::new(&req.email, full_name, password_hash, Role::User))
        .await?;

    tracing::info!(user_id = %user.id, "User signed up");
    Ok(Json(session(&state, keys, &user)?))
}

#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn signin(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SigninRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = signing_keys(&state)?;

    let user = state
        .users
        .find_by_email(&req.email)
        .await?
        .ok_or_else(invalid_credentials)?;
    if !verify_password(&req.password, &user.password_hash) {
        tracing::warn!(user_id = %user.id, "Sign-in rejected");
        return Err(invalid_credentials());
    }

    Ok(Json(session(&state, keys, &user)?))
}

/// The caller's identity and current grants.
pub async fn me(principal: Principal) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        id: principal.id,
        email: principal.email,
        full_name: principal.full_name,
        role: principal.role,
        permissions: principal.permissions,
    })
}

/// All users, newest first. Administrators only.
#[tracing::instrument(skip(state, principal))]
pub async fn list_users(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    principal.require_write(&Resource::Administration)?;

    let users = state.users.list().await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// Change a user's role and grants. Takes effect on their next request.
#[tracing::instrument(skip(state, principal, update))]
pub async fn update_permissions(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<AccessUpdate>,
) -> Result<Json<UserResponse>, AppError> {
    principal.require_write(&Resource::Administration)?;

    let user = state
        .users
        .update_access(&id, update)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    tracing::info!(user_id = %user.id, role = ?user.role, changed_by = %principal.id, "Permissions updated");
    Ok(Json(UserResponse::from(&user)))
}
