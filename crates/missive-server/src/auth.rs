//! Registration, login, and logout handlers.
//!
//! Password hashing lives here, at the session boundary: the core only ever
//! sees an opaque credential hash and an already-authenticated user id.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use missive_core::{ChatError, NewUser};

use crate::api::{AppState, UserDto};
use crate::error::ServerError;

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 12;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    full_name: String,
    username: String,
    email: String,
    password: String,
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    message: String,
    user: UserDto,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ServerError> {
    if !state.config.registration_open {
        return Err(ServerError::RegistrationClosed);
    }

    if req.password.chars().count() < 6 {
        return Err(ServerError::BadRequest(
            "Password must be at least 6 characters long".to_string(),
        ));
    }

    // Hash before taking the service lock; bcrypt is deliberately slow.
    let password_hash = bcrypt::hash(&req.password, BCRYPT_COST)
        .map_err(|e| ServerError::Internal(format!("Password hashing failed: {e}")))?;

    let user = {
        let service = state.service()?;
        service.create_user(NewUser {
            full_name: req.full_name,
            username: req.username,
            email: req.email,
            password_hash,
            avatar_url: req.avatar_url,
        })?
    };

    info!(user_id = %user.id, username = %user.username, "Account created via API");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Account created successfully".to_string(),
            user: user.into(),
        }),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    email: String,
    password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ServerError> {
    let user = {
        let service = state.service()?;
        match service.resolve_user_by_email(&req.email) {
            Ok(user) => user,
            // Same response as a wrong password: do not reveal which field
            // was wrong.
            Err(ChatError::NotFound(_)) => return Err(ServerError::InvalidCredentials),
            Err(other) => return Err(other.into()),
        }
    };

    let valid = bcrypt::verify(&req.password, &user.password_hash)
        .map_err(|e| ServerError::Internal(format!("Password verification failed: {e}")))?;
    if !valid {
        return Err(ServerError::InvalidCredentials);
    }

    let user = {
        let service = state.service()?;
        service.set_online(user.id, true)?;
        service.resolve_user(user.id)?
    };

    info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        message: format!("Welcome back, {}!", user.full_name),
        user: user.into(),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    user_id: Uuid,
}

pub async fn logout(
    State(state): State<AppState>,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let service = state.service()?;
    service.set_online(req.user_id, false)?;

    info!(user_id = %req.user_id, "User logged out");

    Ok(Json(serde_json::json!({ "message": "Logged out" })))
}
