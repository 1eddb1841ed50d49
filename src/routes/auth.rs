use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{password, AuthenticatedUser},
    error::{AppError, AppResult},
    models::NewUser,
    registry::is_valid_email,
    state::AppState,
    store::StoreError,
};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<LoginResponse>)> {
    if !is_valid_email(&payload.email) {
        return Err(AppError::validation("a valid email address is required"));
    }
    if payload.password.len() < 8 {
        return Err(AppError::validation(
            "password must be at least 8 characters",
        ));
    }
    if state.store.user_by_email(&payload.email).await?.is_some() {
        return Err(AppError::validation("email is already registered"));
    }

    let user = match state
        .store
        .insert_user(NewUser {
            id: Uuid::new_v4(),
            email: payload.email.trim().to_string(),
            name: payload.name.filter(|n| !n.trim().is_empty()),
            password_hash: password::hash_password(&payload.password)?,
        })
        .await
    {
        Ok(user) => user,
        // A concurrent registration can slip past the lookup above; the
        // unique constraint reports it the same way.
        Err(StoreError::Conflict(_)) => {
            return Err(AppError::validation("email is already registered"))
        }
        Err(err) => return Err(err.into()),
    };

    let access_token = state.jwt.generate_token(user.id, &user.email)?;
    Ok((
        StatusCode::CREATED,
        Json(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: state.config.jwt_expiry_minutes * 60,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user = state
        .store
        .user_by_email(&payload.email)
        .await?
        .ok_or_else(AppError::unauthorized)?;

    let valid = password::verify_password(&payload.password, &user.password_hash)
        .map_err(|_| AppError::unauthorized())?;
    if !valid {
        return Err(AppError::unauthorized());
    }

    let access_token = state.jwt.generate_token(user.id, &user.email)?;
    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.jwt_expiry_minutes * 60,
    }))
}

pub async fn me(user: AuthenticatedUser) -> Json<AuthenticatedUser> {
    Json(user)
}
