use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{
            ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
            UpdateMeRequest,
        },
        jwt::AuthUser,
        service::{AuthSuccess, PublicUser},
    },
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).patch(update_me).delete(delete_me))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

const MIN_PASSWORD_LEN: usize = 8;

fn check_credentials(email: &str, password: &str) -> ApiResult<()> {
    if !is_valid_email(email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::BadRequest("Invalid email".into()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(ApiError::BadRequest("Password too short".into()));
    }
    Ok(())
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> ApiResult<Json<AuthSuccess>> {
    payload.email = payload.email.trim().to_string();
    check_credentials(&payload.email, &payload.password)?;
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Name must not be empty".into()));
    }

    let success = state
        .auth
        .register(payload.name.trim(), &payload.email, &payload.password)
        .await?;
    Ok(Json(success))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> ApiResult<Json<AuthSuccess>> {
    payload.email = payload.email.trim().to_string();
    if !is_valid_email(&payload.email) {
        return Err(ApiError::BadRequest("Invalid email".into()));
    }

    let success = state.auth.login(&payload.email, &payload.password).await?;
    Ok(Json(success))
}

#[instrument(skip(state, payload))]
async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<Value>> {
    payload.email = payload.email.trim().to_string();
    if !is_valid_email(&payload.email) {
        return Err(ApiError::BadRequest("Invalid email".into()));
    }

    let message = state.auth.forgot_password(&payload.email).await?;
    Ok(Json(json!({ "message": message })))
}

#[instrument(skip(state, payload))]
async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<Json<Value>> {
    if payload.token.trim().is_empty() {
        return Err(ApiError::BadRequest("Reset token is required".into()));
    }
    if payload.new_password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest("Password too short".into()));
    }

    let message = state
        .auth
        .reset_password(payload.token.trim(), &payload.new_password)
        .await?;
    Ok(Json(json!({ "message": message })))
}

#[instrument(skip(state))]
async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<PublicUser>> {
    let user = state
        .auth
        .users()
        .find_by_id(user_id)
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;
    Ok(Json(PublicUser::from(&user)))
}

#[instrument(skip(state, payload))]
async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateMeRequest>,
) -> ApiResult<Json<PublicUser>> {
    if matches!(&payload.name, Some(n) if n.trim().is_empty()) {
        return Err(ApiError::BadRequest("Name must not be empty".into()));
    }
    let email = match payload.email {
        Some(e) => {
            let e = e.trim().to_string();
            if !is_valid_email(&e) {
                return Err(ApiError::BadRequest("Invalid email".into()));
            }
            Some(e)
        }
        None => None,
    };
    if matches!(&payload.password, Some(p) if p.len() < MIN_PASSWORD_LEN) {
        return Err(ApiError::BadRequest("Password too short".into()));
    }

    let user = state
        .auth
        .update_profile(
            user_id,
            payload.name.map(|n| n.trim().to_string()),
            email,
            payload.password,
        )
        .await?;
    Ok(Json(user))
}

#[instrument(skip(state))]
async fn delete_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Value>> {
    state.auth.delete_account(user_id).await?;
    Ok(Json(json!({ "message": "Account deleted" })))
}
