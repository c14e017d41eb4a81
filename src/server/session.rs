use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
};

use super::dto::{
    ChangePasswordRequest, LoginRequest, RefreshRequest, RegisterRequest, SessionResponse,
    TokenPairResponse, UpdateAccountRequest,
};
use super::response::{ApiError, ApiResponse};
use crate::auth::{NewIdentity, RequireIdentity, cookie_value};
use crate::server::AppState;

type SetCookies = AppendHeaders<Vec<(axum::http::HeaderName, String)>>;

/// HTTP-only session cookies carrying the freshly issued pair. The cookie
/// carrier takes precedence over the Authorization header on the way back
/// in.
fn session_cookies(access_token: &str, refresh_token: &str) -> SetCookies {
    AppendHeaders(vec![
        (
            SET_COOKIE,
            format!("access_token={access_token}; Path=/; HttpOnly; SameSite=Lax"),
        ),
        (
            SET_COOKIE,
            format!("refresh_token={refresh_token}; Path=/; HttpOnly; SameSite=Lax"),
        ),
    ])
}

fn clear_cookies() -> SetCookies {
    AppendHeaders(vec![
        (
            SET_COOKIE,
            "access_token=; Path=/; HttpOnly; Max-Age=0".to_string(),
        ),
        (
            SET_COOKIE,
            "refresh_token=; Path=/; HttpOnly; Max-Age=0".to_string(),
        ),
    ])
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = state.sessions.register(NewIdentity {
        username: req.username,
        email: req.email,
        full_name: req.full_name,
        password: req.password,
        avatar_url: req.avatar_url,
        cover_url: req.cover_url,
    })?;

    Ok(ApiResponse::created(identity, "Registered successfully"))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.sessions.login(&req.login, &req.password)?;

    let cookies = session_cookies(&session.access_token, &session.refresh_token);
    let body = ApiResponse::ok(
        SessionResponse {
            identity: session.identity,
            access_token: session.access_token,
            refresh_token: session.refresh_token,
        },
        "Logged in successfully",
    );

    Ok((cookies, body))
}

pub async fn logout(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    state.sessions.logout(&auth.0.id)?;
    Ok((clear_cookies(), ApiResponse::ok((), "Logged out")))
}

/// Rotation endpoint. The incoming refresh token is taken from the
/// `refresh_token` cookie when present, otherwise from the request body.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let incoming = cookie_value(&headers, "refresh_token")
        .or_else(|| body.and_then(|Json(req)| req.refresh_token))
        .ok_or_else(|| ApiError::unauthorized("Refresh token required"))?;

    let rotated = state.sessions.refresh(&incoming)?;

    let cookies = session_cookies(&rotated.access_token, &rotated.refresh_token);
    let body = ApiResponse::ok(
        TokenPairResponse {
            access_token: rotated.access_token,
            refresh_token: rotated.refresh_token,
        },
        "Session refreshed",
    );

    Ok((cookies, body))
}

pub async fn change_password(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .sessions
        .change_password(&auth.0.id, &req.old_password, &req.new_password)?;
    Ok(ApiResponse::ok((), "Password changed"))
}

pub async fn me(auth: RequireIdentity) -> impl IntoResponse {
    ApiResponse::ok(auth.0, "Current identity")
}

/// Partial account update; absent fields keep their current values.
pub async fn update_me(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut identity = auth.0;
    if let Some(full_name) = req.full_name {
        if full_name.trim().is_empty() {
            return Err(ApiError::bad_request("Full name is required"));
        }
        identity.full_name = full_name.trim().to_string();
    }
    if let Some(email) = req.email {
        if email.trim().is_empty() {
            return Err(ApiError::bad_request("Email is required"));
        }
        identity.email = email.trim().to_string();
    }

    state
        .store
        .update_account(&identity.id, &identity.full_name, &identity.email)?;
    Ok(ApiResponse::ok(identity, "Account updated"))
}
