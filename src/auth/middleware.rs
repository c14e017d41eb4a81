use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::Error;
use crate::server::AppState;
use crate::types::Identity;

/// Extractor that requires a valid access token and resolves the caller's
/// identity. The cookie carrier wins over the Authorization header when
/// both are present.
pub struct RequireIdentity(pub Identity);

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidScheme,
    Unauthorized,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Access token required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "code": status.as_u16(), "message": message });
        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"videotube\""),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequireIdentity {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let raw = extract_access_token(parts)?;

        let identity = state.sessions.authorize(&raw).map_err(|e| match e {
            Error::Unauthorized => AuthError::Unauthorized,
            _ => AuthError::InternalError,
        })?;

        Ok(RequireIdentity(identity))
    }
}

/// Pulls the raw access token out of the request: `access_token` cookie
/// first, then `Authorization: Bearer`.
fn extract_access_token(parts: &Parts) -> Result<String, AuthError> {
    if let Some(token) = cookie_value(&parts.headers, "access_token") {
        return Ok(token);
    }

    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match auth_header {
        Some(header) if header.starts_with("Bearer ") => {
            Ok(header.trim_start_matches("Bearer ").to_string())
        }
        Some(_) => Err(AuthError::InvalidScheme),
        None => Err(AuthError::MissingToken),
    }
}

/// Reads a single cookie from the Cookie header, if present.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(header::COOKIE)?.to_str().ok()?;

    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}
