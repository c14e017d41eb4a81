use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;

use super::response::{ApiError, ApiResponse};
use crate::auth::RequireIdentity;
use crate::server::AppState;
use crate::types::LikeTarget;

pub async fn toggle_subscription(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.toggles.toggle_subscription(&auth.0.id, &channel_id)?;
    Ok(ApiResponse::ok(
        json!({ "state": outcome }),
        "Subscription toggled",
    ))
}

pub async fn toggle_like(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path((kind, target_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let kind: LikeTarget = kind
        .parse()
        .map_err(|e: String| ApiError::bad_request(e))?;

    let outcome = state.toggles.toggle_like(&auth.0.id, kind, &target_id)?;
    Ok(ApiResponse::ok(json!({ "state": outcome }), "Like toggled"))
}
