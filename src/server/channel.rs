use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};

use super::dto::PageParams;
use super::response::{ApiError, ApiResponse};
use crate::auth::RequireIdentity;
use crate::server::AppState;

pub async fn channel_profile(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.graph.channel_profile(&username, &auth.0.id)?;
    Ok(ApiResponse::ok(profile, "Channel profile fetched"))
}

pub async fn channel_subscribers(
    _auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let subscribers = state.graph.channel_subscribers(&username)?;
    Ok(ApiResponse::ok(subscribers, "Channel subscribers fetched"))
}

pub async fn subscribed_channels(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let channels = state.graph.subscribed_channels(&auth.0.id)?;
    Ok(ApiResponse::ok(channels, "Subscribed channels fetched"))
}

pub async fn dashboard_stats(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let stats = state.graph.dashboard_stats(&auth.0.id);
    ApiResponse::ok(stats, "Dashboard stats fetched")
}

/// The caller's own uploads, drafts included.
pub async fn dashboard_videos(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .graph
        .channel_videos(&auth.0.id, params.page(), params.limit())?;
    Ok(ApiResponse::ok(page, "Channel videos fetched"))
}

pub async fn channel_tweets(
    _auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tweets = state.graph.channel_tweets(&username)?;
    Ok(ApiResponse::ok(tweets, "Channel tweets fetched"))
}

pub async fn liked_videos(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .graph
        .liked_videos(&auth.0.id, params.page(), params.limit())?;
    Ok(ApiResponse::ok(page, "Liked videos fetched"))
}

pub async fn watch_history(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let history = state.graph.watch_history(&auth.0.id)?;
    Ok(ApiResponse::ok(history, "Watch history fetched"))
}
