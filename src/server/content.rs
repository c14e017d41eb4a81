use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use super::dto::{
    CreateCommentRequest, CreateTweetRequest, CreateVideoRequest, PageParams, UpdateBodyRequest,
    UpdateVideoRequest,
};
use super::response::{ApiError, ApiResponse};
use crate::auth::RequireIdentity;
use crate::server::AppState;
use crate::types::{Comment, Tweet, Video};

/// Loads a video for a viewer. Unpublished videos are visible only to their
/// owner; everyone else gets the same 404 as a missing id.
fn visible_video(state: &AppState, id: &str, viewer_id: &str) -> Result<Video, ApiError> {
    let video = state
        .store
        .get_video(id)?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    if !video.published && video.owner_id != viewer_id {
        return Err(ApiError::not_found("Video not found"));
    }
    Ok(video)
}

/// Loads a video and requires the caller to own it.
fn owned_video(state: &AppState, id: &str, owner_id: &str) -> Result<Video, ApiError> {
    let video = state
        .store
        .get_video(id)?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    if video.owner_id != owner_id {
        return Err(ApiError::forbidden("Not the owner of this video"));
    }
    Ok(video)
}

pub async fn create_video(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateVideoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("Title is required"));
    }
    if req.video_url.trim().is_empty() {
        return Err(ApiError::bad_request("Video URL is required"));
    }

    let video = Video {
        id: Uuid::new_v4().to_string(),
        owner_id: auth.0.id,
        title: req.title,
        description: req.description,
        video_url: req.video_url,
        thumbnail_url: req.thumbnail_url,
        views: 0,
        published: req.published,
        created_at: Utc::now(),
    };

    state.store.create_video(&video)?;
    Ok(ApiResponse::created(video, "Video published"))
}

pub async fn get_video(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let video = visible_video(&state, &id, &auth.0.id)?;
    Ok(ApiResponse::ok(video, "Video fetched"))
}

pub async fn update_video(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateVideoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut video = owned_video(&state, &id, &auth.0.id)?;

    if let Some(title) = req.title {
        if title.trim().is_empty() {
            return Err(ApiError::bad_request("Title is required"));
        }
        video.title = title;
    }
    if let Some(description) = req.description {
        video.description = Some(description);
    }
    if let Some(thumbnail_url) = req.thumbnail_url {
        video.thumbnail_url = Some(thumbnail_url);
    }

    state.store.update_video(&video)?;
    Ok(ApiResponse::ok(video, "Video updated"))
}

pub async fn delete_video(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    owned_video(&state, &id, &auth.0.id)?;
    state.store.delete_video(&id)?;
    Ok(ApiResponse::ok((), "Video deleted"))
}

pub async fn toggle_publish(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut video = owned_video(&state, &id, &auth.0.id)?;
    video.published = !video.published;
    state.store.update_video(&video)?;
    Ok(ApiResponse::ok(video, "Publish status toggled"))
}

/// Records a view: bumps the counter and appends to the viewer's watch
/// history under the configured policy.
pub async fn record_view(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    visible_video(&state, &id, &auth.0.id)?;

    state.store.increment_views(&id)?;
    state.store.record_watch(&auth.0.id, &id, &state.history)?;
    Ok(ApiResponse::ok((), "View recorded"))
}

pub async fn list_comments(
    _auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .graph
        .paginated_comments(&id, params.page(), params.limit())?;
    Ok(ApiResponse::ok(page, "Comments fetched"))
}

pub async fn add_comment(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.body.trim().is_empty() {
        return Err(ApiError::bad_request("Comment body is required"));
    }
    visible_video(&state, &id, &auth.0.id)?;

    let comment = Comment {
        id: Uuid::new_v4().to_string(),
        video_id: id,
        owner_id: auth.0.id,
        body: req.body,
        created_at: Utc::now(),
    };

    state.store.create_comment(&comment)?;
    Ok(ApiResponse::created(comment, "Comment added"))
}

pub async fn create_tweet(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTweetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.body.trim().is_empty() {
        return Err(ApiError::bad_request("Tweet body is required"));
    }

    let tweet = Tweet {
        id: Uuid::new_v4().to_string(),
        owner_id: auth.0.id,
        body: req.body,
        created_at: Utc::now(),
    };

    state.store.create_tweet(&tweet)?;
    Ok(ApiResponse::created(tweet, "Tweet created"))
}

pub async fn update_comment(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateBodyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.body.trim().is_empty() {
        return Err(ApiError::bad_request("Comment body is required"));
    }

    let comment = state
        .store
        .get_comment(&id)?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;
    if comment.owner_id != auth.0.id {
        return Err(ApiError::forbidden("Not the owner of this comment"));
    }

    state.store.update_comment(&id, &req.body)?;
    Ok(ApiResponse::ok((), "Comment updated"))
}

pub async fn delete_comment(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .store
        .get_comment(&id)?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;
    if comment.owner_id != auth.0.id {
        return Err(ApiError::forbidden("Not the owner of this comment"));
    }

    state.store.delete_comment(&id)?;
    Ok(ApiResponse::ok((), "Comment deleted"))
}

pub async fn update_tweet(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateBodyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.body.trim().is_empty() {
        return Err(ApiError::bad_request("Tweet body is required"));
    }

    let tweet = state
        .store
        .get_tweet(&id)?
        .ok_or_else(|| ApiError::not_found("Tweet not found"))?;
    if tweet.owner_id != auth.0.id {
        return Err(ApiError::forbidden("Not the owner of this tweet"));
    }

    state.store.update_tweet(&id, &req.body)?;
    Ok(ApiResponse::ok((), "Tweet updated"))
}

pub async fn delete_tweet(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tweet = state
        .store
        .get_tweet(&id)?
        .ok_or_else(|| ApiError::not_found("Tweet not found"))?;
    if tweet.owner_id != auth.0.id {
        return Err(ApiError::forbidden("Not the owner of this tweet"));
    }

    state.store.delete_tweet(&id)?;
    Ok(ApiResponse::ok((), "Tweet deleted"))
}
