use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{get, patch, post},
};

use super::{channel, content, session, social};
use crate::auth::{SessionManager, TokenCodec};
use crate::config::AuthConfig;
use crate::error::Result;
use crate::graph::{GraphAggregator, ToggleEngine};
use crate::store::{HistoryPolicy, Store};

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub sessions: SessionManager,
    pub graph: GraphAggregator,
    pub toggles: ToggleEngine,
    pub history: HistoryPolicy,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, auth: &AuthConfig, history: HistoryPolicy) -> Result<Self> {
        let codec = TokenCodec::new(auth)?;
        Ok(Self {
            sessions: SessionManager::new(store.clone(), codec),
            graph: GraphAggregator::new(store.clone()),
            toggles: ToggleEngine::new(store.clone()),
            history,
            store,
        })
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/auth/register", post(session::register))
        .route("/auth/login", post(session::login))
        .route("/auth/logout", post(session::logout))
        .route("/auth/refresh", post(session::refresh))
        .route("/auth/change-password", post(session::change_password))
        .route("/auth/me", get(session::me).patch(session::update_me))
        .route("/channels/{username}", get(channel::channel_profile))
        .route("/channels/{username}/tweets", get(channel::channel_tweets))
        .route(
            "/channels/{username}/subscribers",
            get(channel::channel_subscribers),
        )
        .route("/subscriptions", get(channel::subscribed_channels))
        .route(
            "/subscriptions/{channel_id}/toggle",
            post(social::toggle_subscription),
        )
        .route(
            "/likes/{kind}/{target_id}/toggle",
            post(social::toggle_like),
        )
        .route("/dashboard/stats", get(channel::dashboard_stats))
        .route("/dashboard/videos", get(channel::dashboard_videos))
        .route("/videos", post(content::create_video))
        .route("/videos/liked", get(channel::liked_videos))
        .route(
            "/videos/{id}",
            get(content::get_video)
                .patch(content::update_video)
                .delete(content::delete_video),
        )
        .route("/videos/{id}/view", post(content::record_view))
        .route(
            "/videos/{id}/publish-toggle",
            post(content::toggle_publish),
        )
        .route(
            "/videos/{id}/comments",
            get(content::list_comments).post(content::add_comment),
        )
        .route(
            "/comments/{id}",
            patch(content::update_comment).delete(content::delete_comment),
        )
        .route("/tweets", post(content::create_tweet))
        .route(
            "/tweets/{id}",
            patch(content::update_tweet).delete(content::delete_tweet),
        )
        .route("/history", get(channel::watch_history));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
