//! # Videotube
//!
//! A social-video platform backend, usable both as a standalone binary and
//! as a library. The core is the session lifecycle (paired access/refresh
//! tokens with rotation-on-use) and the social-graph aggregation engine
//! (subscriber/like/view facts derived by joining independent relation
//! collections on demand).
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use videotube::config::AuthConfig;
//! use videotube::server::{AppState, create_router};
//! use videotube::store::{HistoryPolicy, SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/videotube.db").unwrap();
//! store.initialize().unwrap();
//!
//! let auth = AuthConfig::with_secrets("access".into(), "refresh".into());
//! let state = Arc::new(
//!     AppState::new(Arc::new(store), &auth, HistoryPolicy::default()).unwrap(),
//! );
//! let router = create_router(state);
//! // Serve with axum...
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod graph;
pub mod server;
pub mod store;
pub mod types;
