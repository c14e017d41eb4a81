mod channel;
mod content;
pub mod dto;
pub mod response;
mod router;
mod session;
mod social;

pub use router::{AppState, create_router};
