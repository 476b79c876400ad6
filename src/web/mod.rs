//! HTTP surface of the dashboard backend.

pub mod handlers;
pub mod response;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::{AppState, SharedState};
