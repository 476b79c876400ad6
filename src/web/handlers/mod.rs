//! HTTP handlers for all API routes.

pub mod export;
pub mod pipeline;
pub mod system;
