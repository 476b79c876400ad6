pub mod config;
pub mod core;
pub mod domain;
pub mod utils;
pub mod web;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::AppConfig;

pub use core::{ProcessRunner, StageService};
pub use utils::error::{DashboardError, Result};
pub use web::{build_router, AppState};
