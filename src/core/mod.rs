pub mod bridge;
pub mod export;
pub mod mock;
pub mod stages;

pub use crate::domain::ports::{ScriptInvocation, ScriptOutput, ScriptRunner};
pub use crate::utils::error::Result;
pub use bridge::ProcessRunner;
pub use stages::StageService;
