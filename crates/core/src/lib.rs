pub mod config;
pub mod errors;
pub mod models;
pub mod traits;

pub use config::SchedulingConfig;
pub use errors::OrchestratorError;
pub use models::*;
pub use traits::*;

/// 统一的结果类型
pub type OrchestratorResult<T> = std::result::Result<T, OrchestratorError>;
