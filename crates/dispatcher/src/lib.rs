pub mod retry_service;
pub mod scheduling_service;
pub mod strategies;
pub mod trigger_utils;

pub use retry_service::{RetryDecision, RetryPolicy};
pub use scheduling_service::{
    ExecutionContext, ExecutionOutcome, SchedulingService, ValidationReport,
};
pub use strategies::{LeastLoadedSelector, RoundRobinSelector, WorkerSelector};
