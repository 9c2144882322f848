use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::debug;

use orchestrator_core::models::{CapabilityRequirement, Worker};
use orchestrator_core::OrchestratorResult;

/// Worker选择策略接口
#[async_trait]
pub trait WorkerSelector: Send + Sync {
    /// 从候选中选出一个满足要求的Worker，没有合适的返回None
    async fn select(
        &self,
        requirement: &CapabilityRequirement,
        candidates: &[Worker],
    ) -> OrchestratorResult<Option<String>>;

    fn name(&self) -> &str;
}

/// 轮询策略
pub struct RoundRobinSelector {
    counter: AtomicUsize,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }
}

impl Default for RoundRobinSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkerSelector for RoundRobinSelector {
    async fn select(
        &self,
        requirement: &CapabilityRequirement,
        candidates: &[Worker],
    ) -> OrchestratorResult<Option<String>> {
        let eligible: Vec<&Worker> = candidates
            .iter()
            .filter(|worker| worker.is_eligible(requirement))
            .collect();

        if eligible.is_empty() {
            debug!("没有满足要求的可用Worker");
            return Ok(None);
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % eligible.len();
        let selected = eligible[index];

        debug!(
            worker_id = %selected.id,
            index,
            total = eligible.len(),
            "轮询策略选择Worker"
        );

        Ok(Some(selected.id.clone()))
    }

    fn name(&self) -> &str {
        "RoundRobin"
    }
}

/// 最低负载策略
pub struct LeastLoadedSelector;

impl LeastLoadedSelector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LeastLoadedSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkerSelector for LeastLoadedSelector {
    async fn select(
        &self,
        requirement: &CapabilityRequirement,
        candidates: &[Worker],
    ) -> OrchestratorResult<Option<String>> {
        let selected = candidates
            .iter()
            .filter(|worker| worker.is_eligible(requirement))
            .min_by(|a, b| {
                a.load_percentage()
                    .partial_cmp(&b.load_percentage())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

        match selected {
            Some(worker) => {
                debug!(
                    worker_id = %worker.id,
                    load = worker.load_percentage(),
                    "负载均衡策略选择Worker"
                );
                Ok(Some(worker.id.clone()))
            }
            None => {
                debug!("没有满足要求的可用Worker");
                Ok(None)
            }
        }
    }

    fn name(&self) -> &str {
        "LeastLoaded"
    }
}
