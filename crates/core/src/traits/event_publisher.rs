use async_trait::async_trait;

use crate::models::DispatchEvent;
use crate::OrchestratorResult;

/// 事件发布接口
///
/// 调度触发后把事件交给消息基础设施，具体实现可以是
/// 消息队列、HTTP分发器或进程内总线。
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// 发布单个事件
    async fn publish(&self, event: &DispatchEvent) -> OrchestratorResult<()>;

    /// 批量发布事件
    async fn publish_batch(&self, events: &[DispatchEvent]) -> OrchestratorResult<()>;

    /// 发布通道是否健康
    async fn is_healthy(&self) -> bool;
}
