use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::OrchestratorResult;

/// 触发产生的调度事件封包
///
/// 下游执行器按 `event_type` 路由，`correlation_id`/`causation_id`
/// 用于串联一次调度的完整链路。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchEvent {
    pub event_id: String,
    pub event_type: String,
    pub event_version: i32,
    pub occurred_at: DateTime<Utc>,
    pub tenant_id: String,
    pub correlation_id: Option<String>,
    pub causation_id: Option<String>,
    pub payload: Option<Value>,
}

impl DispatchEvent {
    pub fn new(event_type: String, tenant_id: String, payload: Option<Value>) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            event_type,
            event_version: 1,
            occurred_at: Utc::now(),
            tenant_id,
            correlation_id: None,
            causation_id: None,
            payload,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: Option<String>) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    pub fn with_causation_id(mut self, causation_id: Option<String>) -> Self {
        self.causation_id = causation_id;
        self
    }

    /// 序列化为JSON字节，用于投递
    pub fn serialize_to_json(&self) -> OrchestratorResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// 从JSON字节反序列化
    pub fn deserialize_from_json(data: &[u8]) -> OrchestratorResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_event_defaults() {
        let event = DispatchEvent::new(
            "orders.sync".to_string(),
            "tenant-1".to_string(),
            Some(json!({"scheduleId": "sched-1"})),
        );
        assert_eq!(event.event_version, 1);
        assert!(event.correlation_id.is_none());
        assert!(!event.event_id.is_empty());
    }

    #[test]
    fn test_correlation_chain() {
        let event = DispatchEvent::new("orders.sync".to_string(), "tenant-1".to_string(), None)
            .with_correlation_id(Some("corr-1".to_string()))
            .with_causation_id(Some("cause-1".to_string()));
        assert_eq!(event.correlation_id.as_deref(), Some("corr-1"));
        assert_eq!(event.causation_id.as_deref(), Some("cause-1"));
    }

    #[test]
    fn test_json_round_trip() {
        let event = DispatchEvent::new(
            "billing.close".to_string(),
            "tenant-1".to_string(),
            Some(json!({"runId": "run-1"})),
        );
        let bytes = event.serialize_to_json().unwrap();
        let decoded = DispatchEvent::deserialize_from_json(&bytes).unwrap();
        assert_eq!(decoded, event);
    }
}
