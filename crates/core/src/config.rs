use serde::{Deserialize, Serialize};

use crate::{OrchestratorError, OrchestratorResult};

/// 调度服务运行时配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// 全局重试次数上限（不含首次执行）
    pub max_retries: i32,
    /// 调度未指定时区时的默认时区
    pub default_timezone: String,
    /// 重新启用调度时是否补跑错过的触发
    pub enable_backfill: bool,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            default_timezone: "UTC".to_string(),
            enable_backfill: false,
        }
    }
}

impl SchedulingConfig {
    pub fn validate(&self) -> OrchestratorResult<()> {
        if self.max_retries < 0 {
            return Err(OrchestratorError::configuration(
                "max_retries must not be negative",
            ));
        }
        if self.default_timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(OrchestratorError::InvalidTimezone(
                self.default_timezone.clone(),
            ));
        }
        Ok(())
    }
}
