use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{OrchestratorError, OrchestratorResult};

/// 重试退避策略类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BackoffStrategy {
    #[serde(rename = "FIXED")]
    Fixed,
    #[serde(rename = "EXPONENTIAL")]
    Exponential,
}

/// 重试退避参数
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackoffPolicy {
    pub strategy: BackoffStrategy,
    /// 基础退避秒数
    pub base_seconds: i64,
    /// 退避上限秒数，不设置时固定策略以基础值为上限
    pub max_seconds: Option<i64>,
}

impl BackoffPolicy {
    pub fn fixed(base_seconds: i64) -> Self {
        Self {
            strategy: BackoffStrategy::Fixed,
            base_seconds,
            max_seconds: None,
        }
    }

    pub fn exponential(base_seconds: i64, max_seconds: i64) -> Self {
        Self {
            strategy: BackoffStrategy::Exponential,
            base_seconds,
            max_seconds: Some(max_seconds),
        }
    }
}

/// 可重试的工作单元定义
///
/// 作业描述"跑什么、怎么重试、多久算超时"，具体的一次执行由 `Run` 记录。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: String,
    pub tenant_id: String,
    /// 租户+队列内唯一的作业标识
    pub key: String,
    pub queue: String,
    /// 优先级，1最高9最低
    pub priority: i32,
    /// 总尝试次数上限（含首次执行）
    pub max_attempts: i32,
    pub backoff: BackoffPolicy,
    pub timeout_seconds: i64,
    /// 同一作业允许并行的执行数
    pub concurrency_limit: Option<i32>,
    /// 从开始到结束允许的时长，超出视为违反SLA
    pub sla_seconds: Option<i64>,
    pub enabled: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(
        tenant_id: String,
        key: String,
        queue: String,
        priority: i32,
        max_attempts: i32,
        backoff: BackoffPolicy,
        timeout_seconds: i64,
    ) -> OrchestratorResult<Self> {
        if max_attempts < 1 {
            return Err(OrchestratorError::configuration(
                "max_attempts must be at least 1",
            ));
        }
        if timeout_seconds < 1 {
            return Err(OrchestratorError::configuration(
                "timeout_seconds must be at least 1",
            ));
        }
        if backoff.base_seconds < 1 {
            return Err(OrchestratorError::configuration(
                "backoff base_seconds must be at least 1",
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            tenant_id,
            key,
            queue,
            priority: priority.clamp(1, 9),
            max_attempts,
            backoff,
            timeout_seconds,
            concurrency_limit: None,
            sla_seconds: None,
            enabled: true,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_concurrency_limit(mut self, limit: i32) -> Self {
        self.concurrency_limit = Some(limit);
        self
    }

    pub fn with_sla_seconds(mut self, sla_seconds: i64) -> Self {
        self.sla_seconds = Some(sla_seconds);
        self
    }

    /// 计算第 `attempt` 次尝试前的退避秒数
    ///
    /// 首次尝试（attempt <= 1）没有退避。指数策略按 base * 2^(attempt-2)
    /// 增长并受上限截断。
    pub fn backoff_delay_seconds(&self, attempt: i32) -> i64 {
        if attempt <= 1 {
            return 0;
        }
        match self.backoff.strategy {
            BackoffStrategy::Fixed => {
                let cap = self.backoff.max_seconds.unwrap_or(self.backoff.base_seconds);
                self.backoff.base_seconds.min(cap)
            }
            BackoffStrategy::Exponential => {
                let exponent = (attempt - 2).min(62) as u32;
                let delay = self
                    .backoff
                    .base_seconds
                    .saturating_mul(1i64.checked_shl(exponent).unwrap_or(i64::MAX));
                match self.backoff.max_seconds {
                    Some(cap) => delay.min(cap),
                    None => delay,
                }
            }
        }
    }

    /// 判断一次执行是否违反SLA
    ///
    /// 未结束的执行以 `now` 为准。未配置SLA时恒为假。
    pub fn is_sla_violated(
        &self,
        started_at: DateTime<Utc>,
        finished_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(sla) = self.sla_seconds else {
            return false;
        };
        let end = finished_at.unwrap_or(now);
        end - started_at > Duration::seconds(sla)
    }

    /// 租户内队列标识
    pub fn queue_key(&self) -> String {
        format!("{}:{}", self.tenant_id, self.queue)
    }

    /// 租户+队列+key 的全局唯一标识
    pub fn job_key(&self) -> String {
        format!("{}:{}:{}", self.tenant_id, self.queue, self.key)
    }

    pub fn enable(&self) -> Self {
        let mut next = self.clone();
        next.enabled = true;
        next.version += 1;
        next.updated_at = Utc::now();
        next
    }

    pub fn disable(&self) -> Self {
        let mut next = self.clone();
        next.enabled = false;
        next.version += 1;
        next.updated_at = Utc::now();
        next
    }
}
