use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use orchestrator_core::models::{Job, Run};
use orchestrator_core::{OrchestratorError, OrchestratorResult, SchedulingConfig};

/// 失败执行的处置结果
#[derive(Debug, Clone)]
pub enum RetryDecision {
    /// 重试：新的待执行记录和最早可执行时间
    Retry {
        run: Run,
        next_attempt_at: DateTime<Utc>,
    },
    /// 升级：重试耗尽，原记录标记为DEAD
    Escalate { run: Run },
}

/// 重试升级策略
///
/// 重试以新的执行记录表达，失败的原记录保持不变作为历史。
/// 尝试总数同时受作业自身的 max_attempts 和服务全局的
/// max_retries 约束。
pub struct RetryPolicy {
    max_retries: i32,
}

impl RetryPolicy {
    pub fn new(config: &SchedulingConfig) -> Self {
        Self {
            max_retries: config.max_retries,
        }
    }

    /// 评估一次失败执行：重试或升级
    pub fn evaluate(&self, job: &Job, failed: &Run, now: DateTime<Utc>) -> OrchestratorResult<RetryDecision> {
        if !failed.can_retry() {
            return Err(OrchestratorError::state_transition(
                failed.status.as_str(),
                "RETRY",
            ));
        }
        let Some(job_id) = &failed.job_id else {
            return Err(OrchestratorError::configuration(
                "only job runs participate in retry escalation",
            ));
        };

        // 全局上限换算成尝试次数：首次执行加max_retries次重试
        let attempt_cap = job.max_attempts.min(self.max_retries + 1);
        if failed.attempt >= attempt_cap {
            info!(
                run_id = %failed.id,
                job_id = %job_id,
                attempt = failed.attempt,
                "重试次数已耗尽，执行升级为DEAD"
            );
            return Ok(RetryDecision::Escalate {
                run: failed.mark_dead("重试次数已耗尽"),
            });
        }

        let next_attempt = failed.attempt + 1;
        let delay = Duration::seconds(job.backoff_delay_seconds(next_attempt));
        let retry = Run::for_job(failed.tenant_id.clone(), job_id.clone(), next_attempt)?
            .with_payload(failed.payload.clone());

        debug!(
            job_id = %job_id,
            attempt = next_attempt,
            delay_seconds = delay.num_seconds(),
            "创建重试执行记录"
        );

        Ok(RetryDecision::Retry {
            run: retry,
            next_attempt_at: now + delay,
        })
    }
}
