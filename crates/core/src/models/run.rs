use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{OrchestratorError, OrchestratorResult};

/// 执行记录状态机
///
/// PENDING -> RUNNING -> SUCCEEDED/FAILED，任意状态可标记为 DEAD，
/// 只有 PENDING 可标记为 MISSED。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RunStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "RUNNING")]
    Running,
    #[serde(rename = "SUCCEEDED")]
    Succeeded,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "DEAD")]
    Dead,
    #[serde(rename = "MISSED")]
    Missed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "PENDING",
            RunStatus::Running => "RUNNING",
            RunStatus::Succeeded => "SUCCEEDED",
            RunStatus::Failed => "FAILED",
            RunStatus::Dead => "DEAD",
            RunStatus::Missed => "MISSED",
        }
    }
}

impl sqlx::Type<sqlx::Postgres> for RunStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("VARCHAR")
    }
}

impl sqlx::Type<sqlx::Sqlite> for RunStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for RunStatus {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        match s {
            "PENDING" => Ok(RunStatus::Pending),
            "RUNNING" => Ok(RunStatus::Running),
            "SUCCEEDED" => Ok(RunStatus::Succeeded),
            "FAILED" => Ok(RunStatus::Failed),
            "DEAD" => Ok(RunStatus::Dead),
            "MISSED" => Ok(RunStatus::Missed),
            _ => Err(format!("Invalid run status: {s}").into()),
        }
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for RunStatus {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for RunStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        match s {
            "PENDING" => Ok(RunStatus::Pending),
            "RUNNING" => Ok(RunStatus::Running),
            "SUCCEEDED" => Ok(RunStatus::Succeeded),
            "FAILED" => Ok(RunStatus::Failed),
            "DEAD" => Ok(RunStatus::Dead),
            "MISSED" => Ok(RunStatus::Missed),
            _ => Err(format!("Invalid run status: {s}").into()),
        }
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for RunStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
    }
}

/// 执行时序指标
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunMetrics {
    /// 创建到开始执行的等待毫秒数
    pub latency_ms: Option<i64>,
    /// 开始到结束的执行毫秒数
    pub duration_ms: Option<i64>,
}

/// 一次具体的执行尝试
///
/// 要么属于调度（schedule_id），要么属于作业（job_id），二者必居其一。
/// 状态转换都返回新实例，原记录保持不变。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Run {
    pub id: String,
    pub tenant_id: String,
    pub schedule_id: Option<String>,
    pub job_id: Option<String>,
    /// 同一触发时刻的幂等键，仓储层保证唯一
    pub dedupe_key: Option<String>,
    pub status: RunStatus,
    /// 第几次尝试，从1开始
    pub attempt: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub metrics: RunMetrics,
    pub worker_id: Option<String>,
    pub payload: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl Run {
    fn new_inner(
        tenant_id: String,
        schedule_id: Option<String>,
        job_id: Option<String>,
        attempt: i32,
    ) -> OrchestratorResult<Self> {
        if schedule_id.is_some() == job_id.is_some() {
            return Err(OrchestratorError::configuration(
                "run must reference exactly one of schedule_id or job_id",
            ));
        }
        if attempt < 1 {
            return Err(OrchestratorError::configuration(
                "attempt must be at least 1",
            ));
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            tenant_id,
            schedule_id,
            job_id,
            dedupe_key: None,
            status: RunStatus::Pending,
            attempt,
            started_at: None,
            finished_at: None,
            error_message: None,
            metrics: RunMetrics::default(),
            worker_id: None,
            payload: None,
            created_at: Utc::now(),
        })
    }

    pub fn for_schedule(
        tenant_id: String,
        schedule_id: String,
        attempt: i32,
    ) -> OrchestratorResult<Self> {
        Self::new_inner(tenant_id, Some(schedule_id), None, attempt)
    }

    pub fn for_job(tenant_id: String, job_id: String, attempt: i32) -> OrchestratorResult<Self> {
        Self::new_inner(tenant_id, None, Some(job_id), attempt)
    }

    pub fn with_dedupe_key(mut self, dedupe_key: String) -> Self {
        self.dedupe_key = Some(dedupe_key);
        self
    }

    pub fn with_payload(mut self, payload: Option<Value>) -> Self {
        self.payload = payload;
        self
    }

    /// PENDING -> RUNNING，记录开始时间和等待耗时
    pub fn start(&self, worker_id: Option<String>) -> OrchestratorResult<Self> {
        if self.status != RunStatus::Pending {
            return Err(OrchestratorError::state_transition(
                self.status.as_str(),
                RunStatus::Running.as_str(),
            ));
        }
        let now = Utc::now();
        let mut next = self.clone();
        next.status = RunStatus::Running;
        next.started_at = Some(now);
        next.worker_id = worker_id;
        next.metrics.latency_ms = Some((now - self.created_at).num_milliseconds());
        Ok(next)
    }

    /// RUNNING -> SUCCEEDED，记录结束时间和执行耗时
    pub fn succeed(&self) -> OrchestratorResult<Self> {
        if self.status != RunStatus::Running {
            return Err(OrchestratorError::state_transition(
                self.status.as_str(),
                RunStatus::Succeeded.as_str(),
            ));
        }
        let now = Utc::now();
        let mut next = self.clone();
        next.status = RunStatus::Succeeded;
        next.finished_at = Some(now);
        next.metrics.duration_ms = self
            .started_at
            .map(|started| (now - started).num_milliseconds());
        Ok(next)
    }

    /// RUNNING -> FAILED，记录失败原因
    pub fn fail<S: Into<String>>(&self, error: S) -> OrchestratorResult<Self> {
        if self.status != RunStatus::Running {
            return Err(OrchestratorError::state_transition(
                self.status.as_str(),
                RunStatus::Failed.as_str(),
            ));
        }
        let now = Utc::now();
        let mut next = self.clone();
        next.status = RunStatus::Failed;
        next.finished_at = Some(now);
        next.error_message = Some(error.into());
        next.metrics.duration_ms = self
            .started_at
            .map(|started| (now - started).num_milliseconds());
        Ok(next)
    }

    /// 任意状态 -> DEAD，重试耗尽或人工终止
    pub fn mark_dead<S: Into<String>>(&self, error: S) -> Self {
        let mut next = self.clone();
        next.status = RunStatus::Dead;
        next.finished_at = Some(Utc::now());
        next.error_message = Some(error.into());
        next
    }

    /// PENDING -> MISSED，错过触发窗口
    pub fn mark_missed(&self) -> OrchestratorResult<Self> {
        if self.status != RunStatus::Pending {
            return Err(OrchestratorError::state_transition(
                self.status.as_str(),
                RunStatus::Missed.as_str(),
            ));
        }
        let mut next = self.clone();
        next.status = RunStatus::Missed;
        next.finished_at = Some(Utc::now());
        Ok(next)
    }

    pub fn can_retry(&self) -> bool {
        self.status == RunStatus::Failed
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            RunStatus::Succeeded | RunStatus::Failed | RunStatus::Dead | RunStatus::Missed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_run() -> Run {
        Run::for_schedule("tenant-1".to_string(), "sched-1".to_string(), 1).unwrap()
    }

    #[test]
    fn test_exactly_one_parent_required() {
        assert!(Run::for_schedule("t".to_string(), "s".to_string(), 1).is_ok());
        assert!(Run::for_job("t".to_string(), "j".to_string(), 1).is_ok());

        let neither = Run::new_inner("t".to_string(), None, None, 1);
        assert!(neither.is_err());
        let both = Run::new_inner("t".to_string(), Some("s".to_string()), Some("j".to_string()), 1);
        assert!(both.is_err());
    }

    #[test]
    fn test_attempt_must_be_positive() {
        assert!(Run::for_job("t".to_string(), "j".to_string(), 0).is_err());
    }

    #[test]
    fn test_happy_path_transitions() {
        let run = pending_run();
        let running = run.start(Some("worker-1".to_string())).unwrap();
        assert_eq!(running.status, RunStatus::Running);
        assert!(running.started_at.is_some());
        assert!(running.metrics.latency_ms.is_some());
        assert_eq!(running.worker_id.as_deref(), Some("worker-1"));

        let succeeded = running.succeed().unwrap();
        assert_eq!(succeeded.status, RunStatus::Succeeded);
        assert!(succeeded.finished_at.is_some());
        assert!(succeeded.metrics.duration_ms.is_some());
        assert!(succeeded.is_terminal());

        // Original values untouched
        assert_eq!(run.status, RunStatus::Pending);
        assert_eq!(running.status, RunStatus::Running);
    }

    #[test]
    fn test_fail_records_error() {
        let running = pending_run().start(None).unwrap();
        let failed = running.fail("boom").unwrap();
        assert_eq!(failed.status, RunStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("boom"));
        assert!(failed.can_retry());
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let run = pending_run();
        assert!(run.succeed().is_err());
        assert!(run.fail("x").is_err());

        let succeeded = run.start(None).unwrap().succeed().unwrap();
        let err = succeeded.start(None).unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::InvalidStateTransition { .. }
        ));
        assert!(succeeded.mark_missed().is_err());
    }

    #[test]
    fn test_mark_dead_from_any_state() {
        let dead_from_pending = pending_run().mark_dead("terminated");
        assert_eq!(dead_from_pending.status, RunStatus::Dead);

        let running = pending_run().start(None).unwrap();
        let dead_from_running = running.mark_dead("retries exhausted");
        assert_eq!(dead_from_running.status, RunStatus::Dead);
        assert_eq!(
            dead_from_running.error_message.as_deref(),
            Some("retries exhausted")
        );
        assert!(!dead_from_running.can_retry());
    }

    #[test]
    fn test_mark_missed_only_from_pending() {
        let missed = pending_run().mark_missed().unwrap();
        assert_eq!(missed.status, RunStatus::Missed);
        assert!(missed.is_terminal());

        let running = pending_run().start(None).unwrap();
        assert!(running.mark_missed().is_err());
    }

    #[test]
    fn test_status_serde_rename() {
        let json = serde_json::to_string(&RunStatus::Succeeded).unwrap();
        assert_eq!(json, "\"SUCCEEDED\"");
        let parsed: RunStatus = serde_json::from_str("\"MISSED\"").unwrap();
        assert_eq!(parsed, RunStatus::Missed);
    }
}
