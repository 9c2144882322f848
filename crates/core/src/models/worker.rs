use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{OrchestratorError, OrchestratorResult};

/// Worker节点状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WorkerStatus {
    #[serde(rename = "ONLINE")]
    Online,
    #[serde(rename = "OFFLINE")]
    Offline,
    #[serde(rename = "MAINTENANCE")]
    Maintenance,
}

impl WorkerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerStatus::Online => "ONLINE",
            WorkerStatus::Offline => "OFFLINE",
            WorkerStatus::Maintenance => "MAINTENANCE",
        }
    }
}

impl sqlx::Type<sqlx::Postgres> for WorkerStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("VARCHAR")
    }
}

impl sqlx::Type<sqlx::Sqlite> for WorkerStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for WorkerStatus {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        match s {
            "ONLINE" => Ok(WorkerStatus::Online),
            "OFFLINE" => Ok(WorkerStatus::Offline),
            "MAINTENANCE" => Ok(WorkerStatus::Maintenance),
            _ => Err(format!("Invalid worker status: {s}").into()),
        }
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for WorkerStatus {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for WorkerStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        match s {
            "ONLINE" => Ok(WorkerStatus::Online),
            "OFFLINE" => Ok(WorkerStatus::Offline),
            "MAINTENANCE" => Ok(WorkerStatus::Maintenance),
            _ => Err(format!("Invalid worker status: {s}").into()),
        }
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for WorkerStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
    }
}

/// Worker声明的服务能力
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkerCapabilities {
    /// 可以消费的队列，空集合表示不限
    pub queues: HashSet<String>,
    /// 可以执行的作业key，空集合表示不限
    pub job_keys: HashSet<String>,
}

/// 选择Worker时的能力要求
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilityRequirement {
    pub queue: Option<String>,
    pub job_key: Option<String>,
}

/// Worker节点注册信息快照
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Worker {
    pub id: String,
    /// 专属租户，None表示共享Worker
    pub tenant_id: Option<String>,
    pub name: String,
    pub capabilities: WorkerCapabilities,
    pub heartbeat_at: DateTime<Utc>,
    pub status: WorkerStatus,
    /// 最大并行执行数
    pub max_parallel: i32,
    pub current_jobs: i32,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Worker {
    pub fn new(
        id: String,
        tenant_id: Option<String>,
        name: String,
        capabilities: WorkerCapabilities,
        max_parallel: i32,
    ) -> OrchestratorResult<Self> {
        if max_parallel < 1 {
            return Err(OrchestratorError::configuration(
                "max_parallel must be at least 1",
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id,
            tenant_id,
            name,
            capabilities,
            heartbeat_at: now,
            status: WorkerStatus::Online,
            max_parallel,
            current_jobs: 0,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_online(&self) -> bool {
        self.status == WorkerStatus::Online
    }

    pub fn has_capacity(&self) -> bool {
        self.current_jobs < self.max_parallel
    }

    pub fn can_serve_queue(&self, queue: &str) -> bool {
        self.capabilities.queues.is_empty() || self.capabilities.queues.contains(queue)
    }

    pub fn can_serve_job_key(&self, job_key: &str) -> bool {
        self.capabilities.job_keys.is_empty() || self.capabilities.job_keys.contains(job_key)
    }

    /// 是否满足调度要求：在线、有余量、能力匹配
    pub fn is_eligible(&self, requirement: &CapabilityRequirement) -> bool {
        self.is_online()
            && self.has_capacity()
            && requirement
                .queue
                .as_deref()
                .map_or(true, |q| self.can_serve_queue(q))
            && requirement
                .job_key
                .as_deref()
                .map_or(true, |k| self.can_serve_job_key(k))
    }

    pub fn load_percentage(&self) -> f64 {
        if self.max_parallel == 0 {
            return 100.0;
        }
        (self.current_jobs as f64 / self.max_parallel as f64) * 100.0
    }

    pub fn is_heartbeat_expired(&self, timeout_seconds: i64, now: DateTime<Utc>) -> bool {
        (now - self.heartbeat_at).num_seconds() > timeout_seconds
    }

    /// 心跳上报，返回版本递增后的新实例
    pub fn heartbeat(&self, now: DateTime<Utc>, current_jobs: i32) -> Self {
        let mut next = self.clone();
        next.heartbeat_at = now;
        next.current_jobs = current_jobs;
        next.version += 1;
        next.updated_at = now;
        next
    }

    pub fn set_status(&self, status: WorkerStatus) -> Self {
        let mut next = self.clone();
        next.status = status;
        next.version += 1;
        next.updated_at = Utc::now();
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn worker_with(queues: &[&str], max_parallel: i32) -> Worker {
        let capabilities = WorkerCapabilities {
            queues: queues.iter().map(|s| s.to_string()).collect(),
            job_keys: HashSet::new(),
        };
        Worker::new(
            "worker-1".to_string(),
            None,
            "Worker One".to_string(),
            capabilities,
            max_parallel,
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_zero_parallelism() {
        assert!(Worker::new(
            "w".to_string(),
            None,
            "w".to_string(),
            WorkerCapabilities::default(),
            0
        )
        .is_err());
    }

    #[test]
    fn test_empty_capabilities_serve_anything() {
        let worker = worker_with(&[], 4);
        assert!(worker.can_serve_queue("reports"));
        assert!(worker.can_serve_job_key("any-key"));
    }

    #[test]
    fn test_eligibility() {
        let worker = worker_with(&["reports"], 2);
        let requirement = CapabilityRequirement {
            queue: Some("reports".to_string()),
            job_key: None,
        };
        assert!(worker.is_eligible(&requirement));

        let other_queue = CapabilityRequirement {
            queue: Some("billing".to_string()),
            job_key: None,
        };
        assert!(!worker.is_eligible(&other_queue));

        let mut full = worker.clone();
        full.current_jobs = 2;
        assert!(!full.is_eligible(&requirement));

        let offline = worker.set_status(WorkerStatus::Offline);
        assert!(!offline.is_eligible(&requirement));
    }

    #[test]
    fn test_load_percentage() {
        let mut worker = worker_with(&[], 4);
        worker.current_jobs = 1;
        assert!((worker.load_percentage() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_heartbeat_expiry_and_refresh() {
        let worker = worker_with(&[], 4);
        let later = worker.heartbeat_at + Duration::seconds(120);
        assert!(worker.is_heartbeat_expired(60, later));
        assert!(!worker.is_heartbeat_expired(300, later));

        let refreshed = worker.heartbeat(later, 3);
        assert_eq!(refreshed.heartbeat_at, later);
        assert_eq!(refreshed.current_jobs, 3);
        assert_eq!(refreshed.version, worker.version + 1);
        assert!(!refreshed.is_heartbeat_expired(60, later));
    }
}
