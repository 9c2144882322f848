use thiserror::Error;

/// 编排器统一错误类型
///
/// 覆盖持久化、实体查找、配置校验、状态机和事件发布各层的失败场景。
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// 数据库操作错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    /// 数据库操作失败（带上下文信息）
    #[error("数据库操作失败: {0}")]
    DatabaseOperation(String),

    /// 调度不存在
    #[error("调度未找到: {id}")]
    ScheduleNotFound { id: String },

    /// 作业不存在
    #[error("作业未找到: {id}")]
    JobNotFound { id: String },

    /// 执行记录不存在
    #[error("执行记录未找到: {id}")]
    RunNotFound { id: String },

    /// Worker不存在
    #[error("Worker未找到: {id}")]
    WorkerNotFound { id: String },

    /// 业务日历不存在
    #[error("业务日历未找到: {code}")]
    CalendarNotFound { code: String },

    /// CRON表达式无效
    #[error("无效的CRON表达式: {expr} - {message}")]
    InvalidCron { expr: String, message: String },

    /// RRULE表达式无效
    #[error("无效的RRULE表达式: {expr} - {message}")]
    InvalidRrule { expr: String, message: String },

    /// 时区标识无效
    #[error("无效的时区: {0}")]
    InvalidTimezone(String),

    /// 配置校验失败
    #[error("配置校验失败: {0}")]
    InvalidConfiguration(String),

    /// 非法的状态转换
    #[error("非法状态转换: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    /// 事件发布失败
    #[error("事件发布失败: {0}")]
    Publish(String),

    /// 序列化/反序列化错误
    #[error("序列化错误: {0}")]
    Serialization(String),

    /// 操作超时
    #[error("操作超时: {0}")]
    Timeout(String),

    /// 乐观锁版本冲突
    #[error("版本冲突: {entity} 期望版本 {expected}")]
    VersionConflict { entity: String, expected: i64 },

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl OrchestratorError {
    pub fn database_operation<S: Into<String>>(message: S) -> Self {
        Self::DatabaseOperation(message.into())
    }

    pub fn schedule_not_found<S: Into<String>>(id: S) -> Self {
        Self::ScheduleNotFound { id: id.into() }
    }

    pub fn job_not_found<S: Into<String>>(id: S) -> Self {
        Self::JobNotFound { id: id.into() }
    }

    pub fn run_not_found<S: Into<String>>(id: S) -> Self {
        Self::RunNotFound { id: id.into() }
    }

    pub fn worker_not_found<S: Into<String>>(id: S) -> Self {
        Self::WorkerNotFound { id: id.into() }
    }

    pub fn calendar_not_found<S: Into<String>>(code: S) -> Self {
        Self::CalendarNotFound { code: code.into() }
    }

    pub fn invalid_cron<S1: Into<String>, S2: Into<String>>(expr: S1, message: S2) -> Self {
        Self::InvalidCron {
            expr: expr.into(),
            message: message.into(),
        }
    }

    pub fn invalid_rrule<S1: Into<String>, S2: Into<String>>(expr: S1, message: S2) -> Self {
        Self::InvalidRrule {
            expr: expr.into(),
            message: message.into(),
        }
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    pub fn state_transition<S1: Into<String>, S2: Into<String>>(from: S1, to: S2) -> Self {
        Self::InvalidStateTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn publish<S: Into<String>>(message: S) -> Self {
        Self::Publish(message.into())
    }

    pub fn timeout<S: Into<String>>(operation: S) -> Self {
        Self::Timeout(operation.into())
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// 判断错误是否属于配置/输入问题
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidCron { .. }
                | Self::InvalidRrule { .. }
                | Self::InvalidTimezone(_)
                | Self::InvalidConfiguration(_)
        )
    }

    /// 判断错误是否可以通过重试恢复
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::DatabaseOperation(_)
                | Self::Publish(_)
                | Self::Timeout(_)
                | Self::VersionConflict { .. }
        )
    }

    /// 判断错误是否为不可恢复的致命错误
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidStateTransition { .. } | Self::Internal(_)
        ) || self.is_configuration()
    }
}

impl From<serde_json::Error> for OrchestratorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for OrchestratorError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
