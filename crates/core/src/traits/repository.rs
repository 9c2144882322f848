use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    BusinessCalendar, Job, Run, RunStatus, Schedule, Worker, WorkerStatus,
};
use crate::OrchestratorResult;

/// 分页请求参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRequest {
    /// 页码，从1开始
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
        }
    }
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        (self.page.saturating_sub(1) as u64) * self.page_size as u64
    }
}

/// 分页查询结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

/// 调度列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct ScheduleFilter {
    pub enabled: Option<bool>,
    /// 名称子串匹配
    pub name_pattern: Option<String>,
}

/// 作业列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub enabled: Option<bool>,
    pub queue: Option<String>,
}

/// 执行记录列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    pub status: Option<RunStatus>,
    pub schedule_id: Option<String>,
    pub job_id: Option<String>,
}

/// Worker列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct WorkerFilter {
    pub status: Option<WorkerStatus>,
}

/// 调度定义仓储接口
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// 创建调度
    async fn create(&self, schedule: &Schedule) -> OrchestratorResult<Schedule>;

    /// 根据ID查询调度
    async fn get_by_id(&self, id: &str) -> OrchestratorResult<Option<Schedule>>;

    /// 更新调度
    ///
    /// 乐观锁更新：持久化中的版本必须小于传入实体的版本，
    /// 否则返回版本冲突错误。
    async fn update(&self, schedule: &Schedule) -> OrchestratorResult<Schedule>;

    /// 删除调度
    async fn delete(&self, id: &str) -> OrchestratorResult<()>;

    /// 分页查询租户下的调度
    async fn find_by_tenant(
        &self,
        tenant_id: &str,
        filter: &ScheduleFilter,
        page: &PageRequest,
    ) -> OrchestratorResult<Page<Schedule>>;

    /// 查询所有到期待触发的调度
    async fn get_due_schedules(&self, now: DateTime<Utc>) -> OrchestratorResult<Vec<Schedule>>;
}

/// 作业定义仓储接口
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: &Job) -> OrchestratorResult<Job>;

    async fn get_by_id(&self, id: &str) -> OrchestratorResult<Option<Job>>;

    /// 按租户+队列+key查询作业
    async fn get_by_key(
        &self,
        tenant_id: &str,
        queue: &str,
        key: &str,
    ) -> OrchestratorResult<Option<Job>>;

    /// 乐观锁更新，同 `ScheduleRepository::update`
    async fn update(&self, job: &Job) -> OrchestratorResult<Job>;

    async fn delete(&self, id: &str) -> OrchestratorResult<()>;

    async fn find_by_tenant(
        &self,
        tenant_id: &str,
        filter: &JobFilter,
        page: &PageRequest,
    ) -> OrchestratorResult<Page<Job>>;
}

/// 执行记录仓储接口
#[async_trait]
pub trait RunRepository: Send + Sync {
    /// 创建执行记录
    ///
    /// `dedupe_key` 非空时必须唯一，重复创建返回数据库操作错误，
    /// 这是同一触发时刻只执行一次的保证。
    async fn create(&self, run: &Run) -> OrchestratorResult<Run>;

    async fn get_by_id(&self, id: &str) -> OrchestratorResult<Option<Run>>;

    async fn get_by_dedupe_key(&self, dedupe_key: &str) -> OrchestratorResult<Option<Run>>;

    async fn update(&self, run: &Run) -> OrchestratorResult<Run>;

    /// 查询某个调度的全部执行记录
    async fn get_by_schedule_id(&self, schedule_id: &str) -> OrchestratorResult<Vec<Run>>;

    /// 查询待执行的记录，可限定创建时间上限
    async fn get_pending_runs(
        &self,
        created_before: Option<DateTime<Utc>>,
    ) -> OrchestratorResult<Vec<Run>>;

    async fn find_by_tenant(
        &self,
        tenant_id: &str,
        filter: &RunFilter,
        page: &PageRequest,
    ) -> OrchestratorResult<Page<Run>>;
}

/// Worker注册表接口
#[async_trait]
pub trait WorkerRepository: Send + Sync {
    /// 注册Worker，同ID重复注册视为更新
    async fn register(&self, worker: &Worker) -> OrchestratorResult<Worker>;

    /// 注销Worker
    async fn unregister(&self, worker_id: &str) -> OrchestratorResult<()>;

    async fn get_by_id(&self, worker_id: &str) -> OrchestratorResult<Option<Worker>>;

    async fn update(&self, worker: &Worker) -> OrchestratorResult<Worker>;

    /// 查询所有在线Worker
    async fn get_online_workers(&self) -> OrchestratorResult<Vec<Worker>>;

    /// 更新心跳时间和当前负载
    async fn update_heartbeat(
        &self,
        worker_id: &str,
        heartbeat_at: DateTime<Utc>,
        current_jobs: i32,
    ) -> OrchestratorResult<()>;

    async fn find_by_tenant(
        &self,
        tenant_id: &str,
        filter: &WorkerFilter,
        page: &PageRequest,
    ) -> OrchestratorResult<Page<Worker>>;
}

/// 业务日历仓储接口
#[async_trait]
pub trait CalendarRepository: Send + Sync {
    async fn create(&self, calendar: &BusinessCalendar) -> OrchestratorResult<BusinessCalendar>;

    /// 按租户+编码查询日历
    async fn get_by_code(
        &self,
        tenant_id: &str,
        code: &str,
    ) -> OrchestratorResult<Option<BusinessCalendar>>;

    async fn update(&self, calendar: &BusinessCalendar) -> OrchestratorResult<BusinessCalendar>;

    async fn delete(&self, id: &str) -> OrchestratorResult<()>;

    async fn find_by_tenant(
        &self,
        tenant_id: &str,
        page: &PageRequest,
    ) -> OrchestratorResult<Page<BusinessCalendar>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_offset() {
        let page = PageRequest::default();
        assert_eq!(page.offset(), 0);

        let page = PageRequest {
            page: 3,
            page_size: 25,
        };
        assert_eq!(page.offset(), 50);

        let page = PageRequest {
            page: 0,
            page_size: 25,
        };
        assert_eq!(page.offset(), 0);
    }
}
