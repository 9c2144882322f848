//! Mock implementations for repository and publisher traits
//!
//! In-memory implementations backed by HashMap + Mutex. They enforce
//! the contracts real implementations enforce: version-checked updates
//! and dedupe-key uniqueness.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use orchestrator_core::models::{BusinessCalendar, DispatchEvent, Job, Run, Schedule, Worker};
use orchestrator_core::traits::{
    CalendarRepository, EventPublisher, JobFilter, JobRepository, Page, PageRequest, RunFilter,
    RunRepository, ScheduleFilter, ScheduleRepository, WorkerFilter, WorkerRepository,
};
use orchestrator_core::{OrchestratorError, OrchestratorResult};

fn paginate<T: Clone>(mut items: Vec<T>, page: &PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let data = items
        .drain(..)
        .skip(page.offset() as usize)
        .take(page.page_size as usize)
        .collect();
    Page {
        data,
        total,
        page: page.page,
        page_size: page.page_size,
    }
}

/// Mock implementation of ScheduleRepository
#[derive(Debug, Clone, Default)]
pub struct MockScheduleRepository {
    schedules: Arc<Mutex<HashMap<String, Schedule>>>,
}

impl MockScheduleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.schedules.lock().unwrap().len()
    }
}

#[async_trait]
impl ScheduleRepository for MockScheduleRepository {
    async fn create(&self, schedule: &Schedule) -> OrchestratorResult<Schedule> {
        let mut schedules = self.schedules.lock().unwrap();
        schedules.insert(schedule.id.clone(), schedule.clone());
        Ok(schedule.clone())
    }

    async fn get_by_id(&self, id: &str) -> OrchestratorResult<Option<Schedule>> {
        let schedules = self.schedules.lock().unwrap();
        Ok(schedules.get(id).cloned())
    }

    async fn update(&self, schedule: &Schedule) -> OrchestratorResult<Schedule> {
        let mut schedules = self.schedules.lock().unwrap();
        match schedules.get(&schedule.id) {
            Some(existing) if existing.version >= schedule.version => {
                Err(OrchestratorError::VersionConflict {
                    entity: "schedule".to_string(),
                    expected: existing.version + 1,
                })
            }
            Some(_) => {
                schedules.insert(schedule.id.clone(), schedule.clone());
                Ok(schedule.clone())
            }
            None => Err(OrchestratorError::schedule_not_found(&schedule.id)),
        }
    }

    async fn delete(&self, id: &str) -> OrchestratorResult<()> {
        let mut schedules = self.schedules.lock().unwrap();
        schedules.remove(id);
        Ok(())
    }

    async fn find_by_tenant(
        &self,
        tenant_id: &str,
        filter: &ScheduleFilter,
        page: &PageRequest,
    ) -> OrchestratorResult<Page<Schedule>> {
        let schedules = self.schedules.lock().unwrap();
        let mut matched: Vec<Schedule> = schedules
            .values()
            .filter(|s| s.tenant_id == tenant_id)
            .cloned()
            .collect();

        if let Some(enabled) = filter.enabled {
            matched.retain(|s| s.enabled == enabled);
        }
        if let Some(pattern) = &filter.name_pattern {
            matched.retain(|s| s.name.contains(pattern.as_str()));
        }
        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(paginate(matched, page))
    }

    async fn get_due_schedules(&self, now: DateTime<Utc>) -> OrchestratorResult<Vec<Schedule>> {
        let schedules = self.schedules.lock().unwrap();
        Ok(schedules
            .values()
            .filter(|s| s.is_due(now))
            .cloned()
            .collect())
    }
}

/// Mock implementation of JobRepository
#[derive(Debug, Clone, Default)]
pub struct MockJobRepository {
    jobs: Arc<Mutex<HashMap<String, Job>>>,
}

impl MockJobRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRepository for MockJobRepository {
    async fn create(&self, job: &Job) -> OrchestratorResult<Job> {
        let mut jobs = self.jobs.lock().unwrap();
        if jobs
            .values()
            .any(|j| j.job_key() == job.job_key() && j.id != job.id)
        {
            return Err(OrchestratorError::database_operation(format!(
                "duplicate job key: {}",
                job.job_key()
            )));
        }
        jobs.insert(job.id.clone(), job.clone());
        Ok(job.clone())
    }

    async fn get_by_id(&self, id: &str) -> OrchestratorResult<Option<Job>> {
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs.get(id).cloned())
    }

    async fn get_by_key(
        &self,
        tenant_id: &str,
        queue: &str,
        key: &str,
    ) -> OrchestratorResult<Option<Job>> {
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs
            .values()
            .find(|j| j.tenant_id == tenant_id && j.queue == queue && j.key == key)
            .cloned())
    }

    async fn update(&self, job: &Job) -> OrchestratorResult<Job> {
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.get(&job.id) {
            Some(existing) if existing.version >= job.version => {
                Err(OrchestratorError::VersionConflict {
                    entity: "job".to_string(),
                    expected: existing.version + 1,
                })
            }
            Some(_) => {
                jobs.insert(job.id.clone(), job.clone());
                Ok(job.clone())
            }
            None => Err(OrchestratorError::job_not_found(&job.id)),
        }
    }

    async fn delete(&self, id: &str) -> OrchestratorResult<()> {
        let mut jobs = self.jobs.lock().unwrap();
        jobs.remove(id);
        Ok(())
    }

    async fn find_by_tenant(
        &self,
        tenant_id: &str,
        filter: &JobFilter,
        page: &PageRequest,
    ) -> OrchestratorResult<Page<Job>> {
        let jobs = self.jobs.lock().unwrap();
        let mut matched: Vec<Job> = jobs
            .values()
            .filter(|j| j.tenant_id == tenant_id)
            .cloned()
            .collect();

        if let Some(enabled) = filter.enabled {
            matched.retain(|j| j.enabled == enabled);
        }
        if let Some(queue) = &filter.queue {
            matched.retain(|j| &j.queue == queue);
        }
        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(paginate(matched, page))
    }
}

/// Mock implementation of RunRepository
#[derive(Debug, Clone, Default)]
pub struct MockRunRepository {
    runs: Arc<Mutex<HashMap<String, Run>>>,
}

impl MockRunRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.runs.lock().unwrap().len()
    }

    pub fn get_all_runs(&self) -> Vec<Run> {
        self.runs.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl RunRepository for MockRunRepository {
    async fn create(&self, run: &Run) -> OrchestratorResult<Run> {
        let mut runs = self.runs.lock().unwrap();
        if let Some(key) = &run.dedupe_key {
            if runs
                .values()
                .any(|r| r.dedupe_key.as_ref() == Some(key) && r.id != run.id)
            {
                return Err(OrchestratorError::database_operation(format!(
                    "duplicate dedupe key: {key}"
                )));
            }
        }
        runs.insert(run.id.clone(), run.clone());
        Ok(run.clone())
    }

    async fn get_by_id(&self, id: &str) -> OrchestratorResult<Option<Run>> {
        let runs = self.runs.lock().unwrap();
        Ok(runs.get(id).cloned())
    }

    async fn get_by_dedupe_key(&self, dedupe_key: &str) -> OrchestratorResult<Option<Run>> {
        let runs = self.runs.lock().unwrap();
        Ok(runs
            .values()
            .find(|r| r.dedupe_key.as_deref() == Some(dedupe_key))
            .cloned())
    }

    async fn update(&self, run: &Run) -> OrchestratorResult<Run> {
        let mut runs = self.runs.lock().unwrap();
        if !runs.contains_key(&run.id) {
            return Err(OrchestratorError::run_not_found(&run.id));
        }
        runs.insert(run.id.clone(), run.clone());
        Ok(run.clone())
    }

    async fn get_by_schedule_id(&self, schedule_id: &str) -> OrchestratorResult<Vec<Run>> {
        let runs = self.runs.lock().unwrap();
        Ok(runs
            .values()
            .filter(|r| r.schedule_id.as_deref() == Some(schedule_id))
            .cloned()
            .collect())
    }

    async fn get_pending_runs(
        &self,
        created_before: Option<DateTime<Utc>>,
    ) -> OrchestratorResult<Vec<Run>> {
        let runs = self.runs.lock().unwrap();
        Ok(runs
            .values()
            .filter(|r| r.status == orchestrator_core::RunStatus::Pending)
            .filter(|r| created_before.map_or(true, |cutoff| r.created_at < cutoff))
            .cloned()
            .collect())
    }

    async fn find_by_tenant(
        &self,
        tenant_id: &str,
        filter: &RunFilter,
        page: &PageRequest,
    ) -> OrchestratorResult<Page<Run>> {
        let runs = self.runs.lock().unwrap();
        let mut matched: Vec<Run> = runs
            .values()
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
            .collect();

        if let Some(status) = filter.status {
            matched.retain(|r| r.status == status);
        }
        if let Some(schedule_id) = &filter.schedule_id {
            matched.retain(|r| r.schedule_id.as_ref() == Some(schedule_id));
        }
        if let Some(job_id) = &filter.job_id {
            matched.retain(|r| r.job_id.as_ref() == Some(job_id));
        }
        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(paginate(matched, page))
    }
}

/// Mock implementation of WorkerRepository
#[derive(Debug, Clone, Default)]
pub struct MockWorkerRepository {
    workers: Arc<Mutex<HashMap<String, Worker>>>,
}

impl MockWorkerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workers(workers: Vec<Worker>) -> Self {
        let map = workers.into_iter().map(|w| (w.id.clone(), w)).collect();
        Self {
            workers: Arc::new(Mutex::new(map)),
        }
    }
}

#[async_trait]
impl WorkerRepository for MockWorkerRepository {
    async fn register(&self, worker: &Worker) -> OrchestratorResult<Worker> {
        let mut workers = self.workers.lock().unwrap();
        workers.insert(worker.id.clone(), worker.clone());
        Ok(worker.clone())
    }

    async fn unregister(&self, worker_id: &str) -> OrchestratorResult<()> {
        let mut workers = self.workers.lock().unwrap();
        workers.remove(worker_id);
        Ok(())
    }

    async fn get_by_id(&self, worker_id: &str) -> OrchestratorResult<Option<Worker>> {
        let workers = self.workers.lock().unwrap();
        Ok(workers.get(worker_id).cloned())
    }

    async fn update(&self, worker: &Worker) -> OrchestratorResult<Worker> {
        let mut workers = self.workers.lock().unwrap();
        match workers.get(&worker.id) {
            Some(existing) if existing.version >= worker.version => {
                Err(OrchestratorError::VersionConflict {
                    entity: "worker".to_string(),
                    expected: existing.version + 1,
                })
            }
            Some(_) => {
                workers.insert(worker.id.clone(), worker.clone());
                Ok(worker.clone())
            }
            None => Err(OrchestratorError::worker_not_found(&worker.id)),
        }
    }

    async fn get_online_workers(&self) -> OrchestratorResult<Vec<Worker>> {
        let workers = self.workers.lock().unwrap();
        Ok(workers
            .values()
            .filter(|w| w.is_online())
            .cloned()
            .collect())
    }

    async fn update_heartbeat(
        &self,
        worker_id: &str,
        heartbeat_at: DateTime<Utc>,
        current_jobs: i32,
    ) -> OrchestratorResult<()> {
        let mut workers = self.workers.lock().unwrap();
        match workers.get(worker_id) {
            Some(worker) => {
                let refreshed = worker.heartbeat(heartbeat_at, current_jobs);
                workers.insert(worker_id.to_string(), refreshed);
                Ok(())
            }
            None => Err(OrchestratorError::worker_not_found(worker_id)),
        }
    }

    async fn find_by_tenant(
        &self,
        tenant_id: &str,
        filter: &WorkerFilter,
        page: &PageRequest,
    ) -> OrchestratorResult<Page<Worker>> {
        let workers = self.workers.lock().unwrap();
        let mut matched: Vec<Worker> = workers
            .values()
            .filter(|w| w.tenant_id.as_deref() == Some(tenant_id) || w.tenant_id.is_none())
            .cloned()
            .collect();

        if let Some(status) = filter.status {
            matched.retain(|w| w.status == status);
        }
        matched.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(paginate(matched, page))
    }
}

/// Mock implementation of CalendarRepository
#[derive(Debug, Clone, Default)]
pub struct MockCalendarRepository {
    calendars: Arc<Mutex<HashMap<String, BusinessCalendar>>>,
}

impl MockCalendarRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_calendars(calendars: Vec<BusinessCalendar>) -> Self {
        let map = calendars.into_iter().map(|c| (c.id.clone(), c)).collect();
        Self {
            calendars: Arc::new(Mutex::new(map)),
        }
    }
}

#[async_trait]
impl CalendarRepository for MockCalendarRepository {
    async fn create(&self, calendar: &BusinessCalendar) -> OrchestratorResult<BusinessCalendar> {
        let mut calendars = self.calendars.lock().unwrap();
        if calendars
            .values()
            .any(|c| c.tenant_id == calendar.tenant_id && c.code == calendar.code)
        {
            return Err(OrchestratorError::database_operation(format!(
                "duplicate calendar code: {}",
                calendar.code
            )));
        }
        calendars.insert(calendar.id.clone(), calendar.clone());
        Ok(calendar.clone())
    }

    async fn get_by_code(
        &self,
        tenant_id: &str,
        code: &str,
    ) -> OrchestratorResult<Option<BusinessCalendar>> {
        let calendars = self.calendars.lock().unwrap();
        Ok(calendars
            .values()
            .find(|c| c.tenant_id == tenant_id && c.code == code)
            .cloned())
    }

    async fn update(&self, calendar: &BusinessCalendar) -> OrchestratorResult<BusinessCalendar> {
        let mut calendars = self.calendars.lock().unwrap();
        match calendars.get(&calendar.id) {
            Some(existing) if existing.version >= calendar.version => {
                Err(OrchestratorError::VersionConflict {
                    entity: "calendar".to_string(),
                    expected: existing.version + 1,
                })
            }
            Some(_) => {
                calendars.insert(calendar.id.clone(), calendar.clone());
                Ok(calendar.clone())
            }
            None => Err(OrchestratorError::calendar_not_found(&calendar.code)),
        }
    }

    async fn delete(&self, id: &str) -> OrchestratorResult<()> {
        let mut calendars = self.calendars.lock().unwrap();
        calendars.remove(id);
        Ok(())
    }

    async fn find_by_tenant(
        &self,
        tenant_id: &str,
        page: &PageRequest,
    ) -> OrchestratorResult<Page<BusinessCalendar>> {
        let calendars = self.calendars.lock().unwrap();
        let mut matched: Vec<BusinessCalendar> = calendars
            .values()
            .filter(|c| c.tenant_id == tenant_id)
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.code.cmp(&b.code));

        Ok(paginate(matched, page))
    }
}

/// Mock implementation of EventPublisher
///
/// Records published events and can be configured to fail or
/// report unhealthy.
#[derive(Debug, Clone)]
pub struct MockEventPublisher {
    published: Arc<Mutex<Vec<DispatchEvent>>>,
    fail_message: Arc<Mutex<Option<String>>>,
    stall: Arc<Mutex<Option<std::time::Duration>>>,
    healthy: Arc<Mutex<bool>>,
}

impl MockEventPublisher {
    pub fn new() -> Self {
        Self {
            published: Arc::new(Mutex::new(Vec::new())),
            fail_message: Arc::new(Mutex::new(None)),
            stall: Arc::new(Mutex::new(None)),
            healthy: Arc::new(Mutex::new(true)),
        }
    }

    /// Make every subsequent publish fail with the given message
    pub fn fail_with(&self, message: &str) {
        *self.fail_message.lock().unwrap() = Some(message.to_string());
    }

    /// Make every subsequent publish sleep before completing,
    /// for exercising caller-side deadlines
    pub fn stall_for(&self, duration: std::time::Duration) {
        *self.stall.lock().unwrap() = Some(duration);
    }

    pub fn recover(&self) {
        *self.fail_message.lock().unwrap() = None;
    }

    pub fn set_healthy(&self, healthy: bool) {
        *self.healthy.lock().unwrap() = healthy;
    }

    pub fn published(&self) -> Vec<DispatchEvent> {
        self.published.lock().unwrap().clone()
    }

    pub fn publish_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

impl Default for MockEventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for MockEventPublisher {
    async fn publish(&self, event: &DispatchEvent) -> OrchestratorResult<()> {
        let stall = *self.stall.lock().unwrap();
        if let Some(duration) = stall {
            tokio::time::sleep(duration).await;
        }
        if let Some(message) = self.fail_message.lock().unwrap().clone() {
            return Err(OrchestratorError::publish(message));
        }
        self.published.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn publish_batch(&self, events: &[DispatchEvent]) -> OrchestratorResult<()> {
        let stall = *self.stall.lock().unwrap();
        if let Some(duration) = stall {
            tokio::time::sleep(duration).await;
        }
        if let Some(message) = self.fail_message.lock().unwrap().clone() {
            return Err(OrchestratorError::publish(message));
        }
        self.published.lock().unwrap().extend_from_slice(events);
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        *self.healthy.lock().unwrap()
    }
}
