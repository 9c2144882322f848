//! Test data builders for creating test entities
//!
//! Builders fill in sensible defaults and construct entities directly,
//! bypassing constructor validation so tests can also produce invalid
//! instances on purpose.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use orchestrator_core::models::{
    BackoffPolicy, BusinessCalendar, CalendarRef, Job, Run, RunMetrics, RunStatus, Schedule,
    Target, Trigger, Worker, WorkerCapabilities, WorkerStatus,
};

/// Builder for creating test Schedule entities
pub struct ScheduleBuilder {
    schedule: Schedule,
}

impl ScheduleBuilder {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            schedule: Schedule {
                id: Uuid::new_v4().to_string(),
                tenant_id: "tenant-1".to_string(),
                name: "test_schedule".to_string(),
                timezone: Some("UTC".to_string()),
                trigger: Trigger::Cron {
                    cron: "*/5 * * * *".to_string(),
                },
                target: Target::Event {
                    event_topic: "orders.sync".to_string(),
                },
                payload: None,
                calendar: None,
                enabled: true,
                next_fire_at: None,
                last_fire_at: None,
                version: 1,
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.schedule.id = id.to_string();
        self
    }

    pub fn with_tenant(mut self, tenant_id: &str) -> Self {
        self.schedule.tenant_id = tenant_id.to_string();
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.schedule.name = name.to_string();
        self
    }

    pub fn with_timezone(mut self, timezone: Option<&str>) -> Self {
        self.schedule.timezone = timezone.map(|s| s.to_string());
        self
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.schedule.trigger = trigger;
        self
    }

    pub fn with_cron(self, cron: &str) -> Self {
        self.with_trigger(Trigger::Cron {
            cron: cron.to_string(),
        })
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.schedule.target = target;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.schedule.payload = Some(payload);
        self
    }

    pub fn with_calendar(mut self, holidays_code: &str, business_days_only: bool) -> Self {
        self.schedule.calendar = Some(CalendarRef {
            holidays_code: holidays_code.to_string(),
            business_days_only,
        });
        self
    }

    pub fn with_next_fire_at(mut self, next_fire_at: Option<DateTime<Utc>>) -> Self {
        self.schedule.next_fire_at = next_fire_at;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.schedule.enabled = false;
        self
    }

    pub fn build(self) -> Schedule {
        self.schedule
    }
}

impl Default for ScheduleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test Job entities
pub struct JobBuilder {
    job: Job,
}

impl JobBuilder {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            job: Job {
                id: Uuid::new_v4().to_string(),
                tenant_id: "tenant-1".to_string(),
                key: "test_job".to_string(),
                queue: "default".to_string(),
                priority: 5,
                max_attempts: 3,
                backoff: BackoffPolicy::fixed(30),
                timeout_seconds: 300,
                concurrency_limit: None,
                sla_seconds: None,
                enabled: true,
                version: 1,
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.job.id = id.to_string();
        self
    }

    pub fn with_tenant(mut self, tenant_id: &str) -> Self {
        self.job.tenant_id = tenant_id.to_string();
        self
    }

    pub fn with_key(mut self, key: &str) -> Self {
        self.job.key = key.to_string();
        self
    }

    pub fn with_queue(mut self, queue: &str) -> Self {
        self.job.queue = queue.to_string();
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.job.max_attempts = max_attempts;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.job.backoff = backoff;
        self
    }

    pub fn with_sla_seconds(mut self, sla_seconds: i64) -> Self {
        self.job.sla_seconds = Some(sla_seconds);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.job.enabled = false;
        self
    }

    pub fn build(self) -> Job {
        self.job
    }
}

impl Default for JobBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test Run entities
pub struct RunBuilder {
    run: Run,
}

impl RunBuilder {
    pub fn new() -> Self {
        Self {
            run: Run {
                id: Uuid::new_v4().to_string(),
                tenant_id: "tenant-1".to_string(),
                schedule_id: Some("schedule-1".to_string()),
                job_id: None,
                dedupe_key: None,
                status: RunStatus::Pending,
                attempt: 1,
                started_at: None,
                finished_at: None,
                error_message: None,
                metrics: RunMetrics::default(),
                worker_id: None,
                payload: None,
                created_at: Utc::now(),
            },
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.run.id = id.to_string();
        self
    }

    pub fn with_tenant(mut self, tenant_id: &str) -> Self {
        self.run.tenant_id = tenant_id.to_string();
        self
    }

    pub fn for_schedule(mut self, schedule_id: &str) -> Self {
        self.run.schedule_id = Some(schedule_id.to_string());
        self.run.job_id = None;
        self
    }

    pub fn for_job(mut self, job_id: &str) -> Self {
        self.run.job_id = Some(job_id.to_string());
        self.run.schedule_id = None;
        self
    }

    pub fn with_dedupe_key(mut self, dedupe_key: &str) -> Self {
        self.run.dedupe_key = Some(dedupe_key.to_string());
        self
    }

    pub fn with_status(mut self, status: RunStatus) -> Self {
        self.run.status = status;
        self
    }

    pub fn with_attempt(mut self, attempt: i32) -> Self {
        self.run.attempt = attempt;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.run.created_at = created_at;
        self
    }

    pub fn failed(mut self, error: &str) -> Self {
        let now = Utc::now();
        self.run.status = RunStatus::Failed;
        self.run.started_at = Some(now);
        self.run.finished_at = Some(now);
        self.run.error_message = Some(error.to_string());
        self
    }

    pub fn build(self) -> Run {
        self.run
    }
}

impl Default for RunBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test Worker entities
pub struct WorkerBuilder {
    worker: Worker,
}

impl WorkerBuilder {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            worker: Worker {
                id: "worker-1".to_string(),
                tenant_id: None,
                name: "Test Worker".to_string(),
                capabilities: WorkerCapabilities::default(),
                heartbeat_at: now,
                status: WorkerStatus::Online,
                max_parallel: 4,
                current_jobs: 0,
                version: 1,
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.worker.id = id.to_string();
        self
    }

    pub fn with_queues(mut self, queues: &[&str]) -> Self {
        self.worker.capabilities.queues = queues.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_job_keys(mut self, job_keys: &[&str]) -> Self {
        self.worker.capabilities.job_keys = job_keys.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_max_parallel(mut self, max_parallel: i32) -> Self {
        self.worker.max_parallel = max_parallel;
        self
    }

    pub fn with_current_jobs(mut self, current_jobs: i32) -> Self {
        self.worker.current_jobs = current_jobs;
        self
    }

    pub fn with_status(mut self, status: WorkerStatus) -> Self {
        self.worker.status = status;
        self
    }

    pub fn offline(mut self) -> Self {
        self.worker.status = WorkerStatus::Offline;
        self
    }

    pub fn build(self) -> Worker {
        self.worker
    }
}

impl Default for WorkerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test BusinessCalendar entities
pub struct CalendarBuilder {
    calendar: BusinessCalendar,
}

impl CalendarBuilder {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            calendar: BusinessCalendar {
                id: Uuid::new_v4().to_string(),
                tenant_id: "tenant-1".to_string(),
                code: "default".to_string(),
                name: "Default Calendar".to_string(),
                holidays: HashSet::new(),
                business_days: [true; 7],
                version: 1,
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub fn with_tenant(mut self, tenant_id: &str) -> Self {
        self.calendar.tenant_id = tenant_id.to_string();
        self
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.calendar.code = code.to_string();
        self
    }

    pub fn with_holiday(mut self, date: NaiveDate) -> Self {
        self.calendar.holidays.insert(date);
        self
    }

    pub fn weekdays_only(mut self) -> Self {
        self.calendar.business_days = [true, true, true, true, true, false, false];
        self
    }

    pub fn build(self) -> BusinessCalendar {
        self.calendar
    }
}

impl Default for CalendarBuilder {
    fn default() -> Self {
        Self::new()
    }
}
