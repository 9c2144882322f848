use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use orchestrator_core::models::{BusinessCalendar, DispatchEvent, Run, Schedule, Target};
use orchestrator_core::traits::{
    CalendarRepository, EventPublisher, RunRepository, ScheduleRepository,
};
use orchestrator_core::{OrchestratorError, OrchestratorResult, SchedulingConfig};

use crate::trigger_utils;

/// 一次执行请求的调用上下文
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub tenant_id: String,
    pub correlation_id: Option<String>,
    pub user_id: Option<String>,
    /// 发布和持久化阶段的总时限
    pub timeout: Option<Duration>,
}

/// 执行结果摘要
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub run_id: Option<String>,
    pub error: Option<String>,
}

/// 调度校验报告，汇总所有问题
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// 调度编排服务
///
/// 负责触发时间计算、调度校验、触发执行和启停管理。
/// 依赖通过trait注入，持久化和消息设施可替换。
pub struct SchedulingService {
    schedule_repo: Arc<dyn ScheduleRepository>,
    run_repo: Arc<dyn RunRepository>,
    calendar_repo: Arc<dyn CalendarRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    config: SchedulingConfig,
}

async fn with_deadline<T, F>(
    timeout: Option<Duration>,
    operation: &str,
    fut: F,
) -> OrchestratorResult<T>
where
    F: Future<Output = OrchestratorResult<T>>,
{
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(OrchestratorError::timeout(operation)),
        },
        None => fut.await,
    }
}

impl SchedulingService {
    pub fn new(
        schedule_repo: Arc<dyn ScheduleRepository>,
        run_repo: Arc<dyn RunRepository>,
        calendar_repo: Arc<dyn CalendarRepository>,
        event_publisher: Arc<dyn EventPublisher>,
        config: SchedulingConfig,
    ) -> Self {
        Self {
            schedule_repo,
            run_repo,
            calendar_repo,
            event_publisher,
            config,
        }
    }

    /// 解析调度引用的业务日历
    async fn resolve_calendar(
        &self,
        schedule: &Schedule,
    ) -> OrchestratorResult<Option<BusinessCalendar>> {
        let Some(calendar_ref) = &schedule.calendar else {
            return Ok(None);
        };
        let calendar = self
            .calendar_repo
            .get_by_code(&schedule.tenant_id, &calendar_ref.holidays_code)
            .await?
            .ok_or_else(|| {
                OrchestratorError::calendar_not_found(&calendar_ref.holidays_code)
            })?;
        Ok(Some(calendar))
    }

    /// 计算调度在当前时刻之后的下一次触发时间
    pub async fn calculate_next_fire_time(
        &self,
        schedule: &Schedule,
        now: DateTime<Utc>,
    ) -> OrchestratorResult<Option<DateTime<Utc>>> {
        let calendar = self.resolve_calendar(schedule).await?;
        trigger_utils::next_fire_time(
            schedule,
            &self.config.default_timezone,
            calendar.as_ref(),
            now,
        )
    }

    /// 全量校验调度配置，汇总所有错误而不是fail-fast
    pub fn validate_schedule(&self, schedule: &Schedule) -> ValidationReport {
        let mut errors = Schedule::validation_errors(
            &schedule.trigger,
            &schedule.target,
            schedule.timezone.as_deref(),
        );

        // 结构性检查通过的表达式再做语法解析
        let syntactically_checkable = match &schedule.trigger {
            orchestrator_core::Trigger::Cron { cron } => !cron.trim().is_empty(),
            orchestrator_core::Trigger::Rrule { rrule } => !rrule.trim().is_empty(),
            _ => true,
        };
        if syntactically_checkable {
            if let Err(e) = trigger_utils::validate_trigger(&schedule.trigger) {
                errors.push(e.to_string());
            }
        }

        ValidationReport {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// 构造触发事件，载荷合并调度payload与执行标识
    fn build_dispatch_event(
        &self,
        schedule: &Schedule,
        run: &Run,
        context: &ExecutionContext,
    ) -> DispatchEvent {
        let mut payload = match &schedule.payload {
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                let mut map = Map::new();
                map.insert("data".to_string(), other.clone());
                map
            }
            None => Map::new(),
        };
        payload.insert("scheduleId".to_string(), Value::String(schedule.id.clone()));
        payload.insert("runId".to_string(), Value::String(run.id.clone()));

        if let Target::Http {
            url,
            method,
            headers,
            hmac_key_ref,
        } = &schedule.target
        {
            let mut http = Map::new();
            http.insert("url".to_string(), Value::String(url.clone()));
            http.insert("method".to_string(), Value::String(method.clone()));
            if let Some(headers) = headers {
                http.insert(
                    "headers".to_string(),
                    Value::Object(
                        headers
                            .iter()
                            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                            .collect(),
                    ),
                );
            }
            if let Some(key_ref) = hmac_key_ref {
                http.insert("hmacKeyRef".to_string(), Value::String(key_ref.clone()));
            }
            payload.insert("http".to_string(), Value::Object(http));
        }

        DispatchEvent::new(
            schedule.target.event_type(),
            schedule.tenant_id.clone(),
            Some(Value::Object(payload)),
        )
        .with_correlation_id(context.correlation_id.clone())
        .with_causation_id(Some(run.id.clone()))
    }

    /// 触发一次调度执行
    ///
    /// 同一触发时刻恰好发布一个事件：幂等键在执行记录上保证唯一，
    /// 发布失败时不落执行记录，只推进下一次触发时间。
    pub async fn execute_schedule(
        &self,
        schedule_id: &str,
        context: &ExecutionContext,
    ) -> OrchestratorResult<ExecutionOutcome> {
        let schedule = self
            .schedule_repo
            .get_by_id(schedule_id)
            .await?
            .ok_or_else(|| OrchestratorError::schedule_not_found(schedule_id))?;

        let now = Utc::now();
        let fire_time = schedule.next_fire_at.unwrap_or(now);

        // 发布前先核对幂等键，同一触发时刻的第二次调用不能再发事件
        let dedupe_key = schedule.dedupe_key(fire_time);
        if self
            .run_repo
            .get_by_dedupe_key(&dedupe_key)
            .await?
            .is_some()
        {
            return Err(OrchestratorError::database_operation(format!(
                "duplicate dedupe key: {dedupe_key}"
            )));
        }

        let run = Run::for_schedule(schedule.tenant_id.clone(), schedule.id.clone(), 1)?
            .with_dedupe_key(dedupe_key)
            .with_payload(schedule.payload.clone());
        let running = run.start(None)?;

        let calendar = self.resolve_calendar(&schedule).await?;
        let next_fire = trigger_utils::next_fire_time(
            &schedule,
            &self.config.default_timezone,
            calendar.as_ref(),
            now,
        )?;

        let event = self.build_dispatch_event(&schedule, &running, context);

        let publish_result = with_deadline(
            context.timeout,
            "publish dispatch event",
            self.event_publisher.publish(&event),
        )
        .await;

        if let Err(e) = publish_result {
            warn!(
                schedule_id = %schedule.id,
                error = %e,
                "事件发布失败，跳过本次触发"
            );
            let updated = schedule.update_next_fire(next_fire);
            self.schedule_repo.update(&updated).await?;
            return Ok(ExecutionOutcome {
                success: false,
                run_id: None,
                error: Some(e.to_string()),
            });
        }

        let finished = running.succeed()?;
        let created = with_deadline(
            context.timeout,
            "persist run",
            self.run_repo.create(&finished),
        )
        .await?;

        let updated = schedule
            .update_last_fire(fire_time)
            .update_next_fire(next_fire);
        self.schedule_repo.update(&updated).await?;

        info!(
            schedule_id = %schedule.id,
            run_id = %created.id,
            next_fire = ?next_fire,
            "调度触发完成"
        );

        Ok(ExecutionOutcome {
            success: true,
            run_id: Some(created.id),
            error: None,
        })
    }

    /// 启用或停用调度
    ///
    /// 启用时重新计算下一次触发时间，停用保留已有的触发计划字段。
    pub async fn set_schedule_enabled(
        &self,
        schedule_id: &str,
        enabled: bool,
    ) -> OrchestratorResult<Schedule> {
        let schedule = self
            .schedule_repo
            .get_by_id(schedule_id)
            .await?
            .ok_or_else(|| OrchestratorError::schedule_not_found(schedule_id))?;

        let updated = if enabled {
            let enabled_schedule = schedule.enable();
            let next_fire = self
                .calculate_next_fire_time(&enabled_schedule, Utc::now())
                .await?;
            if self.config.enable_backfill {
                debug!(
                    schedule_id = %schedule_id,
                    "补跑已配置但未实现，停用期间错过的触发不会补发"
                );
            }
            enabled_schedule.update_next_fire(next_fire)
        } else {
            schedule.disable()
        };

        let persisted = self.schedule_repo.update(&updated).await?;
        info!(schedule_id = %schedule_id, enabled, "调度状态已更新");
        Ok(persisted)
    }

    /// 把超过时限仍未开始的执行标记为MISSED
    pub async fn mark_missed_runs(
        &self,
        created_before: DateTime<Utc>,
    ) -> OrchestratorResult<usize> {
        let pending = self.run_repo.get_pending_runs(Some(created_before)).await?;
        let mut missed = 0;
        for run in pending {
            let updated = run.mark_missed()?;
            self.run_repo.update(&updated).await?;
            missed += 1;
        }
        if missed > 0 {
            info!(count = missed, "标记错过的执行记录");
        }
        Ok(missed)
    }
}
