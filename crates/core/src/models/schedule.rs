use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{OrchestratorError, OrchestratorResult};

/// 触发规则：什么时候产生执行
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Trigger {
    #[serde(rename = "CRON")]
    Cron { cron: String },
    #[serde(rename = "RRULE")]
    Rrule { rrule: String },
    #[serde(rename = "FIXED_DELAY")]
    FixedDelay { delay_seconds: i64 },
    #[serde(rename = "ONE_SHOT")]
    OneShot { start_at: DateTime<Utc> },
}

/// 队列投递参数
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueSpec {
    pub topic: String,
}

/// 触达目标：触发后把事件投递到哪里
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind")]
pub enum Target {
    #[serde(rename = "EVENT")]
    Event { event_topic: String },
    #[serde(rename = "HTTP")]
    Http {
        url: String,
        method: String,
        headers: Option<HashMap<String, String>>,
        hmac_key_ref: Option<String>,
    },
    #[serde(rename = "QUEUE")]
    Queue { queue: QueueSpec },
}

impl Target {
    /// 投递事件的 event_type
    ///
    /// EVENT/QUEUE 目标直接用主题名，HTTP 目标用固定类型，
    /// 具体的 url/method 随载荷下发。
    pub fn event_type(&self) -> String {
        match self {
            Target::Event { event_topic } => event_topic.clone(),
            Target::Queue { queue } => queue.topic.clone(),
            Target::Http { .. } => "http.dispatch".to_string(),
        }
    }
}

/// 调度引用的业务日历约束
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarRef {
    /// 节假日日历编码
    pub holidays_code: String,
    /// 是否仅在工作日触发
    pub business_days_only: bool,
}

/// 定时调度定义
///
/// 实体不可变，所有变更方法返回版本递增后的新实例，
/// 配合仓储层的乐观锁更新。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    /// IANA时区标识，缺省时由服务配置决定
    pub timezone: Option<String>,
    pub trigger: Trigger,
    pub target: Target,
    pub payload: Option<Value>,
    pub calendar: Option<CalendarRef>,
    pub enabled: bool,
    pub next_fire_at: Option<DateTime<Utc>>,
    pub last_fire_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    /// 结构性校验，返回所有问题而不是遇到第一个就停
    ///
    /// 只检查字段的存在性和取值范围，CRON/RRULE 的语法
    /// 校验在触发计算层完成。
    pub fn validation_errors(
        trigger: &Trigger,
        target: &Target,
        timezone: Option<&str>,
    ) -> Vec<String> {
        let mut errors = Vec::new();

        match trigger {
            Trigger::Cron { cron } => {
                if cron.trim().is_empty() {
                    errors.push("cron expression is required for CRON trigger".to_string());
                }
            }
            Trigger::Rrule { rrule } => {
                if rrule.trim().is_empty() {
                    errors.push("rrule expression is required for RRULE trigger".to_string());
                }
            }
            Trigger::FixedDelay { delay_seconds } => {
                if *delay_seconds <= 0 {
                    errors.push("delay must be positive for FIXED_DELAY trigger".to_string());
                }
            }
            Trigger::OneShot { .. } => {}
        }

        match target {
            Target::Event { event_topic } => {
                if event_topic.trim().is_empty() {
                    errors.push("event topic is required for EVENT target".to_string());
                }
            }
            Target::Http { url, method, .. } => {
                if url.trim().is_empty() {
                    errors.push("url is required for HTTP target".to_string());
                }
                if method.trim().is_empty() {
                    errors.push("method is required for HTTP target".to_string());
                }
            }
            Target::Queue { queue } => {
                if queue.topic.trim().is_empty() {
                    errors.push("queue topic is required for QUEUE target".to_string());
                }
            }
        }

        if let Some(tz) = timezone {
            if tz.parse::<chrono_tz::Tz>().is_err() {
                errors.push(format!("unknown timezone: {tz}"));
            }
        }

        errors
    }

    pub fn new(
        tenant_id: String,
        name: String,
        timezone: Option<String>,
        trigger: Trigger,
        target: Target,
    ) -> OrchestratorResult<Self> {
        let errors = Self::validation_errors(&trigger, &target, timezone.as_deref());
        if let Some(first) = errors.into_iter().next() {
            return Err(OrchestratorError::configuration(first));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            tenant_id,
            name,
            timezone,
            trigger,
            target,
            payload: None,
            calendar: None,
            enabled: true,
            next_fire_at: None,
            last_fire_at: None,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_calendar(mut self, calendar: CalendarRef) -> Self {
        self.calendar = Some(calendar);
        self
    }

    fn touched(&self) -> Self {
        let mut next = self.clone();
        next.version += 1;
        next.updated_at = Utc::now();
        next
    }

    pub fn enable(&self) -> Self {
        let mut next = self.touched();
        next.enabled = true;
        next
    }

    pub fn disable(&self) -> Self {
        let mut next = self.touched();
        next.enabled = false;
        next
    }

    pub fn update_next_fire(&self, next_fire_at: Option<DateTime<Utc>>) -> Self {
        let mut next = self.touched();
        next.next_fire_at = next_fire_at;
        next
    }

    pub fn update_last_fire(&self, last_fire_at: DateTime<Utc>) -> Self {
        let mut next = self.touched();
        next.last_fire_at = Some(last_fire_at);
        next
    }

    /// 当前是否到达触发时间
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        match self.next_fire_at {
            Some(at) => at <= now,
            None => false,
        }
    }

    /// 执行前的最终放行检查，目前等价于 `is_due`
    pub fn should_fire(&self, now: DateTime<Utc>) -> bool {
        self.is_due(now)
    }

    /// 同一触发时刻的幂等键
    pub fn dedupe_key(&self, fire_time: DateTime<Utc>) -> String {
        format!("{}@{}", self.id, fire_time.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event_target() -> Target {
        Target::Event {
            event_topic: "orders.sync".to_string(),
        }
    }

    fn cron_trigger() -> Trigger {
        Trigger::Cron {
            cron: "*/5 * * * *".to_string(),
        }
    }

    #[test]
    fn test_new_rejects_empty_cron() {
        let result = Schedule::new(
            "tenant-1".to_string(),
            "sync".to_string(),
            None,
            Trigger::Cron {
                cron: "  ".to_string(),
            },
            event_target(),
        );
        let err = result.unwrap_err();
        assert!(err
            .to_string()
            .contains("cron expression is required for CRON trigger"));
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let errors = Schedule::validation_errors(
            &Trigger::FixedDelay { delay_seconds: 0 },
            &Target::Http {
                url: "".to_string(),
                method: "".to_string(),
                headers: None,
                hmac_key_ref: None,
            },
            Some("Not/AZone"),
        );
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&"delay must be positive for FIXED_DELAY trigger".to_string()));
        assert!(errors.contains(&"url is required for HTTP target".to_string()));
        assert!(errors.contains(&"method is required for HTTP target".to_string()));
        assert!(errors.contains(&"unknown timezone: Not/AZone".to_string()));
    }

    #[test]
    fn test_validation_messages() {
        let errors = Schedule::validation_errors(
            &Trigger::Rrule {
                rrule: "".to_string(),
            },
            &Target::Queue {
                queue: QueueSpec {
                    topic: "".to_string(),
                },
            },
            None,
        );
        assert!(errors.contains(&"rrule expression is required for RRULE trigger".to_string()));
        assert!(errors.contains(&"queue topic is required for QUEUE target".to_string()));

        let errors = Schedule::validation_errors(
            &cron_trigger(),
            &Target::Event {
                event_topic: "".to_string(),
            },
            None,
        );
        assert_eq!(errors, vec!["event topic is required for EVENT target"]);
    }

    #[test]
    fn test_mutators_bump_version() {
        let schedule = Schedule::new(
            "tenant-1".to_string(),
            "sync".to_string(),
            Some("UTC".to_string()),
            cron_trigger(),
            event_target(),
        )
        .unwrap();

        let toggled = schedule.disable().enable().disable();
        assert_eq!(schedule.version, 1);
        assert_eq!(toggled.version, 4);
        assert!(!toggled.enabled);
    }

    #[test]
    fn test_is_due() {
        let now = Utc::now();
        let schedule = Schedule::new(
            "tenant-1".to_string(),
            "sync".to_string(),
            None,
            cron_trigger(),
            event_target(),
        )
        .unwrap();

        assert!(!schedule.is_due(now));

        let due = schedule.update_next_fire(Some(now - Duration::seconds(1)));
        assert!(due.is_due(now));
        assert!(due.should_fire(now));

        let disabled = due.disable();
        assert!(!disabled.is_due(now));
    }

    #[test]
    fn test_dedupe_key_is_deterministic() {
        let schedule = Schedule::new(
            "tenant-1".to_string(),
            "sync".to_string(),
            None,
            cron_trigger(),
            event_target(),
        )
        .unwrap();
        let fire_time = Utc::now();
        let key = schedule.dedupe_key(fire_time);
        assert_eq!(key, schedule.dedupe_key(fire_time));
        assert_eq!(key, format!("{}@{}", schedule.id, fire_time.to_rfc3339()));
    }

    #[test]
    fn test_trigger_serde_tags() {
        let json = serde_json::to_value(&cron_trigger()).unwrap();
        assert_eq!(json["type"], "CRON");
        assert_eq!(json["cron"], "*/5 * * * *");

        let target = serde_json::to_value(&Target::Queue {
            queue: QueueSpec {
                topic: "billing".to_string(),
            },
        })
        .unwrap();
        assert_eq!(target["kind"], "QUEUE");
        assert_eq!(target["queue"]["topic"], "billing");

        let parsed: Trigger =
            serde_json::from_str(r#"{"type":"FIXED_DELAY","delay_seconds":30}"#).unwrap();
        assert_eq!(parsed, Trigger::FixedDelay { delay_seconds: 30 });
    }
}
