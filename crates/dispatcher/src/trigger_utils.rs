use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;
use tracing::debug;

use orchestrator_core::models::{BusinessCalendar, Schedule, Trigger};
use orchestrator_core::{OrchestratorError, OrchestratorResult};

/// 候选触发时间的扫描上限
///
/// 日历约束可能连续排除很多天，超过上限视为没有下一次触发，
/// 避免对病态的日历配置无限扫描。
const MAX_OCCURRENCE_SCAN: usize = 366;

/// 把常见的5字段CRON表达式补成cron库要求的格式
///
/// 5字段补秒位和年位，6字段及以上原样传入由解析器报错。
fn to_seven_field(expr: &str) -> String {
    let fields = expr.split_whitespace().count();
    if fields == 5 {
        format!("0 {expr} *")
    } else {
        expr.to_string()
    }
}

/// 解析IANA时区标识
pub fn parse_timezone(tz: &str) -> OrchestratorResult<Tz> {
    tz.parse::<Tz>()
        .map_err(|_| OrchestratorError::InvalidTimezone(tz.to_string()))
}

fn parse_cron(expr: &str) -> OrchestratorResult<cron::Schedule> {
    cron::Schedule::from_str(&to_seven_field(expr))
        .map_err(|e| OrchestratorError::invalid_cron(expr, e.to_string()))
}

/// 构造RRULE集合，缺少DTSTART时以当前时刻在调度时区补齐
fn build_rrule_set(expr: &str, tz: Tz, now: DateTime<Utc>) -> OrchestratorResult<RRuleSet> {
    let source = if expr.to_uppercase().contains("DTSTART") {
        expr.to_string()
    } else {
        let local = now.with_timezone(&tz);
        let body = if expr.to_uppercase().starts_with("RRULE:") {
            expr.to_string()
        } else {
            format!("RRULE:{expr}")
        };
        format!(
            "DTSTART;TZID={}:{}\n{}",
            tz.name(),
            local.format("%Y%m%dT%H%M%S"),
            body
        )
    };
    source
        .parse::<RRuleSet>()
        .map_err(|e| OrchestratorError::invalid_rrule(expr, e.to_string()))
}

/// 校验触发规则的表达式语法
///
/// 结构性检查（空表达式、非正延迟）在实体层完成，这里
/// 负责CRON/RRULE的语法解析。
pub fn validate_trigger(trigger: &Trigger) -> OrchestratorResult<()> {
    match trigger {
        Trigger::Cron { cron } => {
            parse_cron(cron)?;
            Ok(())
        }
        Trigger::Rrule { rrule } => {
            build_rrule_set(rrule, chrono_tz::UTC, Utc::now())?;
            Ok(())
        }
        Trigger::FixedDelay { delay_seconds } => {
            if *delay_seconds <= 0 {
                return Err(OrchestratorError::configuration(
                    "delay must be positive for FIXED_DELAY trigger",
                ));
            }
            Ok(())
        }
        Trigger::OneShot { .. } => Ok(()),
    }
}

/// 计算调度在 `now` 之后的下一次触发时间
///
/// 时区优先取调度自身配置，其次是服务默认时区。日历约束按
/// 触发时刻在调度时区的本地日期判断。扫描上限内没有合法
/// 候选时返回 `None`，表示调度不再触发。
pub fn next_fire_time(
    schedule: &Schedule,
    fallback_timezone: &str,
    calendar: Option<&BusinessCalendar>,
    now: DateTime<Utc>,
) -> OrchestratorResult<Option<DateTime<Utc>>> {
    let tz_name = schedule.timezone.as_deref().unwrap_or(fallback_timezone);
    let tz = parse_timezone(tz_name)?;

    let business_days_only = schedule
        .calendar
        .as_ref()
        .map(|c| c.business_days_only)
        .unwrap_or(false);
    let allowed = |candidate: DateTime<Utc>| -> bool {
        match calendar {
            Some(cal) => cal.allows(
                candidate.with_timezone(&tz).date_naive(),
                business_days_only,
            ),
            None => true,
        }
    };

    let next = match &schedule.trigger {
        Trigger::Cron { cron } => {
            let parsed = parse_cron(cron)?;
            let local_now = now.with_timezone(&tz);
            parsed
                .after(&local_now)
                .take(MAX_OCCURRENCE_SCAN)
                .map(|local| local.with_timezone(&Utc))
                .find(|candidate| allowed(*candidate))
        }
        Trigger::Rrule { rrule } => {
            let set = build_rrule_set(rrule, tz, now)?;
            let result = set
                .after(now.with_timezone(&rrule::Tz::UTC))
                .all(MAX_OCCURRENCE_SCAN as u16);
            result
                .dates
                .into_iter()
                .map(|occurrence| occurrence.with_timezone(&Utc))
                .filter(|candidate| *candidate > now)
                .find(|candidate| allowed(*candidate))
        }
        Trigger::FixedDelay { delay_seconds } => {
            if *delay_seconds <= 0 {
                return Err(OrchestratorError::configuration(
                    "delay must be positive for FIXED_DELAY trigger",
                ));
            }
            // 相对触发：始终以当前时刻为基准，不锚定上次触发时间
            let delay = Duration::seconds(*delay_seconds);
            let mut candidate = now + delay;
            let mut found = None;
            for _ in 0..MAX_OCCURRENCE_SCAN {
                if allowed(candidate) {
                    found = Some(candidate);
                    break;
                }
                candidate += delay;
            }
            found
        }
        Trigger::OneShot { start_at } => {
            if *start_at <= now || !allowed(*start_at) {
                None
            } else {
                Some(*start_at)
            }
        }
    };

    if next.is_none() {
        debug!(schedule_id = %schedule.id, "调度没有后续触发时间");
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_field_cron_accepted() {
        assert!(parse_cron("*/5 * * * *").is_ok());
        assert!(parse_cron("0 0 * * * *").is_ok());
        assert!(parse_cron("not a cron").is_err());
    }

    #[test]
    fn test_parse_timezone() {
        assert!(parse_timezone("America/New_York").is_ok());
        assert!(matches!(
            parse_timezone("Mars/Olympus"),
            Err(OrchestratorError::InvalidTimezone(_))
        ));
    }

    #[test]
    fn test_validate_trigger_syntax() {
        assert!(validate_trigger(&Trigger::Cron {
            cron: "*/5 * * * *".to_string()
        })
        .is_ok());
        assert!(matches!(
            validate_trigger(&Trigger::Cron {
                cron: "61 * * * *".to_string()
            }),
            Err(OrchestratorError::InvalidCron { .. })
        ));
        assert!(validate_trigger(&Trigger::Rrule {
            rrule: "FREQ=DAILY;INTERVAL=1".to_string()
        })
        .is_ok());
        assert!(matches!(
            validate_trigger(&Trigger::Rrule {
                rrule: "FREQ=SOMETIMES".to_string()
            }),
            Err(OrchestratorError::InvalidRrule { .. })
        ));
    }
}
