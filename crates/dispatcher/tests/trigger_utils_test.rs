#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

    use orchestrator_core::models::Trigger;
    use orchestrator_core::OrchestratorError;
    use orchestrator_dispatcher::trigger_utils::next_fire_time;
    use orchestrator_testing_utils::{CalendarBuilder, ScheduleBuilder};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_cron_daily_at_noon_utc() {
        let schedule = ScheduleBuilder::new().with_cron("0 0 12 * * *").build();
        let now = at(2025, 6, 2, 0, 0);

        let next = next_fire_time(&schedule, "UTC", None, now).unwrap();
        assert_eq!(next, Some(at(2025, 6, 2, 12, 0)));
    }

    #[test]
    fn test_cron_five_field_expression() {
        let schedule = ScheduleBuilder::new().with_cron("30 8 * * *").build();
        let now = at(2025, 6, 2, 9, 0);

        let next = next_fire_time(&schedule, "UTC", None, now).unwrap();
        assert_eq!(next, Some(at(2025, 6, 3, 8, 30)));
    }

    #[test]
    fn test_cron_respects_schedule_timezone() {
        // 9am Sydney in June is 23:00 UTC the previous day
        let schedule = ScheduleBuilder::new()
            .with_timezone(Some("Australia/Sydney"))
            .with_cron("0 0 9 * * *")
            .build();
        let now = at(2025, 6, 2, 0, 0);

        let next = next_fire_time(&schedule, "UTC", None, now).unwrap();
        assert_eq!(next, Some(at(2025, 6, 2, 23, 0)));
    }

    #[test]
    fn test_fallback_timezone_used_when_unset() {
        let schedule = ScheduleBuilder::new()
            .with_timezone(None)
            .with_cron("0 0 9 * * *")
            .build();
        let now = at(2025, 6, 2, 0, 0);

        let next = next_fire_time(&schedule, "Australia/Sydney", None, now).unwrap();
        assert_eq!(next, Some(at(2025, 6, 2, 23, 0)));
    }

    #[test]
    fn test_invalid_cron_rejected() {
        let schedule = ScheduleBuilder::new().with_cron("61 * * * *").build();
        let result = next_fire_time(&schedule, "UTC", None, Utc::now());
        assert!(matches!(result, Err(OrchestratorError::InvalidCron { .. })));
    }

    #[test]
    fn test_one_shot_in_future_fires_once() {
        let start_at = at(2025, 6, 10, 8, 0);
        let schedule = ScheduleBuilder::new()
            .with_trigger(Trigger::OneShot { start_at })
            .build();

        let before = next_fire_time(&schedule, "UTC", None, at(2025, 6, 1, 0, 0)).unwrap();
        assert_eq!(before, Some(start_at));

        let after = next_fire_time(&schedule, "UTC", None, at(2025, 6, 10, 8, 1)).unwrap();
        assert_eq!(after, None);
    }

    #[test]
    fn test_fixed_delay_from_now_without_history() {
        let schedule = ScheduleBuilder::new()
            .with_trigger(Trigger::FixedDelay { delay_seconds: 300 })
            .build();
        let now = at(2025, 6, 2, 10, 0);

        let next = next_fire_time(&schedule, "UTC", None, now).unwrap();
        assert_eq!(next, Some(now + Duration::seconds(300)));
    }

    #[test]
    fn test_fixed_delay_is_relative_to_now_not_last_fire() {
        // A recently fired, re-enabled schedule still waits the full delay
        let now = at(2025, 6, 2, 10, 0);
        let mut schedule = ScheduleBuilder::new()
            .with_trigger(Trigger::FixedDelay {
                delay_seconds: 3600,
            })
            .build();
        schedule.last_fire_at = Some(now - Duration::seconds(60));

        let next = next_fire_time(&schedule, "UTC", None, now).unwrap();
        assert_eq!(next, Some(now + Duration::seconds(3600)));
    }

    #[test]
    fn test_rrule_daily() {
        let schedule = ScheduleBuilder::new()
            .with_trigger(Trigger::Rrule {
                rrule: "FREQ=DAILY;INTERVAL=1".to_string(),
            })
            .build();
        let now = Utc::now();

        let next = next_fire_time(&schedule, "UTC", None, now).unwrap();
        let next = next.expect("daily rule must have a next occurrence");
        assert!(next > now);
        assert!(next <= now + Duration::days(1));
    }

    #[test]
    fn test_rrule_exhausted_returns_none() {
        // Single occurrence at DTSTART, which is never strictly after now
        let schedule = ScheduleBuilder::new()
            .with_trigger(Trigger::Rrule {
                rrule: "FREQ=DAILY;COUNT=1".to_string(),
            })
            .build();

        let next = next_fire_time(&schedule, "UTC", None, Utc::now()).unwrap();
        assert_eq!(next, None);
    }

    #[test]
    fn test_invalid_rrule_rejected() {
        let schedule = ScheduleBuilder::new()
            .with_trigger(Trigger::Rrule {
                rrule: "FREQ=SOMETIMES".to_string(),
            })
            .build();
        let result = next_fire_time(&schedule, "UTC", None, Utc::now());
        assert!(matches!(
            result,
            Err(OrchestratorError::InvalidRrule { .. })
        ));
    }

    #[test]
    fn test_calendar_holiday_skipped() {
        let calendar = CalendarBuilder::new()
            .with_holiday(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap())
            .build();
        let schedule = ScheduleBuilder::new()
            .with_cron("0 0 12 * * *")
            .with_calendar("default", false)
            .build();
        let now = at(2025, 6, 2, 0, 0);

        let next = next_fire_time(&schedule, "UTC", Some(&calendar), now).unwrap();
        assert_eq!(next, Some(at(2025, 6, 3, 12, 0)));
    }

    #[test]
    fn test_business_days_only_skips_weekend() {
        let calendar = CalendarBuilder::new().weekdays_only().build();
        let schedule = ScheduleBuilder::new()
            .with_cron("0 0 12 * * *")
            .with_calendar("default", true)
            .build();
        // Friday afternoon, next weekday noon is Monday
        let now = at(2025, 6, 6, 13, 0);

        let next = next_fire_time(&schedule, "UTC", Some(&calendar), now).unwrap();
        assert_eq!(next, Some(at(2025, 6, 9, 12, 0)));
    }

    #[test]
    fn test_weekend_allowed_without_business_days_flag() {
        let calendar = CalendarBuilder::new().weekdays_only().build();
        let schedule = ScheduleBuilder::new()
            .with_cron("0 0 12 * * *")
            .with_calendar("default", false)
            .build();
        let now = at(2025, 6, 6, 13, 0);

        let next = next_fire_time(&schedule, "UTC", Some(&calendar), now).unwrap();
        assert_eq!(next, Some(at(2025, 6, 7, 12, 0)));
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let schedule = ScheduleBuilder::new()
            .with_timezone(Some("Mars/Olympus"))
            .build();
        let result = next_fire_time(&schedule, "UTC", None, Utc::now());
        assert!(matches!(
            result,
            Err(OrchestratorError::InvalidTimezone(_))
        ));
    }
}
