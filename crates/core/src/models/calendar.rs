use std::collections::HashSet;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 业务日历：节假日集合加上周一到周日的工作日掩码
///
/// 触发时间计算时用来跳过不允许执行的日期。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusinessCalendar {
    pub id: String,
    pub tenant_id: String,
    /// 租户内唯一的日历编码，调度通过编码引用
    pub code: String,
    pub name: String,
    pub holidays: HashSet<NaiveDate>,
    /// 周一到周日是否为工作日，索引0为周一
    pub business_days: [bool; 7],
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BusinessCalendar {
    pub fn new(tenant_id: String, code: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id,
            code,
            name,
            holidays: HashSet::new(),
            business_days: [true; 7],
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_holidays(mut self, holidays: HashSet<NaiveDate>) -> Self {
        self.holidays = holidays;
        self
    }

    pub fn with_business_days(mut self, business_days: [bool; 7]) -> Self {
        self.business_days = business_days;
        self
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        self.business_days[date.weekday().num_days_from_monday() as usize]
    }

    /// 判断日期是否允许触发
    ///
    /// 节假日始终排除；`business_days_only` 为真时还要求命中工作日掩码。
    pub fn allows(&self, date: NaiveDate, business_days_only: bool) -> bool {
        if self.is_holiday(date) {
            return false;
        }
        if business_days_only && !self.is_business_day(date) {
            return false;
        }
        true
    }

    /// 追加节假日，返回版本递增后的新实例
    pub fn add_holiday(&self, date: NaiveDate) -> Self {
        let mut next = self.clone();
        next.holidays.insert(date);
        next.version += 1;
        next.updated_at = Utc::now();
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_calendar_allows_everything_but_holidays() {
        let cal = BusinessCalendar::new(
            "tenant-1".to_string(),
            "default".to_string(),
            "Default".to_string(),
        );
        // 2025-01-04 is a Saturday
        assert!(cal.allows(date(2025, 1, 4), true));
        assert!(cal.allows(date(2025, 1, 6), false));
    }

    #[test]
    fn test_holiday_excluded_regardless_of_mask() {
        let mut holidays = HashSet::new();
        holidays.insert(date(2025, 12, 25));
        let cal = BusinessCalendar::new(
            "tenant-1".to_string(),
            "us".to_string(),
            "US Holidays".to_string(),
        )
        .with_holidays(holidays);

        assert!(!cal.allows(date(2025, 12, 25), false));
        assert!(!cal.allows(date(2025, 12, 25), true));
        assert!(cal.allows(date(2025, 12, 26), false));
    }

    #[test]
    fn test_business_day_mask() {
        // Monday through Friday only
        let mask = [true, true, true, true, true, false, false];
        let cal = BusinessCalendar::new(
            "tenant-1".to_string(),
            "weekdays".to_string(),
            "Weekdays".to_string(),
        )
        .with_business_days(mask);

        // 2025-01-06 Monday, 2025-01-11 Saturday
        assert!(cal.is_business_day(date(2025, 1, 6)));
        assert!(!cal.is_business_day(date(2025, 1, 11)));
        assert!(cal.allows(date(2025, 1, 11), false));
        assert!(!cal.allows(date(2025, 1, 11), true));
    }

    #[test]
    fn test_add_holiday_bumps_version() {
        let cal = BusinessCalendar::new(
            "tenant-1".to_string(),
            "default".to_string(),
            "Default".to_string(),
        );
        let updated = cal.add_holiday(date(2025, 5, 1));
        assert_eq!(cal.version, 1);
        assert_eq!(updated.version, 2);
        assert!(updated.is_holiday(date(2025, 5, 1)));
        assert!(!cal.is_holiday(date(2025, 5, 1)));
    }
}
