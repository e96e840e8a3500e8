//! 时间工具函数 - 营业日边界
//!
//! 所有时间戳统一使用 `i64` Unix millis，时区转换只在这里完成。

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

/// 日期 + cutoff 时间 → Unix millis (业务时区)
///
/// DST gap fallback: 如果本地时间不存在 (夏令时跳跃)，fallback 到 UTC。
pub fn date_cutoff_millis(date: NaiveDate, cutoff: NaiveTime, tz: Tz) -> i64 {
    let naive = date.and_time(cutoff);
    naive
        .and_local_timezone(tz)
        .latest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

/// 解析 cutoff 时间字符串 (HH:MM)，失败返回 00:00
pub fn parse_cutoff(cutoff: &str) -> NaiveTime {
    NaiveTime::parse_from_str(cutoff.trim(), "%H:%M").unwrap_or_else(|e| {
        tracing::warn!(
            "Failed to parse business_day_cutoff '{}': {}, falling back to 00:00",
            cutoff,
            e
        );
        NaiveTime::MIN
    })
}

/// 计算 `now_millis` 所在营业日的起始日期 (业务时区)
///
/// 当前时间 < cutoff → 还在"昨天"的营业日
/// 当前时间 >= cutoff → 当前营业日 = 今天
pub fn business_date_at(now_millis: i64, cutoff: NaiveTime, tz: Tz) -> NaiveDate {
    let now = DateTime::<Utc>::from_timestamp_millis(now_millis)
        .unwrap_or_else(Utc::now)
        .with_timezone(&tz);
    if now.time() < cutoff {
        (now - chrono::Duration::days(1)).date_naive()
    } else {
        now.date_naive()
    }
}

/// Unix millis at which the business day containing `now_millis` began
pub fn business_day_start_millis(now_millis: i64, cutoff: NaiveTime, tz: Tz) -> i64 {
    date_cutoff_millis(business_date_at(now_millis, cutoff, tz), cutoff, tz)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn millis(s: &str) -> i64 {
        DateTime::parse_from_rfc3339(s).unwrap().timestamp_millis()
    }

    #[test]
    fn test_before_cutoff_belongs_to_previous_day() {
        let tz = chrono_tz::Asia::Manila;
        let cutoff = parse_cutoff("04:00");
        // 02:30 Manila on 2026-03-10 is still the 2026-03-09 business day
        let now = millis("2026-03-10T02:30:00+08:00");
        assert_eq!(
            business_date_at(now, cutoff, tz),
            NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()
        );
        assert_eq!(
            business_day_start_millis(now, cutoff, tz),
            millis("2026-03-09T04:00:00+08:00")
        );
    }

    #[test]
    fn test_after_cutoff_belongs_to_today() {
        let tz = chrono_tz::Asia::Manila;
        let cutoff = parse_cutoff("04:00");
        let now = millis("2026-03-10T12:00:00+08:00");
        assert_eq!(
            business_day_start_millis(now, cutoff, tz),
            millis("2026-03-10T04:00:00+08:00")
        );
    }

    #[test]
    fn test_parse_cutoff_fallback() {
        assert_eq!(parse_cutoff("25:99"), NaiveTime::MIN);
        assert_eq!(parse_cutoff(" 06:30 ").format("%H:%M").to_string(), "06:30");
    }
}
