//! Rolling UTC lookback window for the time-based usage endpoints

use chrono::{DateTime, Duration, Timelike, Utc};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `[start, end]` pair anchored to the current hour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Window from the previous day at the top of `now`'s hour
    /// to the last instant of `now`'s hour
    pub fn ending_at(now: DateTime<Utc>) -> Self {
        let into_hour = Duration::seconds(i64::from(now.minute() * 60 + now.second()))
            + Duration::nanoseconds(i64::from(now.nanosecond()));
        let top_of_hour = now - into_hour;

        Self {
            start: top_of_hour - Duration::days(1),
            end: top_of_hour + Duration::minutes(59) + Duration::seconds(59) + Duration::nanoseconds(999_999_999),
        }
    }

    pub fn query_string(&self) -> String {
        format!(
            "?startTime={}&endTime={}",
            escape(&self.start.format(TIME_FORMAT).to_string()),
            escape(&self.end.format(TIME_FORMAT).to_string()),
        )
    }
}

/// Build the `?startTime=..&endTime=..` query string for `now`
pub fn build_time_window(now: DateTime<Utc>) -> String {
    TimeWindow::ending_at(now).query_string()
}

fn escape(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_bounds() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 10, 37, 12).unwrap();
        let window = TimeWindow::ending_at(now);

        assert_eq!(window.start, Utc.with_ymd_and_hms(2025, 6, 14, 10, 0, 0).unwrap());
        assert_eq!(window.end.format(TIME_FORMAT).to_string(), "2025-06-15 10:59:59");
        assert_eq!(window.end.nanosecond(), 999_999_999);
    }

    #[test]
    fn test_query_string_is_escaped() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 10, 37, 12).unwrap();
        assert_eq!(
            build_time_window(now),
            "?startTime=2025-06-14+10%3A00%3A00&endTime=2025-06-15+10%3A59%3A59"
        );
    }

    #[test]
    fn test_window_crosses_month_and_leap_day() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 5, 0).unwrap();
        assert_eq!(
            build_time_window(now),
            "?startTime=2024-02-29+00%3A00%3A00&endTime=2024-03-01+00%3A59%3A59"
        );

        let now = Utc.with_ymd_and_hms(2025, 1, 1, 23, 0, 0).unwrap();
        assert_eq!(
            build_time_window(now),
            "?startTime=2024-12-31+23%3A00%3A00&endTime=2025-01-01+23%3A59%3A59"
        );
    }

    #[test]
    fn test_deterministic_within_hour() {
        let a = Utc.with_ymd_and_hms(2025, 6, 15, 10, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2025, 6, 15, 10, 59, 59).unwrap();
        assert_eq!(build_time_window(a), build_time_window(b));
    }
}
