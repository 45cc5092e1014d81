//! Compact color-coded rendering of a quota for terminal status lines

use chrono::{DateTime, Utc};
use crossterm::style::{style, Color, Stylize};

use crate::models::{PublishedModel, PublishedQuota};

/// Color palette for status output
pub struct Palette;

impl Palette {
    pub const HIGHLIGHT: Color = Color::Green;
    pub const WARNING: Color = Color::Yellow;
    pub const ERROR: Color = Color::Red;
    pub const MUTED: Color = Color::DarkGrey;
}

const FULL_OR_EMPTY_ICON: &str = "●";
const MODEL_PREFIX: &str = "glm-coding-plan-";

/// Remaining percentage with a traffic-light color.
/// Full and exhausted quotas render as a dot instead of a number.
pub fn format_percentage_with_color(percentage: i64) -> String {
    if percentage >= 100 {
        return style(FULL_OR_EMPTY_ICON).with(Palette::HIGHLIGHT).to_string();
    }
    if percentage <= 0 {
        return style(FULL_OR_EMPTY_ICON).with(Palette::ERROR).to_string();
    }

    let color = match percentage {
        50..=99 => Palette::HIGHLIGHT,
        20..=49 => Palette::WARNING,
        _ => Palette::ERROR,
    };
    style(format!("{}%", percentage)).with(color).to_string()
}

/// Time until an RFC 3339 reset instant as `"Xh Ym"`
pub fn format_time_remaining(reset_time: &str, now: DateTime<Utc>) -> String {
    let Ok(reset) = DateTime::parse_from_rfc3339(reset_time) else {
        return String::new();
    };

    let secs = (reset.with_timezone(&Utc) - now).num_seconds();
    if secs <= 0 {
        return "Reset due".to_string();
    }

    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    format!("{}h {}m", hours, minutes)
}

fn short_name(name: &str) -> &str {
    name.strip_prefix(MODEL_PREFIX).unwrap_or(name)
}

fn format_model(model: &PublishedModel, now: DateTime<Utc>) -> String {
    let mut out = format!(
        "{} {}",
        short_name(&model.name),
        format_percentage_with_color(model.percentage)
    );

    if let Some(reset_time) = model.reset_time.as_deref() {
        let remaining = format_time_remaining(reset_time, now);
        if !remaining.is_empty() {
            out.push(' ');
            out.push_str(&style(format!("({})", remaining)).with(Palette::MUTED).to_string());
        }
    }

    out
}

/// One-line summary of every model in the quota
pub fn format_status_line(quota: &PublishedQuota, now: DateTime<Utc>) -> String {
    if quota.is_forbidden {
        return style("forbidden").with(Palette::ERROR).to_string();
    }
    if quota.models.is_empty() {
        return style("no data").with(Palette::MUTED).to_string();
    }

    quota
        .models
        .iter()
        .map(|model| format_model(model, now))
        .collect::<Vec<_>>()
        .join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn colored(text: &str, color: Color) -> String {
        style(text).with(color).to_string()
    }

    #[test]
    fn test_full_and_empty_render_dots() {
        assert_eq!(format_percentage_with_color(100), colored("●", Color::Green));
        assert_eq!(format_percentage_with_color(0), colored("●", Color::Red));
        assert_eq!(format_percentage_with_color(-20), colored("●", Color::Red));
    }

    #[test]
    fn test_percentage_bands() {
        for pct in [50, 75, 99] {
            assert_eq!(format_percentage_with_color(pct), colored(&format!("{}%", pct), Color::Green));
        }
        for pct in [20, 35, 49] {
            assert_eq!(format_percentage_with_color(pct), colored(&format!("{}%", pct), Color::Yellow));
        }
        for pct in [1, 10, 19] {
            assert_eq!(format_percentage_with_color(pct), colored(&format!("{}%", pct), Color::Red));
        }
    }

    #[test]
    fn test_time_remaining() {
        let now = Utc.with_ymd_and_hms(2025, 12, 25, 12, 0, 0).unwrap();

        let future = now + Duration::hours(4) + Duration::minutes(30);
        assert_eq!(format_time_remaining(&future.to_rfc3339(), now), "4h 30m");

        assert_eq!(format_time_remaining("2025-12-25T14:15:00Z", now), "2h 15m");
        assert_eq!(format_time_remaining("2025-12-25T16:15:00+02:00", now), "2h 15m");
        assert_eq!(format_time_remaining("2025-12-25T11:00:00Z", now), "Reset due");
        assert_eq!(format_time_remaining("invalid-time", now), "");
    }

    #[test]
    fn test_status_line() {
        let now = Utc.with_ymd_and_hms(2025, 12, 25, 12, 0, 0).unwrap();
        let mut quota = PublishedQuota::new(0);
        quota.add_model("glm", 75);
        quota.add_model("glm-coding-plan-search-prime", 100);

        let line = format_status_line(&quota, now);
        assert_eq!(
            line,
            format!("glm {} | search-prime {}", colored("75%", Color::Green), colored("●", Color::Green))
        );
    }

    #[test]
    fn test_status_line_with_reset_time() {
        let now = Utc.with_ymd_and_hms(2025, 12, 25, 12, 0, 0).unwrap();
        let quota = PublishedQuota {
            models: vec![PublishedModel {
                name: "gemini-3-flash".to_string(),
                percentage: 30,
                reset_time: Some("2025-12-25T13:05:00Z".to_string()),
            }],
            last_updated: 0,
            is_forbidden: false,
        };

        let line = format_status_line(&quota, now);
        assert!(line.starts_with("gemini-3-flash "));
        assert!(line.contains("30%"));
        assert!(line.contains("(1h 5m)"));
    }

    #[test]
    fn test_status_line_special_states() {
        let now = Utc::now();
        assert_eq!(
            format_status_line(&PublishedQuota::forbidden(0), now),
            colored("forbidden", Color::Red)
        );
        assert_eq!(
            format_status_line(&PublishedQuota::new(0), now),
            colored("no data", Color::DarkGrey)
        );
    }
}
