use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthLabelFormat {
    Short, // Jan
    Full,  // Jan 2024
}

/// Formats a month label for an instant already expressed in the display timezone.
pub fn format_month(dt: &DateTime<Tz>, format: MonthLabelFormat) -> String {
    match format {
        MonthLabelFormat::Short => dt.format("%b").to_string(),
        MonthLabelFormat::Full => dt.format("%b %Y").to_string(),
    }
}

/// Formats a snapshot timestamp (ms since epoch) for tooltips, e.g. `Mar 15, 2024 14:05`.
pub fn format_timestamp(timestamp_ms: i64, tz: Tz) -> String {
    match tz.timestamp_millis_opt(timestamp_ms).earliest() {
        Some(dt) => dt.format("%b %-d, %Y %H:%M").to_string(),
        None => timestamp_ms.to_string(),
    }
}
