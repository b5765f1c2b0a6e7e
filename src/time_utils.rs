use chrono::{DateTime, Datelike, Utc};

/// Axis label: the primary line is always drawn, the secondary only where the larger
/// unit changes between neighbouring ticks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeLabel {
    pub primary: String,
    pub secondary: String,
}

fn utc(timestamp_ms: u64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(i64::try_from(timestamp_ms).ok()?)
}

/// Timeframe-aware label in UTC.
///
/// - intraday: `HH:MM` over `DD Mon`
/// - daily and above: `DD Mon` over `YYYY`
pub fn format_time_label(timestamp_ms: u64, intraday: bool) -> TimeLabel {
    let Some(date) = utc(timestamp_ms) else {
        return TimeLabel { primary: "--".into(), secondary: String::new() };
    };
    if intraday {
        TimeLabel { primary: date.format("%H:%M").to_string(), secondary: date.format("%d %b").to_string() }
    } else {
        TimeLabel { primary: date.format("%d %b").to_string(), secondary: date.format("%Y").to_string() }
    }
}

/// True when the secondary unit (day for intraday, year otherwise) differs
pub fn crosses_boundary(previous_ms: u64, current_ms: u64, intraday: bool) -> bool {
    match (utc(previous_ms), utc(current_ms)) {
        (Some(a), Some(b)) if intraday => a.date_naive() != b.date_naive(),
        (Some(a), Some(b)) => a.year() != b.year(),
        _ => false,
    }
}

/// Full timestamp shown in the crosshair label
pub fn format_crosshair_time(timestamp_ms: u64, intraday: bool) -> String {
    match utc(timestamp_ms) {
        Some(date) if intraday => date.format("%Y-%m-%d %H:%M").to_string(),
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => "--".into(),
    }
}

/// `HH:MM:SS.mmm`, used by the console logger
pub fn format_clock(timestamp_ms: u64) -> String {
    utc(timestamp_ms).map(|date| date.format("%H:%M:%S%.3f").to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-03-09 23:30:00 UTC
    const LATE_EVENING: u64 = 1_710_027_000_000;

    #[test]
    fn intraday_labels() {
        let label = format_time_label(LATE_EVENING, true);
        insta::assert_snapshot!(format!("{} / {}", label.primary, label.secondary), @"23:30 / 09 Mar");
    }

    #[test]
    fn daily_labels() {
        let label = format_time_label(LATE_EVENING, false);
        insta::assert_snapshot!(format!("{} / {}", label.primary, label.secondary), @"09 Mar / 2024");
    }

    #[test]
    fn crosshair_and_clock() {
        insta::assert_snapshot!(format_crosshair_time(LATE_EVENING, true), @"2024-03-09 23:30");
        assert_eq!(format_crosshair_time(0, false), "1970-01-01");
        assert_eq!(format_clock(1_234), "00:00:01.234");
    }

    #[test]
    fn boundaries_follow_timeframe() {
        let an_hour = 3_600_000;
        assert!(crosses_boundary(LATE_EVENING, LATE_EVENING + an_hour, true));
        assert!(!crosses_boundary(LATE_EVENING, LATE_EVENING + an_hour, false));
        assert!(!crosses_boundary(LATE_EVENING - an_hour, LATE_EVENING, true));
    }
}
