//! Per-day lines of the agent's weather advisory.
//!
//! The advisory is a mapping from `YYYY-MM-DD` to a list of lines.

use chrono::{Days, NaiveDate};
use serde_json::Value;

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Key under which the advisory stores `date`
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// `today` plus `days_ahead` days; `None` past the end of the calendar.
pub fn advisory_date(today: NaiveDate, days_ahead: u64) -> Option<NaiveDate> {
    today.checked_add_days(Days::new(days_ahead))
}

/// Lines advised for `date`.
///
/// `None` when the date is absent, its entry is not a list, or the list is
/// empty. Non-string items are rendered as JSON text.
pub fn daily_advisory(all: &Value, date: NaiveDate) -> Option<Vec<String>> {
    let items = all.get(date_key(date))?.as_array()?;
    if items.is_empty() {
        return None;
    }

    Some(
        items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
    )
}

/// Dated advisories for `today` and the following `days` - 1 days, skipping
/// days without lines.
pub fn upcoming_advisories(
    all: &Value,
    today: NaiveDate,
    days: u64,
) -> Vec<(NaiveDate, Vec<String>)> {
    (0..days)
        .filter_map(|offset| advisory_date(today, offset))
        .filter_map(|date| daily_advisory(all, date).map(|lines| (date, lines)))
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn advisory() -> Value {
        json!({
            "2026-10-19": ["Heavy rain after 4 PM", "Avoid spraying pesticides"],
            "2026-10-20": [],
            "2026-10-21": "Clear skies",
            "2026-10-22": ["Light winds", 3]
        })
    }

    #[test]
    fn test_lines_for_date() {
        assert_eq!(
            daily_advisory(&advisory(), day(2026, 10, 19)),
            Some(vec![
                "Heavy rain after 4 PM".to_string(),
                "Avoid spraying pesticides".to_string()
            ])
        );
    }

    #[test]
    fn test_missing_empty_or_non_list() {
        let all = advisory();
        assert_eq!(daily_advisory(&all, day(2026, 10, 20)), None);
        assert_eq!(daily_advisory(&all, day(2026, 10, 21)), None);
        assert_eq!(daily_advisory(&all, day(2026, 10, 23)), None);
        assert_eq!(daily_advisory(&Value::Null, day(2026, 10, 19)), None);
    }

    #[test]
    fn test_non_string_items_are_rendered() {
        assert_eq!(
            daily_advisory(&advisory(), day(2026, 10, 22)),
            Some(vec!["Light winds".to_string(), "3".to_string()])
        );
    }

    #[test]
    fn test_date_helpers() {
        assert_eq!(date_key(day(2026, 1, 5)), "2026-01-05");
        assert_eq!(advisory_date(day(2026, 12, 31), 1), Some(day(2027, 1, 1)));
        assert_eq!(advisory_date(NaiveDate::MAX, 1), None);
    }

    #[test]
    fn test_upcoming_skips_days_without_lines() {
        let upcoming = upcoming_advisories(&advisory(), day(2026, 10, 19), 4);
        let dates: Vec<_> = upcoming.iter().map(|(d, _)| *d).collect();
        assert_eq!(dates, vec![day(2026, 10, 19), day(2026, 10, 22)]);
    }
}
