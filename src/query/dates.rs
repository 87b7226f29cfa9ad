//! Natural-language date expression resolution.
//!
//! Turns expressions like "yesterday", "last week", "October 5, 2023" or
//! "March 2024" into inclusive calendar date ranges. All resolution is done
//! against an explicit `today` so behavior is reproducible in tests.

use chrono::{Datelike, Days, NaiveDate};
use regex::Regex;

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// A range covering a single day.
    pub fn single(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }

    /// Whether a date falls within this range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Explicit single-day formats, tried in order. First match wins, so
/// ambiguous slash dates resolve as month/day/year.
const DAY_FORMATS: &[&str] = &["%B %d, %Y", "%b %d, %Y", "%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"];

/// Resolve a natural-language date expression to a date range.
///
/// Returns `None` when the expression is not recognized.
pub fn parse_date_expr(expr: &str, today: NaiveDate) -> Option<DateRange> {
    let trimmed = normalize(expr);
    if trimmed.is_empty() {
        return None;
    }

    let lower = trimmed.to_lowercase();

    // Relative expressions
    match lower.as_str() {
        "today" => return Some(DateRange::single(today)),
        "yesterday" | "last day" => {
            return today.checked_sub_days(Days::new(1)).map(DateRange::single);
        }
        _ => {}
    }

    if let Some(rest) = lower.strip_prefix("last ") {
        let days_back = match rest.trim() {
            "week" => Some(7),
            "month" => Some(30),
            "year" => Some(365),
            _ => None,
        };
        if let Some(days) = days_back {
            let start = today.checked_sub_days(Days::new(days))?;
            return Some(DateRange { start, end: today });
        }
    }

    // Explicit single-day formats
    for fmt in DAY_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&trimmed, fmt) {
            return Some(DateRange::single(date));
        }
    }

    // Month and year ("October 2023")
    for fmt in &["%B %Y %d", "%b %Y %d"] {
        if let Ok(first) = NaiveDate::parse_from_str(&format!("{} 1", trimmed), fmt) {
            return Some(month_range(first));
        }
    }

    // Bare month, assumed in the current year ("June")
    for fmt in &["%B %Y %d", "%b %Y %d"] {
        if let Ok(first) =
            NaiveDate::parse_from_str(&format!("{} {} 1", trimmed, today.year()), fmt)
        {
            return Some(month_range(first));
        }
    }

    None
}

/// Strip filler prefixes ("in June", "on October 5, 2023").
fn normalize(expr: &str) -> String {
    let trimmed = expr.trim();
    let lower = trimmed.to_lowercase();

    for prefix in &["in ", "on ", "during ", "from "] {
        if lower.starts_with(prefix) {
            return trimmed[prefix.len()..].trim().to_string();
        }
    }

    trimmed.to_string()
}

/// The full calendar month containing `first` (which must be day 1).
fn month_range(first: NaiveDate) -> DateRange {
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };

    let end = next_month
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .unwrap_or(first);

    DateRange { start: first, end }
}

/// Scan free text for date expressions.
///
/// Used by the heuristic query parser when the LLM parse is unavailable.
pub fn find_date_expressions(text: &str) -> Vec<String> {
    // Bare "may" is a modal verb far more often than a month, so it needs a
    // day or year after it to count.
    let pattern = Regex::new(
        r"(?ix)
        \b(
            today
          | yesterday
          | last\s+(?:week|month|year)
          | (?:january|february|march|april|june|july|august|september|october|november|december)
            (?:\s+\d{1,2})?(?:,?\s+\d{4})?
          | may\s+\d{1,2}(?:,?\s+\d{4})?
          | may\s+\d{4}
          | \d{4}-\d{2}-\d{2}
          | \d{1,2}/\d{1,2}/\d{4}
        )\b
        ",
    )
    .expect("valid regex");

    pattern
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

/// Human-readable description of a date range.
pub fn describe_range(range: &DateRange) -> String {
    let (start, end) = (range.start, range.end);

    if start == end {
        return start.format("%B %d, %Y").to_string();
    }

    // Same month and year
    if start.month() == end.month() && start.year() == end.year() {
        return format!("{} - {}", start.format("%B %d"), end.format("%d, %Y"));
    }

    // Same year
    if start.year() == end.year() {
        return format!("{} - {}", start.format("%B %d"), end.format("%B %d, %Y"));
    }

    format!("{} - {}", start.format("%B %d, %Y"), end.format("%B %d, %Y"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const TODAY: fn() -> NaiveDate = || day(2024, 11, 15);

    #[test]
    fn test_today_and_yesterday() {
        let today = TODAY();
        assert_eq!(
            parse_date_expr("today", today),
            Some(DateRange::single(today))
        );
        assert_eq!(
            parse_date_expr("Yesterday", today),
            Some(DateRange::single(day(2024, 11, 14)))
        );
    }

    #[test]
    fn test_relative_ranges() {
        let today = TODAY();

        let last_week = parse_date_expr("last week", today).unwrap();
        assert_eq!(last_week.start, day(2024, 11, 8));
        assert_eq!(last_week.end, today);

        let last_month = parse_date_expr("last month", today).unwrap();
        assert_eq!(last_month.start, day(2024, 10, 16));

        let last_year = parse_date_expr("last  year", today).unwrap();
        assert_eq!(last_year.start, day(2023, 11, 16));
    }

    #[test]
    fn test_explicit_dates() {
        let today = TODAY();

        assert_eq!(
            parse_date_expr("October 5, 2023", today),
            Some(DateRange::single(day(2023, 10, 5)))
        );
        assert_eq!(
            parse_date_expr("Oct 5, 2023", today),
            Some(DateRange::single(day(2023, 10, 5)))
        );
        assert_eq!(
            parse_date_expr("2023-10-05", today),
            Some(DateRange::single(day(2023, 10, 5)))
        );
        // Slash dates resolve month/day/year first
        assert_eq!(
            parse_date_expr("10/05/2023", today),
            Some(DateRange::single(day(2023, 10, 5)))
        );
    }

    #[test]
    fn test_lowercase_month_names() {
        // Expressions arrive lowercased from the heuristic parser
        let range = parse_date_expr("october 5, 2023", TODAY()).unwrap();
        assert_eq!(range.start, day(2023, 10, 5));
    }

    #[test]
    fn test_month_and_year() {
        let range = parse_date_expr("October 2023", TODAY()).unwrap();
        assert_eq!(range.start, day(2023, 10, 1));
        assert_eq!(range.end, day(2023, 10, 31));

        // February in a leap year
        let range = parse_date_expr("February 2024", TODAY()).unwrap();
        assert_eq!(range.end, day(2024, 2, 29));

        let range = parse_date_expr("Feb 2023", TODAY()).unwrap();
        assert_eq!(range.end, day(2023, 2, 28));
    }

    #[test]
    fn test_bare_month_uses_current_year() {
        let range = parse_date_expr("June", TODAY()).unwrap();
        assert_eq!(range.start, day(2024, 6, 1));
        assert_eq!(range.end, day(2024, 6, 30));

        // December rolls the end into the right year
        let range = parse_date_expr("December", TODAY()).unwrap();
        assert_eq!(range.end, day(2024, 12, 31));
    }

    #[test]
    fn test_filler_prefixes() {
        let range = parse_date_expr("in June", TODAY()).unwrap();
        assert_eq!(range.start, day(2024, 6, 1));

        let range = parse_date_expr("on October 5, 2023", TODAY()).unwrap();
        assert_eq!(range, DateRange::single(day(2023, 10, 5)));
    }

    #[test]
    fn test_unparseable_expressions() {
        let today = TODAY();
        assert_eq!(parse_date_expr("sometime", today), None);
        assert_eq!(parse_date_expr("", today), None);
        assert_eq!(parse_date_expr("next week", today), None);
    }

    #[test]
    fn test_find_date_expressions() {
        let found = find_date_expressions("what did I say about the garden last week");
        assert_eq!(found, vec!["last week"]);

        let found = find_date_expressions("meetings on october 5, 2023 and yesterday");
        assert!(found.contains(&"october 5, 2023".to_string()));
        assert!(found.contains(&"yesterday".to_string()));

        let found = find_date_expressions("nothing datelike here at all");
        assert!(found.is_empty());
    }

    #[test]
    fn test_describe_range() {
        assert_eq!(
            describe_range(&DateRange::single(day(2023, 10, 5))),
            "October 05, 2023"
        );
        assert_eq!(
            describe_range(&DateRange { start: day(2023, 10, 1), end: day(2023, 10, 15) }),
            "October 01 - 15, 2023"
        );
        assert_eq!(
            describe_range(&DateRange { start: day(2023, 10, 1), end: day(2023, 11, 15) }),
            "October 01 - November 15, 2023"
        );
        assert_eq!(
            describe_range(&DateRange { start: day(2022, 12, 20), end: day(2023, 1, 5) }),
            "December 20, 2022 - January 05, 2023"
        );
    }

    #[test]
    fn test_range_contains() {
        let range = DateRange { start: day(2024, 10, 1), end: day(2024, 10, 31) };
        assert!(range.contains(day(2024, 10, 1)));
        assert!(range.contains(day(2024, 10, 31)));
        assert!(!range.contains(day(2024, 11, 1)));
    }
}
