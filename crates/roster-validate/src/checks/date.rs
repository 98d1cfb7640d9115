//! Date parsing and normalization to `DD/MM/YYYY`.

use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;

use roster_model::{AmbiguousDatePolicy, FixKind};

use super::{Canonical, CheckResult};

/// Output format for every date field.
pub const UK_DATE_FORMAT: &str = "%d/%m/%Y";

/// Serial day numbers accepted from spreadsheet exports (1900-01-01 ..= 2100-12-31).
const SERIAL_RANGE: std::ops::RangeInclusive<i64> = 2..=73_415;

static DAY_MONTH_YEAR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})([/.-])(\d{1,2})([/.-])(\d{2}|\d{4})$").expect("Invalid D/M/Y regex")
});

static YEAR_FIRST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})(?:[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?)?$")
        .expect("Invalid year-first regex")
});

static SERIAL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{5})(?:\.0+)?$").expect("Invalid serial date regex"));

static ORDINAL_SUFFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").expect("Invalid ordinal suffix regex")
});

/// Textual layouts tried after the numeric ones. chrono accepts full and
/// abbreviated month names for both `%B` and `%b`.
const TEXTUAL_FORMATS: &[&str] = &["%d %B %Y", "%B %d %Y", "%d-%b-%Y"];

fn format_uk(date: NaiveDate) -> String {
    date.format(UK_DATE_FORMAT).to_string()
}

fn serial_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}

fn number(text: &str) -> Option<u32> {
    text.parse().ok()
}

/// Checks a date value and proposes its `DD/MM/YYYY` form.
pub fn check_date(value: &str, policy: AmbiguousDatePolicy) -> CheckResult {
    if let Some(caps) = DAY_MONTH_YEAR_REGEX.captures(value) {
        if caps[2] != caps[4] {
            return Err(format!("{value:?} mixes date separators"));
        }
        if caps[5].len() == 2 {
            return Err(format!("{value:?} has a two-digit year"));
        }
        let (Some(first), Some(second), Ok(year)) =
            (number(&caps[1]), number(&caps[3]), caps[5].parse::<i32>())
        else {
            return Err(format!("{value:?} is not a valid date"));
        };
        return day_month_year(value, first, second, year, policy);
    }

    if let Some(caps) = YEAR_FIRST_REGEX.captures(value) {
        let parsed = match (caps[1].parse::<i32>(), number(&caps[2]), number(&caps[3])) {
            (Ok(year), Some(month), Some(day)) => NaiveDate::from_ymd_opt(year, month, day),
            _ => None,
        };
        return parsed
            .map(|date| Canonical::compared(value, format_uk(date), FixKind::DateFormat))
            .ok_or_else(|| format!("{value:?} is not a valid calendar date"));
    }

    if let Some(caps) = SERIAL_REGEX.captures(value) {
        return serial_date(value, &caps[1]);
    }

    textual_date(value)
        .map(|date| Canonical::compared(value, format_uk(date), FixKind::DateFormat))
        .ok_or_else(|| format!("{value:?} is not a recognised date"))
}

fn day_month_year(
    value: &str,
    first: u32,
    second: u32,
    year: i32,
    policy: AmbiguousDatePolicy,
) -> CheckResult {
    let day_first = NaiveDate::from_ymd_opt(year, second, first);
    let month_first = NaiveDate::from_ymd_opt(year, first, second);
    match (day_first, month_first) {
        (Some(date), None) => Ok(Canonical::compared(
            value,
            format_uk(date),
            FixKind::DateFormat,
        )),
        (None, Some(date)) => Ok(Canonical {
            value: format_uk(date),
            kind: Some(FixKind::UsToUkDate),
        }),
        (Some(date), Some(_)) if first == second || policy == AmbiguousDatePolicy::DayFirst => Ok(
            Canonical::compared(value, format_uk(date), FixKind::DateFormat),
        ),
        (Some(date), Some(other)) => Err(format!(
            "{value:?} is ambiguous: {} or {}",
            date.format("%-d %B %Y"),
            other.format("%-d %B %Y")
        )),
        (None, None) => Err(format!("{value:?} is not a valid calendar date")),
    }
}

fn serial_date(value: &str, digits: &str) -> CheckResult {
    let days: i64 = digits
        .parse()
        .map_err(|_| format!("{value:?} is not a valid serial date"))?;
    if !SERIAL_RANGE.contains(&days) {
        return Err(format!("{value:?} is outside the serial date range"));
    }
    serial_epoch()
        .and_then(|epoch| epoch.checked_add_signed(Duration::days(days)))
        .map(|date| Canonical {
            value: format_uk(date),
            kind: Some(FixKind::SerialDate),
        })
        .ok_or_else(|| format!("{value:?} is not a valid serial date"))
}

fn textual_date(value: &str) -> Option<NaiveDate> {
    let cleaned = ORDINAL_SUFFIX_REGEX.replace_all(value, "$1").replace(',', " ");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    TEXTUAL_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&cleaned, format).ok())
        .filter(|date| (1900..=2100).contains(&date.year()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(value: &str) -> (String, Option<FixKind>) {
        let canonical = check_date(value, AmbiguousDatePolicy::Manual).expect("repairable");
        (canonical.value, canonical.kind)
    }

    #[test]
    fn uk_dates_pass_or_get_padded() {
        assert_eq!(fixed("13/02/2010"), ("13/02/2010".to_string(), None));
        assert_eq!(
            fixed("13/2/2010"),
            ("13/02/2010".to_string(), Some(FixKind::DateFormat))
        );
        assert_eq!(
            fixed("13-02-2010"),
            ("13/02/2010".to_string(), Some(FixKind::DateFormat))
        );
        assert_eq!(fixed("01/01/2010"), ("01/01/2010".to_string(), None));
    }

    #[test]
    fn us_only_dates_are_swapped() {
        assert_eq!(
            fixed("02/13/2010"),
            ("13/02/2010".to_string(), Some(FixKind::UsToUkDate))
        );
    }

    #[test]
    fn ambiguous_dates_follow_policy() {
        let err = check_date("05/06/2010", AmbiguousDatePolicy::Manual).expect_err("ambiguous");
        assert!(err.contains("ambiguous"), "{err}");
        let day_first = check_date("5/6/2010", AmbiguousDatePolicy::DayFirst).expect("day first");
        assert_eq!(day_first.value, "05/06/2010");
    }

    #[test]
    fn other_layouts_are_normalized() {
        assert_eq!(fixed("2010-02-13").0, "13/02/2010");
        assert_eq!(fixed("2010-02-13T00:00:00").0, "13/02/2010");
        assert_eq!(fixed("13 February 2010").0, "13/02/2010");
        assert_eq!(fixed("13th Feb 2010").0, "13/02/2010");
        assert_eq!(fixed("February 13, 2010").0, "13/02/2010");
        assert_eq!(
            fixed("40222"),
            ("13/02/2010".to_string(), Some(FixKind::SerialDate))
        );
    }

    #[test]
    fn impossible_dates_need_manual_entry() {
        for value in ["31/02/2010", "13/13/2010", "1/2/10", "2010-02-30", "soon", "13/02-2010"] {
            assert!(
                check_date(value, AmbiguousDatePolicy::DayFirst).is_err(),
                "{value}"
            );
        }
    }
}
