use std::sync::LazyLock;

use regex::Regex;

use roster_model::FixKind;

use super::{Canonical, CheckResult};

/// Whole numbers, optionally exported as `7.0` or prefixed like `Year 7`.
static INTEGER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:year|yr|y)\s*)?([+-]?\d+)(?:\.0+)?$").expect("Invalid integer regex")
});

pub fn check_integer(value: &str, min: Option<i64>, max: Option<i64>) -> CheckResult {
    let number: i64 = INTEGER_REGEX
        .captures(value)
        .and_then(|caps| caps[1].parse().ok())
        .ok_or_else(|| format!("{value:?} is not a whole number"))?;
    if min.is_some_and(|min| number < min) || max.is_some_and(|max| number > max) {
        return Err(format!("{number} is outside {}", describe_range(min, max)));
    }
    Ok(Canonical::compared(
        value,
        number.to_string(),
        FixKind::IntegerFormat,
    ))
}

fn describe_range(min: Option<i64>, max: Option<i64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("{min}..={max}"),
        (Some(min), None) => format!("{min}.."),
        (None, Some(max)) => format!("..={max}"),
        (None, None) => "any range".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spreadsheet_forms_are_repaired() {
        assert_eq!(check_integer("7", Some(1), Some(13)).expect("ok").kind, None);
        for value in ["7.0", "Year 7", "y7", "07"] {
            let fixed = check_integer(value, Some(1), Some(13)).expect(value);
            assert_eq!(fixed.value, "7");
            assert_eq!(fixed.kind, Some(FixKind::IntegerFormat));
        }
    }

    #[test]
    fn bounds_and_garbage_are_manual() {
        let err = check_integer("14", Some(1), Some(13)).expect_err("range");
        assert_eq!(err, "14 is outside 1..=13");
        assert!(check_integer("7.5", None, None).is_err());
        assert!(check_integer("seven", None, None).is_err());
        assert!(check_integer("-1", Some(0), None).is_err());
    }
}
