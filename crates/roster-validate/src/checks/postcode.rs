use std::sync::LazyLock;

use regex::Regex;

use roster_model::FixKind;

use super::{Canonical, CheckResult};

/// Outward code, one space, inward code.
static UK_POSTCODE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z]{1,2}[0-9][0-9A-Z]? [0-9][A-Z]{2}$").expect("Invalid postcode regex")
});

/// Uppercases, removes internal spacing and reinserts a single space before
/// the three-character inward code.
pub fn normalize_postcode(value: &str) -> String {
    let compact: String = value
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect();
    if compact.len() < 5 || !compact.is_ascii() {
        return compact;
    }
    let (outward, inward) = compact.split_at(compact.len() - 3);
    format!("{outward} {inward}")
}

pub fn check_postcode(value: &str) -> CheckResult {
    let candidate = normalize_postcode(value);
    if !UK_POSTCODE_REGEX.is_match(&candidate) {
        return Err(format!("{value:?} is not a valid UK postcode"));
    }
    Ok(Canonical::compared(value, candidate, FixKind::PostcodeFormat))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spacing_and_case_are_repaired() {
        let fixed = check_postcode("sw1a1aa").expect("valid");
        assert_eq!(fixed.value, "SW1A 1AA");
        assert_eq!(fixed.kind, Some(FixKind::PostcodeFormat));
        assert_eq!(check_postcode("M1 1AE").expect("valid").kind, None);
        assert_eq!(check_postcode("B33  8TH").expect("valid").value, "B33 8TH");
    }

    #[test]
    fn malformed_postcodes_are_rejected() {
        for value in ["12345", "SW1A", "SW1A 1A", "ZZZZ 1AA", "SW1A-1AA"] {
            assert!(check_postcode(value).is_err(), "{value}");
        }
    }
}
