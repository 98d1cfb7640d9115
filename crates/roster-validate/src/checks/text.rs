use std::sync::LazyLock;

use regex::Regex;

use roster_model::{CanonicalCase, FixKind};

use super::{Canonical, CheckResult};

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("Invalid email regex")
});

/// Minimum digits in a phone number.
pub const PHONE_MIN_DIGITS: usize = 10;

/// Trims and collapses internal whitespace runs to single spaces.
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Title-cases words; letters after a non-letter start a new word, so
/// `o'brien-smith` becomes `O'Brien-Smith`.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

fn is_single_case(value: &str) -> bool {
    let letters = value.chars().filter(|ch| ch.is_alphabetic());
    let (mut lower, mut upper) = (false, false);
    for ch in letters {
        lower |= ch.is_lowercase();
        upper |= ch.is_uppercase();
    }
    !(lower && upper)
}

pub fn apply_case(value: &str, case: CanonicalCase) -> String {
    match case {
        CanonicalCase::AsIs => value.to_string(),
        CanonicalCase::Lower => value.to_lowercase(),
        CanonicalCase::Upper => value.to_uppercase(),
        CanonicalCase::Title if is_single_case(value) => title_case(value),
        CanonicalCase::Title => value.to_string(),
    }
}

pub fn check_text(value: &str, case: CanonicalCase) -> CheckResult {
    Ok(Canonical::compared(value, apply_case(value, case), FixKind::Case))
}

pub fn check_email(value: &str, case: CanonicalCase) -> CheckResult {
    let candidate = apply_case(value, case);
    if !EMAIL_REGEX.is_match(&candidate) {
        return Err(format!("{value:?} is not a valid email address"));
    }
    Ok(Canonical::compared(value, candidate, FixKind::Case))
}

pub fn check_phone(value: &str) -> CheckResult {
    let digits: String = value
        .chars()
        .filter(|ch| !(ch.is_whitespace() || matches!(ch, '-' | '(' | ')' | '+')))
        .collect();
    if !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(format!("{value:?} contains characters other than digits"));
    }
    if digits.len() < PHONE_MIN_DIGITS {
        return Err(format!(
            "{value:?} has {} digits, at least {PHONE_MIN_DIGITS} are needed",
            digits.len()
        ));
    }
    Ok(Canonical::unchanged(value))
}
