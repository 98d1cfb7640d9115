use std::collections::BTreeMap;

use roster_model::FixKind;

use super::{Canonical, CheckResult};

/// Maps a submitted token onto one of the canonical `values`.
pub fn check_choice(
    value: &str,
    values: &[String],
    tokens: &BTreeMap<String, String>,
) -> CheckResult {
    if values.iter().any(|canonical| canonical == value) {
        return Ok(Canonical::unchanged(value));
    }
    let lowered = value.to_lowercase();
    let canonical = tokens
        .get(&lowered)
        .or_else(|| {
            values
                .iter()
                .find(|canonical| canonical.to_lowercase() == lowered)
        })
        .ok_or_else(|| format!("{value:?} is not one of {}", values.join(", ")))?;
    let kind = if canonical.to_lowercase() == lowered {
        FixKind::Case
    } else {
        FixKind::ChoiceToken
    };
    Ok(Canonical {
        value: canonical.clone(),
        kind: Some(kind),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gender() -> (Vec<String>, BTreeMap<String, String>) {
        let values = vec!["Male".to_string(), "Female".to_string()];
        let tokens = [("m", "Male"), ("male", "Male"), ("f", "Female")]
            .into_iter()
            .map(|(token, value)| (token.to_string(), value.to_string()))
            .collect();
        (values, tokens)
    }

    #[test]
    fn tokens_map_to_canonical_values() {
        let (values, tokens) = gender();
        assert_eq!(check_choice("Male", &values, &tokens).expect("ok").kind, None);
        let fixed = check_choice("F", &values, &tokens).expect("token");
        assert_eq!(fixed.value, "Female");
        assert_eq!(fixed.kind, Some(FixKind::ChoiceToken));
        let fixed = check_choice("FEMALE", &values, &tokens).expect("case");
        assert_eq!(fixed.kind, Some(FixKind::Case));
        let err = check_choice("x", &values, &tokens).expect_err("unknown");
        assert!(err.contains("Male, Female"), "{err}");
    }
}
