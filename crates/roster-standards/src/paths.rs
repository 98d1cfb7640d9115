//! Standards directory path resolution.

use std::path::PathBuf;

/// Environment variable for overriding the bundled standards.
pub const STANDARDS_ENV_VAR: &str = "ROSTER_STANDARDS_DIR";

/// Directory of the Sport Passport format inside a standards root.
pub const SPORT_PASSPORT_DIR: &str = "sport_passport";

pub const FIELDS_FILE: &str = "fields.toml";
pub const VARIATIONS_FILE: &str = "variations.csv";

/// Standards root named by `ROSTER_STANDARDS_DIR`, if set.
pub fn standards_root_override() -> Option<PathBuf> {
    std::env::var_os(STANDARDS_ENV_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
