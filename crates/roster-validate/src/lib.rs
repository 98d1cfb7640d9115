//! Field-level validation for roster tables.

pub mod checks;
mod validator;

pub use checks::date::UK_DATE_FORMAT;
pub use checks::postcode::normalize_postcode;
pub use checks::text::{collapse_whitespace, title_case};
pub use validator::{ValidationEngine, ValidationOutcome};
