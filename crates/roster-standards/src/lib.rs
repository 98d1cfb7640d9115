#![deny(unsafe_code)]

pub mod error;
pub mod hash;
pub mod loaders;
pub mod paths;
pub mod variations;

pub use crate::error::{Result, StandardsError};
pub use crate::loaders::{
    Standards, load_default_standards, load_standards, parse_schema, parse_standards,
    parse_variations,
};
pub use crate::variations::{
    Variation, VariationTable, compact_header, exact_field, normalize_header,
};
