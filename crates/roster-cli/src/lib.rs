//! Library side of the `roster-convert` binary.

pub mod convert;
pub mod logging;
pub mod output;
