//! Shared constants and small process/path helpers.

pub mod constants;
pub mod utils;
