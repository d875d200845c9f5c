//! Shared types for the container test environment toolkit
//!
//! Contains only the value types that both the environment controller and
//! the test harness speak: service identity, runtime container state, the
//! readiness rule derived from it and runtime quantity parsing.

pub mod errors;
pub mod logging;
pub mod types;
pub mod units;

pub use errors::*;
pub use types::*;
pub use units::{parse_byte_size, parse_percentage};
