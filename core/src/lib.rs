//! Matched-filter core for compact-binary inspiral searches.
//!
//! A filter call correlates one frequency-domain template against one
//! conditioned data segment, optionally computes the chi-squared veto,
//! clusters threshold crossings and returns finalised events.

pub mod interface;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use prelude::{FilterConfig, FilterError, FilterInitParams, FilterParams, FilterResult};
