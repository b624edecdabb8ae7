//! slugline-common: ambient pieces shared by the slugline crates.
//!
//! - `SluglineError` - top-level error type
//! - `config::FileStore` - JSON-backed configuration loading/saving
//! - `telemetry` - tracing subscriber setup
//! - `metadata` - process-wide annotation metadata cache

pub mod config;
pub mod error;
pub mod metadata;
#[cfg(feature = "telemetry")]
pub mod telemetry;

pub use error::{Result, SluglineError};
