//! Logging setup for applications built on `configure`.
//!
//! The `configure` crate emits `tracing` events while it loads and merges
//! documents. This crate installs a subscriber for them, with the subscriber
//! settings themselves read from a configuration store:
//!
//! ```toml
//! [logging]
//! level = "configure=debug,info"
//! format = "pretty"
//! file_line_info = true
//! ```
//!
//! See [`LogConfig::from_config`] and [`init_logging`].

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
