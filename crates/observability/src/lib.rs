//! Logging for strata.
//!
//! Everything logs through `tracing`; this crate installs the subscriber.

mod logging;

pub use logging::{LogLevel, LoggingConfig, init_logging, init_test_logging};
