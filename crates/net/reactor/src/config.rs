//! Reactor configuration (TOML-serializable).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ReactorError;
use crate::limits::open_file_limit;

/// Default capacity of the readiness event buffer.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Default upper bound on a single poller wait.
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactorConfig {
    /// Descriptor table capacity. `None` uses the process open-file limit.
    pub open_max: Option<usize>,

    /// Initial capacity of the readiness event buffer.
    pub event_capacity: usize,

    /// Upper bound on a single poller wait in milliseconds. `None` blocks
    /// until an event arrives.
    pub poll_timeout_ms: Option<u64>,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            open_max: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            poll_timeout_ms: Some(DEFAULT_POLL_TIMEOUT_MS),
        }
    }
}

impl ReactorConfig {
    /// Config with a fixed descriptor capacity.
    pub fn with_open_max(open_max: usize) -> Self {
        Self {
            open_max: Some(open_max),
            ..Default::default()
        }
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        self.poll_timeout_ms.map(Duration::from_millis)
    }

    /// Descriptor table capacity, falling back to the process limit.
    pub fn resolve_open_max(&self) -> Result<usize, ReactorError> {
        match self.open_max {
            Some(open_max) => Ok(open_max),
            None => open_file_limit().map_err(ReactorError::OpenFileLimit),
        }
    }
}
