//! Single-threaded readiness reactor: resolves poller batches against the
//! active socket set and hands each ready bit to the socket owner.

mod config;
mod context;
mod error;
pub mod limits;
mod metrics;
mod reactor;

#[cfg(test)]
mod tests;

pub use config::{DEFAULT_EVENT_CAPACITY, DEFAULT_POLL_TIMEOUT_MS, ReactorConfig};
pub use context::Context;
pub use error::ReactorError;
pub use self::metrics::ReactorMetrics;
pub use reactor::{Reactor, SocketOwner};
