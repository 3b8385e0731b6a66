//! Reactor errors.

use std::io;

use strata_net_socket::SocketError;

#[derive(Debug, thiserror::Error)]
pub enum ReactorError {
    #[error("Socket error: {0}")]
    Socket(#[from] SocketError),
    #[error("Failed to read the open file limit: {0}")]
    OpenFileLimit(#[source] io::Error),
    #[error("Poller wait failed: {0}")]
    Wait(#[source] io::Error),
}

impl ReactorError {
    /// Whether the error comes from a misbehaving socket owner rather than the
    /// environment.
    pub fn is_programmer_error(&self) -> bool {
        matches!(self, Self::Socket(err) if err.is_programmer_error())
    }
}
