//! Error taxonomy shared by the socket registry and the interest state machine.

use std::io;

use crate::state::SocketState;

/// Errors raised by socket bookkeeping.
///
/// `InvalidFileDescriptor` and `InvalidTransition` are programmer errors: no
/// correct caller can produce them, so they are reported immediately and never
/// retried. Use [`SocketError::is_programmer_error`] to tell them apart from
/// runtime failures.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("invalid file descriptor {fd} (table capacity {capacity})")]
    InvalidFileDescriptor { fd: i64, capacity: usize },
    #[error("invalid transition `{op}` on fd {fd} in state {state}")]
    InvalidTransition {
        fd: u32,
        op: &'static str,
        state: SocketState,
    },
    #[error("descriptor table exhausted: fd {fd} does not fit capacity {capacity}")]
    ResourceExhausted { fd: u32, capacity: usize },
    #[error("Poller error: {0}")]
    Poller(#[from] io::Error),
}

impl SocketError {
    /// Whether this error indicates a bug in the calling subsystem.
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFileDescriptor { .. } | Self::InvalidTransition { .. }
        )
    }
}
