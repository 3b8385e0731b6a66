//! Socket handle owned by the subsystem that created the socket.

use tracing::error;

use crate::error::SocketError;
use crate::fd::{AsSocketFd, SocketFd};
use crate::interest::Interest;
use crate::state::SocketState;

/// Identifies one socket: its descriptor, current interest and lifecycle state.
///
/// A handle is owned by whoever created the socket (a connection, a listener).
/// Registries and pollers only keep its [`SocketFd`]. The owner must drive the
/// handle back to [`SocketState::Closed`] (see [`SocketHandle::close`] and
/// [`SocketHandle::closed`]) before dropping it; dropping a handle in any other
/// state is reported as a liveness violation.
#[derive(Debug)]
pub struct SocketHandle {
    pub(crate) fd: SocketFd,
    pub(crate) interest: Interest,
    pub(crate) state: SocketState,
    type_name: &'static str,
}

impl SocketHandle {
    pub fn new(fd: SocketFd, type_name: &'static str) -> Self {
        Self {
            fd,
            interest: Interest::empty(),
            state: SocketState::Closed,
            type_name,
        }
    }

    pub fn fd(&self) -> SocketFd {
        self.fd
    }

    /// Diagnostic tag naming the kind of socket (e.g. `"peer_connection"`).
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn interest(&self) -> Interest {
        self.interest
    }

    pub fn state(&self) -> SocketState {
        self.state
    }

    pub fn is_read_interested(&self) -> bool {
        self.interest.contains(Interest::READ)
    }

    pub fn is_write_interested(&self) -> bool {
        self.interest.contains(Interest::WRITE)
    }

    pub fn is_error_interested(&self) -> bool {
        self.interest.contains(Interest::ERROR)
    }

    pub(crate) fn invalid_transition(&self, op: &'static str) -> SocketError {
        error!(
            fd = %self.fd,
            type_name = self.type_name,
            state = %self.state,
            op,
            "invalid socket transition"
        );
        SocketError::InvalidTransition {
            fd: self.fd.get(),
            op,
            state: self.state,
        }
    }
}

impl AsSocketFd for SocketHandle {
    fn socket_fd(&self) -> SocketFd {
        self.fd
    }
}

impl Drop for SocketHandle {
    fn drop(&mut self) {
        if self.state.is_closed() {
            return;
        }
        error!(
            fd = %self.fd,
            type_name = self.type_name,
            state = %self.state,
            "socket handle dropped before the socket was closed"
        );
        if cfg!(debug_assertions) && !std::thread::panicking() {
            panic!(
                "socket handle fd {} ({}) dropped in state {}",
                self.fd, self.type_name, self.state
            );
        }
    }
}
