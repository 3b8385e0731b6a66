//! Lifecycle states of a socket handle.

/// Lifecycle state. An `Open` handle with a non-empty interest mask is what the
/// poller treats as read/write/error interested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(strum::Display, strum::IntoStaticStr, strum::EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum SocketState {
    /// No poller registration; the fd value may be reused.
    #[default]
    Closed,
    Open,
    /// Owner closed the socket, waiting for the OS to retire the fd.
    Closing,
}

impl SocketState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
