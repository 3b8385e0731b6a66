//! Handle-owner view of the reactor, usable from inside event callbacks.

use strata_net_socket::{AsSocketFd, Poller, SocketError, SocketHandle};
use strata_net_socket_set::SocketSet;
use tracing::{error, trace};

/// Mutable access to the socket registry and poller for socket owners.
///
/// Handed to every [`SocketOwner`](crate::SocketOwner) callback, so a handler
/// may open or close any socket, including ones that still have events
/// pending in the current batch. Closing only tombstones the registry slot,
/// and the reactor skips pending events of sockets that are no longer present.
pub struct Context<'a> {
    pub(crate) sockets: &'a mut SocketSet,
    pub(crate) poller: &'a mut dyn Poller,
}

impl<'a> Context<'a> {
    pub fn new(sockets: &'a mut SocketSet, poller: &'a mut dyn Poller) -> Self {
        Self { sockets, poller }
    }

    /// Register `handle` with the poller and add it to the active set.
    ///
    /// Fails with [`SocketError::ResourceExhausted`] when the descriptor does
    /// not fit the reserved table, before anything is registered.
    pub fn open(&mut self, handle: &mut SocketHandle) -> Result<(), SocketError> {
        let capacity = self.sockets.capacity();
        if handle.fd().index() >= capacity {
            return Err(SocketError::ResourceExhausted {
                fd: handle.fd().get(),
                capacity,
            });
        }
        handle.open(&mut *self.poller)?;
        self.sockets.insert(handle)?;
        trace!(fd = %handle.fd(), live = self.sockets.len(), "socket activated");
        Ok(())
    }

    pub fn insert_read(&mut self, handle: &mut SocketHandle) -> Result<(), SocketError> {
        handle.insert_read(&mut *self.poller)
    }

    pub fn insert_write(&mut self, handle: &mut SocketHandle) -> Result<(), SocketError> {
        handle.insert_write(&mut *self.poller)
    }

    pub fn insert_error(&mut self, handle: &mut SocketHandle) -> Result<(), SocketError> {
        handle.insert_error(&mut *self.poller)
    }

    pub fn remove_read(&mut self, handle: &mut SocketHandle) -> Result<(), SocketError> {
        handle.remove_read(&mut *self.poller)
    }

    pub fn remove_write(&mut self, handle: &mut SocketHandle) -> Result<(), SocketError> {
        handle.remove_write(&mut *self.poller)
    }

    pub fn remove_error(&mut self, handle: &mut SocketHandle) -> Result<(), SocketError> {
        handle.remove_error(&mut *self.poller)
    }

    /// Unregister `handle` and erase it from the active set. Safe to call
    /// mid-batch for any socket; a no-op when already closing.
    ///
    /// A descriptor outside the table is rejected before the handle changes
    /// state.
    pub fn close(&mut self, handle: &mut SocketHandle) -> Result<(), SocketError> {
        let capacity = self.sockets.capacity();
        if handle.fd().index() >= capacity {
            error!(fd = %handle.fd(), capacity, "closing socket outside socket table");
            return Err(SocketError::InvalidFileDescriptor {
                fd: i64::from(handle.fd().get()),
                capacity,
            });
        }
        handle.close(&mut *self.poller)?;
        self.sockets.erase(handle)?;
        trace!(fd = %handle.fd(), live = self.sockets.len(), "socket deactivated");
        Ok(())
    }

    /// The OS has retired the descriptor of a closing `handle`.
    pub fn closed(&mut self, handle: &mut SocketHandle) -> Result<(), SocketError> {
        handle.closed()
    }

    pub fn has<S: AsSocketFd + ?Sized>(&self, socket: &S) -> bool {
        self.sockets.has(socket)
    }

    /// Number of live sockets.
    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }
}
