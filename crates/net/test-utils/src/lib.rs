//! Test doubles shared by the socket, socket-set and reactor crates.

mod poller;

pub use poller::{MockPoller, PollerCall};

use strata_net_socket::{Poller, SocketFd, SocketHandle};

/// Diagnostic tag carried by handles built with [`socket`].
pub const TEST_SOCKET: &str = "test_socket";

/// A `Closed` handle for `fd`.
pub fn socket(fd: u32) -> SocketHandle {
    SocketHandle::new(SocketFd::from(fd), TEST_SOCKET)
}

/// An `Open` handle for `fd`, registered with `poller`.
pub fn open_socket<P: Poller + ?Sized>(poller: &mut P, fd: u32) -> SocketHandle {
    let mut handle = socket(fd);
    if let Err(err) = handle.open(poller) {
        panic!("failed to open test socket {fd}: {err}");
    }
    handle
}

/// Drive `handle` through `close` and `closed` so it can be dropped.
pub fn retire<P: Poller + ?Sized>(poller: &mut P, handle: &mut SocketHandle) {
    if handle.state().is_open() {
        if let Err(err) = handle.close(poller) {
            panic!("failed to close test socket {}: {err}", handle.fd());
        }
    }
    if !handle.state().is_closed() {
        if let Err(err) = handle.closed() {
            panic!("failed to retire test socket {}: {err}", handle.fd());
        }
    }
}
