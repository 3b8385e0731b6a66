//! The readiness multiplexer seam.

use std::io;
use std::time::Duration;

use auto_impl::auto_impl;

use crate::fd::SocketFd;
use crate::interest::Interest;

/// One entry of a readiness batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyEvent {
    pub fd: SocketFd,
    pub ready: Interest,
}

impl ReadyEvent {
    pub fn new(fd: impl Into<SocketFd>, ready: Interest) -> Self {
        Self {
            fd: fd.into(),
            ready,
        }
    }
}

/// OS readiness multiplexer (epoll, kqueue, or a test double).
///
/// Object safe so a dispatch context can hold `&mut dyn Poller`.
#[auto_impl(&mut, Box)]
pub trait Poller {
    /// Start tracking `fd` with the given interest (possibly empty).
    fn register(&mut self, fd: SocketFd, interest: Interest) -> io::Result<()>;

    /// Replace the interest of an already registered `fd`.
    fn modify(&mut self, fd: SocketFd, interest: Interest) -> io::Result<()>;

    /// Stop tracking `fd`.
    fn unregister(&mut self, fd: SocketFd) -> io::Result<()>;

    /// Block for at most `timeout` (forever if `None`) and append the ready
    /// descriptors to `events`. Returns the number of events appended.
    fn wait(&mut self, timeout: Option<Duration>, events: &mut Vec<ReadyEvent>)
        -> io::Result<usize>;
}
