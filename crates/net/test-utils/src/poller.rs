//! Recording poller with scripted readiness batches.

use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::time::Duration;

use strata_net_socket::{Interest, Poller, ReadyEvent, SocketFd};
use tracing::trace;

/// A call received by [`MockPoller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerCall {
    Register(SocketFd, Interest),
    Modify(SocketFd, Interest),
    Unregister(SocketFd),
}

/// In-memory [`Poller`] that records interest changes and replays queued
/// batches from `wait`.
///
/// It behaves like a strict multiplexer: registering twice or touching an
/// unknown descriptor fails, so tests catch sequencing bugs.
#[derive(Debug, Default)]
pub struct MockPoller {
    calls: Vec<PollerCall>,
    registered: BTreeMap<SocketFd, Interest>,
    batches: VecDeque<Vec<ReadyEvent>>,
    fail_next: Option<io::ErrorKind>,
    waits: usize,
}

impl MockPoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a batch for a future `wait`.
    pub fn push_batch(&mut self, events: impl IntoIterator<Item = ReadyEvent>) {
        self.batches.push_back(events.into_iter().collect());
    }

    /// Make the next register/modify/unregister/wait call fail with `kind`.
    pub fn fail_next(&mut self, kind: io::ErrorKind) {
        self.fail_next = Some(kind);
    }

    pub fn calls(&self) -> &[PollerCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<PollerCall> {
        std::mem::take(&mut self.calls)
    }

    /// Current interest of `fd`, or `None` if it is not registered.
    pub fn interest(&self, fd: impl Into<SocketFd>) -> Option<Interest> {
        self.registered.get(&fd.into()).copied()
    }

    pub fn is_registered(&self, fd: impl Into<SocketFd>) -> bool {
        self.registered.contains_key(&fd.into())
    }

    pub fn wait_count(&self) -> usize {
        self.waits
    }

    pub fn pending_batches(&self) -> usize {
        self.batches.len()
    }

    fn check_failure(&mut self) -> io::Result<()> {
        match self.fail_next.take() {
            Some(kind) => Err(io::Error::new(kind, "injected poller failure")),
            None => Ok(()),
        }
    }
}

impl Poller for MockPoller {
    fn register(&mut self, fd: SocketFd, interest: Interest) -> io::Result<()> {
        self.check_failure()?;
        if self.registered.contains_key(&fd) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("fd {fd} already registered"),
            ));
        }
        self.registered.insert(fd, interest);
        self.calls.push(PollerCall::Register(fd, interest));
        Ok(())
    }

    fn modify(&mut self, fd: SocketFd, interest: Interest) -> io::Result<()> {
        self.check_failure()?;
        let Some(current) = self.registered.get_mut(&fd) else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("fd {fd} not registered"),
            ));
        };
        *current = interest;
        self.calls.push(PollerCall::Modify(fd, interest));
        Ok(())
    }

    fn unregister(&mut self, fd: SocketFd) -> io::Result<()> {
        self.check_failure()?;
        if self.registered.remove(&fd).is_none() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("fd {fd} not registered"),
            ));
        }
        self.calls.push(PollerCall::Unregister(fd));
        Ok(())
    }

    fn wait(
        &mut self,
        timeout: Option<Duration>,
        events: &mut Vec<ReadyEvent>,
    ) -> io::Result<usize> {
        self.check_failure()?;
        self.waits += 1;
        let batch = self.batches.pop_front().unwrap_or_default();
        trace!(?timeout, len = batch.len(), "mock poller batch");
        let len = batch.len();
        events.extend(batch);
        Ok(len)
    }
}
