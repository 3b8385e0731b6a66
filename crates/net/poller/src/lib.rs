//! Mio-based poller using epoll/kqueue.
//!
//! Descriptors are registered with mio through [`SourceFd`] using the fd value
//! as the token, so ready events map straight back to a [`SocketFd`] without a
//! lookup table of their own beyond the interest masks.

use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

use mio::unix::SourceFd;
use mio::{Events, Poll, Token};
use strata_net_socket::{Interest, Poller, ReadyEvent, SocketFd};
use tracing::trace;

/// Default number of events fetched per `wait`.
pub const DEFAULT_EVENTS_CAPACITY: usize = 1024;

/// [`Poller`] backed by [`mio::Poll`].
///
/// mio cannot hold a descriptor with an empty interest, so a descriptor with
/// no interest is only tracked here and gets registered with mio once it asks
/// for something. Error readiness is always reported by the OS; an error-only
/// mask is registered as readable and the read bit is filtered out again.
pub struct MioPoller {
    poll: Poll,
    events: Events,
    /// Interest per descriptor, `None` when not registered.
    interests: Vec<Option<Interest>>,
}

impl MioPoller {
    pub fn new() -> io::Result<Self> {
        Self::with_capacity(DEFAULT_EVENTS_CAPACITY)
    }

    pub fn with_capacity(events_capacity: usize) -> io::Result<Self> {
        Ok(Self {
            poll: Poll::new()?,
            events: Events::with_capacity(events_capacity),
            interests: Vec::new(),
        })
    }

    /// Interest currently recorded for `fd`.
    pub fn interest(&self, fd: SocketFd) -> Option<Interest> {
        self.interests.get(fd.index()).copied().flatten()
    }

    fn current(&self, fd: SocketFd) -> io::Result<Interest> {
        self.interest(fd).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("fd {fd} not registered"))
        })
    }

    fn apply(&mut self, fd: SocketFd, before: Interest, after: Interest) -> io::Result<()> {
        let raw: RawFd = fd
            .as_raw()
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
        let mut source = SourceFd(&raw);
        let registry = self.poll.registry();
        let token = Token(fd.index());

        match (to_mio(before), to_mio(after)) {
            (None, Some(interest)) => registry.register(&mut source, token, interest),
            (Some(_), Some(interest)) => registry.reregister(&mut source, token, interest),
            (Some(_), None) => registry.deregister(&mut source),
            (None, None) => Ok(()),
        }
    }
}

impl Poller for MioPoller {
    fn register(&mut self, fd: SocketFd, interest: Interest) -> io::Result<()> {
        if self.interest(fd).is_some() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("fd {fd} already registered"),
            ));
        }
        self.apply(fd, Interest::empty(), interest)?;
        if self.interests.len() <= fd.index() {
            self.interests.resize(fd.index() + 1, None);
        }
        if let Some(slot) = self.interests.get_mut(fd.index()) {
            *slot = Some(interest);
        }
        trace!(%fd, %interest, "poller register");
        Ok(())
    }

    fn modify(&mut self, fd: SocketFd, interest: Interest) -> io::Result<()> {
        let before = self.current(fd)?;
        self.apply(fd, before, interest)?;
        if let Some(slot) = self.interests.get_mut(fd.index()) {
            *slot = Some(interest);
        }
        trace!(%fd, %interest, "poller modify");
        Ok(())
    }

    fn unregister(&mut self, fd: SocketFd) -> io::Result<()> {
        let before = self.current(fd)?;
        self.apply(fd, before, Interest::empty())?;
        if let Some(slot) = self.interests.get_mut(fd.index()) {
            *slot = None;
        }
        trace!(%fd, "poller unregister");
        Ok(())
    }

    fn wait(
        &mut self,
        timeout: Option<Duration>,
        events: &mut Vec<ReadyEvent>,
    ) -> io::Result<usize> {
        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::Interrupted => return Ok(0),
            Err(err) => return Err(err),
        }

        let mut count = 0;
        for event in self.events.iter() {
            let Ok(fd) = u32::try_from(event.token().0).map(SocketFd::from) else {
                continue;
            };
            let Some(wanted) = self.interests.get(fd.index()).copied().flatten() else {
                continue;
            };

            let mut ready = Interest::empty();
            if event.is_readable() || event.is_read_closed() {
                ready |= Interest::READ;
            }
            if event.is_writable() || event.is_write_closed() {
                ready |= Interest::WRITE;
            }
            if event.is_error() {
                ready |= Interest::ERROR;
            }

            let ready = ready & wanted;
            if ready.is_empty() {
                continue;
            }
            events.push(ReadyEvent { fd, ready });
            count += 1;
        }
        Ok(count)
    }
}

fn to_mio(interest: Interest) -> Option<mio::Interest> {
    let write = interest.contains(Interest::WRITE);
    let read = interest.contains(Interest::READ) || (!write && interest.contains(Interest::ERROR));

    match (read, write) {
        (true, true) => Some(mio::Interest::READABLE | mio::Interest::WRITABLE),
        (true, false) => Some(mio::Interest::READABLE),
        (false, true) => Some(mio::Interest::WRITABLE),
        (false, false) => None,
    }
}
