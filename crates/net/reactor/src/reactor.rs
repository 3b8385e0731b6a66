//! Readiness dispatch loop.

use std::time::Duration;

use strata_net_socket::{Interest, Poller, ReadyEvent, SocketError, SocketFd};
use strata_net_socket_set::SocketSet;
use tracing::{debug, trace, warn};

use crate::config::ReactorConfig;
use crate::context::Context;
use crate::error::ReactorError;
use crate::metrics::ReactorMetrics;

/// Event callbacks of the subsystem that owns the sockets.
///
/// The reactor only knows descriptors; the owner maps each descriptor back to
/// its own connection or listener. Each callback runs at most once per ready
/// bit per batch, in the order error, read, write, and only while the socket is
/// still in the active set. Events of a socket closed during the batch are
/// dropped, even when a new socket already reuses its descriptor.
pub trait SocketOwner {
    fn event_read(&mut self, fd: SocketFd, cx: &mut Context<'_>) -> Result<(), SocketError> {
        let _ = (fd, cx);
        Ok(())
    }

    fn event_write(&mut self, fd: SocketFd, cx: &mut Context<'_>) -> Result<(), SocketError> {
        let _ = (fd, cx);
        Ok(())
    }

    fn event_error(&mut self, fd: SocketFd, cx: &mut Context<'_>) -> Result<(), SocketError> {
        let _ = (fd, cx);
        Ok(())
    }
}

/// Single-threaded reactor: a [`Poller`], the [`SocketSet`] of active sockets
/// and a reusable event buffer.
///
/// Compaction of sockets erased during a batch is deferred to the start of the
/// next [`Reactor::poll_once`], so nothing moves while a batch is dispatched.
pub struct Reactor<P> {
    poller: P,
    sockets: SocketSet,
    events: Vec<ReadyEvent>,
    config: ReactorConfig,
    metrics: ReactorMetrics,
}

impl<P: Poller> Reactor<P> {
    pub fn new(poller: P, config: ReactorConfig) -> Result<Self, ReactorError> {
        let open_max = config.resolve_open_max()?;
        debug!(open_max, event_capacity = config.event_capacity, "reactor created");
        Ok(Self {
            poller,
            sockets: SocketSet::with_capacity(open_max),
            events: Vec::with_capacity(config.event_capacity),
            config,
            metrics: ReactorMetrics::default(),
        })
    }

    pub fn with_defaults(poller: P) -> Result<Self, ReactorError> {
        Self::new(poller, ReactorConfig::default())
    }

    pub fn config(&self) -> &ReactorConfig {
        &self.config
    }

    pub fn sockets(&self) -> &SocketSet {
        &self.sockets
    }

    pub fn poller(&self) -> &P {
        &self.poller
    }

    pub fn poller_mut(&mut self) -> &mut P {
        &mut self.poller
    }

    /// Owner API outside of callbacks (opening new sockets, shutting down).
    pub fn context(&mut self) -> Context<'_> {
        Context::new(&mut self.sockets, &mut self.poller)
    }

    /// Change the descriptor capacity, e.g. after raising the fd limit.
    pub fn reserve(&mut self, open_max: usize) -> Result<(), ReactorError> {
        self.sockets.reserve(open_max)?;
        Ok(())
    }

    /// Compact sockets erased since the last batch.
    pub fn prepare(&mut self) {
        let compacted = self.sockets.tombstones();
        if compacted == 0 {
            return;
        }
        self.sockets.prepare();
        self.metrics.record_compaction(self.sockets.len());
        trace!(compacted, live = self.sockets.len(), "reactor compacted");
    }

    /// Wait for one batch of readiness events and dispatch it to `owner`.
    ///
    /// Returns the number of callbacks invoked. Recoverable callback errors are
    /// logged and dispatch continues; a programmer error aborts the batch and
    /// is returned.
    pub fn poll_once<O: SocketOwner + ?Sized>(
        &mut self,
        owner: &mut O,
        timeout: Option<Duration>,
    ) -> Result<usize, ReactorError> {
        self.prepare();

        let mut events = std::mem::take(&mut self.events);
        events.clear();
        let result = match self.poller.wait(timeout, &mut events) {
            Ok(_) => self.dispatch(owner, &events),
            Err(err) => Err(ReactorError::Wait(err)),
        };
        self.events = events;
        result
    }

    /// Run batches with the configured timeout until `done` holds.
    pub fn run_until<O, F>(&mut self, owner: &mut O, mut done: F) -> Result<(), ReactorError>
    where
        O: SocketOwner + ?Sized,
        F: FnMut(&O) -> bool,
    {
        let timeout = self.config.poll_timeout();
        while !done(owner) {
            self.poll_once(owner, timeout)?;
        }
        Ok(())
    }

    /// Visit every active socket. `f` may close any socket, including ones not
    /// visited yet, which are then skipped. Compacts afterwards.
    pub fn for_each_active<F>(&mut self, mut f: F) -> Result<(), ReactorError>
    where
        F: FnMut(SocketFd, &mut Context<'_>) -> Result<(), SocketError>,
    {
        let mut cx = Context::new(&mut self.sockets, &mut self.poller);
        let mut result = Ok(());
        let mut index = 0;
        // Closing appends nothing and opening appends at the end, so
        // re-reading the length picks up sockets opened during the walk.
        while index < cx.sockets.slots() {
            if let Some(fd) = cx.sockets.get(index) {
                if let Err(err) = f(fd, &mut cx) {
                    result = Err(err.into());
                    break;
                }
            }
            index += 1;
        }
        self.prepare();
        result
    }

    fn dispatch<O: SocketOwner + ?Sized>(
        &mut self,
        owner: &mut O,
        events: &[ReadyEvent],
    ) -> Result<usize, ReactorError> {
        // Insertion only appends, so a socket opened during this batch sits
        // at or past `epoch`. That includes one reusing the descriptor of a
        // socket closed earlier in the batch, whose pending events are stale.
        let epoch = self.sockets.slots();
        let mut cx = Context::new(&mut self.sockets, &mut self.poller);
        let mut callbacks = 0;
        let mut stale = 0;

        for event in events {
            if !is_current(cx.sockets, event.fd, epoch) {
                trace!(fd = %event.fd, ready = %event.ready, "skipping event for inactive socket");
                stale += 1;
                continue;
            }
            for bit in event.ready.dispatch_order() {
                // An earlier callback may have closed this socket.
                if !is_current(cx.sockets, event.fd, epoch) {
                    break;
                }
                let result = if bit == Interest::ERROR {
                    owner.event_error(event.fd, &mut cx)
                } else if bit == Interest::READ {
                    owner.event_read(event.fd, &mut cx)
                } else {
                    owner.event_write(event.fd, &mut cx)
                };
                callbacks += 1;

                if let Err(err) = result {
                    if err.is_programmer_error() {
                        self.metrics.record_batch(callbacks, stale, cx.sockets.len());
                        return Err(err.into());
                    }
                    warn!(fd = %event.fd, ready = %bit, %err, "socket callback failed");
                }
            }
        }

        self.metrics.record_batch(callbacks, stale, cx.sockets.len());
        trace!(events = events.len(), callbacks, stale, "batch dispatched");
        Ok(callbacks)
    }
}

/// Whether `fd` is still the socket that was active when the batch started.
fn is_current(sockets: &SocketSet, fd: SocketFd, epoch: usize) -> bool {
    sockets.find(&fd).is_some_and(|index| index < epoch)
}
