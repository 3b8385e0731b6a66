use std::collections::BTreeMap;
use std::io;

use assert_matches::assert_matches;
use strata_net_socket::{Interest, ReadyEvent, SocketError, SocketFd, SocketHandle, SocketState};
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use strata_net_test_utils::{MockPoller, PollerCall, open_socket, retire, socket};

use crate::{Context, Reactor, ReactorConfig, ReactorError, SocketOwner};

#[derive(Debug, Clone, Copy)]
enum Action {
    /// Close and retire another socket.
    Close(u32),
    /// Close a socket and immediately open a new one on the same fd.
    Reopen(u32),
    /// Report a `closed` notification for an open socket.
    Misuse,
    /// Return a recoverable error.
    Fail,
}

/// Owner arena mapping descriptors to handles, with scripted reactions.
#[derive(Default)]
struct Peers {
    handles: BTreeMap<SocketFd, SocketHandle>,
    log: Vec<(u32, &'static str)>,
    script: BTreeMap<(u32, &'static str), Action>,
}

impl Peers {
    fn open(&mut self, reactor: &mut Reactor<MockPoller>, fd: u32) {
        let mut handle = socket(fd);
        let mut cx = reactor.context();
        cx.open(&mut handle).unwrap();
        cx.insert_read(&mut handle).unwrap();
        self.handles.insert(handle.fd(), handle);
    }

    fn close(&mut self, fd: u32, cx: &mut Context<'_>) -> Result<(), SocketError> {
        if let Some(mut handle) = self.handles.remove(&SocketFd::from(fd)) {
            cx.close(&mut handle)?;
            cx.closed(&mut handle)?;
        }
        Ok(())
    }

    fn shutdown(&mut self, reactor: &mut Reactor<MockPoller>) {
        let mut cx = reactor.context();
        for (_, mut handle) in std::mem::take(&mut self.handles) {
            cx.close(&mut handle).unwrap();
            cx.closed(&mut handle).unwrap();
        }
        assert!(cx.is_empty());
    }

    fn react(
        &mut self,
        fd: SocketFd,
        kind: &'static str,
        cx: &mut Context<'_>,
    ) -> Result<(), SocketError> {
        self.log.push((fd.get(), kind));
        match self.script.get(&(fd.get(), kind)).copied() {
            None => Ok(()),
            Some(Action::Close(victim)) => self.close(victim, cx),
            Some(Action::Reopen(victim)) => {
                self.close(victim, cx)?;
                let mut handle = socket(victim);
                cx.open(&mut handle)?;
                cx.insert_read(&mut handle)?;
                self.handles.insert(handle.fd(), handle);
                Ok(())
            }
            Some(Action::Misuse) => match self.handles.get_mut(&fd) {
                Some(handle) => cx.closed(handle),
                None => Ok(()),
            },
            Some(Action::Fail) => Err(SocketError::ResourceExhausted {
                fd: fd.get(),
                capacity: 0,
            }),
        }
    }
}

impl SocketOwner for Peers {
    fn event_read(&mut self, fd: SocketFd, cx: &mut Context<'_>) -> Result<(), SocketError> {
        self.react(fd, "read", cx)
    }

    fn event_write(&mut self, fd: SocketFd, cx: &mut Context<'_>) -> Result<(), SocketError> {
        self.react(fd, "write", cx)
    }

    fn event_error(&mut self, fd: SocketFd, cx: &mut Context<'_>) -> Result<(), SocketError> {
        self.react(fd, "error", cx)
    }
}

fn reactor(open_max: usize) -> Reactor<MockPoller> {
    strata_observability::init_test_logging();
    Reactor::new(MockPoller::new(), ReactorConfig::with_open_max(open_max)).unwrap()
}

fn read(fd: u32) -> ReadyEvent {
    ReadyEvent::new(fd, Interest::READ)
}

#[test]
fn test_open_registers_and_activates() {
    let mut reactor = reactor(16);
    let mut peers = Peers::default();

    peers.open(&mut reactor, 3);

    assert!(reactor.sockets().has(&SocketFd::from(3)));
    assert_eq!(
        reactor.poller().calls(),
        &[
            PollerCall::Register(3.into(), Interest::empty()),
            PollerCall::Modify(3.into(), Interest::READ),
        ]
    );

    peers.shutdown(&mut reactor);
    assert!(!reactor.poller().is_registered(3));
}

#[test]
fn test_open_beyond_capacity() {
    let mut reactor = reactor(4);
    let mut handle = socket(4);

    let err = reactor.context().open(&mut handle).unwrap_err();

    assert_matches!(err, SocketError::ResourceExhausted { fd: 4, capacity: 4 });
    assert!(!err.is_programmer_error());
    assert_eq!(handle.state(), SocketState::Closed);
    assert!(reactor.poller().calls().is_empty());
}

#[test]
fn test_dispatch_order_per_ready_bit() {
    let mut reactor = reactor(16);
    let mut peers = Peers::default();
    peers.open(&mut reactor, 3);

    reactor
        .poller_mut()
        .push_batch([ReadyEvent::new(3, Interest::all())]);
    let callbacks = reactor.poll_once(&mut peers, None).unwrap();

    assert_eq!(callbacks, 3);
    assert_eq!(peers.log, vec![(3, "error"), (3, "read"), (3, "write")]);

    peers.shutdown(&mut reactor);
}

#[test]
fn test_close_other_socket_mid_batch() {
    let mut reactor = reactor(16);
    let mut peers = Peers::default();
    for fd in 1..=3 {
        peers.open(&mut reactor, fd);
    }
    peers.script.insert((1, "read"), Action::Close(3));

    reactor.poller_mut().push_batch([read(1), read(3), read(2)]);
    let callbacks = reactor.poll_once(&mut peers, None).unwrap();

    // fd 3 was closed by fd 1's handler before its own event came up.
    assert_eq!(callbacks, 2);
    assert_eq!(peers.log, vec![(1, "read"), (2, "read")]);
    assert_eq!(reactor.sockets().len(), 2);
    assert_eq!(reactor.sockets().tombstones(), 1);

    // The next batch compacts first.
    reactor.poll_once(&mut peers, None).unwrap();
    assert_eq!(reactor.sockets().tombstones(), 0);
    assert_eq!(reactor.sockets().slots(), 2);

    peers.shutdown(&mut reactor);
}

#[test]
fn test_close_self_skips_remaining_bits() {
    let mut reactor = reactor(16);
    let mut peers = Peers::default();
    peers.open(&mut reactor, 5);
    peers.script.insert((5, "error"), Action::Close(5));

    reactor
        .poller_mut()
        .push_batch([ReadyEvent::new(5, Interest::ERROR | Interest::READ)]);
    let callbacks = reactor.poll_once(&mut peers, None).unwrap();

    assert_eq!(callbacks, 1);
    assert_eq!(peers.log, vec![(5, "error")]);
    assert!(reactor.sockets().is_empty());
}

#[test]
fn test_event_for_unknown_socket_is_skipped() {
    let mut reactor = reactor(16);
    let mut peers = Peers::default();
    peers.open(&mut reactor, 1);

    reactor.poller_mut().push_batch([read(9), read(1)]);
    let callbacks = reactor.poll_once(&mut peers, None).unwrap();

    assert_eq!(callbacks, 1);
    assert_eq!(peers.log, vec![(1, "read")]);

    peers.shutdown(&mut reactor);
}

#[test]
fn test_fd_reused_within_batch() {
    let mut reactor = reactor(16);
    let mut peers = Peers::default();
    for fd in 1..=3 {
        peers.open(&mut reactor, fd);
    }
    peers.script.insert((1, "read"), Action::Reopen(2));

    reactor.poller_mut().push_batch([read(1), read(3)]);
    reactor.poll_once(&mut peers, None).unwrap();

    // Reopened socket got a fresh slot at the end.
    assert_eq!(reactor.sockets().find(&SocketFd::from(2)), Some(3));
    assert_eq!(reactor.sockets().get(1), None);

    reactor.prepare();
    let sockets = reactor.sockets();
    assert_eq!(sockets.len(), 3);
    for (index, slot) in sockets.iter().enumerate() {
        let fd = slot.unwrap();
        assert_eq!(sockets.find(&fd), Some(index));
    }

    peers.shutdown(&mut reactor);
}

#[test]
fn test_pending_event_not_delivered_to_reused_fd() {
    let mut reactor = reactor(16);
    let mut peers = Peers::default();
    peers.open(&mut reactor, 1);
    peers.open(&mut reactor, 2);
    peers.script.insert((1, "read"), Action::Reopen(2));

    reactor.poller_mut().push_batch([read(1), read(2)]);
    let callbacks = reactor.poll_once(&mut peers, None).unwrap();

    // The read on fd 2 was reported for the socket that fd 1's handler closed.
    assert_eq!(callbacks, 1);
    assert_eq!(peers.log, vec![(1, "read")]);
    assert!(reactor.sockets().has(&SocketFd::from(2)));

    // The new socket on fd 2 gets its own events from the next batch on.
    reactor.poller_mut().push_batch([read(2)]);
    assert_eq!(reactor.poll_once(&mut peers, None).unwrap(), 1);
    assert_eq!(peers.log, vec![(1, "read"), (2, "read")]);

    peers.shutdown(&mut reactor);
}

#[test]
fn test_socket_opened_mid_batch_skips_batch() {
    let mut reactor = reactor(16);
    let mut peers = Peers::default();
    peers.open(&mut reactor, 1);
    peers.script.insert((1, "read"), Action::Reopen(7));

    reactor.poller_mut().push_batch([read(1), read(7)]);
    let callbacks = reactor.poll_once(&mut peers, None).unwrap();

    assert_eq!(callbacks, 1);
    assert_eq!(peers.log, vec![(1, "read")]);
    assert_eq!(reactor.sockets().len(), 2);

    peers.shutdown(&mut reactor);
}

#[test]
fn test_close_out_of_range_keeps_state() {
    let mut reactor = reactor(16);
    let mut handle = open_socket(reactor.poller_mut(), 20);
    reactor.poller_mut().take_calls();

    assert_matches!(
        reactor.context().close(&mut handle),
        Err(SocketError::InvalidFileDescriptor { fd: 20, capacity: 16 })
    );
    assert_eq!(handle.state(), SocketState::Open);
    assert!(reactor.poller().is_registered(20));
    assert!(reactor.poller().calls().is_empty());

    retire(reactor.poller_mut(), &mut handle);
}

#[test]
fn test_metrics_recorded() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        let mut reactor = reactor(16);
        let mut peers = Peers::default();
        for fd in 1..=3 {
            peers.open(&mut reactor, fd);
        }
        peers.script.insert((1, "read"), Action::Close(3));

        reactor.poller_mut().push_batch([read(1), read(3), read(9)]);
        reactor.poll_once(&mut peers, None).unwrap();

        peers.shutdown(&mut reactor);
    });

    let values: BTreeMap<String, DebugValue> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(key, _, _, value)| (key.key().name().to_string(), value))
        .collect();

    assert_matches!(values.get("reactor.batches_total"), Some(DebugValue::Counter(1)));
    assert_matches!(values.get("reactor.callbacks_total"), Some(DebugValue::Counter(1)));
    assert_matches!(values.get("reactor.stale_events_total"), Some(DebugValue::Counter(2)));
    // No compaction ran, the gauge comes from the batch.
    assert_matches!(values.get("reactor.compactions_total"), None | Some(DebugValue::Counter(0)));
    assert_matches!(
        values.get("reactor.active_sockets"),
        Some(DebugValue::Gauge(live)) if live.0 == 2.0
    );
}

#[test]
fn test_programmer_error_aborts_batch() {
    let mut reactor = reactor(16);
    let mut peers = Peers::default();
    peers.open(&mut reactor, 1);
    peers.open(&mut reactor, 2);
    peers.script.insert((1, "read"), Action::Misuse);

    reactor.poller_mut().push_batch([read(1), read(2)]);
    let err = reactor.poll_once(&mut peers, None).unwrap_err();

    assert!(err.is_programmer_error());
    assert_matches!(
        err,
        ReactorError::Socket(SocketError::InvalidTransition { fd: 1, op: "closed", .. })
    );
    assert_eq!(peers.log, vec![(1, "read")]);

    peers.shutdown(&mut reactor);
}

#[test]
fn test_recoverable_error_continues_batch() {
    let mut reactor = reactor(16);
    let mut peers = Peers::default();
    peers.open(&mut reactor, 1);
    peers.open(&mut reactor, 2);
    peers.script.insert((1, "read"), Action::Fail);

    reactor.poller_mut().push_batch([read(1), read(2)]);
    let callbacks = reactor.poll_once(&mut peers, None).unwrap();

    assert_eq!(callbacks, 2);
    assert_eq!(peers.log, vec![(1, "read"), (2, "read")]);

    peers.shutdown(&mut reactor);
}

#[test]
fn test_wait_failure() {
    let mut reactor = reactor(16);
    let mut peers = Peers::default();

    reactor.poller_mut().fail_next(io::ErrorKind::Interrupted);
    assert_matches!(
        reactor.poll_once(&mut peers, None),
        Err(ReactorError::Wait(err)) if err.kind() == io::ErrorKind::Interrupted
    );

    // The reactor stays usable.
    reactor.poller_mut().push_batch([read(1)]);
    assert_eq!(reactor.poll_once(&mut peers, None).unwrap(), 0);
    assert_eq!(reactor.poller().wait_count(), 1);
}

#[test]
fn test_for_each_active_tolerates_close() {
    let mut reactor = reactor(16);
    let mut peers = Peers::default();
    for fd in 0..6 {
        peers.open(&mut reactor, fd);
    }

    let mut visited = Vec::new();
    reactor
        .for_each_active(|fd, cx| {
            visited.push(fd.get());
            match fd.get() {
                1 => peers.close(4, cx),
                2 => peers.close(2, cx),
                _ => Ok(()),
            }
        })
        .unwrap();

    assert_eq!(visited, vec![0, 1, 2, 3, 5]);
    assert_eq!(reactor.sockets().len(), 4);
    assert_eq!(reactor.sockets().tombstones(), 0);

    peers.shutdown(&mut reactor);
}

#[test]
fn test_run_until() {
    let mut reactor = reactor(16);
    let mut peers = Peers::default();
    peers.open(&mut reactor, 1);
    for _ in 0..3 {
        reactor.poller_mut().push_batch([read(1)]);
    }

    reactor
        .run_until(&mut peers, |peers| peers.log.len() >= 3)
        .unwrap();

    assert_eq!(reactor.poller().wait_count(), 3);
    assert_eq!(reactor.poller().pending_batches(), 0);

    peers.shutdown(&mut reactor);
}

#[test]
fn test_reserve_rejects_shrink_below_live_fd() {
    let mut reactor = reactor(16);
    let mut peers = Peers::default();
    peers.open(&mut reactor, 12);

    assert_matches!(
        reactor.reserve(8),
        Err(ReactorError::Socket(SocketError::InvalidFileDescriptor { fd: 12, capacity: 8 }))
    );
    reactor.reserve(32).unwrap();
    assert_eq!(reactor.sockets().capacity(), 32);

    peers.shutdown(&mut reactor);
}
