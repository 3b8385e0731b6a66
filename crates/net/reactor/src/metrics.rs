//! Reactor Metrics

use metrics::{Counter, Gauge};

/// Reactor Metrics
#[derive(Clone, Debug)]
pub struct ReactorMetrics {
    /// Number of poller batches dispatched
    pub(crate) batches_total: Counter,
    /// Number of owner callbacks invoked
    pub(crate) callbacks_total: Counter,
    /// Number of ready events dropped because the socket was erased first
    pub(crate) stale_events_total: Counter,
    /// Number of compaction passes that removed tombstones
    pub(crate) compactions_total: Counter,
    /// Live sockets after the last batch or compaction
    pub(crate) active_sockets: Gauge,
}

impl Default for ReactorMetrics {
    fn default() -> Self {
        Self {
            batches_total: metrics::counter!("reactor.batches_total"),
            callbacks_total: metrics::counter!("reactor.callbacks_total"),
            stale_events_total: metrics::counter!("reactor.stale_events_total"),
            compactions_total: metrics::counter!("reactor.compactions_total"),
            active_sockets: metrics::gauge!("reactor.active_sockets"),
        }
    }
}

impl ReactorMetrics {
    pub(crate) fn record_batch(&self, callbacks: usize, stale: usize, live: usize) {
        self.batches_total.increment(1);
        self.callbacks_total.increment(callbacks as u64);
        self.stale_events_total.increment(stale as u64);
        self.active_sockets.set(live as f64);
    }

    pub(crate) fn record_compaction(&self, live: usize) {
        self.compactions_total.increment(1);
        self.active_sockets.set(live as f64);
    }
}
