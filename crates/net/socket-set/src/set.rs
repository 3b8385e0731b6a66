//! Dense registry of active sockets keyed by file descriptor.

use strata_net_socket::{AsSocketFd, SocketError, SocketFd};
use tracing::{debug, trace};

/// Registry of active sockets with O(1) `has`/`insert`/`erase`.
///
/// Three pieces of state:
/// - `active`: dense list of descriptors, `None` marking a tombstone;
/// - `table`: one entry per possible descriptor, holding its `active` index;
/// - `erased`: tombstoned `active` indices awaiting [`SocketSet::prepare`].
///
/// [`SocketSet::erase`] only tombstones a slot, so positions held by an
/// in-progress walk over the active list stay valid while a handler erases
/// other sockets. Compaction happens in [`SocketSet::prepare`], which must only
/// run between dispatch batches. Insertion always appends; a tombstoned slot is
/// never reused before it has been compacted, otherwise the new socket's table
/// entry would alias an index the erased buffer still references.
///
/// The set never owns the sockets, it only records their descriptors.
#[derive(Debug, Default)]
pub struct SocketSet {
    active: Vec<Option<SocketFd>>,
    table: Vec<Option<u32>>,
    erased: Vec<u32>,
    live: usize,
}

impl SocketSet {
    /// An empty set with no descriptor capacity; call [`SocketSet::reserve`]
    /// before inserting.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty set able to hold descriptors `0..open_max`.
    pub fn with_capacity(open_max: usize) -> Self {
        let mut set = Self::new();
        set.table.resize(open_max, None);
        set.active.reserve(open_max);
        set.erased.reserve(open_max);
        set
    }

    /// Size the fd table for descriptors `0..open_max`.
    ///
    /// Meant to run once at startup or when the process fd limit changes.
    /// Shrinking below a live descriptor fails with
    /// [`SocketError::InvalidFileDescriptor`].
    pub fn reserve(&mut self, open_max: usize) -> Result<(), SocketError> {
        if let Some(fd) = self.live().find(|fd| fd.index() >= open_max) {
            return Err(SocketError::InvalidFileDescriptor {
                fd: i64::from(fd.get()),
                capacity: open_max,
            });
        }
        self.table.resize(open_max, None);
        self.active
            .reserve(open_max.saturating_sub(self.active.len()));
        self.erased
            .reserve(open_max.saturating_sub(self.erased.len()));
        debug!(capacity = open_max, "socket table reserved");
        Ok(())
    }

    /// Number of descriptors the table can index.
    pub fn capacity(&self) -> usize {
        self.table.len()
    }

    /// Number of live sockets.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Length of the active list, tombstones included.
    pub fn slots(&self) -> usize {
        self.active.len()
    }

    /// Tombstones waiting for [`SocketSet::prepare`].
    pub fn tombstones(&self) -> usize {
        self.erased.len()
    }

    pub fn has<S: AsSocketFd + ?Sized>(&self, socket: &S) -> bool {
        self.find(socket).is_some()
    }

    /// Position of `socket` in the active list.
    pub fn find<S: AsSocketFd + ?Sized>(&self, socket: &S) -> Option<usize> {
        self.table
            .get(socket.socket_fd().index())
            .copied()
            .flatten()
            .map(|index| index as usize)
    }

    /// Descriptor stored at `index`, `None` for tombstones and out-of-range
    /// positions.
    pub fn get(&self, index: usize) -> Option<SocketFd> {
        self.active.get(index).copied().flatten()
    }

    /// Add `socket` to the set. A no-op if it is already present.
    pub fn insert<S: AsSocketFd + ?Sized>(&mut self, socket: &S) -> Result<(), SocketError> {
        let fd = socket.socket_fd();
        let capacity = self.table.len();
        let Some(entry) = self.table.get_mut(fd.index()) else {
            return Err(out_of_bounds(fd, capacity, "insert"));
        };
        if entry.is_some() {
            return Ok(());
        }

        let index = u32::try_from(self.active.len()).map_err(|_| {
            SocketError::ResourceExhausted {
                fd: fd.get(),
                capacity,
            }
        })?;
        *entry = Some(index);
        self.active.push(Some(fd));
        self.live += 1;
        trace!(%fd, index, "socket inserted");
        Ok(())
    }

    /// Remove `socket` from the set. A no-op if it is absent.
    ///
    /// The slot becomes a tombstone; no other element moves until
    /// [`SocketSet::prepare`].
    pub fn erase<S: AsSocketFd + ?Sized>(&mut self, socket: &S) -> Result<(), SocketError> {
        let fd = socket.socket_fd();
        let capacity = self.table.len();
        let Some(entry) = self.table.get_mut(fd.index()) else {
            return Err(out_of_bounds(fd, capacity, "erase"));
        };
        let Some(index) = entry.take() else {
            return Ok(());
        };

        if let Some(slot) = self.active.get_mut(index as usize) {
            *slot = None;
        }
        self.erased.push(index);
        self.live -= 1;
        trace!(%fd, index, "socket erased");
        Ok(())
    }

    /// Compact the active list by moving the last live element into each
    /// tombstone. Must not run while the active list is being walked.
    pub fn prepare(&mut self) {
        if self.erased.is_empty() {
            return;
        }

        // Highest index first, so trailing tombstones are popped rather than
        // swapped into lower slots.
        let mut erased = std::mem::take(&mut self.erased);
        erased.sort_unstable_by(|a, b| b.cmp(a));
        for &index in &erased {
            self.replace_with_last(index as usize);
        }
        debug!(
            compacted = erased.len(),
            live = self.live,
            "socket set compacted"
        );
        erased.clear();
        self.erased = erased;
    }

    /// Walk the active list front to back, tombstones included.
    pub fn iter(
        &self,
    ) -> impl DoubleEndedIterator<Item = Option<SocketFd>> + ExactSizeIterator + '_ {
        self.active.iter().copied()
    }

    /// Live descriptors only.
    pub fn live(&self) -> impl DoubleEndedIterator<Item = SocketFd> + '_ {
        self.active.iter().copied().flatten()
    }

    fn replace_with_last(&mut self, index: usize) {
        while matches!(self.active.last(), Some(None)) {
            self.active.pop();
        }
        if index >= self.active.len() {
            return;
        }
        // The tail is live and `index` is a tombstone, so `index` stays in
        // bounds after the pop.
        let Some(Some(last)) = self.active.pop() else {
            return;
        };
        if let Some(slot) = self.active.get_mut(index) {
            *slot = Some(last);
        }
        if let Some(entry) = self.table.get_mut(last.index()) {
            *entry = Some(index as u32);
        }
    }
}

fn out_of_bounds(fd: SocketFd, capacity: usize, op: &'static str) -> SocketError {
    tracing::error!(%fd, capacity, op, "file descriptor outside socket table");
    SocketError::InvalidFileDescriptor {
        fd: i64::from(fd.get()),
        capacity,
    }
}
