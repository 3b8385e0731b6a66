//! Open/interest/close state machine.
//!
//! ```text
//! Closed --open--> Open --(insert|remove)_*--> Open --close--> Closing --closed--> Closed
//! ```
//!
//! Every transition is forwarded to the [`Poller`] before the handle is
//! updated, so a poller failure leaves the handle untouched. A transition from
//! an unexpected state is a programmer error ([`SocketError::InvalidTransition`]).

use tracing::{debug, trace};

use crate::error::SocketError;
use crate::handle::SocketHandle;
use crate::interest::Interest;
use crate::poller::Poller;
use crate::state::SocketState;

impl SocketHandle {
    /// Register the descriptor with the poller. `Closed -> Open`.
    pub fn open<P: Poller + ?Sized>(&mut self, poller: &mut P) -> Result<(), SocketError> {
        if self.state != SocketState::Closed {
            return Err(self.invalid_transition("open"));
        }
        poller.register(self.fd, Interest::empty())?;
        self.state = SocketState::Open;
        self.interest = Interest::empty();
        debug!(fd = %self.fd, type_name = self.type_name(), "socket opened");
        Ok(())
    }

    pub fn insert_read<P: Poller + ?Sized>(&mut self, poller: &mut P) -> Result<(), SocketError> {
        self.insert_interest(poller, Interest::READ, "insert_read")
    }

    pub fn insert_write<P: Poller + ?Sized>(&mut self, poller: &mut P) -> Result<(), SocketError> {
        self.insert_interest(poller, Interest::WRITE, "insert_write")
    }

    pub fn insert_error<P: Poller + ?Sized>(&mut self, poller: &mut P) -> Result<(), SocketError> {
        self.insert_interest(poller, Interest::ERROR, "insert_error")
    }

    pub fn remove_read<P: Poller + ?Sized>(&mut self, poller: &mut P) -> Result<(), SocketError> {
        self.remove_interest(poller, Interest::READ)
    }

    pub fn remove_write<P: Poller + ?Sized>(&mut self, poller: &mut P) -> Result<(), SocketError> {
        self.remove_interest(poller, Interest::WRITE)
    }

    pub fn remove_error<P: Poller + ?Sized>(&mut self, poller: &mut P) -> Result<(), SocketError> {
        self.remove_interest(poller, Interest::ERROR)
    }

    /// Owner-initiated close: drops all interest and unregisters the
    /// descriptor. `Open -> Closing`; a no-op when already `Closing`.
    pub fn close<P: Poller + ?Sized>(&mut self, poller: &mut P) -> Result<(), SocketError> {
        match self.state {
            SocketState::Closing => Ok(()),
            SocketState::Closed => Err(self.invalid_transition("close")),
            SocketState::Open => {
                poller.unregister(self.fd)?;
                self.interest = Interest::empty();
                self.state = SocketState::Closing;
                debug!(fd = %self.fd, type_name = self.type_name(), "socket closing");
                Ok(())
            }
        }
    }

    /// The OS has retired the descriptor. `Closing -> Closed`; only after this
    /// may the fd value be handed to a new socket.
    pub fn closed(&mut self) -> Result<(), SocketError> {
        if self.state != SocketState::Closing {
            return Err(self.invalid_transition("closed"));
        }
        self.state = SocketState::Closed;
        debug!(fd = %self.fd, type_name = self.type_name(), "socket closed");
        Ok(())
    }

    fn insert_interest<P: Poller + ?Sized>(
        &mut self,
        poller: &mut P,
        bit: Interest,
        op: &'static str,
    ) -> Result<(), SocketError> {
        if self.state != SocketState::Open {
            return Err(self.invalid_transition(op));
        }
        if self.interest.contains(bit) {
            return Ok(());
        }
        let interest = self.interest | bit;
        poller.modify(self.fd, interest)?;
        self.interest = interest;
        trace!(fd = %self.fd, %interest, "interest added");
        Ok(())
    }

    // Bits are only ever set while `Open`, so a clear bit is a no-op in any state.
    fn remove_interest<P: Poller + ?Sized>(
        &mut self,
        poller: &mut P,
        bit: Interest,
    ) -> Result<(), SocketError> {
        if !self.interest.contains(bit) {
            return Ok(());
        }
        let interest = self.interest - bit;
        poller.modify(self.fd, interest)?;
        self.interest = interest;
        trace!(fd = %self.fd, %interest, "interest removed");
        Ok(())
    }
}
