//! Socket handles and the open/interest/close protocol every socket follows
//! between its owner and the readiness poller.

pub mod error;
pub mod fd;
pub mod handle;
pub mod interest;
pub mod poller;
pub mod state;
mod transition;

pub use error::SocketError;
pub use fd::{AsSocketFd, SocketFd};
pub use handle::SocketHandle;
pub use interest::Interest;
pub use poller::{Poller, ReadyEvent};
pub use state::SocketState;
