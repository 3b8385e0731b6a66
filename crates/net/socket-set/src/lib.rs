//! Registry of active sockets keyed by file descriptor, safe to mutate while a
//! dispatch batch is walking it.

mod set;

pub use set::SocketSet;
