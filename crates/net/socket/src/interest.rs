//! Readiness interest masks.

use std::fmt;

bitflags::bitflags! {
    /// Subset of readiness conditions a socket wants to be notified about.
    ///
    /// The same type describes the ready mask reported by a poller.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Interest: u8 {
        const READ = 0b001;
        const WRITE = 0b010;
        const ERROR = 0b100;
    }
}

impl Interest {
    /// Ready bits in callback order: error, then read, then write.
    pub fn dispatch_order(self) -> impl Iterator<Item = Interest> {
        [Interest::ERROR, Interest::READ, Interest::WRITE]
            .into_iter()
            .filter(move |bit| self.contains(*bit))
    }
}

impl fmt::Display for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        bitflags::parser::to_writer(self, f)
    }
}
