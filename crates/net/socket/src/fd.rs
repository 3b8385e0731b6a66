//! Descriptor newtype used as the key of every socket table.

use std::fmt;
use std::os::fd::RawFd;

use crate::error::SocketError;

/// A non-negative socket file descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SocketFd(u32);

impl SocketFd {
    /// Wrap a raw descriptor, rejecting negative values.
    pub fn new(raw: RawFd) -> Result<Self, SocketError> {
        u32::try_from(raw)
            .map(Self)
            .map_err(|_| SocketError::InvalidFileDescriptor {
                fd: i64::from(raw),
                capacity: 0,
            })
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Position of this descriptor in an fd-indexed table.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The OS descriptor. Fails for values built through `From<u32>` that do
    /// not fit a [`RawFd`].
    pub fn as_raw(self) -> Result<RawFd, SocketError> {
        RawFd::try_from(self.0).map_err(|_| SocketError::InvalidFileDescriptor {
            fd: i64::from(self.0),
            capacity: RawFd::MAX as usize,
        })
    }
}

impl From<u32> for SocketFd {
    fn from(fd: u32) -> Self {
        Self(fd)
    }
}

impl TryFrom<RawFd> for SocketFd {
    type Error = SocketError;

    fn try_from(raw: RawFd) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl fmt::Display for SocketFd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Anything that can be looked up by its socket descriptor.
pub trait AsSocketFd {
    fn socket_fd(&self) -> SocketFd;
}

impl AsSocketFd for SocketFd {
    fn socket_fd(&self) -> SocketFd {
        *self
    }
}

impl<T: AsSocketFd + ?Sized> AsSocketFd for &T {
    fn socket_fd(&self) -> SocketFd {
        (**self).socket_fd()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_negative_fd_rejected() {
        assert_matches!(
            SocketFd::new(-1),
            Err(SocketError::InvalidFileDescriptor { fd: -1, .. })
        );
    }

    #[test]
    fn test_roundtrip_raw() {
        let fd = SocketFd::new(42).unwrap();
        assert_eq!(fd.get(), 42);
        assert_eq!(fd.index(), 42);
        assert_eq!(fd.as_raw().unwrap(), 42);
        assert_eq!(fd, SocketFd::from(42u32));
        assert_eq!(fd.to_string(), "42");
    }

    #[test]
    fn test_as_raw_out_of_range() {
        let fd = SocketFd::from(u32::MAX);
        assert_matches!(
            fd.as_raw(),
            Err(SocketError::InvalidFileDescriptor { fd, .. }) if fd == i64::from(u32::MAX)
        );
        assert_eq!(SocketFd::from(i32::MAX as u32).as_raw().unwrap(), i32::MAX);
    }
}
