//! Process descriptor limit discovery.

use std::io;

/// Upper bound on the fd table when the soft limit is unlimited or huge.
pub const MAX_TABLE_CAPACITY: usize = 1 << 20;

/// Soft `RLIMIT_NOFILE` of the current process, capped at
/// [`MAX_TABLE_CAPACITY`].
pub fn open_file_limit() -> io::Result<usize> {
    let mut limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: getrlimit only writes into the struct we pass.
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    if limit.rlim_cur == libc::RLIM_INFINITY {
        return Ok(MAX_TABLE_CAPACITY);
    }
    Ok(usize::try_from(limit.rlim_cur)
        .unwrap_or(MAX_TABLE_CAPACITY)
        .min(MAX_TABLE_CAPACITY))
}
