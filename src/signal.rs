//! Shutdown signal handling
//!
//! SIGINT and SIGTERM set a process-wide flag and write a byte to a wake
//! pipe. The handlers are installed without `SA_RESTART`, so a blocked read
//! returns `EINTR`; a signal that lands just before the touch device starts
//! waiting is still seen through the pipe.

use std::io;
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use crate::Result;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);
static WAKE_READ: AtomicI32 = AtomicI32::new(-1);
static WAKE_WRITE: AtomicI32 = AtomicI32::new(-1);

extern "C" fn request_shutdown(_signal: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
    let fd = WAKE_WRITE.load(Ordering::SeqCst);
    if fd >= 0 {
        // SAFETY: write(2) is async-signal-safe; the pipe is non-blocking
        unsafe {
            libc::write(fd, [1u8].as_ptr() as *const libc::c_void, 1);
        }
    }
}

pub fn install() -> Result<()> {
    let mut fds = [-1; 2];
    // SAFETY: fds has room for the two descriptors pipe2 fills in
    if unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC | libc::O_NONBLOCK) } != 0 {
        return Err(io::Error::last_os_error().into());
    }
    WAKE_READ.store(fds[0], Ordering::SeqCst);
    WAKE_WRITE.store(fds[1], Ordering::SeqCst);

    for signal in [libc::SIGINT, libc::SIGTERM] {
        // SAFETY: the handler only stores atomics and calls write(2); sigaction is fully initialized
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = request_shutdown as extern "C" fn(libc::c_int) as libc::sighandler_t;
            action.sa_flags = 0;
            libc::sigemptyset(&mut action.sa_mask);
            if libc::sigaction(signal, &action, std::ptr::null_mut()) != 0 {
                return Err(io::Error::last_os_error().into());
            }
        }
    }
    Ok(())
}

/// The flag the dispatch loop polls
pub fn flag() -> &'static AtomicBool {
    &SHUTDOWN
}

/// Read end of the wake pipe; readable once shutdown has been requested
pub fn wake_fd() -> Option<RawFd> {
    let fd = WAKE_READ.load(Ordering::SeqCst);
    (fd >= 0).then_some(fd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_sets_flag_and_wakes() {
        let mut fds = [-1; 2];
        assert_eq!(unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_NONBLOCK) }, 0);
        WAKE_READ.store(fds[0], Ordering::SeqCst);
        WAKE_WRITE.store(fds[1], Ordering::SeqCst);

        request_shutdown(libc::SIGTERM);
        assert!(flag().load(Ordering::SeqCst));

        let mut byte = [0u8; 1];
        let fd = wake_fd().unwrap();
        let n = unsafe { libc::read(fd, byte.as_mut_ptr() as *mut libc::c_void, 1) };
        assert_eq!(n, 1);

        SHUTDOWN.store(false, Ordering::SeqCst);
        WAKE_READ.store(-1, Ordering::SeqCst);
        WAKE_WRITE.store(-1, Ordering::SeqCst);
        unsafe {
            libc::close(fds[0]);
            libc::close(fds[1]);
        }
    }
}
