//! Owned OS Handle
//!
//! `FileDesc` owns exactly one raw file descriptor and closes it when dropped.
//! It is deliberately not `Clone`: the only way to hand the descriptor to
//! someone else is to move the `FileDesc` (or [`FileDesc::release`] it, which
//! leaves the source invalid).
//!
//! ## I/O
//!
//! `&FileDesc` implements [`std::io::Read`] and [`std::io::Write`] directly on
//! top of `read(2)` / `write(2)`, the same way `&File` does in std. That lets
//! the transfer pump stay generic over `Read`/`Write` while the session hands
//! it raw descriptors.

use std::io;
use std::net::TcpStream;
use std::os::unix::io::{AsRawFd, FromRawFd, IntoRawFd, RawFd};

/// Value stored in an invalid (empty or closed) `FileDesc`.
const INVALID_FD: RawFd = -1;

/// Exclusive owner of one OS-level file descriptor.
#[derive(Debug)]
pub struct FileDesc {
    fd: RawFd,
}

impl FileDesc {
    /// Wraps a raw descriptor, taking ownership of it.
    ///
    /// Negative values produce an invalid `FileDesc`, so the return value of
    /// `socket(2)`, `epoll_create(2)` and friends can be wrapped before checking it.
    pub fn new(fd: RawFd) -> Self {
        Self {
            fd: if fd < 0 { INVALID_FD } else { fd },
        }
    }

    /// Creates a `FileDesc` that owns nothing.
    pub fn invalid() -> Self {
        Self { fd: INVALID_FD }
    }

    /// Returns true while a descriptor is owned.
    pub fn is_valid(&self) -> bool {
        self.fd >= 0
    }

    /// Returns the raw descriptor without giving up ownership.
    pub fn raw(&self) -> RawFd {
        self.fd
    }

    /// Moves the descriptor out, leaving `self` invalid.
    ///
    /// Not called `take`: `&FileDesc` implements `Read`, and `Read::take`
    /// would win method resolution wherever that trait is in scope.
    pub fn release(&mut self) -> FileDesc {
        std::mem::replace(self, FileDesc::invalid())
    }

    /// Closes the descriptor if one is owned. Calling it again is a no-op.
    ///
    /// Close failures are ignored.
    pub fn close(&mut self) {
        if self.is_valid() {
            // SAFETY: we own `fd` and invalidate it right after, so it is closed exactly once.
            unsafe {
                libc::close(self.fd);
            }
            self.fd = INVALID_FD;
        }
    }

    fn check_valid(&self) -> io::Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(io::Error::from_raw_os_error(libc::EBADF))
        }
    }
}

impl Default for FileDesc {
    fn default() -> Self {
        Self::invalid()
    }
}

impl Drop for FileDesc {
    fn drop(&mut self) {
        self.close();
    }
}

impl AsRawFd for FileDesc {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl FromRawFd for FileDesc {
    unsafe fn from_raw_fd(fd: RawFd) -> Self {
        Self::new(fd)
    }
}

impl IntoRawFd for FileDesc {
    fn into_raw_fd(mut self) -> RawFd {
        std::mem::replace(&mut self.fd, INVALID_FD)
    }
}

impl From<TcpStream> for FileDesc {
    fn from(stream: TcpStream) -> Self {
        Self::new(stream.into_raw_fd())
    }
}

impl PartialEq<RawFd> for FileDesc {
    fn eq(&self, other: &RawFd) -> bool {
        self.is_valid() && self.fd == *other
    }
}

impl io::Read for &FileDesc {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.check_valid()?;
        // SAFETY: `buf` is a valid writable region of `buf.len()` bytes.
        let n = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }
}

impl io::Write for &FileDesc {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check_valid()?;
        // SAFETY: `buf` is a valid readable region of `buf.len()` bytes.
        let n = unsafe { libc::write(self.fd, buf.as_ptr() as *const libc::c_void, buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;

    fn fd_is_open(fd: RawFd) -> bool {
        unsafe { libc::fcntl(fd, libc::F_GETFD) != -1 }
    }

    #[test]
    fn test_negative_fd_is_invalid() {
        let fd = FileDesc::new(-7);
        assert!(!fd.is_valid());
        assert_eq!(fd.raw(), -1);
    }

    #[test]
    fn test_drop_closes_descriptor() {
        let (a, _b) = UnixStream::pair().unwrap();
        let raw = a.into_raw_fd();
        {
            let fd = FileDesc::new(raw);
            assert!(fd.is_valid());
            assert!(fd_is_open(raw));
        }
        assert!(!fd_is_open(raw));
    }

    #[test]
    fn test_close_is_idempotent() {
        let (a, _b) = UnixStream::pair().unwrap();
        let mut fd = FileDesc::new(a.into_raw_fd());
        fd.close();
        assert!(!fd.is_valid());
        // A second close and the drop must not touch whatever reuses the number.
        let (c, _d) = UnixStream::pair().unwrap();
        let reused = c.as_raw_fd();
        fd.close();
        drop(fd);
        assert!(fd_is_open(reused));
    }

    #[test]
    fn test_release_invalidates_source() {
        let (a, _b) = UnixStream::pair().unwrap();
        let raw = a.into_raw_fd();
        let mut first = FileDesc::new(raw);
        let second = first.release();
        assert!(!first.is_valid());
        assert!(second.is_valid());
        drop(first);
        assert!(fd_is_open(raw));
        drop(second);
        assert!(!fd_is_open(raw));
    }

    #[test]
    fn test_release_then_read_with_io_traits_in_scope() {
        let (a, b) = UnixStream::pair().unwrap();
        let mut held = FileDesc::new(a.into_raw_fd());
        let peer = FileDesc::new(b.into_raw_fd());

        let moved = held.release();
        assert!(!held.is_valid());

        (&peer).write_all(b"ok").unwrap();
        let mut buf = [0u8; 2];
        (&moved).read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ok");

        let err = (&held).read(&mut buf).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
    }

    #[test]
    fn test_into_raw_fd_releases_ownership() {
        let (a, _b) = UnixStream::pair().unwrap();
        let fd = FileDesc::new(a.into_raw_fd());
        let raw = fd.into_raw_fd();
        assert!(fd_is_open(raw));
        unsafe { libc::close(raw) };
    }

    #[test]
    fn test_read_write_through_descriptor() {
        let (a, b) = UnixStream::pair().unwrap();
        let left = FileDesc::new(a.into_raw_fd());
        let right = FileDesc::new(b.into_raw_fd());

        assert_eq!((&left).write(b"hello").unwrap(), 5);

        let mut buf = [0u8; 16];
        let n = (&right).read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");
    }

    #[test]
    fn test_io_on_invalid_descriptor_fails() {
        let fd = FileDesc::invalid();
        let mut buf = [0u8; 4];
        let err = (&fd).read(&mut buf).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
    }
}
