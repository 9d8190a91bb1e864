//! Readiness Notification
//!
//! A thin wrapper over Linux `epoll`. The session only ever asks for one
//! thing: "tell me when one of these handles is readable", level-triggered,
//! one event per wait.

use crate::fd::FileDesc;
use std::io;
use std::os::unix::io::RawFd;

/// One readiness report from [`Poller::wait_one`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    /// The descriptor the event was registered for
    pub fd: RawFd,
    /// Raw epoll event bits
    pub events: u32,
}

impl Readiness {
    /// Returns true if the event carries a readable indication.
    pub fn is_readable(&self) -> bool {
        self.events & libc::EPOLLIN as u32 != 0
    }
}

/// An epoll instance owned through a [`FileDesc`].
#[derive(Debug)]
pub struct Poller {
    epoll_fd: FileDesc,
}

impl Poller {
    /// Creates an epoll instance sized for `capacity` watched handles.
    pub fn new(capacity: usize) -> io::Result<Self> {
        // SAFETY: plain syscall; the size hint only has to be positive.
        let fd = unsafe { libc::epoll_create(capacity.max(1) as libc::c_int) };
        let epoll_fd = FileDesc::new(fd);
        if !epoll_fd.is_valid() {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { epoll_fd })
    }

    /// Registers `fd` for readable interest.
    pub fn register_readable(&self, fd: &FileDesc) -> io::Result<()> {
        self.modify(libc::EPOLL_CTL_ADD, fd, libc::EPOLLIN as u32)
    }

    fn modify(&self, operation: libc::c_int, fd: &FileDesc, events: u32) -> io::Result<()> {
        let mut event = libc::epoll_event {
            events,
            u64: fd.raw() as u64,
        };

        // SAFETY: both descriptors are owned by live `FileDesc`s and `event` outlives the call.
        let res = unsafe { libc::epoll_ctl(self.epoll_fd.raw(), operation, fd.raw(), &mut event) };
        if res < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Blocks until exactly one event is available and returns it.
    ///
    /// There is no timeout. A wait interrupted by a signal is restarted.
    pub fn wait_one(&self) -> io::Result<Readiness> {
        let mut event = libc::epoll_event { events: 0, u64: 0 };

        loop {
            // SAFETY: `event` is a valid buffer for one epoll_event.
            let num = unsafe { libc::epoll_wait(self.epoll_fd.raw(), &mut event, 1, -1) };

            if num < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }

            if num == 0 {
                continue;
            }

            return Ok(Readiness {
                fd: event.u64 as RawFd,
                events: event.events,
            });
        }
    }
}
