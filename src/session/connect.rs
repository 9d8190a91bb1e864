//! Outbound dial to the upstream server.

use crate::config::EndpointConfig;
use crate::fd::FileDesc;
use crate::session::SessionError;
use std::io;
use tracing::info;

/// Opens a blocking TCP connection to `endpoint`.
///
/// The call blocks until the connect completes or fails; no timeout is
/// applied here.
pub fn connect(endpoint: &EndpointConfig) -> Result<FileDesc, SessionError> {
    // SAFETY: plain syscall; the result is checked through `FileDesc::is_valid`.
    let fd = FileDesc::new(unsafe {
        libc::socket(libc::AF_INET, libc::SOCK_STREAM | libc::SOCK_CLOEXEC, 0)
    });
    if !fd.is_valid() {
        return Err(SessionError::Socket(io::Error::last_os_error()));
    }

    // SAFETY: sockaddr_in is plain old data; all-zero is a valid starting value.
    let mut addr: libc::sockaddr_in = unsafe { std::mem::zeroed() };
    addr.sin_family = libc::AF_INET as libc::sa_family_t;
    addr.sin_port = endpoint.port.to_be();
    addr.sin_addr = libc::in_addr {
        s_addr: u32::from(endpoint.address).to_be(),
    };

    info!("Initiating connection to {}", endpoint);

    // SAFETY: `addr` is a fully initialised sockaddr_in and the length matches it.
    let res = unsafe {
        libc::connect(
            fd.raw(),
            &addr as *const libc::sockaddr_in as *const libc::sockaddr,
            std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        )
    };

    if res < 0 {
        return Err(SessionError::Connect {
            addr: *endpoint,
            source: io::Error::last_os_error(),
        });
    }

    info!("Connected to {}", endpoint);

    Ok(fd)
}
