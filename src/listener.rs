//! Accept Loop
//!
//! Accepts clients on a Tokio listener and gives each one its own blocking
//! [`ProxySession`](crate::session::ProxySession) on Tokio's blocking pool.
//! Sessions never share state beyond the [`RelayStats`] counters.

use crate::config::EndpointConfig;
use crate::fd::FileDesc;
use crate::parser::ParserFactory;
use crate::session::{handle_session, RelayStats};
use std::io;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, warn};

/// Accepts connections forever, one session per client.
///
/// Accept failures are logged and the loop continues.
pub async fn serve(
    listener: TcpListener,
    upstream: EndpointConfig,
    factory: Arc<dyn ParserFactory>,
    stats: Arc<RelayStats>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let client_fd = match into_blocking_fd(stream) {
                    Ok(fd) => fd,
                    Err(e) => {
                        warn!(client = %addr, error = %e, "Failed to hand off connection");
                        continue;
                    }
                };

                let factory = Arc::clone(&factory);
                let stats = Arc::clone(&stats);

                // Sessions block on epoll, so they run on the blocking pool.
                tokio::task::spawn_blocking(move || {
                    debug!(client = %addr, "Client connected");
                    handle_session(upstream, client_fd, factory.as_ref(), stats);
                    debug!(client = %addr, "Client session ended");
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Detaches an accepted stream from the Tokio reactor and switches it back
/// to blocking mode.
fn into_blocking_fd(stream: TcpStream) -> io::Result<FileDesc> {
    let stream = stream.into_std()?;
    stream.set_nonblocking(false)?;
    Ok(FileDesc::from(stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{PassthroughFactory, RespInspectorFactory};
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn echo_upstream() -> EndpointConfig {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = match listener.local_addr().unwrap() {
            SocketAddr::V4(addr) => EndpointConfig::from(addr),
            SocketAddr::V6(_) => unreachable!("bound to an IPv4 address"),
        };

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    loop {
                        match stream.read(&mut buf).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => {
                                if stream.write_all(&buf[..n]).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                });
            }
        });

        endpoint
    }

    async fn start_relay(factory: Arc<dyn ParserFactory>) -> (SocketAddr, Arc<RelayStats>) {
        let upstream = echo_upstream().await;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stats = Arc::new(RelayStats::new());

        tokio::spawn(serve(listener, upstream, factory, Arc::clone(&stats)));

        (addr, stats)
    }

    async fn read_exactly(client: &mut TcpStream, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        tokio::time::timeout(Duration::from_secs(5), client.read_exact(&mut buf))
            .await
            .expect("timed out waiting for relay")
            .unwrap();
        buf
    }

    async fn wait_until_idle(stats: &RelayStats) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while stats.active() > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_relays_through_echo_upstream() {
        let (addr, stats) = start_relay(Arc::new(PassthroughFactory)).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"PING\n").await.unwrap();
        assert_eq!(read_exactly(&mut client, 5).await, b"PING\n");

        drop(client);
        wait_until_idle(&stats).await;

        assert_eq!(stats.sessions_started.load(std::sync::atomic::Ordering::Relaxed), 1);
        assert_eq!(stats.active(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sessions_are_independent() {
        let (addr, stats) = start_relay(Arc::new(PassthroughFactory)).await;

        let mut first = TcpStream::connect(addr).await.unwrap();
        let mut second = TcpStream::connect(addr).await.unwrap();

        second.write_all(b"two").await.unwrap();
        first.write_all(b"one").await.unwrap();

        assert_eq!(read_exactly(&mut first, 3).await, b"one");
        assert_eq!(read_exactly(&mut second, 3).await, b"two");

        drop(first);
        drop(second);
        wait_until_idle(&stats).await;
        assert_eq!(stats.active(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_resp_inspector_drops_malformed_client() {
        let (addr, stats) = start_relay(Arc::new(RespInspectorFactory::default())).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
        assert_eq!(read_exactly(&mut client, 14).await, b"*1\r\n$4\r\nPING\r\n");

        client.write_all(b":oops\r\n").await.unwrap();

        let mut buf = [0u8; 16];
        let n = tokio::time::timeout(Duration::from_secs(5), client.read(&mut buf))
            .await
            .expect("relay did not close the connection")
            .unwrap_or(0);
        assert_eq!(n, 0);

        wait_until_idle(&stats).await;
        assert_eq!(
            stats.parser_failures.load(std::sync::atomic::Ordering::Relaxed),
            1
        );
    }
}
