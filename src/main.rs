//! proxyrelay - A Transparent TCP Relay
//!
//! This is the main entry point for the relay.
//! It parses the command line, binds the listener and hands every accepted
//! client to its own session.

use proxyrelay::config::{CliAction, ProxyConfig};
use proxyrelay::listener::serve;
use proxyrelay::session::RelayStats;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!(
        r#"
proxyrelay - A Transparent TCP Relay with Pluggable Parsers

USAGE:
    proxyrelay --upstream <IPV4:PORT> [OPTIONS]

OPTIONS:
    -u, --upstream <IPV4:PORT>   Server every client is relayed to (required)
    -l, --listen <HOST:PORT>     Address to accept clients on (default: 127.0.0.1:8080)
    -p, --parser <KIND>          passthrough or resp (default: passthrough)
    -v, --version                Print version information
    -h, --help                   Print this help message

EXAMPLES:
    proxyrelay -u 127.0.0.1:6379                   # Relay 127.0.0.1:8080 to a local Redis
    proxyrelay -u 10.0.0.5:6379 -p resp            # Also check RESP framing both ways
    proxyrelay -u 10.0.0.5:80 -l 0.0.0.0:8000      # Listen on all interfaces

LOGGING:
    Set RUST_LOG to change verbosity, e.g. RUST_LOG=proxyrelay=debug
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = match ProxyConfig::from_args(std::env::args().skip(1)) {
        Ok(CliAction::Run(config)) => config,
        Ok(CliAction::Help) => {
            print_help();
            return Ok(());
        }
        Ok(CliAction::Version) => {
            println!("proxyrelay version {}", proxyrelay::VERSION);
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let stats = Arc::new(RelayStats::new());

    // Bind the TCP listener
    let listener = TcpListener::bind(config.listen).await?;
    info!(
        listen = %config.listen,
        upstream = %config.upstream,
        parser = ?config.parser,
        "proxyrelay v{} ready",
        proxyrelay::VERSION
    );

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, stopping relay...");
    };

    // Main accept loop
    tokio::select! {
        _ = serve(listener, config.upstream, config.parser.factory(), Arc::clone(&stats)) => {}
        _ = shutdown => {}
    }

    info!(
        sessions = stats.sessions_started.load(Ordering::Relaxed),
        active = stats.active(),
        "Relay shutdown complete"
    );

    // Sessions still running hold blocking threads; don't wait for them.
    std::process::exit(0);
}
