//! Configuration
//!
//! [`EndpointConfig`] is the only configuration a session needs: where to
//! dial. [`ProxyConfig`] is what the `proxyrelay` binary parses from its
//! command line to run the accept loop.

use crate::parser::{ParserFactory, PassthroughFactory, RespInspectorFactory};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Errors produced while parsing configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} requires a value")]
    MissingValue(String),

    #[error("invalid endpoint {0:?}: expected <ipv4>:<port>")]
    InvalidEndpoint(String),

    #[error("invalid listen address {0:?}: expected <host>:<port>")]
    InvalidListenAddress(String),

    #[error("unknown parser {0:?}: expected passthrough or resp")]
    UnknownParser(String),

    #[error("unknown argument: {0}")]
    UnknownArgument(String),

    #[error("--upstream is required")]
    MissingUpstream,
}

/// Upstream address and port for a session. Fixed for the session's lifetime.
///
/// The address must already be resolved; no DNS lookup happens in the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointConfig {
    pub address: Ipv4Addr,
    pub port: u16,
}

impl EndpointConfig {
    pub fn new(address: Ipv4Addr, port: u16) -> Self {
        Self { address, port }
    }

    pub fn socket_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.address, self.port)
    }
}

impl From<SocketAddrV4> for EndpointConfig {
    fn from(addr: SocketAddrV4) -> Self {
        Self::new(*addr.ip(), addr.port())
    }
}

impl FromStr for EndpointConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<SocketAddrV4>()
            .map(Self::from)
            .map_err(|_| ConfigError::InvalidEndpoint(s.to_string()))
    }
}

impl fmt::Display for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Which parser plugin the binary installs for both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserKind {
    #[default]
    Passthrough,
    Resp,
}

impl ParserKind {
    /// Builds the factory for this kind.
    pub fn factory(&self) -> Arc<dyn ParserFactory> {
        match self {
            ParserKind::Passthrough => Arc::new(PassthroughFactory),
            ParserKind::Resp => Arc::new(RespInspectorFactory::default()),
        }
    }
}

impl FromStr for ParserKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "passthrough" => Ok(ParserKind::Passthrough),
            "resp" => Ok(ParserKind::Resp),
            _ => Err(ConfigError::UnknownParser(s.to_string())),
        }
    }
}

/// Default address the binary listens on
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";

/// Configuration for the `proxyrelay` binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Address to accept clients on
    pub listen: SocketAddr,
    /// Where every session dials
    pub upstream: EndpointConfig,
    /// Parser plugin for both directions
    pub parser: ParserKind,
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliAction {
    Run(ProxyConfig),
    Help,
    Version,
}

impl ProxyConfig {
    /// Parses command-line arguments (without the program name).
    pub fn from_args<I>(args: I) -> Result<CliAction, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut listen: Option<SocketAddr> = None;
        let mut upstream: Option<EndpointConfig> = None;
        let mut parser = ParserKind::default();

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--listen" | "-l" => {
                    let value = next_value(&mut args, &arg)?;
                    listen = Some(
                        value
                            .parse()
                            .map_err(|_| ConfigError::InvalidListenAddress(value))?,
                    );
                }
                "--upstream" | "-u" => {
                    upstream = Some(next_value(&mut args, &arg)?.parse()?);
                }
                "--parser" | "-p" => {
                    parser = next_value(&mut args, &arg)?.parse()?;
                }
                "--help" | "-h" => return Ok(CliAction::Help),
                "--version" | "-v" => return Ok(CliAction::Version),
                _ => return Err(ConfigError::UnknownArgument(arg)),
            }
        }

        let listen = match listen {
            Some(addr) => addr,
            None => DEFAULT_LISTEN
                .parse()
                .map_err(|_| ConfigError::InvalidListenAddress(DEFAULT_LISTEN.to_string()))?,
        };

        Ok(CliAction::Run(ProxyConfig {
            listen,
            upstream: upstream.ok_or(ConfigError::MissingUpstream)?,
            parser,
        }))
    }
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, ConfigError> {
    args.next()
        .ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
}
