//! Short-lived TCP reachability checks.
use log::debug;
use std::{
    fmt,
    future::Future,
    io::ErrorKind,
    net::{IpAddr, SocketAddr},
    time::Duration,
};
use tokio::{io::AsyncReadExt, net::TcpStream, time};

/// Default budget for both the connect and the first read.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// How a single probe ended. Failures are data here, never errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Connected and the peer sent at least one byte.
    Responded { bytes: usize },
    /// Connected but nothing arrived before the timeout.
    NoBanner,
    /// Connection refused, timed out or without a route to the host.
    Unreachable,
    /// Any other transport failure.
    Error(String),
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Responded { bytes } => write!(f, "reachable, response received ({bytes} bytes)"),
            Self::NoBanner => write!(f, "reachable, no banner"),
            Self::Unreachable => write!(f, "unreachable"),
            Self::Error(cause) => write!(f, "error: {cause}"),
        }
    }
}

/// Something that can check whether `ip:port` answers.
pub trait Probe {
    fn probe(&self, ip: IpAddr, port: u16) -> impl Future<Output = ProbeOutcome> + Send;
}

impl<P: Probe> Probe for &P {
    fn probe(&self, ip: IpAddr, port: u16) -> impl Future<Output = ProbeOutcome> + Send {
        (**self).probe(ip, port)
    }
}

/// Direct TCP connect followed by a single read.
#[derive(Debug, Clone, Copy)]
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Performs the connection to the socket with timeout.
    async fn connect(&self, socket: SocketAddr) -> std::io::Result<TcpStream> {
        time::timeout(self.timeout, async move { TcpStream::connect(socket).await }).await?
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl Probe for TcpProbe {
    async fn probe(&self, ip: IpAddr, port: u16) -> ProbeOutcome {
        let socket = SocketAddr::new(ip, port);
        let mut stream = match self.connect(socket).await {
            Ok(stream) => stream,
            Err(e) if matches!(e.kind(), ErrorKind::ConnectionRefused
                        | ErrorKind::TimedOut
                        | ErrorKind::HostUnreachable
                        | ErrorKind::NetworkUnreachable) => {
                debug!("Probe {socket} unreachable: {e}");
                return ProbeOutcome::Unreachable;
            }
            Err(e) => {
                debug!("Probe {socket} failed: {e}");
                return ProbeOutcome::Error(e.to_string());
            }
        };

        let mut buf = [0u8; 1024];
        let outcome = match time::timeout(self.timeout, stream.read(&mut buf)).await {
            Ok(Ok(0)) | Err(_) => ProbeOutcome::NoBanner,
            Ok(Ok(bytes)) => ProbeOutcome::Responded { bytes },
            Ok(Err(e)) => ProbeOutcome::Error(e.to_string()),
        };
        debug!("Probe {socket}: {outcome}");
        outcome
    }
}
