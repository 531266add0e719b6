//! # Network Transport
//!
//! Raw TCP printing, usually port 9100 ("JetDirect"). Bytes written to the
//! socket go straight to the printer's command parser, and real-time status
//! replies come back on the same socket.

use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info, instrument};

use crate::error::{ConnectionError, TransportError};
use crate::printer::PrinterStatus;

use super::{NetworkSpec, Transport, seconds};

/// Longest wait for a single status reply byte.
const STATUS_TIMEOUT: Duration = Duration::from_secs(2);

/// An open TCP connection to a printer.
#[derive(Debug)]
pub struct NetworkTransport {
    stream: TcpStream,
    addr: String,
}

impl NetworkTransport {
    /// Connect, trying every resolved address within the configured timeout.
    #[instrument(skip_all, fields(host = %spec.host, port = spec.port))]
    pub fn connect(spec: &NetworkSpec) -> Result<Self, ConnectionError> {
        let timeout = seconds(spec.timeout, "timeout")?;
        let addr = format!("{}:{}", spec.host, spec.port);

        let candidates: Vec<SocketAddr> = (spec.host.as_str(), spec.port)
            .to_socket_addrs()
            .map_err(|e| ConnectionError::Unresolvable {
                addr: addr.clone(),
                reason: e.to_string(),
            })?
            .collect();
        if candidates.is_empty() {
            return Err(ConnectionError::Unresolvable {
                addr,
                reason: "no addresses found".into(),
            });
        }

        let mut last_error = None;
        for candidate in &candidates {
            debug!(%candidate, "connecting");
            match TcpStream::connect_timeout(candidate, timeout) {
                Ok(stream) => {
                    stream.set_write_timeout(Some(timeout))?;
                    stream.set_read_timeout(Some(timeout.min(STATUS_TIMEOUT)))?;
                    stream.set_nodelay(true)?;
                    info!("connected");
                    return Ok(Self { stream, addr });
                }
                Err(e) => last_error = Some(e),
            }
        }

        let error = last_error.unwrap_or_else(|| io::Error::other("no address attempted"));
        Err(classify_connect_error(error, addr, timeout))
    }
}

fn classify_connect_error(error: io::Error, addr: String, timeout: Duration) -> ConnectionError {
    match error.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
            ConnectionError::Timeout { addr, timeout }
        }
        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset => {
            ConnectionError::ConnectionRefused { addr }
        }
        _ => ConnectionError::Io(error),
    }
}

impl Transport for NetworkTransport {
    fn describe(&self) -> String {
        format!("tcp://{}", self.addr)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.stream
            .write_all(bytes)
            .and_then(|_| self.stream.flush())
            .map_err(TransportError::Write)
    }

    fn read_status(&mut self) -> Result<PrinterStatus, TransportError> {
        PrinterStatus::query(&mut self.stream)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.stream.flush().map_err(TransportError::Write)?;
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(TransportError::Write(e)),
        }
    }
}
