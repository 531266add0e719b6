//! # Printer Transport Layer
//!
//! Resolves a declarative [`ConnectionSpec`] into a live [`Connection`].
//!
//! ## Available Transports
//!
//! | `type` | Backend | Status support |
//! |--------|---------|----------------|
//! | `local` (`windows`) | [`local`]: CUPS queue via `lp` | queue state |
//! | `network` | [`network`]: raw TCP, port 9100 | `DLE EOT` |
//! | `serial` | [`serial`]: TTY device (Unix) | `DLE EOT` |
//! | `null` (`dummy`) | [`null`]: in-memory sink | always online |
//!
//! ## Lifetime
//!
//! A connection is opened per request and closed before the next request is
//! read. [`Connection`] closes its transport when dropped, so early returns
//! and panics inside a job still release the device.
//!
//! ## Example
//!
//! ```
//! use posprinter::transport::{self, ConnectionSpec};
//!
//! let spec: ConnectionSpec = serde_json::from_str(r#"{"type": "dummy"}"#).unwrap();
//! let mut conn = transport::resolve(&spec).unwrap();
//! conn.write(&[0x1B, 0x40]).unwrap();
//! assert!(conn.read_status().unwrap().online);
//! conn.close().unwrap();
//! ```

pub mod local;
pub mod network;
pub mod null;
#[cfg(unix)]
pub mod serial;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConnectionError, TransportError};
use crate::printer::PrinterStatus;

pub use local::PrinterInfo;
pub use null::{NullTransport, SharedSink};

// ============================================================================
// CONNECTION DESCRIPTORS
// ============================================================================

/// Where a request's printer lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionSpec {
    #[serde(alias = "windows")]
    Local(LocalSpec),
    Network(NetworkSpec),
    Serial(SerialSpec),
    #[serde(alias = "dummy")]
    Null,
}

impl ConnectionSpec {
    /// Wire tag of this descriptor.
    pub fn kind(&self) -> &'static str {
        match self {
            ConnectionSpec::Local(_) => "local",
            ConnectionSpec::Network(_) => "network",
            ConnectionSpec::Serial(_) => "serial",
            ConnectionSpec::Null => "null",
        }
    }
}

/// A named system print queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSpec {
    #[serde(alias = "name")]
    pub printer_name: String,
}

fn default_network_port() -> u16 {
    9100
}

fn default_network_timeout() -> f64 {
    10.0
}

/// A raw TCP printer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub host: String,
    #[serde(default = "default_network_port")]
    pub port: u16,
    /// Connect and write deadline, in seconds.
    #[serde(default = "default_network_timeout")]
    pub timeout: f64,
}

fn default_baudrate() -> u32 {
    9600
}

fn default_bytesize() -> u8 {
    8
}

fn default_stopbits() -> u8 {
    1
}

fn default_serial_timeout() -> f64 {
    1.0
}

/// Serial parity setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Parity {
    #[default]
    #[serde(rename = "N")]
    None,
    #[serde(rename = "E")]
    Even,
    #[serde(rename = "O")]
    Odd,
}

/// A printer on a serial line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialSpec {
    /// Device path, e.g. `/dev/ttyUSB0`.
    pub port: String,
    #[serde(default = "default_baudrate")]
    pub baudrate: u32,
    #[serde(default = "default_bytesize")]
    pub bytesize: u8,
    #[serde(default)]
    pub parity: Parity,
    #[serde(default = "default_stopbits")]
    pub stopbits: u8,
    /// Read timeout for status replies, in seconds.
    #[serde(default = "default_serial_timeout")]
    pub timeout: f64,
}

/// Convert a seconds value from the wire into a positive [`Duration`].
pub(crate) fn seconds(value: f64, field: &str) -> Result<Duration, ConnectionError> {
    match Duration::try_from_secs_f64(value) {
        Ok(d) if !d.is_zero() => Ok(d),
        _ => Err(ConnectionError::InvalidConfig(format!(
            "{field} must be a positive number of seconds, got {value}"
        ))),
    }
}

// ============================================================================
// TRANSPORT TRAIT
// ============================================================================

/// Minimal capability set every backend provides.
pub trait Transport {
    /// Human-readable target, for logs.
    fn describe(&self) -> String;

    /// Send bytes, in order, all or nothing from the caller's point of view.
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Query the printer's current state.
    fn read_status(&mut self) -> Result<PrinterStatus, TransportError>;

    /// Flush and release the underlying handle.
    fn close(&mut self) -> Result<(), TransportError>;
}

/// An open transport, closed exactly once.
pub struct Connection {
    inner: Box<dyn Transport>,
    closed: bool,
}

impl Connection {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            inner: Box::new(transport),
            closed: false,
        }
    }

    pub fn describe(&self) -> String {
        self.inner.describe()
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.inner.write(bytes)
    }

    pub fn read_status(&mut self) -> Result<PrinterStatus, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.inner.read_status()
    }

    /// Close and report any error from the final flush.
    pub fn close(mut self) -> Result<(), TransportError> {
        self.closed = true;
        debug!(conn = %self.inner.describe(), "closing connection");
        self.inner.close()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.inner.close() {
                warn!(conn = %self.inner.describe(), error = %e, "close on drop failed");
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("target", &self.inner.describe())
            .field("closed", &self.closed)
            .finish()
    }
}

// ============================================================================
// CONNECTOR
// ============================================================================

/// Opens connections and enumerates printers.
///
/// The daemon is generic over this so tests can substitute recording
/// backends for real devices.
pub trait Connector {
    fn connect(&self, spec: &ConnectionSpec) -> Result<Connection, ConnectionError>;

    /// Installed print queues.
    fn printers(&self) -> Result<Vec<PrinterInfo>, ConnectionError> {
        local::list_printers()
    }
}

/// The real backends.
#[derive(Debug, Clone, Default)]
pub struct SystemConnector {
    null_sink: Option<SharedSink>,
}

impl SystemConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route every `null` connection into `sink`.
    pub fn with_null_sink(sink: SharedSink) -> Self {
        Self {
            null_sink: Some(sink),
        }
    }
}

impl Connector for SystemConnector {
    fn connect(&self, spec: &ConnectionSpec) -> Result<Connection, ConnectionError> {
        debug!(kind = spec.kind(), "resolving connection");
        match spec {
            ConnectionSpec::Local(local) => Ok(Connection::new(local::LocalTransport::open(local)?)),
            ConnectionSpec::Network(net) => {
                Ok(Connection::new(network::NetworkTransport::connect(net)?))
            }
            ConnectionSpec::Serial(serial) => open_serial(serial),
            ConnectionSpec::Null => {
                let transport = match &self.null_sink {
                    Some(sink) => NullTransport::with_sink(sink.clone()),
                    None => NullTransport::new(),
                };
                Ok(Connection::new(transport))
            }
        }
    }
}

#[cfg(unix)]
fn open_serial(spec: &SerialSpec) -> Result<Connection, ConnectionError> {
    Ok(Connection::new(serial::SerialTransport::open(spec)?))
}

#[cfg(not(unix))]
fn open_serial(spec: &SerialSpec) -> Result<Connection, ConnectionError> {
    Err(ConnectionError::DeviceUnavailable {
        path: spec.port.clone(),
        reason: "serial ports are only supported on Unix hosts".into(),
    })
}

/// Resolve `spec` with the system backends.
pub fn resolve(spec: &ConnectionSpec) -> Result<Connection, ConnectionError> {
    SystemConnector::new().connect(spec)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_spec_aliases() {
        let spec: ConnectionSpec =
            serde_json::from_str(r#"{"type": "windows", "printer_name": "POS-58"}"#).unwrap();
        assert_eq!(
            spec,
            ConnectionSpec::Local(LocalSpec {
                printer_name: "POS-58".into()
            })
        );

        let spec: ConnectionSpec = serde_json::from_str(r#"{"type": "dummy"}"#).unwrap();
        assert_eq!(spec, ConnectionSpec::Null);
    }

    #[test]
    fn test_network_defaults() {
        let spec: ConnectionSpec =
            serde_json::from_str(r#"{"type": "network", "host": "10.0.0.7"}"#).unwrap();
        let ConnectionSpec::Network(net) = spec else {
            panic!("expected network spec");
        };
        assert_eq!(net.port, 9100);
        assert_eq!(net.timeout, 10.0);
    }

    #[test]
    fn test_serial_defaults_and_parity() {
        let spec: SerialSpec =
            serde_json::from_str(r#"{"port": "/dev/ttyS0", "parity": "E"}"#).unwrap();
        assert_eq!(spec.baudrate, 9600);
        assert_eq!(spec.bytesize, 8);
        assert_eq!(spec.stopbits, 1);
        assert_eq!(spec.parity, Parity::Even);

        assert!(serde_json::from_str::<SerialSpec>(r#"{"port": "x", "parity": "Q"}"#).is_err());
    }

    #[test]
    fn test_seconds_validation() {
        assert_eq!(seconds(1.5, "timeout").unwrap(), Duration::from_millis(1500));
        assert!(seconds(0.0, "timeout").is_err());
        assert!(seconds(-1.0, "timeout").is_err());
        assert!(seconds(f64::NAN, "timeout").is_err());
    }

    #[test]
    fn test_null_always_resolves() {
        let mut conn = resolve(&ConnectionSpec::Null).unwrap();
        let status = conn.read_status().unwrap();
        assert!(status.ready && status.online);
        conn.close().unwrap();
    }

    struct CountingTransport {
        closes: Rc<RefCell<u32>>,
    }

    impl Transport for CountingTransport {
        fn describe(&self) -> String {
            "counting".into()
        }
        fn write(&mut self, _bytes: &[u8]) -> Result<(), TransportError> {
            Ok(())
        }
        fn read_status(&mut self) -> Result<PrinterStatus, TransportError> {
            Ok(PrinterStatus::online("test"))
        }
        fn close(&mut self) -> Result<(), TransportError> {
            *self.closes.borrow_mut() += 1;
            Ok(())
        }
    }

    #[test]
    fn test_connection_closes_once() {
        let closes = Rc::new(RefCell::new(0));
        let conn = Connection::new(CountingTransport {
            closes: closes.clone(),
        });
        conn.close().unwrap();
        assert_eq!(*closes.borrow(), 1);

        {
            let _conn = Connection::new(CountingTransport {
                closes: closes.clone(),
            });
        }
        assert_eq!(*closes.borrow(), 2);
    }
}
