//! # Error Types
//!
//! This module defines the error taxonomy used throughout the daemon.
//!
//! Each component reports its own error enum; [`PosError`] unifies them at the
//! job and protocol boundary, where they are collapsed into one structured
//! response line.
//!
//! | Error | Raised by | Effect |
//! |-------|-----------|--------|
//! | [`ProtocolError`] | request decoding | request rejected, loop continues |
//! | [`ConnectionError`] | connection resolver | job aborted, nothing sent |
//! | [`RenderError`] | task renderer | remaining tasks aborted |
//! | [`TransportError`] | open transport | job aborted, handle closed |
//! | [`RangeError`] | calibration bounds | rejected before any task runs |

use std::fmt;
use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error labels carried in responses and job results.
///
/// The serialized form is the exact `error` string a client sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "Invalid JSON")]
    InvalidJson,
    #[serde(rename = "Unknown Action")]
    UnknownAction,
    #[serde(rename = "Validation Error")]
    Validation,
    #[serde(rename = "Connection Error")]
    Connection,
    #[serde(rename = "Render Error")]
    Render,
    #[serde(rename = "Transport Error")]
    Transport,
    #[serde(rename = "Range Error")]
    Range,
    #[serde(rename = "Printer Error")]
    Printer,
    #[serde(rename = "System Error")]
    System,
}

impl ErrorKind {
    /// The label written into the response `error` field.
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::InvalidJson => "Invalid JSON",
            ErrorKind::UnknownAction => "Unknown Action",
            ErrorKind::Validation => "Validation Error",
            ErrorKind::Connection => "Connection Error",
            ErrorKind::Render => "Render Error",
            ErrorKind::Transport => "Transport Error",
            ErrorKind::Range => "Range Error",
            ErrorKind::Printer => "Printer Error",
            ErrorKind::System => "System Error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Malformed or unroutable requests.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("request is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("request has no 'action' field")]
    MissingAction,

    #[error("{0}")]
    Validation(String),
}

/// Failures while resolving a connection descriptor to a live transport.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("print queue '{0}' not found")]
    NotFound(String),

    #[error("print queue '{name}' is not reachable: {reason}")]
    PermissionDenied { name: String, reason: String },

    #[error("print spooler unavailable: {0}")]
    SpoolerUnavailable(String),

    #[error("connection to {addr} timed out after {timeout:?}")]
    Timeout { addr: String, timeout: Duration },

    #[error("connection to {addr} refused")]
    ConnectionRefused { addr: String },

    #[error("cannot resolve {addr}: {reason}")]
    Unresolvable { addr: String, reason: String },

    #[error("serial device {path} unavailable: {reason}")]
    DeviceUnavailable { path: String, reason: String },

    #[error("invalid connection settings: {0}")]
    InvalidConfig(String),

    #[error("I/O error while connecting: {0}")]
    Io(#[from] io::Error),
}

/// Bad task data. Raised by the pure renderer, never by a transport.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderError {
    #[error("table row {row} has {found} cells but {expected} column ratios were given")]
    ColumnMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid column ratios: {0}")]
    InvalidRatios(String),

    #[error("image payload could not be decoded: {0}")]
    DecodeError(String),

    #[error("image could not be encoded: {0}")]
    EncodeError(String),

    #[error("invalid hex data: {0}")]
    InvalidHex(String),
}

/// I/O failures on an already open transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    #[error("spooler rejected the job: {0}")]
    Spooler(String),

    #[error("connection already closed")]
    Closed,
}

/// Invalid calibration sweep bounds.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("step must not be zero")]
    ZeroStep,

    #[error("step {step} never reaches {end} from {start}")]
    WrongDirection { start: i64, end: i64, step: i64 },

    #[error("sweep values must lie in {min}..={max}, got {start}..{end}")]
    OutOfBounds {
        start: i64,
        end: i64,
        min: i64,
        max: i64,
    },
}

/// Top-level error collapsed into a response at the protocol boundary.
#[derive(Debug, Error)]
pub enum PosError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error("printer enumeration failed: {0}")]
    Spooler(String),
}

impl PosError {
    /// Response label for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PosError::Protocol(ProtocolError::InvalidJson(_)) => ErrorKind::InvalidJson,
            PosError::Protocol(ProtocolError::UnknownAction(_)) => ErrorKind::UnknownAction,
            PosError::Protocol(_) => ErrorKind::Validation,
            PosError::Connection(_) => ErrorKind::Connection,
            PosError::Render(_) => ErrorKind::Render,
            PosError::Transport(_) => ErrorKind::Transport,
            PosError::Range(_) => ErrorKind::Range,
            PosError::Spooler(_) => ErrorKind::Printer,
        }
    }
}

/// Render an error and its `source()` chain, one cause per line.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\ncaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
