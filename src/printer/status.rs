//! # Printer Status
//!
//! Decodes ESC/POS real-time status replies into a [`PrinterStatus`].
//!
//! ## Status Bytes
//!
//! | Request | Reply bit | Meaning |
//! |---------|-----------|---------|
//! | `DLE EOT 1` | bit 3 | printer offline |
//! | `DLE EOT 4` | bits 5-6 | paper end detected |
//!
//! A printer that never answers is reported as ready with a warning: many
//! cheap units ignore real-time status requests entirely.

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TransportError;
use crate::escpos::commands::{self, StatusKind};

/// Coarse printer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Online,
    Offline,
    Error,
}

/// Result of a `check_status` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterStatus {
    pub state: StatusState,
    pub ready: bool,
    pub online: bool,
    pub paper_out: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub warning: bool,
}

impl PrinterStatus {
    /// A printer known to be online with paper loaded.
    pub fn online(details: impl Into<String>) -> Self {
        Self {
            state: StatusState::Online,
            ready: true,
            online: true,
            paper_out: false,
            error: None,
            details: Some(details.into()),
            warning: false,
        }
    }

    /// A printer that is reachable but disabled or paused.
    pub fn offline(details: impl Into<String>) -> Self {
        Self {
            state: StatusState::Offline,
            ready: false,
            online: false,
            paper_out: false,
            error: None,
            details: Some(details.into()),
            warning: false,
        }
    }

    /// The printer accepted the request but never replied.
    pub fn assumed_online() -> Self {
        Self {
            state: StatusState::Online,
            ready: true,
            online: true,
            paper_out: false,
            error: None,
            details: Some("No response (Assuming Online)".into()),
            warning: true,
        }
    }

    /// The status exchange itself failed.
    pub fn io_error(details: impl Into<String>) -> Self {
        Self {
            state: StatusState::Error,
            ready: false,
            online: false,
            paper_out: false,
            error: Some("IO Error".into()),
            details: Some(details.into()),
            warning: false,
        }
    }

    /// Decode the `DLE EOT 1` printer byte and optional `DLE EOT 4` paper byte.
    pub fn from_status_bytes(printer: u8, paper: Option<u8>) -> Self {
        let offline = printer & 0b0000_1000 != 0;
        let paper_out = paper.is_some_and(|p| p & 0b0110_0000 != 0);
        Self {
            state: if offline {
                StatusState::Offline
            } else {
                StatusState::Online
            },
            ready: !offline && !paper_out,
            online: !offline,
            paper_out,
            error: None,
            details: None,
            warning: false,
        }
    }

    /// Run the real-time status exchange over a bidirectional stream.
    ///
    /// The stream's read timeout bounds how long each reply is awaited; a
    /// timeout or empty read counts as "no reply".
    pub fn query<S: Read + Write>(stream: &mut S) -> Result<Self, TransportError> {
        let Some(printer) = request_byte(stream, StatusKind::Printer)? else {
            debug!("printer did not answer DLE EOT 1");
            return Ok(Self::assumed_online());
        };
        let paper = request_byte(stream, StatusKind::Paper)?;
        debug!(printer, ?paper, "status bytes received");
        Ok(Self::from_status_bytes(printer, paper))
    }
}

fn request_byte<S: Read + Write>(
    stream: &mut S,
    kind: StatusKind,
) -> Result<Option<u8>, TransportError> {
    stream
        .write_all(&commands::status_request(kind))
        .and_then(|_| stream.flush())
        .map_err(TransportError::Write)?;

    let mut byte = [0u8; 1];
    match stream.read(&mut byte) {
        Ok(0) => Ok(None),
        Ok(_) => Ok(Some(byte[0])),
        Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
            Ok(None)
        }
        Err(e) => Err(TransportError::Read(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Scripted stream: reads come from `replies`, writes are recorded.
    struct Scripted {
        replies: Cursor<Vec<u8>>,
        written: Vec<u8>,
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.replies.read(&mut buf[..1])
        }
    }

    impl Write for Scripted {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_offline_bit() {
        let status = PrinterStatus::from_status_bytes(0b0001_1010, Some(0x12));
        assert_eq!(status.state, StatusState::Offline);
        assert!(!status.online);
        assert!(!status.ready);
        assert!(!status.paper_out);
    }

    #[test]
    fn test_paper_out_bits() {
        let status = PrinterStatus::from_status_bytes(0x12, Some(0x72));
        assert!(status.online);
        assert!(status.paper_out);
        assert!(!status.ready);
    }

    #[test]
    fn test_query_reads_both_bytes() {
        let mut stream = Scripted {
            replies: Cursor::new(vec![0x12, 0x12]),
            written: Vec::new(),
        };
        let status = PrinterStatus::query(&mut stream).unwrap();
        assert!(status.ready);
        assert_eq!(stream.written, vec![0x10, 0x04, 0x01, 0x10, 0x04, 0x04]);
    }

    #[test]
    fn test_query_without_reply_assumes_online() {
        let mut stream = Scripted {
            replies: Cursor::new(Vec::new()),
            written: Vec::new(),
        };
        let status = PrinterStatus::query(&mut stream).unwrap();
        assert!(status.warning);
        assert!(status.ready);
        assert_eq!(stream.written.len(), 3);
    }
}
