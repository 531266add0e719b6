//! # Null Transport
//!
//! Records every written byte in memory and always reports the printer as
//! online. Used for dry runs and tests.

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::TransportError;
use crate::printer::PrinterStatus;

use super::Transport;

/// Byte buffer shared between a null transport and its observer.
pub type SharedSink = Arc<Mutex<Vec<u8>>>;

/// In-memory sink transport.
#[derive(Debug, Default)]
pub struct NullTransport {
    sink: SharedSink,
}

impl NullTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write into an existing sink.
    pub fn with_sink(sink: SharedSink) -> Self {
        Self { sink }
    }

    /// Handle to the recorded bytes.
    pub fn sink(&self) -> SharedSink {
        self.sink.clone()
    }
}

impl Transport for NullTransport {
    fn describe(&self) -> String {
        "null".into()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(bytes);
        Ok(())
    }

    fn read_status(&mut self) -> Result<PrinterStatus, TransportError> {
        Ok(PrinterStatus::online("Null transport"))
    }

    fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}
