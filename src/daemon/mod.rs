//! # Protocol Loop
//!
//! Reads one JSON request per line and writes exactly one JSON response per
//! request, in order, flushing after each.
//!
//! ## States
//!
//! ```text
//!               ┌──────────── blank line ─────────────┐
//!               ▼                                     │
//! AwaitingRequest ──line──► Processing ──► Responding ─┴──► Idle ──► AwaitingRequest
//!       │
//!       └── EOF ──► Shutdown
//! ```
//!
//! Requests never overlap: the next line is not read until the previous
//! response is flushed. Failures of any kind, panics included, become an
//! error response and the loop keeps going. Only a closed input ends it.
//!
//! ## Example
//!
//! ```
//! use posprinter::daemon::Daemon;
//! use posprinter::printer::Profile;
//!
//! let input = b"{\"action\":\"check_status\",\"connection\":{\"type\":\"null\"}}\n";
//! let mut output = Vec::new();
//! Daemon::new(Profile::default()).run(&input[..], &mut output)?;
//!
//! let line = String::from_utf8(output).unwrap();
//! assert!(line.starts_with("{\"status\":\"success\""));
//! assert_eq!(line.lines().count(), 1);
//! # Ok::<(), std::io::Error>(())
//! ```

pub mod dispatch;
pub mod request;
pub mod response;

pub use request::Request;
pub use response::{Response, ResponseStatus};

use std::any::Any;
use std::io::{self, BufRead, Write};
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, info, warn};

use crate::error::{ErrorKind, PosError};
use crate::printer::Profile;
use crate::telemetry;
use crate::transport::{Connector, SystemConnector};

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    AwaitingRequest,
    Processing,
    Responding,
    Shutdown,
}

/// The request loop and its per-process configuration.
pub struct Daemon<C: Connector = SystemConnector> {
    connector: C,
    defaults: Profile,
    state: LoopState,
}

impl Daemon<SystemConnector> {
    /// A daemon using the real transports.
    pub fn new(defaults: Profile) -> Self {
        Self::with_connector(SystemConnector::new(), defaults)
    }
}

impl<C: Connector> Daemon<C> {
    pub fn with_connector(connector: C, defaults: Profile) -> Self {
        Self {
            connector,
            defaults,
            state: LoopState::AwaitingRequest,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    fn transition(&mut self, next: LoopState) {
        debug!(from = ?self.state, to = ?next, "loop state");
        self.state = next;
    }

    /// Serve requests from `input` until it closes.
    ///
    /// Returns an error only when `output` cannot be written.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> io::Result<()> {
        let mut line = Vec::new();
        loop {
            self.transition(LoopState::AwaitingRequest);
            line.clear();

            match input.read_until(b'\n', &mut line) {
                Ok(0) => {
                    info!("control input closed, shutting down");
                    self.transition(LoopState::Shutdown);
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "control input unreadable, shutting down");
                    self.transition(LoopState::Shutdown);
                    return Ok(());
                }
            }

            self.transition(LoopState::Processing);
            let Some(response) = self.handle_line(&line) else {
                continue;
            };

            self.transition(LoopState::Responding);
            response.write_line(&mut output)?;
            self.transition(LoopState::Idle);
        }
    }

    /// Produce the response for one raw input line, or `None` for a blank one.
    pub fn handle_line(&self, line: &[u8]) -> Option<Response> {
        let text = match std::str::from_utf8(line) {
            Ok(text) => text.trim(),
            Err(e) => {
                warn!(error = %e, "request is not UTF-8");
                return Some(Response::error(
                    ErrorKind::InvalidJson,
                    format!("request is not valid UTF-8: {e}"),
                ));
            }
        };
        if text.is_empty() {
            return None;
        }

        let handled = panic::catch_unwind(AssertUnwindSafe(|| self.process(text)));
        Some(handled.unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            error!(%message, "request aborted by panic");
            Response::system(message, telemetry::take_panic_trace())
        }))
    }

    fn process(&self, text: &str) -> Response {
        match Request::parse(text) {
            Ok(request) => {
                info!(action = request.action(), "request received");
                dispatch::dispatch(&self.connector, &self.defaults, request)
            }
            Err(e) => {
                warn!(error = %e, "rejected request");
                Response::from_error(&PosError::from(e))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("internal error: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("internal error: {s}")
    } else {
        "internal error".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectionError;
    use crate::transport::{Connection, ConnectionSpec};

    struct Exploding;

    impl Connector for Exploding {
        fn connect(&self, _spec: &ConnectionSpec) -> Result<Connection, ConnectionError> {
            panic!("boom");
        }
    }

    #[test]
    fn test_blank_lines_produce_nothing() {
        let daemon = Daemon::new(Profile::default());
        assert!(daemon.handle_line(b"   \r\n").is_none());
    }

    #[test]
    fn test_non_utf8_is_invalid_json() {
        let daemon = Daemon::new(Profile::default());
        let response = daemon.handle_line(&[0xFF, 0xFE, b'\n']).unwrap();
        assert_eq!(response.error.as_deref(), Some("Invalid JSON"));
    }

    #[test]
    fn test_panic_becomes_system_error() {
        let mut daemon = Daemon::with_connector(Exploding, Profile::default());
        let input = b"{\"action\":\"check_status\",\"connection\":{\"type\":\"null\"}}\n\
                      {\"action\":\"nope\"}\n";
        let mut output = Vec::new();
        daemon.run(&input[..], &mut output).unwrap();

        let lines: Vec<Response> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].error.as_deref(), Some("System Error"));
        assert_eq!(lines[0].message.as_deref(), Some("internal error: boom"));
        assert_eq!(lines[1].error.as_deref(), Some("Unknown Action"));
        assert_eq!(daemon.state(), LoopState::Shutdown);
    }
}
