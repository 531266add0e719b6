//! # Local Spooler Transport
//!
//! Prints through a named system print queue using the CUPS command line
//! tools. Bytes are buffered while the job runs and submitted as one raw
//! spool job (`lp -d NAME -o raw`) when the connection closes.
//!
//! | Operation | Command |
//! |-----------|---------|
//! | open | `lpstat -a NAME` (queue exists and accepts jobs) |
//! | status | `lpstat -p NAME` (enabled or disabled) |
//! | close | `lp -d NAME -o raw` with the job on stdin |
//! | enumerate | `lpstat -v`, then `lpoptions -p NAME` for the driver |

use std::io::Write;
use std::process::{Child, Command, Output, Stdio};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{ConnectionError, TransportError};
use crate::printer::PrinterStatus;

use super::{LocalSpec, Transport};

/// One installed print queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterInfo {
    pub name: String,
    /// Device URI, e.g. `usb://EPSON/TM-T20`.
    pub port: String,
    /// Make and model as reported by the spooler.
    pub driver: String,
}

/// A print queue with a pending job buffer.
#[derive(Debug)]
pub struct LocalTransport {
    name: String,
    buffer: Vec<u8>,
}

impl LocalTransport {
    /// Check that the queue exists and accepts jobs.
    #[instrument(skip_all, fields(printer = %spec.printer_name))]
    pub fn open(spec: &LocalSpec) -> Result<Self, ConnectionError> {
        let name = spec.printer_name.trim();
        if name.is_empty() {
            return Err(ConnectionError::InvalidConfig(
                "printer_name must not be empty".into(),
            ));
        }

        let output = run("lpstat", &["-a", name])
            .map_err(|e| ConnectionError::SpoolerUnavailable(format!("lpstat: {e}")))?;
        if !output.status.success() {
            return Err(ConnectionError::NotFound(name.to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if let Some(reason) = rejection_reason(&stdout) {
            return Err(ConnectionError::PermissionDenied {
                name: name.to_string(),
                reason,
            });
        }

        debug!("queue accepts jobs");
        Ok(Self {
            name: name.to_string(),
            buffer: Vec::new(),
        })
    }

    fn submit(&mut self) -> Result<(), TransportError> {
        let mut child = Command::new("lp")
            .args(["-d", &self.name, "-o", "raw"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| TransportError::Spooler(format!("cannot run lp: {e}")))?;

        feed_stdin(&mut child, &self.buffer)?;

        let output = child.wait_with_output().map_err(TransportError::Read)?;
        if !output.status.success() {
            return Err(TransportError::Spooler(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        info!(
            printer = %self.name,
            bytes = self.buffer.len(),
            job = %String::from_utf8_lossy(&output.stdout).trim(),
            "spool job submitted"
        );
        self.buffer.clear();
        Ok(())
    }
}

/// Write `bytes` to the child's stdin and close it. On failure the child is
/// killed and reaped before the error is returned.
fn feed_stdin(child: &mut Child, bytes: &[u8]) -> Result<(), TransportError> {
    let Some(mut stdin) = child.stdin.take() else {
        return Ok(());
    };
    if let Err(e) = stdin.write_all(bytes) {
        drop(stdin);
        if let Err(kill) = child.kill() {
            debug!(error = %kill, "spooler child already gone");
        }
        if let Err(wait) = child.wait() {
            warn!(error = %wait, "cannot reap spooler child");
        }
        return Err(TransportError::Write(e));
    }
    Ok(())
}

impl Transport for LocalTransport {
    fn describe(&self) -> String {
        format!("queue://{}", self.name)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    fn read_status(&mut self) -> Result<PrinterStatus, TransportError> {
        let output = run("lpstat", &["-p", &self.name])
            .map_err(|e| TransportError::Spooler(format!("cannot run lpstat: {e}")))?;
        if !output.status.success() {
            return Err(TransportError::Spooler(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(queue_status(&String::from_utf8_lossy(&output.stdout)))
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.submit()
    }
}

// ============================================================================
// ENUMERATION
// ============================================================================

/// List installed queues with their device URI and driver.
#[instrument]
pub fn list_printers() -> Result<Vec<PrinterInfo>, ConnectionError> {
    let output = run("lpstat", &["-v"])
        .map_err(|e| ConnectionError::SpoolerUnavailable(format!("lpstat: {e}")))?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        if stderr.contains("No destinations") {
            return Ok(Vec::new());
        }
        return Err(ConnectionError::SpoolerUnavailable(stderr.trim().to_string()));
    }

    let printers = parse_devices(&stdout)
        .into_iter()
        .map(|(name, port)| {
            let driver = driver_for(&name);
            PrinterInfo { name, port, driver }
        })
        .collect::<Vec<_>>();

    debug!(count = printers.len(), "printers enumerated");
    Ok(printers)
}

fn driver_for(name: &str) -> String {
    match run("lpoptions", &["-p", name]) {
        Ok(out) if out.status.success() => {
            parse_make_and_model(&String::from_utf8_lossy(&out.stdout)).unwrap_or_default()
        }
        Ok(out) => {
            warn!(printer = name, stderr = %String::from_utf8_lossy(&out.stderr).trim(), "lpoptions failed");
            String::new()
        }
        Err(e) => {
            warn!(printer = name, error = %e, "cannot run lpoptions");
            String::new()
        }
    }
}

fn run(program: &str, args: &[&str]) -> std::io::Result<Output> {
    Command::new(program)
        .args(args)
        .env("LC_ALL", "C")
        .stdin(Stdio::null())
        .output()
}

// ============================================================================
// OUTPUT PARSING
// ============================================================================

/// Parse `lpstat -v` lines of the form `device for NAME: URI`.
fn parse_devices(stdout: &str) -> Vec<(String, String)> {
    stdout
        .lines()
        .filter_map(|line| line.trim().strip_prefix("device for "))
        .filter_map(|rest| rest.split_once(':'))
        .map(|(name, uri)| (name.trim().to_string(), uri.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

/// Extract `printer-make-and-model` from `lpoptions -p` output.
fn parse_make_and_model(stdout: &str) -> Option<String> {
    const KEY: &str = "printer-make-and-model=";
    let start = stdout.find(KEY)? + KEY.len();
    let rest = &stdout[start..];

    let value = match rest.chars().next()? {
        quote @ ('\'' | '"') => {
            let inner = &rest[1..];
            &inner[..inner.find(quote).unwrap_or(inner.len())]
        }
        _ => rest.split_whitespace().next().unwrap_or(""),
    };
    Some(value.to_string())
}

/// `lpstat -a` reports "NAME not accepting requests since ...".
fn rejection_reason(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find(|line| line.contains("not accepting"))
        .map(|line| line.trim().to_string())
}

/// Map `lpstat -p` output to a status.
fn queue_status(stdout: &str) -> PrinterStatus {
    let line = stdout.lines().next().unwrap_or("").trim().to_string();
    if line.contains("disabled") {
        PrinterStatus::offline(line)
    } else {
        PrinterStatus::online(line)
    }
}
