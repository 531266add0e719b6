//! # Job Executor
//!
//! Runs a task list against one connection with fail-fast semantics.
//!
//! ## Algorithm
//!
//! ```text
//! connect ──✗──► error result, no outcomes, nothing sent
//!    │
//! preamble (ESC @, ESC t n)
//!    │
//! for each task, in order:
//!    render ──✗──► record failure, stop
//!    write every op ──✗──► record failure, stop
//!    record success
//!    │
//! close (always)
//! ```
//!
//! A failed task ends the job: later tasks are neither rendered nor sent,
//! so a bad task in the middle can never produce a cut before the content
//! that should precede it.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{ErrorKind, PosError, TransportError, error_chain};
use crate::escpos::TextEncoder;
use crate::ir::Program;
use crate::printer::Profile;
use crate::render;
use crate::task::Task;
use crate::transport::{Connection, ConnectionSpec, Connector};

/// Overall job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Error,
}

/// What happened to one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Printed { ops: usize, bytes: usize },
    Failed { error: ErrorKind, message: String },
}

/// Per-task entry in a [`JobResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub task_index: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Aggregated result of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub status: JobStatus,
    #[serde(rename = "per_task_outcomes")]
    pub outcomes: Vec<TaskOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Error source chain, for the diagnostic `traceback` field.
    #[serde(skip)]
    pub trace: Option<String>,
}

impl JobResult {
    pub fn succeeded(outcomes: Vec<TaskOutcome>) -> Self {
        Self {
            status: JobStatus::Success,
            outcomes,
            error_kind: None,
            message: None,
            trace: None,
        }
    }

    pub fn failed(outcomes: Vec<TaskOutcome>, err: &PosError) -> Self {
        Self {
            status: JobStatus::Error,
            outcomes,
            error_kind: Some(err.kind()),
            message: Some(err.to_string()),
            trace: Some(error_chain(err)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }
}

/// Resolve the connection, run `tasks`, close.
#[instrument(skip_all, fields(conn = spec.kind(), tasks = tasks.len()))]
pub fn execute<C: Connector + ?Sized>(
    connector: &C,
    spec: &ConnectionSpec,
    profile: &Profile,
    tasks: &[Task],
) -> JobResult {
    let mut conn = match connector.connect(spec) {
        Ok(conn) => conn,
        Err(e) => {
            warn!(error = %e, "connection failed, nothing sent");
            return JobResult::failed(Vec::new(), &PosError::from(e));
        }
    };
    debug!(target_printer = %conn.describe(), "connected");

    let result = match write_preamble(&mut conn, profile) {
        Ok(()) => run_tasks(&mut conn, profile, tasks),
        Err(e) => JobResult::failed(Vec::new(), &PosError::from(e)),
    };
    finish(conn, result)
}

/// Reset the printer and select the profile's code page.
pub fn write_preamble(conn: &mut Connection, profile: &Profile) -> Result<(), TransportError> {
    let preamble = Program::preamble(profile.codepage());
    conn.write(&preamble.to_bytes(&TextEncoder::ascii()))
}

/// Run `tasks` in order on an open connection, stopping at the first failure.
pub fn run_tasks(conn: &mut Connection, profile: &Profile, tasks: &[Task]) -> JobResult {
    let encoder = profile.encoder();
    let mut outcomes = Vec::with_capacity(tasks.len());

    for (index, task) in tasks.iter().enumerate() {
        match print_task(conn, &encoder, profile, task) {
            Ok((ops, bytes)) => {
                debug!(task_index = index, kind = task.kind(), ops, bytes, "task printed");
                outcomes.push(TaskOutcome {
                    task_index: index,
                    kind: task.kind().to_string(),
                    outcome: Outcome::Printed { ops, bytes },
                });
            }
            Err(err) => {
                warn!(task_index = index, kind = task.kind(), error = %err, "task failed, aborting job");
                outcomes.push(TaskOutcome {
                    task_index: index,
                    kind: task.kind().to_string(),
                    outcome: Outcome::Failed {
                        error: err.kind(),
                        message: err.to_string(),
                    },
                });
                return JobResult::failed(outcomes, &err);
            }
        }
    }

    JobResult::succeeded(outcomes)
}

fn print_task(
    conn: &mut Connection,
    encoder: &TextEncoder,
    profile: &Profile,
    task: &Task,
) -> Result<(usize, usize), PosError> {
    let program = render::render(task, profile)?;
    let mut bytes = 0;
    for op in &program {
        let encoded = op.to_bytes(encoder);
        conn.write(&encoded)?;
        bytes += encoded.len();
    }
    Ok((program.len(), bytes))
}

/// Close `conn`; a close failure turns a successful job into a transport error.
pub fn finish(conn: Connection, result: JobResult) -> JobResult {
    match conn.close() {
        Ok(()) => {
            if result.is_success() {
                info!(tasks = result.outcomes.len(), "job complete");
            }
            result
        }
        Err(e) if result.is_success() => {
            warn!(error = %e, "close failed after a successful job");
            JobResult::failed(result.outcomes, &PosError::from(e))
        }
        Err(e) => {
            warn!(error = %e, "close failed after an aborted job");
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectionError;
    use crate::printer::PrinterStatus;
    use crate::task::{RawTask, TextTask};
    use crate::transport::{SharedSink, SystemConnector, Transport};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;

    fn text(value: &str) -> Task {
        Task::Text(TextTask {
            value: value.into(),
            align: crate::escpos::Alignment::Left,
            wrap: true,
        })
    }

    fn raw(hex: &str) -> Task {
        Task::Raw(RawTask {
            hex_data: hex.into(),
        })
    }

    fn connector() -> (SystemConnector, SharedSink) {
        let sink = SharedSink::default();
        (SystemConnector::with_null_sink(sink.clone()), sink)
    }

    #[test]
    fn test_success_records_every_task() {
        let (connector, sink) = connector();
        let tasks = vec![text("hi"), Task::feed(2), Task::Cut];
        let result = execute(&connector, &ConnectionSpec::Null, &Profile::default(), &tasks);

        assert!(result.is_success());
        assert_eq!(
            result.outcomes.iter().map(|o| o.task_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        let bytes = sink.lock().unwrap().clone();
        assert!(bytes.starts_with(&[0x1B, 0x40, 0x1B, 0x74, 73, b'h', b'i', b'\n']));
        assert!(bytes.ends_with(&[0x1D, 0x56, 0x01]));
    }

    #[test]
    fn test_fail_fast_on_bad_hex() {
        let (connector, sink) = connector();
        let tasks = vec![text("before"), raw("zz"), Task::Cut];
        let result = execute(&connector, &ConnectionSpec::Null, &Profile::default(), &tasks);

        assert_eq!(result.status, JobStatus::Error);
        assert_eq!(result.error_kind, Some(ErrorKind::Render));
        assert_eq!(result.outcomes.len(), 2);
        assert!(matches!(result.outcomes[0].outcome, Outcome::Printed { .. }));
        assert!(matches!(
            result.outcomes[1].outcome,
            Outcome::Failed {
                error: ErrorKind::Render,
                ..
            }
        ));

        let bytes = sink.lock().unwrap().clone();
        assert!(!bytes.windows(2).any(|w| w == [0x1D, 0x56]));
    }

    struct Unreachable;

    impl Connector for Unreachable {
        fn connect(&self, spec: &ConnectionSpec) -> Result<Connection, ConnectionError> {
            Err(ConnectionError::NotFound(spec.kind().into()))
        }
    }

    #[test]
    fn test_connection_failure_has_no_outcomes() {
        let result = execute(
            &Unreachable,
            &ConnectionSpec::Null,
            &Profile::default(),
            &[Task::Cut],
        );
        assert_eq!(result.error_kind, Some(ErrorKind::Connection));
        assert!(result.outcomes.is_empty());
        assert!(result.trace.is_some());
    }

    /// Bytes accepted and close calls seen by a [`Flaky`] transport.
    #[derive(Default)]
    struct WireLog {
        written: Vec<u8>,
        closes: u32,
    }

    /// Accepts writes until one equals `fail_on`, then reports a broken pipe.
    struct Flaky {
        fail_on: Vec<u8>,
        log: Rc<RefCell<WireLog>>,
    }

    impl Transport for Flaky {
        fn describe(&self) -> String {
            "flaky".into()
        }

        fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
            if bytes == self.fail_on.as_slice() {
                return Err(TransportError::Write(io::Error::from(
                    io::ErrorKind::BrokenPipe,
                )));
            }
            self.log.borrow_mut().written.extend_from_slice(bytes);
            Ok(())
        }

        fn read_status(&mut self) -> Result<PrinterStatus, TransportError> {
            Ok(PrinterStatus::online("flaky"))
        }

        fn close(&mut self) -> Result<(), TransportError> {
            self.log.borrow_mut().closes += 1;
            Ok(())
        }
    }

    struct FlakyConnector {
        fail_on: Vec<u8>,
        log: Rc<RefCell<WireLog>>,
    }

    impl Connector for FlakyConnector {
        fn connect(&self, _spec: &ConnectionSpec) -> Result<Connection, ConnectionError> {
            Ok(Connection::new(Flaky {
                fail_on: self.fail_on.clone(),
                log: self.log.clone(),
            }))
        }
    }

    #[test]
    fn test_write_failure_stops_job() {
        let log = Rc::new(RefCell::new(WireLog::default()));
        let connector = FlakyConnector {
            fail_on: vec![0x1B, 0x70],
            log: log.clone(),
        };
        let tasks = vec![text("first"), raw("1b70"), text("never"), Task::Cut];
        let result = execute(&connector, &ConnectionSpec::Null, &Profile::default(), &tasks);

        assert_eq!(result.error_kind, Some(ErrorKind::Transport));
        assert_eq!(result.outcomes.len(), 2);
        assert!(matches!(result.outcomes[0].outcome, Outcome::Printed { .. }));
        assert!(matches!(
            result.outcomes[1].outcome,
            Outcome::Failed {
                error: ErrorKind::Transport,
                ..
            }
        ));

        let log = log.borrow();
        assert_eq!(log.closes, 1);
        assert!(log.written.windows(5).any(|w| w == b"first"));
        assert!(!log.written.windows(5).any(|w| w == b"never"));
        assert!(!log.written.windows(2).any(|w| w == [0x1D, 0x56]));
    }

    #[test]
    fn test_result_wire_format() {
        let result = JobResult::succeeded(vec![TaskOutcome {
            task_index: 0,
            kind: "cut".into(),
            outcome: Outcome::Printed { ops: 1, bytes: 6 },
        }]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "success",
                "per_task_outcomes": [
                    {"task_index": 0, "type": "cut", "outcome": "printed", "ops": 1, "bytes": 6}
                ]
            })
        );
    }
}
