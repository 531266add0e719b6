//! # posprinter - ESC/POS Print Daemon
//!
//! A line-delimited JSON daemon that prints on ESC/POS receipt printers. It
//! provides:
//!
//! - **Task rendering**: text, tables, images, feeds, cuts and raw bytes
//!   lowered to a small IR and then to ESC/POS
//! - **Transports**: CUPS spool queues, raw TCP (port 9100), serial lines and
//!   an in-memory sink
//! - **Calibration**: image-width and characters-per-line sweeps
//! - **Protocol loop**: one response line per request line, diagnostics on
//!   stderr only
//!
//! ## Quick Start
//!
//! ```
//! use posprinter::{
//!     job,
//!     printer::Profile,
//!     task::Task,
//!     transport::{ConnectionSpec, SharedSink, SystemConnector},
//! };
//!
//! let sink = SharedSink::default();
//! let connector = SystemConnector::with_null_sink(sink.clone());
//!
//! let tasks = vec![Task::centered("RECEIPT"), Task::feed(2), Task::Cut];
//! let result = job::execute(&connector, &ConnectionSpec::Null, &Profile::default(), &tasks);
//!
//! assert!(result.is_success());
//! assert!(sink.lock().unwrap().starts_with(&[0x1B, 0x40]));
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`daemon`] | Request decoding, dispatch and response framing |
//! | [`job`] | Fail-fast task execution on one connection |
//! | [`calibration`] | Sweep drivers |
//! | [`task`] | Wire task types |
//! | [`render`] | Task to IR: wrapping, tables, image dithering |
//! | [`ir`] | Primitive ops and codegen |
//! | [`escpos`] | ESC/POS command builders and text encoding |
//! | [`transport`] | Connection descriptors and backends |
//! | [`printer`] | Formatting profile and status decoding |
//! | [`telemetry`] | stderr logging and panic capture |
//! | [`error`] | Error types |

pub mod calibration;
pub mod daemon;
pub mod error;
pub mod escpos;
pub mod ir;
pub mod job;
pub mod printer;
pub mod render;
pub mod task;
pub mod telemetry;
pub mod transport;

// Re-exports for convenience
pub use daemon::Daemon;
pub use error::PosError;
pub use printer::Profile;
pub use task::Task;
pub use transport::{ConnectionSpec, Connector, SystemConnector};
