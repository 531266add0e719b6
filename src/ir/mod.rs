//! # Intermediate Representation (IR)
//!
//! The IR sits between declarative print tasks and raw ESC/POS bytes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────┐     ┌───────────┐
//! │    Tasks    │ ──► │     IR      │ ──► │ Codegen  │ ──► │ Transport │
//! │(declarative)│     │  (Vec<Op>)  │     │ (bytes)  │     │           │
//! └─────────────┘     └─────────────┘     └──────────┘     └───────────┘
//! ```
//!
//! Rendering to ops instead of bytes keeps the renderer testable without a
//! printer and lets the executor stop between ops on failure.
//!
//! ## Example
//!
//! ```
//! use posprinter::escpos::TextEncoder;
//! use posprinter::ir::{Op, Program};
//!
//! let mut program = Program::preamble(0);
//! program.push(Op::Text("HELLO".into()));
//! program.push(Op::Newline);
//! program.push(Op::Cut);
//!
//! let bytes = program.to_bytes(&TextEncoder::ascii());
//! assert!(bytes.starts_with(&[0x1B, 0x40]));
//! ```

mod codegen;
mod ops;

pub use ops::*;
