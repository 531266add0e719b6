//! # Printer Module
//!
//! Printer-side parameters and state.
//!
//! ## Modules
//!
//! - [`profile`]: Formatting profile consumed by the renderer
//! - [`status`]: Real-time status decoding

pub mod profile;
pub mod status;

pub use profile::{Profile, ProfileSpec};
pub use status::{PrinterStatus, StatusState};
