//! # ESC/POS Command Builders
//!
//! Pure byte builders for the ESC/POS printer language. Nothing here touches
//! a transport; callers concatenate the returned bytes and send them.
//!
//! ## Modules
//!
//! - [`commands`]: Initialization, code page, feed, cut, real-time status
//! - [`text`]: Alignment and code page text encoding
//! - [`graphics`]: `GS v 0` raster images
//!
//! ## Command Reference
//!
//! | Command | Bytes | Purpose |
//! |---------|-------|---------|
//! | ESC @ | 1B 40 | Initialize |
//! | ESC t n | 1B 74 n | Select code page |
//! | ESC a n | 1B 61 n | Justification |
//! | ESC d n | 1B 64 n | Print and feed n lines |
//! | GS V m | 1D 56 m | Cut |
//! | GS v 0 | 1D 76 30 | Raster image |
//! | DLE EOT n | 10 04 n | Real-time status |

pub mod commands;
pub mod graphics;
pub mod text;

pub use text::{Alignment, TextEncoder};
