//! # Task Renderer
//!
//! Pure translation of one [`Task`] plus a [`Profile`] into an IR
//! [`Program`]. Nothing here performs I/O.
//!
//! ## Modules
//!
//! - [`text`]: Paragraph wrapping and space-padded alignment
//! - [`table`]: Proportional column layout with ellipsis truncation
//! - [`image`]: Base64 decode, resize and dither
//! - [`dither`]: Bayer 8x8 ordered dithering
//!
//! ## Output per Task
//!
//! | Task | Ops |
//! |------|-----|
//! | text | `Text` + `Newline` per line |
//! | table | `Text` + `Newline` per row |
//! | image | one `Bitmap` |
//! | feed | `Feed(n)`, clamped to `0..=MAX_FEED_LINES` |
//! | cut | `Cut` |
//! | raw | `Raw(bytes)` |
//!
//! ## Usage Example
//!
//! ```
//! use posprinter::ir::Op;
//! use posprinter::printer::Profile;
//! use posprinter::render;
//! use posprinter::task::Task;
//!
//! let program = render::render(&Task::feed(-3), &Profile::default()).unwrap();
//! assert_eq!(program.ops, vec![Op::Feed(0)]);
//! ```

pub mod dither;
pub mod image;
pub mod table;
pub mod text;

use crate::error::RenderError;
use crate::ir::{Op, Program};
use crate::printer::Profile;
use crate::task::{RawTask, Task};

/// Most lines one feed task advances; larger counts are clamped.
pub const MAX_FEED_LINES: i64 = 255;

/// Render one task.
pub fn render(task: &Task, profile: &Profile) -> Result<Program, RenderError> {
    match task {
        Task::Text(t) => Ok(text::render(t, profile)),
        Task::Table(t) => table::render(t, profile),
        Task::Image(t) => image::render(t, profile),
        Task::Feed(t) => {
            let lines = t.lines.clamp(0, MAX_FEED_LINES) as u32;
            Ok(Program::from_iter([Op::Feed(lines)]))
        }
        Task::Cut => Ok(Program::from_iter([Op::Cut])),
        Task::Raw(t) => Ok(Program::from_iter([Op::Raw(decode_hex(t)?)])),
    }
}

fn decode_hex(task: &RawTask) -> Result<Vec<u8>, RenderError> {
    let compact: String = task
        .hex_data
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    hex::decode(&compact).map_err(|e| RenderError::InvalidHex(e.to_string()))
}
