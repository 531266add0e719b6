//! # Code Generation
//!
//! Converts IR ops to ESC/POS bytes.
//!
//! Ops are compiled one at a time so the job executor can stop between any
//! two of them; [`Program::to_bytes`] is the concatenation.

use super::ops::{Op, Program};
use crate::escpos::text::{self, Alignment, TextEncoder};
use crate::escpos::{commands, graphics};

impl Op {
    /// Compile a single op, encoding text with `encoder`.
    pub fn to_bytes(&self, encoder: &TextEncoder) -> Vec<u8> {
        match self {
            // ===== Printer Control =====
            Op::Init => commands::init(),
            Op::SetCodepage(n) => commands::select_codepage(*n),

            // ===== Content =====
            Op::Text(s) => {
                // A run that fills the whole line makes auto-wrapping
                // printers advance on their own, so the following LF would
                // feed a blank line. Padding is dropped for that reason.
                encoder.encode(s.trim_end_matches(' '))
            }
            Op::Newline => vec![commands::LF],
            Op::Feed(n) => commands::feed_lines(*n),
            Op::Cut => commands::feed_and_cut(),
            Op::Raw(bytes) => bytes.clone(),

            // ===== Graphics =====
            Op::Bitmap { align, image } => {
                let mut out = text::align(*align);
                out.extend(graphics::raster_chunked(
                    image.width as u16,
                    image.height as usize,
                    &image.data,
                ));
                out.extend(text::align(Alignment::Left));
                out
            }
        }
    }
}

impl Program {
    /// Compile the whole program.
    pub fn to_bytes(&self, encoder: &TextEncoder) -> Vec<u8> {
        let mut out = Vec::new();
        for op in &self.ops {
            out.extend(op.to_bytes(encoder));
        }
        out
    }
}
