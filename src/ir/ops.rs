//! # IR Opcodes
//!
//! The primitive operations a rendered task is made of. The renderer only
//! ever produces these; codegen turns them into ESC/POS bytes.
//!
//! ```text
//! Task → render → Program (Vec<Op>) → codegen → bytes → transport
//! ```
//!
//! Each opcode is atomic: a transport either receives all of an op's bytes
//! or the job stops at that op.

use crate::escpos::text::Alignment;

/// A packed 1-bit image, MSB = leftmost dot, 1 = black.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    /// `ceil(width / 8) * height` bytes.
    pub data: Vec<u8>,
}

impl Bitmap {
    /// Bytes per packed row.
    #[inline]
    pub fn width_bytes(&self) -> usize {
        (self.width as usize).div_ceil(8)
    }

    /// Whether the dot at (x, y) is black.
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let idx = y as usize * self.width_bytes() + x as usize / 8;
        self.data[idx] & (0x80 >> (x % 8)) != 0
    }
}

/// IR opcodes - the renderer's output alphabet.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    // ========== Printer Control ==========
    /// Initialize printer (ESC @).
    Init,

    /// Select the character code table (ESC t n).
    SetCodepage(u8),

    // ========== Content ==========
    /// A text run without trailing newline.
    Text(String),

    /// Line feed.
    Newline,

    /// Print and feed `n` lines.
    Feed(u32),

    /// Feed past the cutter and partial cut.
    Cut,

    /// A monochrome raster image.
    Bitmap { align: Alignment, image: Bitmap },

    /// Bytes passed through untouched.
    Raw(Vec<u8>),
}

impl Op {
    /// Short opcode name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Op::Init => "init",
            Op::SetCodepage(_) => "set_codepage",
            Op::Text(_) => "text",
            Op::Newline => "newline",
            Op::Feed(_) => "feed",
            Op::Cut => "cut",
            Op::Bitmap { .. } => "bitmap",
            Op::Raw(_) => "raw",
        }
    }
}

/// An ordered sequence of ops.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub ops: Vec<Op>,
}

impl Program {
    /// Create an empty program.
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Job preamble: initialize, then select `codepage`.
    pub fn preamble(codepage: u8) -> Self {
        Self {
            ops: vec![Op::Init, Op::SetCodepage(codepage)],
        }
    }

    /// Add an op to the program.
    pub fn push(&mut self, op: Op) {
        self.ops.push(op);
    }

    /// Get the number of ops in the program.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check if the program is empty.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Iterate over ops.
    pub fn iter(&self) -> impl Iterator<Item = &Op> {
        self.ops.iter()
    }
}

impl FromIterator<Op> for Program {
    fn from_iter<T: IntoIterator<Item = Op>>(iter: T) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Program {
    type Item = Op;
    type IntoIter = std::vec::IntoIter<Op>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Op;
    type IntoIter = std::slice::Iter<'a, Op>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_new() {
        let program = Program::new();
        assert!(program.is_empty());
    }

    #[test]
    fn test_preamble() {
        let program = Program::preamble(73);
        assert_eq!(program.ops, vec![Op::Init, Op::SetCodepage(73)]);
    }

    #[test]
    fn test_program_push() {
        let mut program = Program::new();
        program.push(Op::Text("Hello".into()));
        program.push(Op::Newline);
        program.push(Op::Cut);
        assert_eq!(program.len(), 3);
        assert_eq!(program.iter().map(Op::name).collect::<Vec<_>>(), ["text", "newline", "cut"]);
    }

    #[test]
    fn test_bitmap_is_set() {
        let bitmap = Bitmap {
            width: 10,
            height: 1,
            data: vec![0b1000_0000, 0b0100_0000],
        };
        assert!(bitmap.is_set(0, 0));
        assert!(!bitmap.is_set(1, 0));
        assert!(bitmap.is_set(9, 0));
        assert!(!bitmap.is_set(10, 0));
    }
}
