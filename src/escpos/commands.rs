//! # ESC/POS Control Commands
//!
//! Byte builders for printer control: initialization, code page selection,
//! paper feed, cutting and real-time status requests.
//!
//! ## Escape Sequence Structure
//!
//! - Single byte: `LF`
//! - Two-byte prefix with parameter: `ESC d n`, `ESC t n`, `GS V m`
//! - Real-time commands: `DLE EOT n` (answered even while the buffer is busy)
//!
//! ## Byte Order
//!
//! Multi-byte integers are **little-endian**: `u16` 0x1234 is `[0x34, 0x12]`.

// ============================================================================
// ESCAPE SEQUENCE CONSTANTS
// ============================================================================

/// ESC (Escape) - command prefix byte
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - extended command prefix
pub const GS: u8 = 0x1D;

/// DLE (Data Link Escape) - real-time command prefix
pub const DLE: u8 = 0x10;

/// EOT (End Of Transmission) - used by `DLE EOT n` status requests
pub const EOT: u8 = 0x04;

/// LF (Line Feed) - print buffer and advance one line
pub const LF: u8 = 0x0A;

// ============================================================================
// INITIALIZATION
// ============================================================================

/// # Initialize Printer (ESC @)
///
/// Clears the print buffer and resets modes (alignment, size, emphasis) to
/// their power-on values. Sent once at the start of every job.
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC @ |
/// | Hex     | 1B 40 |
///
/// ```
/// use posprinter::escpos::commands;
///
/// assert_eq!(commands::init(), vec![0x1B, 0x40]);
/// ```
#[inline]
pub fn init() -> Vec<u8> {
    vec![ESC, b'@']
}

/// # Select Character Code Table (ESC t n)
///
/// Chooses the code page used to interpret bytes 0x80-0xFF.
///
/// | n | Table |
/// |---|-------|
/// | 0 | PC437 |
/// | 17 | PC866 (Cyrillic #2) |
/// | 73 | WPC1251 (Cyrillic) |
#[inline]
pub fn select_codepage(n: u8) -> Vec<u8> {
    vec![ESC, b't', n]
}

// ============================================================================
// PAPER FEED AND CUT
// ============================================================================

/// # Print and Feed n Lines (ESC d n)
///
/// Prints the buffer and feeds `n` lines. Larger counts are split into
/// several commands of at most 255 lines each.
///
/// ```
/// use posprinter::escpos::commands;
///
/// assert_eq!(commands::feed_lines(3), vec![0x1B, 0x64, 3]);
/// assert!(commands::feed_lines(0).is_empty());
/// assert_eq!(commands::feed_lines(300).len(), 6);
/// ```
pub fn feed_lines(n: u32) -> Vec<u8> {
    let mut out = Vec::new();
    let mut remaining = n;
    while remaining > 0 {
        let chunk = remaining.min(u8::MAX as u32);
        out.extend_from_slice(&[ESC, b'd', chunk as u8]);
        remaining -= chunk;
    }
    out
}

/// # Partial Cut (GS V 1)
///
/// Cuts the paper leaving a small hinge.
///
/// | Format  | Bytes    |
/// |---------|----------|
/// | ASCII   | GS V 1   |
/// | Hex     | 1D 56 01 |
#[inline]
pub fn cut_partial() -> Vec<u8> {
    vec![GS, b'V', 1]
}

/// Lines fed before a cut so the last printed line clears the cutter.
pub const CUT_FEED_LINES: usize = 3;

/// Feed past the cutter, then partial cut.
///
/// ```
/// use posprinter::escpos::commands;
///
/// assert_eq!(commands::feed_and_cut(), vec![0x0A, 0x0A, 0x0A, 0x1D, 0x56, 0x01]);
/// ```
pub fn feed_and_cut() -> Vec<u8> {
    let mut out = vec![LF; CUT_FEED_LINES];
    out.extend(cut_partial());
    out
}

// ============================================================================
// REAL-TIME STATUS
// ============================================================================

/// Real-time status request selector for `DLE EOT n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// n = 1: printer status (online/offline)
    Printer = 1,
    /// n = 4: paper roll sensor
    Paper = 4,
}

/// # Transmit Real-Time Status (DLE EOT n)
///
/// ```
/// use posprinter::escpos::commands::{status_request, StatusKind};
///
/// assert_eq!(status_request(StatusKind::Paper), vec![0x10, 0x04, 0x04]);
/// ```
#[inline]
pub fn status_request(kind: StatusKind) -> Vec<u8> {
    vec![DLE, EOT, kind as u8]
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Encode a u16 value as little-endian bytes [low, high]
///
/// ```
/// use posprinter::escpos::commands::u16_le;
///
/// assert_eq!(u16_le(0x1234), [0x34, 0x12]);
/// ```
#[inline]
pub fn u16_le(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}
