//! # ESC/POS Text Commands
//!
//! Alignment control and code page encoding for text runs.
//!
//! ## Text Alignment
//!
//! ```text
//! Left aligned (default)    |LEFT TEXT
//! Center aligned            |  CENTER TEXT
//! Right aligned             |      RIGHT TEXT
//! ```
//!
//! Text tasks are padded with spaces by the renderer, so hardware alignment
//! is only used around raster images.
//!
//! ## Encoding
//!
//! Printers interpret bytes 0x80-0xFF through the code page selected with
//! `ESC t n`. [`TextEncoder`] converts UTF-8 strings to that single-byte
//! code page; characters the code page cannot represent become `?`.

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::commands::ESC;

// ============================================================================
// TEXT ALIGNMENT
// ============================================================================

/// Horizontal alignment for text lines and images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

/// # Select Justification (ESC a n)
///
/// ## Protocol Details
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC a n |
/// | Hex     | 1B 61 n |
///
/// ## Parameters
///
/// - `n = 0`: Left (default)
/// - `n = 1`: Center
/// - `n = 2`: Right
///
/// ## Behavior
///
/// - Only takes effect at the start of a line
/// - Reset by ESC @ (initialize)
///
/// ```
/// use posprinter::escpos::text::{align, Alignment};
///
/// assert_eq!(align(Alignment::Center), vec![0x1B, 0x61, 0x01]);
/// ```
#[inline]
pub fn align(alignment: Alignment) -> Vec<u8> {
    vec![ESC, b'a', alignment as u8]
}

// ============================================================================
// CODE PAGE ENCODING
// ============================================================================

/// Encodes text into the printer's single-byte code page.
#[derive(Debug, Clone, Copy)]
pub struct TextEncoder {
    /// `None` means plain ASCII.
    encoding: Option<&'static Encoding>,
}

impl TextEncoder {
    /// Plain 7-bit ASCII encoder.
    pub const fn ascii() -> Self {
        Self { encoding: None }
    }

    /// Look up an encoder by label (`cp1251`, `windows-1251`, `cp866`, ...).
    ///
    /// Unknown labels fall back to ASCII and log a warning.
    pub fn for_label(label: &str) -> Self {
        let trimmed = label.trim();
        if trimmed.eq_ignore_ascii_case("ascii") || trimmed.eq_ignore_ascii_case("us-ascii") {
            return Self::ascii();
        }
        match Encoding::for_label(trimmed.as_bytes()) {
            Some(encoding) => Self {
                encoding: Some(encoding),
            },
            None => {
                warn!(encoding = trimmed, "unknown text encoding, falling back to ASCII");
                Self::ascii()
            }
        }
    }

    /// Name of the underlying encoding.
    pub fn name(&self) -> &'static str {
        self.encoding.map_or("ascii", |e| e.name())
    }

    /// Encode `text`, substituting `?` for anything the code page lacks.
    ///
    /// ```
    /// use posprinter::escpos::text::TextEncoder;
    ///
    /// let enc = TextEncoder::for_label("cp1251");
    /// assert_eq!(enc.encode("Привет"), vec![0xCF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2]);
    /// assert_eq!(enc.encode("a★b"), b"a?b".to_vec());
    /// ```
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len());
        let mut buf = [0u8; 4];

        for ch in text.chars() {
            if ch.is_ascii() {
                out.push(ch as u8);
                continue;
            }
            let Some(encoding) = self.encoding else {
                out.push(b'?');
                continue;
            };
            // Per character: encoding_rs would otherwise emit HTML numeric
            // references for unmappable characters.
            let (bytes, _, had_errors) = encoding.encode(ch.encode_utf8(&mut buf));
            if had_errors {
                out.push(b'?');
            } else {
                out.extend_from_slice(&bytes);
            }
        }

        out
    }
}

impl Default for TextEncoder {
    fn default() -> Self {
        Self::ascii()
    }
}
