//! # Printer Profile
//!
//! Formatting parameters consumed by the task renderer.
//!
//! ## Fields
//!
//! | Field | Wire name | Default | Allowed | Meaning |
//! |-------|-----------|---------|---------|---------|
//! | `total_chars` | `printer_total_chars` | 42 | 20..=100 | characters the head prints on one line |
//! | `paper_width_chars` | `paper_width_chars` | 42 | 10..=100 | characters visible on the paper |
//! | `image_width_px` | `image_width_px` | 384 | 100..=3000 | target bitmap width in dots |
//! | `encoding` | `encoding` | `cp1251` | any label | code page for text bytes |
//! | `codepage_id` | `codepage_id` | derived | 0..=255 | explicit `ESC t n` value |
//!
//! `paper_width_chars <= total_chars` is expected but not enforced; the
//! renderer clamps the wrap width instead.
//!
//! ## Usage
//!
//! ```
//! use posprinter::printer::{Profile, ProfileSpec};
//!
//! let defaults = Profile::default();
//! let spec: ProfileSpec = serde_json::from_str(r#"{"printer_total_chars": 48}"#).unwrap();
//! let profile = spec.resolve(&defaults).unwrap();
//! assert_eq!(profile.total_chars, 48);
//! assert_eq!(profile.paper_width_chars, 42);
//! ```

use std::fmt::Display;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::escpos::text::TextEncoder;

/// Default characters per line (58mm paper, font A).
pub const DEFAULT_TOTAL_CHARS: usize = 42;

/// Default printable characters per line.
pub const DEFAULT_PAPER_WIDTH_CHARS: usize = 42;

/// Default bitmap width in dots.
pub const DEFAULT_IMAGE_WIDTH_PX: u32 = 384;

/// Default text code page.
pub const DEFAULT_ENCODING: &str = "cp1251";

/// Accepted `printer_total_chars` values.
pub const TOTAL_CHARS_RANGE: RangeInclusive<usize> = 20..=100;

/// Accepted `paper_width_chars` values.
pub const PAPER_WIDTH_CHARS_RANGE: RangeInclusive<usize> = 10..=100;

/// Accepted `image_width_px` values.
pub const IMAGE_WIDTH_PX_RANGE: RangeInclusive<u32> = 100..=3000;

/// Immutable formatting parameters for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "printer_total_chars")]
    pub total_chars: usize,
    pub paper_width_chars: usize,
    pub image_width_px: u32,
    pub encoding: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codepage_id: Option<u8>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            total_chars: DEFAULT_TOTAL_CHARS,
            paper_width_chars: DEFAULT_PAPER_WIDTH_CHARS,
            image_width_px: DEFAULT_IMAGE_WIDTH_PX,
            encoding: DEFAULT_ENCODING.to_string(),
            codepage_id: None,
        }
    }
}

impl Profile {
    /// Check every dimension against its accepted range.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        check_range("printer_total_chars", self.total_chars, TOTAL_CHARS_RANGE)?;
        check_range(
            "paper_width_chars",
            self.paper_width_chars,
            PAPER_WIDTH_CHARS_RANGE,
        )?;
        check_range("image_width_px", self.image_width_px, IMAGE_WIDTH_PX_RANGE)
    }

    /// Width used for wrapping text, clamped to the printable line.
    #[inline]
    pub fn wrap_width(&self) -> usize {
        self.paper_width_chars.min(self.total_chars).max(1)
    }

    /// The `ESC t n` code page number for this profile.
    ///
    /// An explicit `codepage_id` wins; otherwise the encoding name is mapped:
    ///
    /// | Encoding | n |
    /// |----------|---|
    /// | cp866 / ibm866 | 17 |
    /// | cp1251 / windows-1251 | 73 |
    /// | anything else | 0 |
    pub fn codepage(&self) -> u8 {
        if let Some(id) = self.codepage_id {
            return id;
        }
        let normalized = self.encoding.to_lowercase().replace(['-', '_'], "");
        match normalized.as_str() {
            "cp866" | "ibm866" => 17,
            "win1251" | "cp1251" | "windows1251" => 73,
            _ => 0,
        }
    }

    /// Text encoder for this profile's code page.
    pub fn encoder(&self) -> TextEncoder {
        TextEncoder::for_label(&self.encoding)
    }
}

fn check_range<T: PartialOrd + Display>(
    field: &str,
    value: T,
    range: RangeInclusive<T>,
) -> Result<(), ProtocolError> {
    if range.contains(&value) {
        return Ok(());
    }
    Err(ProtocolError::Validation(format!(
        "profile.{field} must be between {} and {}, got {value}",
        range.start(),
        range.end()
    )))
}

/// A partially specified profile as it arrives on the wire.
///
/// Missing fields are taken from the daemon defaults by [`ProfileSpec::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileSpec {
    #[serde(default, alias = "total_chars")]
    pub printer_total_chars: Option<usize>,
    #[serde(default, alias = "paper_chars")]
    pub paper_width_chars: Option<usize>,
    #[serde(default, alias = "image_width")]
    pub image_width_px: Option<u32>,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub codepage_id: Option<u8>,
}

impl ProfileSpec {
    /// Overlay this spec on `defaults` and validate the result.
    pub fn resolve(&self, defaults: &Profile) -> Result<Profile, ProtocolError> {
        let profile = Profile {
            total_chars: self.printer_total_chars.unwrap_or(defaults.total_chars),
            paper_width_chars: self.paper_width_chars.unwrap_or(defaults.paper_width_chars),
            image_width_px: self.image_width_px.unwrap_or(defaults.image_width_px),
            encoding: self
                .encoding
                .clone()
                .unwrap_or_else(|| defaults.encoding.clone()),
            codepage_id: self.codepage_id.or(defaults.codepage_id),
        };
        profile.validate()?;
        Ok(profile)
    }
}

/// Resolve an optional wire profile against the defaults.
pub fn resolve_profile(
    spec: Option<&ProfileSpec>,
    defaults: &Profile,
) -> Result<Profile, ProtocolError> {
    match spec {
        Some(spec) => spec.resolve(defaults),
        None => {
            defaults.validate()?;
            Ok(defaults.clone())
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
