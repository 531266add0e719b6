//! # Print Tasks
//!
//! The declarative instructions a `print` request carries. Tasks are tagged
//! by `"type"` on the wire:
//!
//! ```json
//! [
//!   {"type": "text", "value": "SHOP", "align": "center"},
//!   {"type": "table", "data": [["Tea", "2.50"]], "columns_ratio": [0.7, 0.3]},
//!   {"type": "image", "data": "iVBORw0KGgo..."},
//!   {"type": "feed", "lines": 2},
//!   {"type": "cut"},
//!   {"type": "raw", "hex_data": "1B 40"}
//! ]
//! ```
//!
//! A task list is executed strictly in order.

use serde::{Deserialize, Serialize};

pub use crate::escpos::text::Alignment;

fn default_center() -> Alignment {
    Alignment::Center
}

fn default_true() -> bool {
    true
}

fn default_one() -> i64 {
    1
}

fn default_ratios() -> Vec<f64> {
    vec![0.7, 0.3]
}

/// One print instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Task {
    Text(TextTask),
    Table(TableTask),
    Image(ImageTask),
    Feed(FeedTask),
    Cut,
    Raw(RawTask),
}

impl Task {
    /// Wire tag of this task.
    pub fn kind(&self) -> &'static str {
        match self {
            Task::Text(_) => "text",
            Task::Table(_) => "table",
            Task::Image(_) => "image",
            Task::Feed(_) => "feed",
            Task::Cut => "cut",
            Task::Raw(_) => "raw",
        }
    }

    /// Left-aligned text without wrapping.
    pub fn line(value: impl Into<String>) -> Self {
        Task::Text(TextTask {
            value: value.into(),
            align: Alignment::Left,
            wrap: false,
        })
    }

    /// Centered, wrapped text.
    pub fn centered(value: impl Into<String>) -> Self {
        Task::Text(TextTask {
            value: value.into(),
            align: Alignment::Center,
            wrap: true,
        })
    }

    /// Feed `lines` lines.
    pub fn feed(lines: i64) -> Self {
        Task::Feed(FeedTask { lines })
    }
}

/// A block of text, split into paragraphs on `\n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextTask {
    pub value: String,
    #[serde(default = "default_center")]
    pub align: Alignment,
    /// Wrap paragraphs to the printable width.
    #[serde(default = "default_true")]
    pub wrap: bool,
}

/// Rows of cells laid out in proportional columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableTask {
    #[serde(rename = "data", alias = "rows")]
    pub rows: Vec<Vec<String>>,
    #[serde(
        rename = "columns_ratio",
        alias = "column_ratios",
        default = "default_ratios"
    )]
    pub column_ratios: Vec<f64>,
}

/// A base64 encoded image (PNG, JPEG, GIF, BMP...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageTask {
    pub data: String,
    #[serde(default = "default_center")]
    pub align: Alignment,
}

/// Blank lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedTask {
    /// Negative counts are treated as zero.
    #[serde(default = "default_one")]
    pub lines: i64,
}

/// Bytes given as hex, whitespace ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTask {
    #[serde(alias = "hex")]
    pub hex_data: String,
}
