//! Characters-per-line sweep.
//!
//! Each step prints a bracketed grid line exactly N characters wide. A line
//! that wraps onto a second row is wider than the printer's real line.

use crate::error::RenderError;
use crate::printer::Profile;
use crate::task::Task;

use super::{Calibration, SubJob, SweepRange};

const INSTRUCTIONS: &str = "Find the longest line that\n\
                            fits on ONE row with both\n\
                            brackets [ ] visible.\n\
                            Its number is printer_total_chars.";

const SEPARATOR: &str = "--------------------------------";

/// Sweeps `printer_total_chars`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCalibration;

impl Calibration for TextCalibration {
    fn name(&self) -> &'static str {
        "text_width"
    }

    fn default_range(&self) -> (i64, i64, i64) {
        (20, 60, 2)
    }

    fn bounds(&self) -> (i64, i64) {
        (10, 200)
    }

    fn header(&self, range: &SweepRange) -> Vec<Task> {
        vec![
            Task::centered("--- TEXT CALIBRATION ---"),
            Task::centered(format!(
                "Range: {}-{} chars",
                range.start(),
                range.end()
            )),
            Task::feed(1),
            Task::line(INSTRUCTIONS),
            Task::line(SEPARATOR),
        ]
    }

    fn iteration(&self, value: i64, base: &Profile) -> Result<SubJob, RenderError> {
        let width = usize::try_from(value)
            .map_err(|_| RenderError::EncodeError(format!("invalid line width {value}")))?;
        let profile = Profile {
            total_chars: width,
            paper_width_chars: width,
            ..base.clone()
        };

        Ok(SubJob {
            value,
            profile,
            tasks: vec![Task::line(grid_line(width)), Task::feed(1)],
        })
    }
}

/// `[<<< N >>>]`, `width` characters wide when the label fits.
///
/// ```
/// use posprinter::calibration::grid_line;
///
/// assert_eq!(grid_line(12), "[<<< 12 >>>]");
/// assert_eq!(grid_line(12).len(), 12);
/// assert_eq!(grid_line(4), "[ 4 ]");
/// ```
pub fn grid_line(width: usize) -> String {
    let label = format!(" {width} ");
    let available = width.saturating_sub(2 + label.len());
    let left = available / 2;
    let right = available - left;
    format!("[{}{label}{}]", "<".repeat(left), ">".repeat(right))
}
