//! # Table Layout
//!
//! Splits the line into proportional columns and renders one line per row.
//!
//! ```text
//! total = 20, ratios = [0.7, 0.3]
//! widths = [14, 6]
//! |Espresso         3.20|
//! |Croissant w/ jam…4.10|
//! ```
//!
//! All columns are left-justified except the last, which is right-justified.
//! There is no separator between columns beyond the padding.

use crate::error::RenderError;
use crate::ir::{Op, Program};
use crate::printer::Profile;
use crate::task::TableTask;

use super::text::byte_offset;

/// Render a table task.
pub fn render(task: &TableTask, profile: &Profile) -> Result<Program, RenderError> {
    let columns = task.column_ratios.len();
    if let Some((row, cells)) = task
        .rows
        .iter()
        .enumerate()
        .find(|(_, cells)| cells.len() != columns)
    {
        return Err(RenderError::ColumnMismatch {
            row,
            expected: columns,
            found: cells.len(),
        });
    }

    let widths = column_widths(&task.column_ratios, profile.total_chars)?;
    let last = columns - 1;

    let mut program = Program::new();
    for cells in &task.rows {
        let mut line = String::with_capacity(profile.total_chars);
        for (i, (cell, &width)) in cells.iter().zip(&widths).enumerate() {
            let fitted = fit_cell(cell, width);
            let pad = width - fitted.chars().count();
            if i == last {
                line.extend(std::iter::repeat_n(' ', pad));
                line.push_str(&fitted);
            } else {
                line.push_str(&fitted);
                line.extend(std::iter::repeat_n(' ', pad));
            }
        }
        program.push(Op::Text(line));
        program.push(Op::Newline);
    }

    Ok(program)
}

/// Column widths for `ratios`, summing to exactly `total`.
///
/// Every column but the last gets `round(ratio * total)`, clamped so the
/// running sum never exceeds `total`; the last column takes the remainder.
///
/// ```
/// use posprinter::render::table::column_widths;
///
/// assert_eq!(column_widths(&[0.7, 0.3], 42).unwrap(), vec![29, 13]);
/// assert_eq!(column_widths(&[0.5, 0.5, 0.5], 10).unwrap(), vec![5, 5, 0]);
/// ```
pub fn column_widths(ratios: &[f64], total: usize) -> Result<Vec<usize>, RenderError> {
    let Some((_, leading)) = ratios.split_last() else {
        return Err(RenderError::InvalidRatios(
            "at least one column ratio is required".into(),
        ));
    };
    if let Some(bad) = ratios.iter().find(|r| !r.is_finite() || **r < 0.0) {
        return Err(RenderError::InvalidRatios(format!(
            "ratio {bad} is not a non-negative number"
        )));
    }

    let mut widths = Vec::with_capacity(ratios.len());
    let mut used = 0;
    for ratio in leading {
        let width = ((ratio * total as f64).round() as usize).min(total - used);
        widths.push(width);
        used += width;
    }
    widths.push(total - used);
    Ok(widths)
}

/// Truncate `cell` to `width` characters.
///
/// Columns of width 4 or more end a truncated cell with `…`; narrower
/// columns are cut hard.
///
/// ```
/// use posprinter::render::table::fit_cell;
///
/// assert_eq!(fit_cell("Cappuccino", 6), "Cappu…");
/// assert_eq!(fit_cell("Cappuccino", 3), "Cap");
/// assert_eq!(fit_cell("Tea", 6), "Tea");
/// ```
pub fn fit_cell(cell: &str, width: usize) -> String {
    if cell.chars().count() <= width {
        return cell.to_string();
    }
    if width >= 4 {
        let mut out = cell[..byte_offset(cell, width - 1)].to_string();
        out.push('…');
        out
    } else {
        cell[..byte_offset(cell, width)].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn profile(total: usize) -> Profile {
        Profile {
            total_chars: total,
            ..Default::default()
        }
    }

    #[test]
    fn test_widths_sum_to_total() {
        let ratio_sets: [&[f64]; 5] = [
            &[0.7, 0.3],
            &[0.5, 0.5],
            &[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0],
            &[0.25, 0.25, 0.25, 0.25],
            &[0.15, 0.35, 0.2, 0.3],
        ];
        for ratios in ratio_sets {
            for total in 1..=80 {
                let widths = column_widths(ratios, total).unwrap();
                assert_eq!(widths.iter().sum::<usize>(), total, "{ratios:?} @ {total}");
            }
        }
    }

    #[test]
    fn test_invalid_ratios() {
        assert!(matches!(
            column_widths(&[], 10),
            Err(RenderError::InvalidRatios(_))
        ));
        assert!(matches!(
            column_widths(&[f64::NAN, 0.5], 10),
            Err(RenderError::InvalidRatios(_))
        ));
        assert!(matches!(
            column_widths(&[-0.2, 1.2], 10),
            Err(RenderError::InvalidRatios(_))
        ));
    }

    #[test]
    fn test_render_rows() {
        let task = TableTask {
            rows: vec![row(&["Espresso", "3.20"]), row(&["Croissant with jam", "4.10"])],
            column_ratios: vec![0.7, 0.3],
        };
        let program = render(&task, &profile(20)).unwrap();
        assert_eq!(
            program.ops,
            vec![
                Op::Text("Espresso        3.20".into()),
                Op::Newline,
                Op::Text("Croissant wit…  4.10".into()),
                Op::Newline,
            ]
        );
    }

    #[test]
    fn test_column_mismatch_reports_row() {
        let task = TableTask {
            rows: vec![row(&["a", "b"]), row(&["only one"])],
            column_ratios: vec![0.5, 0.5],
        };
        assert_eq!(
            render(&task, &profile(10)).unwrap_err(),
            RenderError::ColumnMismatch {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_every_line_is_total_wide() {
        let task = TableTask {
            rows: vec![row(&["x", "y", "z"]), row(&["long cell text", "", "9999999"])],
            column_ratios: vec![0.4, 0.3, 0.3],
        };
        let program = render(&task, &profile(17)).unwrap();
        for op in program.iter() {
            if let Op::Text(line) = op {
                assert_eq!(line.chars().count(), 17);
            }
        }
    }
}
