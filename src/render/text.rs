//! # Text Layout
//!
//! Paragraph wrapping and space-padded alignment.
//!
//! ## Alignment
//!
//! Lines are padded with spaces to exactly `total_chars`:
//!
//! ```text
//! total = 11, line = "abcd"
//! left    |abcd       |
//! center  |   abcd    |   left = floor((11 - 4) / 2) = 3
//! right   |       abcd|
//! ```
//!
//! Lines already `total_chars` wide or wider are left untouched.

use crate::escpos::text::Alignment;
use crate::ir::{Op, Program};
use crate::printer::Profile;
use crate::task::TextTask;

/// Render a text task into one `Text` + `Newline` pair per output line.
pub fn render(task: &TextTask, profile: &Profile) -> Program {
    let mut program = Program::new();
    let width = profile.wrap_width();

    for paragraph in task.value.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        let lines = if task.wrap {
            wrap(paragraph, width)
        } else if paragraph.is_empty() {
            Vec::new()
        } else {
            vec![paragraph.to_string()]
        };

        if lines.is_empty() {
            program.push(Op::Newline);
            continue;
        }

        for line in lines {
            program.push(Op::Text(align_line(&line, task.align, profile.total_chars)));
            program.push(Op::Newline);
        }
    }

    program
}

/// Greedy word wrap. Words longer than `width` are split across lines.
///
/// ```
/// use posprinter::render::text::wrap;
///
/// assert_eq!(wrap("the quick brown fox", 10), vec!["the quick", "brown fox"]);
/// assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
/// assert!(wrap("   ", 10).is_empty());
/// ```
pub fn wrap(paragraph: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in paragraph.split_whitespace() {
        let mut rest = word;
        while !rest.is_empty() {
            let rest_len = rest.chars().count();

            if current_len == 0 {
                if rest_len <= width {
                    current.push_str(rest);
                    current_len = rest_len;
                    break;
                }
                let split = byte_offset(rest, width);
                lines.push(rest[..split].to_string());
                rest = &rest[split..];
                continue;
            }

            if current_len + 1 + rest_len <= width {
                current.push(' ');
                current.push_str(rest);
                current_len += 1 + rest_len;
                break;
            }

            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
    }

    if current_len > 0 {
        lines.push(current);
    }
    lines
}

/// Pad `line` with spaces to `total` characters.
///
/// ```
/// use posprinter::escpos::Alignment;
/// use posprinter::render::text::align_line;
///
/// assert_eq!(align_line("ab", Alignment::Center, 7), "  ab   ");
/// assert_eq!(align_line("ab", Alignment::Right, 5), "   ab");
/// ```
pub fn align_line(line: &str, align: Alignment, total: usize) -> String {
    let len = line.chars().count();
    if len >= total {
        return line.to_string();
    }
    let pad = total - len;
    let left = match align {
        Alignment::Left => 0,
        Alignment::Center => pad / 2,
        Alignment::Right => pad,
    };
    let right = pad - left;

    let mut out = String::with_capacity(line.len() + pad);
    out.extend(std::iter::repeat_n(' ', left));
    out.push_str(line);
    out.extend(std::iter::repeat_n(' ', right));
    out
}

/// Byte offset of the `n`th character, or the string length.
pub(crate) fn byte_offset(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(i, _)| i)
}
