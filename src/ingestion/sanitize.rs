//! Cell sanitization for raw exports.
//!
//! The administrative system occasionally emits quoted cells that contain hard line breaks.
//! Those breaks are replaced by a single space so that every record sits on one line.
//! Delimiters and quote characters are never added or removed, so cell boundaries are kept.
//! Leading/trailing whitespace of each cell is trimmed later by the tabular reader.
//!
//! Quoting follows the CSV reader: a `"` opens a quoted cell only as the first character of
//! a cell. A `"` anywhere else (`Mesura 5" de llarg`) is literal text.

use std::borrow::Cow;

/// Replace line breaks inside quoted cells with a single space.
///
/// `delimiter` is the cell separator the text will be read with. Whitespace around a break
/// collapses into that one space. If the text ends inside an open quote it cannot be
/// interpreted, and the original text is returned unchanged.
pub fn sanitize(text: &str, delimiter: u8) -> Cow<'_, str> {
    if !text.contains('"') {
        return Cow::Borrowed(text);
    }

    let delimiter = char::from(delimiter);
    let mut out = String::with_capacity(text.len());
    let mut in_quotes = false;
    let mut at_cell_start = true;
    let mut changed = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    out.push_str("\"\"");
                }
                '"' => {
                    in_quotes = false;
                    out.push(ch);
                }
                '\r' | '\n' => {
                    changed = true;
                    let kept = out.trim_end_matches([' ', '\t']).len();
                    out.truncate(kept);
                    while matches!(chars.peek(), Some('\r' | '\n' | ' ' | '\t')) {
                        chars.next();
                    }
                    out.push(' ');
                }
                _ => out.push(ch),
            }
            continue;
        }

        if ch == '"' && at_cell_start {
            in_quotes = true;
        }
        at_cell_start = ch == delimiter || ch == '\r' || ch == '\n';
        out.push(ch);
    }

    if in_quotes || !changed {
        return Cow::Borrowed(text);
    }
    Cow::Owned(out)
}
