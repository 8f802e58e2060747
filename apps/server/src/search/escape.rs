//! SQL text escaping for the remote search backend
//!
//! The remote SQL-over-HTTP service offers no bind parameters, so free-text
//! values (references, curie parts, WKT) are interpolated into the query
//! text. Every such value passes through [`sqlescape`] first; numeric and
//! enum-derived tokens are formatted directly and never take this path.

/// Escape a free-text value for inclusion inside a single-quoted SQL string
/// literal: single quotes are doubled; double quotes, backslashes, percent
/// signs and control characters are stripped; newline, carriage return, tab
/// and backspace become a single space.
pub(crate) fn sqlescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\'' => out.push_str("''"),
            '"' | '\\' | '%' => {}
            '\n' | '\r' | '\t' | '\u{8}' => out.push(' '),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}
