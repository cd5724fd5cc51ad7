//! Escape-aware delimiter matching over raw JSON-like text.
//!
//! The scanners in this crate never build a parse tree. They walk the text
//! once, keeping a stack of open delimiters and two flags (inside a quoted
//! string, next character escaped), which is enough to locate matching
//! brackets and quotes without decoding any values.

/// One open delimiter on the scan stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delim {
    Brace,
    Bracket,
    Quote,
}

/// Transient scan state shared by [`find_matching_delimiter`] and the array
/// element scanner.
///
/// Transition rules, applied per character:
///
/// - `{` and `[` push themselves when not inside a string; `}` and `]` pop
///   only when the top of stack is the corresponding opener. A mismatched
///   closer is inert rather than an error.
/// - `"` toggles the string marker unless the previous character left a
///   pending escape.
/// - `\` sets the escape flag, or clears it when it is the second half of a
///   literal `\\`.
/// - Any other character clears a pending escape.
///
/// Bracket characters leave the escape flag untouched; the scan tolerates
/// malformed escape sequences instead of validating them.
#[derive(Debug, Default)]
pub(crate) struct DelimStack {
    stack: Vec<Delim>,
    in_string: bool,
    escaped: bool,
}

impl DelimStack {
    pub(crate) fn step(&mut self, ch: char) {
        match ch {
            '{' => {
                if !self.in_string {
                    self.stack.push(Delim::Brace);
                }
            }
            '}' => {
                if !self.in_string && self.stack.last() == Some(&Delim::Brace) {
                    self.stack.pop();
                }
            }
            '[' => {
                if !self.in_string {
                    self.stack.push(Delim::Bracket);
                }
            }
            ']' => {
                if !self.in_string && self.stack.last() == Some(&Delim::Bracket) {
                    self.stack.pop();
                }
            }
            '"' => {
                if self.escaped {
                    self.escaped = false;
                } else if self.stack.last() == Some(&Delim::Quote) {
                    self.stack.pop();
                    self.in_string = false;
                } else {
                    self.stack.push(Delim::Quote);
                    self.in_string = true;
                }
            }
            '\\' => {
                // A second backslash consumes the pending escape.
                self.escaped = !self.escaped;
            }
            _ => {
                if self.escaped {
                    self.escaped = false;
                }
            }
        }
    }

    /// No unterminated bracket or string is open.
    pub(crate) fn is_balanced(&self) -> bool {
        self.stack.is_empty()
    }
}

/// Finds the byte index of the close matching the opener at `open_index`.
///
/// `haystack[open_index]` is expected to sit on `{`, `[`, or `"`; the scan
/// honors nesting and string escaping (including doubled backslashes) and
/// returns the index of the balancing `}`, `]`, or `"`. Returns `None` when
/// the text ends before the opener is closed.
///
/// A start character that opens nothing leaves the stack balanced, so the
/// scan reports `open_index` itself.
///
/// # Panics
///
/// Panics if `open_index` is not a valid offset into `haystack`. Passing an
/// out-of-bounds index is a programming error, not a data error.
///
/// # Examples
///
/// ```
/// use keywire::find_matching_delimiter;
///
/// let text = r#"{ "foo": [true, false] }"#;
/// assert_eq!(find_matching_delimiter(text, 0), Some(23));
/// assert_eq!(find_matching_delimiter(text, 9), Some(21));
/// assert_eq!(find_matching_delimiter("{ unterminated", 0), None);
/// ```
#[must_use]
pub fn find_matching_delimiter(haystack: &str, open_index: usize) -> Option<usize> {
    assert!(
        open_index < haystack.len(),
        "find_matching_delimiter: open_index {open_index} out of bounds for text of length {}",
        haystack.len()
    );

    let mut scan = DelimStack::default();
    for (offset, ch) in haystack[open_index..].char_indices() {
        scan.step(ch);
        if scan.is_balanced() {
            return Some(open_index + offset);
        }
    }
    None
}
