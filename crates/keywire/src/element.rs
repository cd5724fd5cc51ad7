//! Locating top-level array element boundaries without parsing.

use core::ops::Range;

use crate::{delimiter::DelimStack, error::ScanError};

/// Finds the terminator for the array element beginning at `element_start`.
///
/// Scans forward with the same stack discipline as
/// [`find_matching_delimiter`](crate::find_matching_delimiter), but instead of
/// matching a single pair it looks for the separator that belongs to the
/// element at `element_start`: a comma or closing `]` at depth zero. The
/// returned index points at that terminator, so `haystack[element_start..end]`
/// is the element's raw text (possibly with surrounding whitespace).
///
/// Returns `None` when the element is malformed: a depth-zero `]` directly
/// preceded by `[` or `,` (an empty slot), or end of text reached without a
/// terminator. Nested commas and brackets never terminate the scan.
///
/// # Panics
///
/// Panics if `element_start` is not a valid offset into `haystack`.
///
/// # Examples
///
/// ```
/// use keywire::find_element_end;
///
/// assert_eq!(find_element_end("[1,2,3]", 1), Some(2));
/// assert_eq!(find_element_end("[true,false,null]", 12), Some(16));
/// assert_eq!(find_element_end("[true,false", 7), None);
/// ```
#[must_use]
pub fn find_element_end(haystack: &str, element_start: usize) -> Option<usize> {
    assert!(
        element_start < haystack.len(),
        "find_element_end: element_start {element_start} out of bounds for text of length {}",
        haystack.len()
    );

    let mut scan = DelimStack::default();
    for (offset, ch) in haystack[element_start..].char_indices() {
        let index = element_start + offset;
        // A balanced stack means depth zero outside any string, so commas and
        // the array's own closer terminate here and nowhere deeper.
        if scan.is_balanced() {
            match ch {
                ',' => return Some(index),
                ']' => {
                    let previous = haystack[..index].chars().next_back();
                    if matches!(previous, Some('[' | ',')) {
                        // Empty slot, e.g. "[]" or "[a,]".
                        return None;
                    }
                    return Some(index);
                }
                _ => {}
            }
        }
        scan.step(ch);
    }
    None
}

/// Splits a bracketed array string into the `[start, end)` byte ranges of its
/// top-level elements, in order.
///
/// Each range's slice, once trimmed, is exactly one element's raw text; the
/// element may itself be a nested object, array, string, or primitive literal
/// and is left unparsed. The scan is driven by [`find_element_end`], starting
/// after the opening `[` and resuming after each terminator.
///
/// An empty array `"[]"` is rejected: the first boundary scan lands on the
/// closing `]` right after `[`, which reads as an empty slot. Callers that
/// need to represent zero elements must special-case that input themselves.
///
/// # Errors
///
/// Returns [`ScanError::UnterminatedElement`] when any element has no
/// depth-zero terminator.
///
/// # Panics
///
/// Panics if `haystack` does not start with `[`.
///
/// # Examples
///
/// ```
/// use keywire::array_element_ranges;
///
/// let text = r#"["foo", ["foo","bar"], "baz"]"#;
/// let ranges = array_element_ranges(text).unwrap();
/// let elements: Vec<&str> = ranges.iter().map(|r| text[r.clone()].trim()).collect();
/// assert_eq!(elements, [r#""foo""#, r#"["foo","bar"]"#, r#""baz""#]);
/// ```
pub fn array_element_ranges(haystack: &str) -> Result<Vec<Range<usize>>, ScanError> {
    assert!(
        haystack.starts_with('['),
        "array_element_ranges: expected text starting with '[', got {:?}",
        haystack.get(0..1)
    );

    let mut ranges: Vec<Range<usize>> = Vec::new();
    loop {
        let start = match ranges.last() {
            None => 1,
            Some(previous) => previous.end + 1,
        };
        // The closing ']' occupies the final byte; once the next candidate
        // start reaches it, every element has been covered.
        if !ranges.is_empty() && start >= haystack.len() - 1 {
            return Ok(ranges);
        }
        // A body truncated right after '[' (or after a terminator) leaves no
        // text to scan; that is malformed data, not a caller error.
        if start >= haystack.len() {
            return Err(ScanError::UnterminatedElement(start));
        }
        let end =
            find_element_end(haystack, start).ok_or(ScanError::UnterminatedElement(start))?;
        ranges.push(start..end);
    }
}
