//! Lexical extraction of segments, data elements, and group data elements.
//!
//! The wire form is self-delimiting: `'` ends a segment, `+` separates data
//! elements, `:` separates group data elements, `?` escapes the following
//! byte, and `@<n>@` introduces a run of exactly `n` raw bytes that are not
//! subject to escaping. Extraction keeps escape sequences and binary
//! prefixes intact; unescaping happens in the typed element codecs.

use crate::error::{Error, Result};
use crate::token::{BINARY_MARKER, ELEMENT_SEPARATOR, ESCAPE, GROUP_SEPARATOR, SEGMENT_END};

fn framing(offset: usize, reason: impl Into<String>) -> Error {
    Error::MalformedFraming {
        offset,
        reason: reason.into(),
    }
}

/// Scans one binary run starting at `pos` (which must point at `@`).
/// Returns the position just past the run.
fn skip_binary_run(input: &[u8], pos: usize) -> Result<usize> {
    let mut i = pos + 1;
    let len_start = i;
    while i < input.len() && input[i].is_ascii_digit() {
        i += 1;
    }
    if i == len_start {
        return Err(framing(pos, "binary marker not followed by a length"));
    }
    if i >= input.len() || input[i] != BINARY_MARKER {
        return Err(framing(pos, "unterminated binary length"));
    }
    // The length digits are ASCII; parse cannot fail.
    let len: usize = std::str::from_utf8(&input[len_start..i])
        .expect("ascii digits")
        .parse()
        .map_err(|_| framing(pos, "binary length out of range"))?;
    let data_start = i + 1;
    if data_start + len > input.len() {
        return Err(framing(pos, format!("binary run of {len} bytes exceeds input")));
    }
    Ok(data_start + len)
}

/// Splits a full message into its segments.
///
/// Each returned slice covers one segment without its terminating `'`.
pub fn split_segments(input: &[u8]) -> Result<Vec<&[u8]>> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut i = 0;
    let mut at_element_start = true;
    while i < input.len() {
        match input[i] {
            SEGMENT_END => {
                segments.push(&input[start..i]);
                i += 1;
                start = i;
                at_element_start = true;
            }
            ESCAPE => {
                if i + 1 >= input.len() {
                    return Err(framing(i, "escape character at end of input"));
                }
                i += 2;
                at_element_start = false;
            }
            BINARY_MARKER if at_element_start => {
                i = skip_binary_run(input, i)?;
                at_element_start = false;
            }
            ELEMENT_SEPARATOR | GROUP_SEPARATOR => {
                i += 1;
                at_element_start = true;
            }
            _ => {
                i += 1;
                at_element_start = false;
            }
        }
    }
    if start != input.len() {
        return Err(framing(start, "unterminated segment"));
    }
    Ok(segments)
}

/// Splits one segment (without its `'`) into raw data-element byte strings.
///
/// Group separators, escapes, and binary prefixes are preserved inside each
/// element. Trailing empty elements are dropped, mirroring the wire rule
/// that trailing optional fields are omitted.
pub fn extract_elements(segment: &[u8]) -> Result<Vec<Vec<u8>>> {
    let segment = segment.strip_suffix(&[SEGMENT_END]).unwrap_or(segment);
    let mut parts = split_on(segment, ELEMENT_SEPARATOR)?;
    while parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }
    Ok(parts)
}

/// Splits one raw data element into its group data elements.
///
/// An element without group separators yields a single part.
pub fn extract_group_elements(element: &[u8]) -> Result<Vec<Vec<u8>>> {
    split_on(element, GROUP_SEPARATOR)
}

/// Splits on an unescaped separator, skipping binary runs.
fn split_on(input: &[u8], separator: u8) -> Result<Vec<Vec<u8>>> {
    let mut parts = Vec::new();
    let mut current = Vec::new();
    let mut i = 0;
    let mut at_element_start = true;
    while i < input.len() {
        match input[i] {
            b if b == separator => {
                parts.push(std::mem::take(&mut current));
                i += 1;
                at_element_start = true;
            }
            ESCAPE => {
                if i + 1 >= input.len() {
                    return Err(framing(i, "escape character at end of element"));
                }
                current.extend_from_slice(&input[i..i + 2]);
                i += 2;
                at_element_start = false;
            }
            BINARY_MARKER if at_element_start => {
                let end = skip_binary_run(input, i)?;
                current.extend_from_slice(&input[i..end]);
                i = end;
                at_element_start = false;
            }
            b @ (ELEMENT_SEPARATOR | GROUP_SEPARATOR) => {
                // The other separator kind stays inside the current part.
                current.push(b);
                i += 1;
                at_element_start = true;
            }
            b => {
                current.push(b);
                i += 1;
                at_element_start = false;
            }
        }
    }
    parts.push(current);
    Ok(parts)
}

/// Removes escape sequences, yielding the literal bytes.
pub fn unescape(raw: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == ESCAPE {
            if i + 1 >= raw.len() {
                return Err(framing(i, "dangling escape character"));
            }
            out.push(raw[i + 1]);
            i += 2;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    Ok(out)
}

/// Escapes the syntax characters `+ : ' ?` into `?`-prefixed sequences.
pub fn escape_into(text: &[u8], out: &mut Vec<u8>) {
    for &b in text {
        if matches!(b, ELEMENT_SEPARATOR | GROUP_SEPARATOR | SEGMENT_END | ESCAPE) {
            out.push(ESCAPE);
        }
        out.push(b);
    }
}

/// Parses a binary element `@<n>@<data>` into its raw data bytes.
pub fn parse_binary(raw: &[u8]) -> Result<Vec<u8>> {
    if raw.first() != Some(&BINARY_MARKER) {
        return Err(framing(0, "binary element without marker"));
    }
    let end = skip_binary_run(raw, 0)?;
    if end != raw.len() {
        return Err(framing(end, "trailing bytes after binary run"));
    }
    let second_marker = raw[1..]
        .iter()
        .position(|&b| b == BINARY_MARKER)
        .expect("validated by skip_binary_run")
        + 1;
    Ok(raw[second_marker + 1..].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_simple_segment() {
        let input = b"HNHBK:1:3+000000000100+220+0+1'";
        let segments = split_segments(input).unwrap();
        assert_eq!(segments.len(), 1);
        let elements = extract_elements(segments[0]).unwrap();
        assert_eq!(elements.len(), 5);
        assert_eq!(elements[0], b"HNHBK:1:3");
        assert_eq!(elements[1], b"000000000100");
        assert_eq!(elements[2], b"220");
        assert_eq!(elements[3], b"0");
        assert_eq!(elements[4], b"1");
    }

    #[test]
    fn groups_stay_joined_at_element_level() {
        let elements = extract_elements(b"abcde:123:012+de+'").unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0], b"abcde:123:012");
        assert_eq!(elements[1], b"de");
        let groups = extract_group_elements(&elements[0]).unwrap();
        assert_eq!(groups, vec![b"abcde".to_vec(), b"123".to_vec(), b"012".to_vec()]);
    }

    #[test]
    fn escaped_separators_are_literal() {
        let elements = extract_elements(b"A?+B??C?'D+next").unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(unescape(&elements[0]).unwrap(), b"A+B?C'D");
        assert_eq!(elements[1], b"next");
    }

    #[test]
    fn binary_run_is_opaque() {
        // The run contains every separator; none of them may split.
        let input = b"HNVSD:999:1+@9@ab'cd+ef:'";
        let segments = split_segments(input).unwrap();
        assert_eq!(segments.len(), 1);
        let elements = extract_elements(segments[0]).unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(parse_binary(&elements[1]).unwrap(), b"ab'cd+ef:");
    }

    #[test]
    fn unterminated_segment_reports_offset() {
        let err = split_segments(b"HNHBK:1:3+12").unwrap_err();
        match err {
            Error::MalformedFraming { offset, .. } => assert_eq!(offset, 0),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unterminated_binary_run_is_rejected() {
        assert!(split_segments(b"HNVSD:999:1+@99@abc'").is_err());
        assert!(split_segments(b"HNVSD:999:1+@abc'").is_err());
    }

    #[test]
    fn escape_round_trip() {
        let mut out = Vec::new();
        escape_into(b"A+B?C'D", &mut out);
        assert_eq!(out, b"A?+B??C?'D");
        assert_eq!(unescape(&out).unwrap(), b"A+B?C'D");
    }
}
