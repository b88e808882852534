//! Typed data elements and data-element groups.
//!
//! [`types`] holds the validated leaves, [`groups`] the composites. The
//! [`Elem`] value is the wire-facing projection both layers marshal through:
//! a segment's element list is a `Vec<Elem>`, and marshalling is a pure
//! function of that value plus the separator grammar.

pub mod groups;
pub mod types;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;

use crate::extractor::escape_into;
use crate::token::{BINARY_MARKER, GROUP_SEPARATOR};

/// One marshallable data-element value.
#[derive(Debug, Clone, PartialEq)]
pub enum Elem {
    /// An omitted optional element.
    Empty,
    /// Alphanumeric/text/identification payload; escaped at marshal.
    Alpha(String),
    /// Numeric without leading zeros.
    Num(i64),
    /// Digit string with fixed width, zero padded.
    Dig { value: u64, width: usize },
    /// Decimal value; wire form uses the comma separator.
    Val(Decimal),
    Date(NaiveDate),
    Time(NaiveTime),
    YesNo(bool),
    /// Raw bytes with `@<len>@` framing.
    Bin(Vec<u8>),
    /// Pre-marshalled bytes carried verbatim (opaque parameter clusters).
    Raw(Vec<u8>),
    /// A data-element group; members joined by `:`.
    Group(Vec<Elem>),
}

impl Elem {
    pub fn is_empty(&self) -> bool {
        match self {
            Elem::Empty => true,
            Elem::Alpha(s) => s.is_empty(),
            Elem::Raw(b) => b.is_empty(),
            Elem::Group(members) => members.iter().all(Elem::is_empty),
            _ => false,
        }
    }

    /// Appends the wire form. Infallible: all validation happened when the
    /// value was constructed.
    pub fn marshal_into(&self, out: &mut Vec<u8>) {
        match self {
            Elem::Empty => {}
            Elem::Alpha(s) => {
                let mut encoded = Vec::with_capacity(s.len());
                for c in s.chars() {
                    encoded.push(c as u8);
                }
                escape_into(&encoded, out);
            }
            Elem::Num(n) => out.extend_from_slice(n.to_string().as_bytes()),
            Elem::Dig { value, width } => {
                out.extend_from_slice(format!("{:0w$}", value, w = *width).as_bytes())
            }
            Elem::Val(v) => out.extend_from_slice(types::format_value(v).as_bytes()),
            Elem::Date(d) => out.extend_from_slice(d.format("%Y%m%d").to_string().as_bytes()),
            Elem::Time(t) => out.extend_from_slice(t.format("%H%M%S").to_string().as_bytes()),
            Elem::YesNo(b) => out.push(if *b { b'J' } else { b'N' }),
            Elem::Bin(data) => {
                out.push(BINARY_MARKER);
                out.extend_from_slice(data.len().to_string().as_bytes());
                out.push(BINARY_MARKER);
                out.extend_from_slice(data);
            }
            Elem::Raw(bytes) => out.extend_from_slice(bytes),
            Elem::Group(members) => {
                let mut members = members.as_slice();
                while members.last().is_some_and(Elem::is_empty) {
                    members = &members[..members.len() - 1];
                }
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        out.push(GROUP_SEPARATOR);
                    }
                    member.marshal_into(out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn wire(elem: Elem) -> Vec<u8> {
        let mut out = Vec::new();
        elem.marshal_into(&mut out);
        out
    }

    #[test]
    fn alpha_escapes_syntax_characters() {
        assert_eq!(wire(Elem::Alpha("A+B?C'D".into())), b"A?+B??C?'D");
    }

    #[test]
    fn digit_pads_to_width() {
        assert_eq!(wire(Elem::Dig { value: 100, width: 12 }), b"000000000100");
    }

    #[test]
    fn value_uses_comma() {
        assert_eq!(wire(Elem::Val(dec!(123.45))), b"123,45");
    }

    #[test]
    fn binary_carries_length_prefix() {
        assert_eq!(wire(Elem::Bin(b"a+b'c".to_vec())), b"@5@a+b'c");
    }

    #[test]
    fn group_trims_trailing_empty_members() {
        let group = Elem::Group(vec![
            Elem::Alpha("D".into()),
            Elem::Val(dec!(1.5)),
            Elem::Empty,
            Elem::Empty,
        ]);
        assert_eq!(wire(group), b"D:1,5");
    }
}
