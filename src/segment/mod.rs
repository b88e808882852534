//! The segment catalogue.
//!
//! A segment is the unit of message composition: a header
//! (`ID:NUMBER:VERSION[:REFERENCE]`) followed by `+`-separated data
//! elements, terminated by `'`. Client-emitted segments implement
//! [`WireSegment`]; bank-emitted segments are decoded from [`RawSegment`]
//! through the dispatch table in [`registry`].

pub mod account;
pub mod ack;
pub mod bank_params;
pub mod communication;
pub mod dialog;
pub mod encryption;
pub mod key_management;
pub mod message;
pub mod registry;
pub mod signature;
pub mod user_params;

use crate::element::types::Numeric;
use crate::element::Elem;
use crate::error::{Error, Result};
use crate::extractor::{extract_elements, extract_group_elements};
use crate::token::{ELEMENT_SEPARATOR, SEGMENT_END};

/// HBCI protocol versions this crate speaks.
pub const SUPPORTED_HBCI_VERSIONS: [u16; 3] = [201, 210, 220];

/// Default protocol version for new dialogs.
pub const DEFAULT_HBCI_VERSION: u16 = 220;

/// The common segment header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentHeader {
    /// Segment id: 5 or 6 uppercase ASCII characters.
    pub id: String,
    /// Position in the enclosing message, 1-based; rewritten at assembly.
    pub number: u32,
    /// Segment (not protocol) version.
    pub version: u32,
    /// Number of the request segment this one answers, if any.
    pub reference: Option<u32>,
}

impl SegmentHeader {
    pub fn new(id: &str, version: u32) -> Self {
        SegmentHeader {
            id: id.to_owned(),
            number: 1,
            version,
            reference: None,
        }
    }

    pub fn referencing(id: &str, version: u32, reference: u32) -> Self {
        SegmentHeader {
            id: id.to_owned(),
            number: 1,
            version,
            reference: Some(reference),
        }
    }

    fn to_elem(&self) -> Elem {
        let mut members = vec![
            Elem::Alpha(self.id.clone()),
            Elem::Num(self.number as i64),
            Elem::Num(self.version as i64),
        ];
        if let Some(reference) = self.reference {
            members.push(Elem::Num(reference as i64));
        }
        Elem::Group(members)
    }

    /// Parses `ID:NUMBER:VERSION[:REFERENCE]` from the first raw element.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let parts = extract_group_elements(raw)?;
        if parts.len() < 3 {
            return Err(Error::Segment {
                id: String::from_utf8_lossy(raw).into_owned(),
                reason: "segment header needs id, number and version".into(),
            });
        }
        let id = String::from_utf8_lossy(&parts[0]).into_owned();
        if !(5..=6).contains(&id.len()) || !id.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(Error::Segment {
                id,
                reason: "segment id must be 5 or 6 uppercase characters".into(),
            });
        }
        let number = Numeric::unmarshal(&parts[1])?.value();
        let version = Numeric::unmarshal(&parts[2])?.value();
        if number < 1 {
            return Err(Error::Segment {
                id,
                reason: format!("segment number must be >= 1, got {number}"),
            });
        }
        let reference = match parts.get(3) {
            Some(bytes) if !bytes.is_empty() => Some(Numeric::unmarshal(bytes)?.value() as u32),
            _ => None,
        };
        Ok(SegmentHeader {
            id,
            number: number as u32,
            version: version as u32,
            reference,
        })
    }
}

/// Emission seam for client segments: a header plus an ordered element
/// projection. Marshalling is derived and infallible.
pub trait WireSegment {
    fn header(&self) -> &SegmentHeader;
    fn header_mut(&mut self) -> &mut SegmentHeader;
    /// The data elements after the header, in wire order.
    fn elements(&self) -> Vec<Elem>;

    fn marshal(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.header().to_elem().marshal_into(&mut out);
        let mut elements = self.elements();
        while elements.last().is_some_and(Elem::is_empty) {
            elements.pop();
        }
        for element in &elements {
            out.push(ELEMENT_SEPARATOR);
            element.marshal_into(&mut out);
        }
        out.push(SEGMENT_END);
        out
    }
}

/// A lexed but not yet schema-decoded segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSegment {
    pub header: SegmentHeader,
    /// Raw data elements after the header; escapes and binary prefixes
    /// preserved.
    pub elements: Vec<Vec<u8>>,
    /// The full segment bytes without the terminator.
    pub raw: Vec<u8>,
}

impl RawSegment {
    /// Lexes one segment (without its `'`).
    pub fn parse(segment: &[u8]) -> Result<Self> {
        let mut elements = extract_elements(segment)?;
        if elements.is_empty() {
            return Err(Error::Segment {
                id: String::new(),
                reason: "empty segment".into(),
            });
        }
        let header = SegmentHeader::parse(&elements.remove(0))?;
        Ok(RawSegment {
            header,
            elements,
            raw: segment.to_vec(),
        })
    }

    /// The raw data element at `index`, or an error naming the segment.
    pub fn element(&self, index: usize) -> Result<&[u8]> {
        self.elements
            .get(index)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::Segment {
                id: self.header.id.clone(),
                reason: format!("missing data element {}", index + 1),
            })
    }

    /// The raw data element at `index` when present and non-empty.
    pub fn optional_element(&self, index: usize) -> Option<&[u8]> {
        self.elements
            .get(index)
            .filter(|e| !e.is_empty())
            .map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let header = SegmentHeader::referencing("HIRMS", 4, 3);
        let mut out = Vec::new();
        header.to_elem().marshal_into(&mut out);
        assert_eq!(out, b"HIRMS:1:4:3");
        assert_eq!(SegmentHeader::parse(&out).unwrap(), header);
    }

    #[test]
    fn header_rejects_bad_ids() {
        assert!(SegmentHeader::parse(b"HN:1:3").is_err());
        assert!(SegmentHeader::parse(b"hnhbk:1:3").is_err());
        assert!(SegmentHeader::parse(b"HNHBK:0:3").is_err());
    }

    #[test]
    fn raw_segment_splits_header_and_elements() {
        let raw = RawSegment::parse(b"HNHBK:1:3+000000000100+220+0+1").unwrap();
        assert_eq!(raw.header.id, "HNHBK");
        assert_eq!(raw.header.number, 1);
        assert_eq!(raw.header.version, 3);
        assert_eq!(raw.elements.len(), 4);
        assert_eq!(raw.element(0).unwrap(), b"000000000100");
    }
}
