//! Message framing segments: HNHBK (header) and HNHBS (end).

use crate::element::groups::reference_message_elem;
use crate::element::types::{Digit, Identification, Numeric};
use crate::element::Elem;
use crate::error::{Error, Result};
use crate::segment::{RawSegment, SegmentHeader, WireSegment, SUPPORTED_HBCI_VERSIONS};

/// Width of the HNHBK size field; constant so sizing needs no second
/// length adjustment.
pub const SIZE_FIELD_WIDTH: usize = 12;

/// HNHBK v3 — frames message size, protocol version, dialog id, and the
/// dialog-scoped message number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    header: SegmentHeader,
    pub size: u64,
    pub hbci_version: u16,
    pub dialog_id: String,
    pub message_number: u32,
    /// Present on bank responses: the client message being answered.
    pub reference: Option<(String, u32)>,
}

impl MessageHeader {
    pub fn new(hbci_version: u16, dialog_id: impl Into<String>, message_number: u32) -> Result<Self> {
        if !SUPPORTED_HBCI_VERSIONS.contains(&hbci_version) {
            return Err(Error::FieldConstraint {
                field: "MessageHeader.hbci_version",
                reason: format!(
                    "{hbci_version} is not one of the supported versions {SUPPORTED_HBCI_VERSIONS:?}"
                ),
            });
        }
        let dialog_id = dialog_id.into();
        Identification::new(dialog_id.clone())?;
        Ok(MessageHeader {
            header: SegmentHeader::new("HNHBK", 3),
            size: 0,
            hbci_version,
            dialog_id,
            message_number,
            reference: None,
        })
    }

    pub fn set_size(&mut self, size: u64) {
        self.size = size;
    }

    pub fn parse(raw: &RawSegment) -> Result<Self> {
        let size = Digit::unmarshal(raw.element(0)?)?;
        let hbci_version = Numeric::unmarshal(raw.element(1)?)?.value() as u16;
        let dialog_id = Identification::unmarshal(raw.element(2)?)?.as_str().to_owned();
        let message_number = Numeric::unmarshal(raw.element(3)?)?.value() as u32;
        let reference = match raw.optional_element(4) {
            Some(bytes) => Some(crate::element::groups::parse_reference_message(bytes)?),
            None => None,
        };
        Ok(MessageHeader {
            header: raw.header.clone(),
            size: size.value(),
            hbci_version,
            dialog_id,
            message_number,
            reference,
        })
    }
}

impl WireSegment for MessageHeader {
    fn header(&self) -> &SegmentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut SegmentHeader {
        &mut self.header
    }

    fn elements(&self) -> Vec<Elem> {
        vec![
            Elem::Dig {
                value: self.size,
                width: SIZE_FIELD_WIDTH,
            },
            Elem::Num(self.hbci_version as i64),
            Elem::Alpha(self.dialog_id.clone()),
            Elem::Num(self.message_number as i64),
            match &self.reference {
                Some((dialog_id, number)) => reference_message_elem(dialog_id, *number),
                None => Elem::Empty,
            },
        ]
    }
}

/// HNHBS v1 — closes the message, repeating its message number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEnd {
    header: SegmentHeader,
    pub message_number: u32,
}

impl MessageEnd {
    pub fn new(message_number: u32) -> Self {
        MessageEnd {
            header: SegmentHeader::new("HNHBS", 1),
            message_number,
        }
    }

    pub fn parse(raw: &RawSegment) -> Result<Self> {
        Ok(MessageEnd {
            header: raw.header.clone(),
            message_number: Numeric::unmarshal(raw.element(0)?)?.value() as u32,
        })
    }
}

impl WireSegment for MessageEnd {
    fn header(&self) -> &SegmentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut SegmentHeader {
        &mut self.header
    }

    fn elements(&self) -> Vec<Elem> {
        vec![Elem::Num(self.message_number as i64)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_header_round_trip() {
        let mut header = MessageHeader::new(220, "0", 1).unwrap();
        header.set_size(100);
        let wire = header.marshal();
        assert_eq!(wire, b"HNHBK:1:3+000000000100+220+0+1'");
        let raw = RawSegment::parse(&wire[..wire.len() - 1]).unwrap();
        let parsed = MessageHeader::parse(&raw).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn unsupported_version_rejected() {
        assert!(MessageHeader::new(300, "0", 1).is_err());
    }

    #[test]
    fn message_end_marshals() {
        let end = MessageEnd::new(7);
        assert_eq!(end.marshal(), b"HNHBS:1:1+7'");
    }
}
