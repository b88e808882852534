//! Acknowledgement segments: HIRMG (message level) and HIRMS (segment
//! level).

use crate::charset;
use crate::domain::Acknowledgement;
use crate::element::types::AlphaNumeric;
use crate::error::{Error, Result};
use crate::extractor::extract_group_elements;
use crate::segment::{RawSegment, SegmentHeader};

fn parse_ack_group(raw: &[u8], referencing_segment: Option<u32>) -> Result<Acknowledgement> {
    let parts = extract_group_elements(raw)?;
    if parts.len() < 3 {
        return Err(Error::Segment {
            id: "HIRMG/HIRMS".into(),
            reason: format!(
                "acknowledgement group needs code, reference and text, got {} members",
                parts.len()
            ),
        });
    }
    let code_str = charset::to_utf8(&parts[0]);
    if code_str.len() != 4 || !code_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Segment {
            id: "HIRMG/HIRMS".into(),
            reason: format!("acknowledgement code must be 4 digits, got {code_str:?}"),
        });
    }
    let code = code_str.parse::<u16>().expect("4 ascii digits");
    let reference_element = AlphaNumeric::unmarshal(&parts[1])?.into_string();
    let text = AlphaNumeric::unmarshal(&parts[2])?.into_string();
    let params = parts[3..]
        .iter()
        .map(|p| AlphaNumeric::unmarshal(p).map(AlphaNumeric::into_string))
        .collect::<Result<Vec<_>>>()?;
    Ok(Acknowledgement {
        code,
        reference_element,
        text,
        params,
        referencing_segment,
    })
}

/// HIRMG v2 — outcome codes for the message as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAcknowledgement {
    pub header: SegmentHeader,
    pub acknowledgements: Vec<Acknowledgement>,
}

impl MessageAcknowledgement {
    pub fn parse(raw: &RawSegment) -> Result<Self> {
        let acknowledgements = raw
            .elements
            .iter()
            .filter(|e| !e.is_empty())
            .map(|e| parse_ack_group(e, None))
            .collect::<Result<Vec<_>>>()?;
        Ok(MessageAcknowledgement {
            header: raw.header.clone(),
            acknowledgements,
        })
    }
}

/// HIRMS v2 — outcome codes attributed to one request segment; the header
/// reference names the segment number the entries belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentAcknowledgement {
    pub header: SegmentHeader,
    pub acknowledgements: Vec<Acknowledgement>,
}

impl SegmentAcknowledgement {
    pub fn parse(raw: &RawSegment) -> Result<Self> {
        let reference = raw.header.reference;
        let acknowledgements = raw
            .elements
            .iter()
            .filter(|e| !e.is_empty())
            .map(|e| parse_ack_group(e, reference))
            .collect::<Result<Vec<_>>>()?;
        Ok(SegmentAcknowledgement {
            header: raw.header.clone(),
            acknowledgements,
        })
    }
}
