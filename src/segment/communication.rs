//! Communication access segments: HKKOM (request) and HIKOM (response).
//!
//! Banks advertise their reachable endpoints here; a client can discover
//! the HTTPS or raw-TCP address for a bank it only knows by its id.

use crate::domain::{BankId, CommunicationParameter};
use crate::element::groups::{
    bank_identification_elem, parse_bank_identification, parse_communication_parameter,
};
use crate::element::types::Numeric;
use crate::element::Elem;
use crate::error::Result;
use crate::segment::{RawSegment, SegmentHeader, WireSegment};

/// HKKOM v3 — requests communication access data for a range of banks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunicationAccessRequest {
    header: SegmentHeader,
    pub from_bank: BankId,
    pub to_bank: BankId,
    pub max_entries: u32,
    pub continuation_reference: Option<String>,
}

impl CommunicationAccessRequest {
    pub fn new(from_bank: BankId, to_bank: BankId, max_entries: u32) -> Self {
        CommunicationAccessRequest {
            header: SegmentHeader::new("HKKOM", 3),
            from_bank,
            to_bank,
            max_entries,
            continuation_reference: None,
        }
    }
}

impl WireSegment for CommunicationAccessRequest {
    fn header(&self) -> &SegmentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut SegmentHeader {
        &mut self.header
    }

    fn elements(&self) -> Vec<Elem> {
        vec![
            bank_identification_elem(&self.from_bank),
            bank_identification_elem(&self.to_bank),
            Elem::Num(self.max_entries as i64),
            match &self.continuation_reference {
                Some(r) => Elem::Alpha(r.clone()),
                None => Elem::Empty,
            },
        ]
    }
}

/// HIKOM v3 — one bank's communication endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunicationAccessResponse {
    pub header: SegmentHeader,
    pub bank_id: BankId,
    pub default_language: u8,
    pub parameters: Vec<CommunicationParameter>,
}

impl CommunicationAccessResponse {
    pub fn parse(raw: &RawSegment) -> Result<Self> {
        let bank_id = parse_bank_identification(raw.element(0)?)?;
        let default_language = Numeric::unmarshal(raw.element(1)?)?.value() as u8;
        let parameters = raw
            .elements
            .iter()
            .skip(2)
            .filter(|e| !e.is_empty())
            .map(|e| parse_communication_parameter(e))
            .collect::<Result<Vec<_>>>()?;
        Ok(CommunicationAccessResponse {
            header: raw.header.clone(),
            bank_id,
            default_language,
            parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_marshals() {
        let bank = BankId::new(280, "10090000").unwrap();
        let seg = CommunicationAccessRequest::new(bank.clone(), bank, 5);
        assert_eq!(
            seg.marshal(),
            b"HKKOM:1:3+280:10090000+280:10090000+5'"
        );
    }

    #[test]
    fn response_parses_endpoints() {
        let raw = RawSegment::parse(
            b"HIKOM:4:3:2+280:10090000+1+3:banking.example.com+2:hbci.example.com:10019",
        )
        .unwrap();
        let parsed = CommunicationAccessResponse::parse(&raw).unwrap();
        assert_eq!(parsed.default_language, 1);
        assert_eq!(parsed.parameters.len(), 2);
        assert_eq!(parsed.parameters[0].protocol, 3);
        assert_eq!(parsed.parameters[0].address, "banking.example.com");
        assert_eq!(parsed.parameters[1].address_addition, "10019");
    }
}
