//! Dialog lifecycle segments: HKIDN, HKVVB, HKEND, HKSYN, HISYN.

use crate::domain::{BankId, Language};
use crate::element::groups::bank_identification_elem;
use crate::element::types::{AlphaNumeric, Identification, Numeric};
use crate::element::Elem;
use crate::error::Result;
use crate::segment::{RawSegment, SegmentHeader, WireSegment};

/// HKIDN v2 — identifies client and client system at dialog start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogIdentification {
    header: SegmentHeader,
    pub bank_id: BankId,
    pub client_id: String,
    pub client_system_id: String,
    pub system_id_required: bool,
}

impl DialogIdentification {
    pub fn new(
        bank_id: BankId,
        client_id: impl Into<String>,
        client_system_id: impl Into<String>,
        system_id_required: bool,
    ) -> Result<Self> {
        let client_id = client_id.into();
        let client_system_id = client_system_id.into();
        Identification::new(client_id.clone())?;
        Identification::new(client_system_id.clone())?;
        Ok(DialogIdentification {
            header: SegmentHeader::new("HKIDN", 2),
            bank_id,
            client_id,
            client_system_id,
            system_id_required,
        })
    }
}

impl WireSegment for DialogIdentification {
    fn header(&self) -> &SegmentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut SegmentHeader {
        &mut self.header
    }

    fn elements(&self) -> Vec<Elem> {
        vec![
            bank_identification_elem(&self.bank_id),
            Elem::Alpha(self.client_id.clone()),
            Elem::Alpha(self.client_system_id.clone()),
            Elem::Num(if self.system_id_required { 1 } else { 0 }),
        ]
    }
}

/// HKVVB v2 — processing preparation: parameter versions, language, and the
/// client product signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingPreparation {
    header: SegmentHeader,
    pub bpd_version: u32,
    pub upd_version: u32,
    pub language: Language,
    pub product_name: String,
    pub product_version: String,
}

impl ProcessingPreparation {
    pub fn new(
        bpd_version: u32,
        upd_version: u32,
        language: Language,
        product_name: &str,
        product_version: &str,
    ) -> Result<Self> {
        AlphaNumeric::new(product_name, 25)?;
        AlphaNumeric::new(product_version, 5)?;
        Ok(ProcessingPreparation {
            header: SegmentHeader::new("HKVVB", 2),
            bpd_version,
            upd_version,
            language,
            product_name: product_name.to_owned(),
            product_version: product_version.to_owned(),
        })
    }
}

impl WireSegment for ProcessingPreparation {
    fn header(&self) -> &SegmentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut SegmentHeader {
        &mut self.header
    }

    fn elements(&self) -> Vec<Elem> {
        vec![
            Elem::Num(self.bpd_version as i64),
            Elem::Num(self.upd_version as i64),
            Elem::Num(self.language.code() as i64),
            Elem::Alpha(self.product_name.clone()),
            Elem::Alpha(self.product_version.clone()),
        ]
    }
}

/// HKEND v1 — terminates the dialog named by its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogEnd {
    header: SegmentHeader,
    pub dialog_id: String,
}

impl DialogEnd {
    pub fn new(dialog_id: impl Into<String>) -> Result<Self> {
        let dialog_id = dialog_id.into();
        Identification::new(dialog_id.clone())?;
        Ok(DialogEnd {
            header: SegmentHeader::new("HKEND", 1),
            dialog_id,
        })
    }
}

impl WireSegment for DialogEnd {
    fn header(&self) -> &SegmentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut SegmentHeader {
        &mut self.header
    }

    fn elements(&self) -> Vec<Elem> {
        vec![Elem::Alpha(self.dialog_id.clone())]
    }
}

/// Synchronisation modes of HKSYN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Obtain a new client system id.
    NewClientSystemId,
    /// Request the last processed message number.
    LastMessageNumber,
    /// Request signature ids.
    SignatureId,
}

impl SyncMode {
    fn code(self) -> i64 {
        match self {
            SyncMode::NewClientSystemId => 0,
            SyncMode::LastMessageNumber => 1,
            SyncMode::SignatureId => 2,
        }
    }
}

/// HKSYN v2 — synchronisation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synchronisation {
    header: SegmentHeader,
    pub mode: SyncMode,
}

impl Synchronisation {
    pub fn new(mode: SyncMode) -> Self {
        Synchronisation {
            header: SegmentHeader::new("HKSYN", 2),
            mode,
        }
    }
}

impl WireSegment for Synchronisation {
    fn header(&self) -> &SegmentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut SegmentHeader {
        &mut self.header
    }

    fn elements(&self) -> Vec<Elem> {
        vec![Elem::Num(self.mode.code())]
    }
}

/// HISYN v3 — synchronisation response carrying the assigned client system
/// id and, depending on the requested mode, counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynchronisationResponse {
    pub header: SegmentHeader,
    pub client_system_id: String,
    pub last_message_number: Option<u32>,
    pub signature_id: Option<u64>,
}

impl SynchronisationResponse {
    pub fn parse(raw: &RawSegment) -> Result<Self> {
        let client_system_id = Identification::unmarshal(raw.element(0)?)?.as_str().to_owned();
        let last_message_number = match raw.optional_element(1) {
            Some(bytes) => Some(Numeric::unmarshal(bytes)?.value() as u32),
            None => None,
        };
        let signature_id = match raw.optional_element(2) {
            Some(bytes) => Some(Numeric::unmarshal(bytes)?.value() as u64),
            None => None,
        };
        Ok(SynchronisationResponse {
            header: raw.header.clone(),
            client_system_id,
            last_message_number,
            signature_id,
        })
    }
}
