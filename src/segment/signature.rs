//! Signature envelope segments: HNSHK (header) and HNSHA (trailer).

use chrono::{NaiveDate, NaiveTime};

use crate::domain::KeyName;
use crate::element::groups::{
    hash_algorithm_elem, key_name_elem, parse_key_name, signature_algorithm_elem, SecurityDate,
    SecurityIdentification,
};
use crate::element::types::{AlphaNumeric, Binary, Numeric};
use crate::element::Elem;
use crate::error::Result;
use crate::extractor::extract_group_elements;
use crate::segment::{RawSegment, SegmentHeader, WireSegment};

/// Security function code of a single-step PIN/TAN signature.
pub const SECURITY_FUNCTION_PIN_TAN: &str = "999";

/// HNSHK v3 — opens the signed span and names the signing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    header: SegmentHeader,
    pub security_function: String,
    /// Links header and trailer; both carry the same reference.
    pub control_reference: String,
    /// 1 = signature covers the whole message.
    pub application_range: u8,
    /// 1 = the signer is the message issuer.
    pub supplier_role: u8,
    pub security_id: SecurityIdentification,
    /// Signature counter against replay; PIN/TAN banks accept 0.
    pub security_reference: u64,
    pub date: SecurityDate,
    /// 999 = no hash algorithm (PIN/TAN).
    pub hash_algorithm: u16,
    pub signature_algorithm: u16,
    pub signature_operation_mode: u16,
    pub key_name: KeyName,
}

impl SignatureHeader {
    /// The PIN/TAN profile: no real cryptography, fixed algorithm codes.
    pub fn pin_tan(
        control_reference: &str,
        client_system_id: &str,
        date: NaiveDate,
        time: NaiveTime,
        key_name: KeyName,
    ) -> Result<Self> {
        AlphaNumeric::new(control_reference, 14)?;
        Ok(SignatureHeader {
            header: SegmentHeader::new("HNSHK", 3),
            security_function: SECURITY_FUNCTION_PIN_TAN.to_owned(),
            control_reference: control_reference.to_owned(),
            application_range: 1,
            supplier_role: 1,
            security_id: SecurityIdentification::sender(client_system_id),
            security_reference: 0,
            date: SecurityDate::timestamp(date, time),
            hash_algorithm: 999,
            signature_algorithm: 10,
            signature_operation_mode: 16,
            key_name,
        })
    }

    pub fn parse(raw: &RawSegment) -> Result<Self> {
        let security_function = AlphaNumeric::unmarshal(raw.element(0)?)?.into_string();
        let control_reference = AlphaNumeric::unmarshal(raw.element(1)?)?.into_string();
        let application_range = Numeric::unmarshal(raw.element(2)?)?.value() as u8;
        let supplier_role = Numeric::unmarshal(raw.element(3)?)?.value() as u8;
        let security_id = SecurityIdentification::from_wire(raw.element(4)?)?;
        let security_reference = Numeric::unmarshal(raw.element(5)?)?.value() as u64;
        let date = SecurityDate::from_wire(raw.element(6)?)?;
        let hash = extract_group_elements(raw.element(7)?)?;
        let hash_algorithm = Numeric::unmarshal(hash.get(1).map_or(&[][..], Vec::as_slice))?.value() as u16;
        let sig = extract_group_elements(raw.element(8)?)?;
        let signature_algorithm =
            Numeric::unmarshal(sig.get(1).map_or(&[][..], Vec::as_slice))?.value() as u16;
        let signature_operation_mode =
            Numeric::unmarshal(sig.get(2).map_or(&[][..], Vec::as_slice))?.value() as u16;
        let key_name = parse_key_name(raw.element(9)?)?;
        Ok(SignatureHeader {
            header: raw.header.clone(),
            security_function,
            control_reference,
            application_range,
            supplier_role,
            security_id,
            security_reference,
            date,
            hash_algorithm,
            signature_algorithm,
            signature_operation_mode,
            key_name,
        })
    }
}

impl WireSegment for SignatureHeader {
    fn header(&self) -> &SegmentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut SegmentHeader {
        &mut self.header
    }

    fn elements(&self) -> Vec<Elem> {
        vec![
            Elem::Alpha(self.security_function.clone()),
            Elem::Alpha(self.control_reference.clone()),
            Elem::Num(self.application_range as i64),
            Elem::Num(self.supplier_role as i64),
            self.security_id.to_elem(),
            Elem::Num(self.security_reference as i64),
            self.date.to_elem(),
            hash_algorithm_elem(self.hash_algorithm),
            signature_algorithm_elem(self.signature_algorithm, self.signature_operation_mode),
            key_name_elem(&self.key_name),
        ]
    }
}

/// HNSHA v1 — closes the signed span and carries the signature value.
///
/// For PIN/TAN the "signature" is the PIN plus optional TAN in the
/// user-signature group; the binary field stays empty. RDH signers place
/// their signature bytes in the binary field instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEnd {
    header: SegmentHeader,
    pub control_reference: String,
    pub signature: Option<Vec<u8>>,
    pub pin: Option<String>,
    pub tan: Option<String>,
}

impl SignatureEnd {
    pub fn new(control_reference: &str) -> Result<Self> {
        AlphaNumeric::new(control_reference, 14)?;
        Ok(SignatureEnd {
            header: SegmentHeader::new("HNSHA", 1),
            control_reference: control_reference.to_owned(),
            signature: None,
            pin: None,
            tan: None,
        })
    }

    pub fn set_pin_tan(&mut self, pin: &str, tan: Option<&str>) {
        self.pin = Some(pin.to_owned());
        self.tan = tan.map(str::to_owned);
    }

    pub fn set_signature(&mut self, signature: Vec<u8>) {
        self.signature = Some(signature);
    }

    pub fn parse(raw: &RawSegment) -> Result<Self> {
        let control_reference = AlphaNumeric::unmarshal(raw.element(0)?)?.into_string();
        let signature = match raw.optional_element(1) {
            Some(bytes) => Some(Binary::unmarshal(bytes)?.into_bytes()),
            None => None,
        };
        let (pin, tan) = match raw.optional_element(2) {
            Some(bytes) => {
                let parts = extract_group_elements(bytes)?;
                let pin = parts
                    .first()
                    .filter(|p| !p.is_empty())
                    .map(|p| AlphaNumeric::unmarshal(p).map(AlphaNumeric::into_string))
                    .transpose()?;
                let tan = parts
                    .get(1)
                    .filter(|p| !p.is_empty())
                    .map(|p| AlphaNumeric::unmarshal(p).map(AlphaNumeric::into_string))
                    .transpose()?;
                (pin, tan)
            }
            None => (None, None),
        };
        Ok(SignatureEnd {
            header: raw.header.clone(),
            control_reference,
            signature,
            pin,
            tan,
        })
    }
}

impl WireSegment for SignatureEnd {
    fn header(&self) -> &SegmentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut SegmentHeader {
        &mut self.header
    }

    fn elements(&self) -> Vec<Elem> {
        let user_signature = match (&self.pin, &self.tan) {
            (Some(pin), Some(tan)) => {
                Elem::Group(vec![Elem::Alpha(pin.clone()), Elem::Alpha(tan.clone())])
            }
            (Some(pin), None) => Elem::Group(vec![Elem::Alpha(pin.clone())]),
            (None, _) => Elem::Empty,
        };
        vec![
            Elem::Alpha(self.control_reference.clone()),
            match &self.signature {
                Some(bytes) => Elem::Bin(bytes.clone()),
                None => Elem::Empty,
            },
            user_signature,
        ]
    }
}
