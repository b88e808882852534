//! RDH key-management segments: HKSAK, HKISA, HIISA, HKSSP, HISSP.
//!
//! Constructors validate the key type and reference numbers; a segment that
//! would violate the protocol cannot be built.

use chrono::{NaiveDate, NaiveTime};

use crate::domain::{KeyName, KeyType, PublicKey};
use crate::element::groups::{
    key_name_elem, parse_key_name, parse_public_key, public_key_elem, SecurityDate,
};
use crate::element::types::{AlphaNumeric, Identification, Numeric};
use crate::element::Elem;
use crate::error::{Error, Result};
use crate::segment::{RawSegment, SegmentHeader, WireSegment};

/// Revocation reason: the owner's key is compromised.
pub const REVOCATION_KEY_COMPROMISED: &str = "1";
/// Revocation reason: compromise is suspected.
pub const REVOCATION_SUSPECTED: &str = "501";
/// Revocation reason: miscellaneous.
pub const REVOCATION_MISC: &str = "999";

const VALID_REVOCATION_REASONS: [&str; 3] = [
    REVOCATION_KEY_COMPROMISED,
    REVOCATION_SUSPECTED,
    REVOCATION_MISC,
];

fn require_dedicated_key(key_name: &KeyName, segment: &'static str) -> Result<()> {
    if key_name.key_type == KeyType::Both {
        return Err(Error::FieldConstraint {
            field: segment,
            reason: "key type B is not allowed here".into(),
        });
    }
    Ok(())
}

fn require_valid_reason(reason: &str) -> Result<()> {
    if !VALID_REVOCATION_REASONS.contains(&reason) {
        return Err(Error::FieldConstraint {
            field: "revocation reason",
            reason: format!("must be one of {VALID_REVOCATION_REASONS:?}, got {reason:?}"),
        });
    }
    Ok(())
}

/// HKSAK v2 — sends a replacement public key to the bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyRenewal {
    header: SegmentHeader,
    pub key_name: KeyName,
    pub public_key: PublicKey,
}

impl PublicKeyRenewal {
    pub fn new(key_name: KeyName, public_key: PublicKey) -> Result<Self> {
        require_dedicated_key(&key_name, "HKSAK key name")?;
        Ok(PublicKeyRenewal {
            header: SegmentHeader::new("HKSAK", 2),
            key_name,
            public_key,
        })
    }
}

impl WireSegment for PublicKeyRenewal {
    fn header(&self) -> &SegmentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut SegmentHeader {
        &mut self.header
    }

    fn elements(&self) -> Vec<Elem> {
        vec![
            // 2 = key-management message expecting a response.
            Elem::Num(2),
            // 112 = certificate replacement.
            Elem::Num(112),
            key_name_elem(&self.key_name),
            public_key_elem(&self.public_key),
        ]
    }
}

/// HKISA v2 — requests a public key from the bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyRequest {
    header: SegmentHeader,
    pub key_name: KeyName,
}

impl PublicKeyRequest {
    pub fn new(key_name: KeyName) -> Self {
        PublicKeyRequest {
            header: SegmentHeader::new("HKISA", 2),
            key_name,
        }
    }
}

impl WireSegment for PublicKeyRequest {
    fn header(&self) -> &SegmentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut SegmentHeader {
        &mut self.header
    }

    fn elements(&self) -> Vec<Elem> {
        vec![
            Elem::Num(2),
            // 124 = certificate status request.
            Elem::Num(124),
            key_name_elem(&self.key_name),
        ]
    }
}

/// HIISA v2 — the bank's answer to a key request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyTransmission {
    pub header: SegmentHeader,
    pub dialog_id: String,
    pub message_reference: u32,
    pub key_name: KeyName,
    pub public_key: PublicKey,
}

impl PublicKeyTransmission {
    pub fn parse(raw: &RawSegment) -> Result<Self> {
        let _message_id = Numeric::unmarshal(raw.element(0)?)?;
        let dialog_id = Identification::unmarshal(raw.element(1)?)?.as_str().to_owned();
        let message_reference = Numeric::unmarshal(raw.element(2)?)?.value();
        if message_reference <= 0 {
            return Err(Error::Segment {
                id: raw.header.id.clone(),
                reason: format!("message reference must be positive, got {message_reference}"),
            });
        }
        let _function_id = Numeric::unmarshal(raw.element(3)?)?;
        let key_name = parse_key_name(raw.element(4)?)?;
        let public_key = parse_public_key(raw.element(5)?)?;
        Ok(PublicKeyTransmission {
            header: raw.header.clone(),
            dialog_id,
            message_reference: message_reference as u32,
            key_name,
            public_key,
        })
    }
}

/// HKSSP v2 — revokes a public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyRevocation {
    header: SegmentHeader,
    pub key_name: KeyName,
    pub reason: String,
    pub date: SecurityDate,
}

impl PublicKeyRevocation {
    pub fn new(
        key_name: KeyName,
        reason: &str,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Self> {
        require_dedicated_key(&key_name, "HKSSP key name")?;
        require_valid_reason(reason)?;
        Ok(PublicKeyRevocation {
            header: SegmentHeader::new("HKSSP", 2),
            key_name,
            reason: reason.to_owned(),
            date: SecurityDate::timestamp(date, time),
        })
    }
}

impl WireSegment for PublicKeyRevocation {
    fn header(&self) -> &SegmentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut SegmentHeader {
        &mut self.header
    }

    fn elements(&self) -> Vec<Elem> {
        vec![
            Elem::Num(2),
            // 130 = certificate revocation.
            Elem::Num(130),
            key_name_elem(&self.key_name),
            Elem::Alpha(self.reason.clone()),
            self.date.to_elem(),
        ]
    }
}

/// HISSP v2 — the bank's confirmation of a revocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationConfirmation {
    pub header: SegmentHeader,
    pub dialog_id: String,
    pub message_reference: u32,
    pub key_name: KeyName,
    pub reason: String,
    pub date: Option<SecurityDate>,
}

impl RevocationConfirmation {
    pub fn parse(raw: &RawSegment) -> Result<Self> {
        let _message_id = Numeric::unmarshal(raw.element(0)?)?;
        let dialog_id = Identification::unmarshal(raw.element(1)?)?.as_str().to_owned();
        let message_reference = Numeric::unmarshal(raw.element(2)?)?.value();
        if message_reference <= 0 {
            return Err(Error::Segment {
                id: raw.header.id.clone(),
                reason: format!("message reference must be positive, got {message_reference}"),
            });
        }
        let _function_id = Numeric::unmarshal(raw.element(3)?)?;
        let key_name = parse_key_name(raw.element(4)?)?;
        let reason = AlphaNumeric::unmarshal(raw.element(5)?)?.into_string();
        require_valid_reason(&reason)?;
        let date = match raw.optional_element(6) {
            Some(bytes) => Some(SecurityDate::from_wire(bytes)?),
            None => None,
        };
        Ok(RevocationConfirmation {
            header: raw.header.clone(),
            dialog_id,
            message_reference: message_reference as u32,
            key_name,
            reason,
            date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BankId;

    fn key_name(key_type: KeyType) -> KeyName {
        KeyName {
            bank_id: BankId::new(280, "10090000").unwrap(),
            user_id: "user1".into(),
            key_type,
            key_number: 1,
            key_version: 1,
        }
    }

    fn public_key() -> PublicKey {
        PublicKey {
            key_type: KeyType::Signing,
            modulus: vec![0x01, 0x02],
            exponent: vec![0x01, 0x00, 0x01],
        }
    }

    #[test]
    fn renewal_rejects_combined_key_type() {
        let err = PublicKeyRenewal::new(key_name(KeyType::Both), public_key());
        assert!(err.is_err());
        assert!(PublicKeyRenewal::new(key_name(KeyType::Signing), public_key()).is_ok());
    }

    #[test]
    fn revocation_validates_reason() {
        let date = NaiveDate::from_ymd_opt(2023, 4, 12).unwrap();
        let time = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        assert!(PublicKeyRevocation::new(
            key_name(KeyType::Signing),
            REVOCATION_SUSPECTED,
            date,
            time
        )
        .is_ok());
        assert!(
            PublicKeyRevocation::new(key_name(KeyType::Signing), "42", date, time).is_err()
        );
    }

    #[test]
    fn renewal_marshals_function_codes() {
        let seg = PublicKeyRenewal::new(key_name(KeyType::Signing), public_key()).unwrap();
        let wire = seg.marshal();
        assert!(wire.starts_with(b"HKSAK:1:2+2+112+280:10090000:user1:S:1:1+6:16:10:@2@"));
    }

    #[test]
    fn transmission_rejects_zero_reference() {
        let raw = RawSegment::parse(
            b"HIISA:4:2:3+1+82410923+0+224+280:10090000:user1:S:1:1+6:16:10:@2@\x01\x02:12:@3@\x01\x00\x01:13",
        )
        .unwrap();
        assert!(PublicKeyTransmission::parse(&raw).is_err());
    }
}
