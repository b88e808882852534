//! Encryption envelope segments: HNVSK (header) and HNVSD (data).

use chrono::{NaiveDate, NaiveTime};

use crate::domain::KeyName;
use crate::element::groups::{
    encryption_algorithm_elem, key_name_elem, parse_key_name, SecurityDate,
    SecurityIdentification,
};
use crate::element::types::{AlphaNumeric, Binary, Numeric};
use crate::element::Elem;
use crate::error::Result;
use crate::extractor::extract_group_elements;
use crate::segment::{RawSegment, SegmentHeader, WireSegment};

/// Segment number the wire assigns to the encryption header.
pub const ENCRYPTION_HEADER_NUMBER: u32 = 998;
/// Segment number the wire assigns to the encrypted-data segment.
pub const ENCRYPTED_DATA_NUMBER: u32 = 999;

/// Security function code of the PIN/TAN encryption profile.
pub const SECURITY_FUNCTION_ENCRYPTION: &str = "998";

/// HNVSK v2 — describes how the opaque payload was encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionHeader {
    header: SegmentHeader,
    pub security_function: String,
    /// 1 = the encrypter is the message issuer.
    pub supplier_role: u8,
    pub security_id: SecurityIdentification,
    pub date: SecurityDate,
    /// 2 = cipher-block chaining; PIN/TAN carries the placeholder profile.
    pub operation_mode: u16,
    /// 13 = two-key triple DES; again a placeholder under PIN/TAN.
    pub algorithm: u16,
    pub message_key: Vec<u8>,
    pub key_name: KeyName,
    /// 0 = no compression.
    pub compression: u8,
}

impl EncryptionHeader {
    /// The PIN/TAN profile: fixed placeholder algorithm, zeroed message key.
    pub fn pin_tan(
        client_system_id: &str,
        date: NaiveDate,
        time: NaiveTime,
        key_name: KeyName,
    ) -> Self {
        let mut header = SegmentHeader::new("HNVSK", 2);
        header.number = ENCRYPTION_HEADER_NUMBER;
        EncryptionHeader {
            header,
            security_function: SECURITY_FUNCTION_ENCRYPTION.to_owned(),
            supplier_role: 1,
            security_id: SecurityIdentification::sender(client_system_id),
            date: SecurityDate::timestamp(date, time),
            operation_mode: 2,
            algorithm: 13,
            message_key: b"00000000".to_vec(),
            key_name,
            compression: 0,
        }
    }

    pub fn parse(raw: &RawSegment) -> Result<Self> {
        let security_function = AlphaNumeric::unmarshal(raw.element(0)?)?.into_string();
        let supplier_role = Numeric::unmarshal(raw.element(1)?)?.value() as u8;
        let security_id = SecurityIdentification::from_wire(raw.element(2)?)?;
        let date = SecurityDate::from_wire(raw.element(3)?)?;
        let algo = extract_group_elements(raw.element(4)?)?;
        let operation_mode =
            Numeric::unmarshal(algo.get(1).map_or(&[][..], Vec::as_slice))?.value() as u16;
        let algorithm =
            Numeric::unmarshal(algo.get(2).map_or(&[][..], Vec::as_slice))?.value() as u16;
        let message_key = match algo.get(3) {
            Some(bytes) if !bytes.is_empty() => Binary::unmarshal(bytes)?.into_bytes(),
            _ => Vec::new(),
        };
        let key_name = parse_key_name(raw.element(5)?)?;
        let compression = match raw.optional_element(6) {
            Some(bytes) => Numeric::unmarshal(bytes)?.value() as u8,
            None => 0,
        };
        Ok(EncryptionHeader {
            header: raw.header.clone(),
            security_function,
            supplier_role,
            security_id,
            date,
            operation_mode,
            algorithm,
            message_key,
            key_name,
            compression,
        })
    }
}

impl WireSegment for EncryptionHeader {
    fn header(&self) -> &SegmentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut SegmentHeader {
        &mut self.header
    }

    fn elements(&self) -> Vec<Elem> {
        vec![
            Elem::Alpha(self.security_function.clone()),
            Elem::Num(self.supplier_role as i64),
            self.security_id.to_elem(),
            self.date.to_elem(),
            encryption_algorithm_elem(self.operation_mode, self.algorithm, &self.message_key),
            key_name_elem(&self.key_name),
            Elem::Num(self.compression as i64),
        ]
    }
}

/// HNVSD v1 — the opaque encrypted payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedData {
    header: SegmentHeader,
    pub data: Vec<u8>,
}

impl EncryptedData {
    pub fn new(data: Vec<u8>) -> Self {
        let mut header = SegmentHeader::new("HNVSD", 1);
        header.number = ENCRYPTED_DATA_NUMBER;
        EncryptedData { header, data }
    }

    pub fn parse(raw: &RawSegment) -> Result<Self> {
        Ok(EncryptedData {
            header: raw.header.clone(),
            data: Binary::unmarshal(raw.element(0)?)?.into_bytes(),
        })
    }
}

impl WireSegment for EncryptedData {
    fn header(&self) -> &SegmentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut SegmentHeader {
        &mut self.header
    }

    fn elements(&self) -> Vec<Elem> {
        vec![Elem::Bin(self.data.clone())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BankId, KeyType};

    #[test]
    fn pin_tan_encryption_header_round_trip() {
        let key_name = KeyName {
            bank_id: BankId::new(280, "10090000").unwrap(),
            user_id: "user1".into(),
            key_type: KeyType::Encryption,
            key_number: 0,
            key_version: 0,
        };
        let date = NaiveDate::from_ymd_opt(2023, 4, 12).unwrap();
        let time = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        let header = EncryptionHeader::pin_tan("sys42", date, time, key_name);
        let wire = header.marshal();
        assert!(wire.starts_with(b"HNVSK:998:2+998+1+1::sys42+1:20230412:093000+2:2:13:@8@"));
        let raw = RawSegment::parse(&wire[..wire.len() - 1]).unwrap();
        assert_eq!(EncryptionHeader::parse(&raw).unwrap(), header);
    }

    #[test]
    fn encrypted_data_wraps_payload() {
        let seg = EncryptedData::new(b"HNSHK:2:3+...'".to_vec());
        assert_eq!(seg.marshal(), b"HNVSD:999:1+@14@HNSHK:2:3+...''");
    }
}
