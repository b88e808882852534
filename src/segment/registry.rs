//! Schema dispatch: decodes a lexed segment against the catalogue.
//!
//! Dispatch keys on the header's `(id, version)` pair. Pairs the catalogue
//! does not know are carried as [`BankSegment::Unknown`] so one bank
//! extension never fails a whole message.

use crate::error::Result;
use crate::segment::account::{BalanceResponse, TransactionsResponse};
use crate::segment::ack::{MessageAcknowledgement, SegmentAcknowledgement};
use crate::segment::bank_params::{
    BusinessTransactionParams, CommonBankParameter, CompressionMethods, SecurityMethods,
};
use crate::segment::communication::CommunicationAccessResponse;
use crate::segment::dialog::SynchronisationResponse;
use crate::segment::encryption::{EncryptedData, EncryptionHeader};
use crate::segment::key_management::{PublicKeyTransmission, RevocationConfirmation};
use crate::segment::message::{MessageEnd, MessageHeader};
use crate::segment::signature::{SignatureEnd, SignatureHeader};
use crate::segment::user_params::{AccountInformationSegment, CommonUserParameter};
use crate::segment::{RawSegment, SegmentHeader, WireSegment};

/// A decoded bank-side segment.
#[derive(Debug, Clone, PartialEq)]
pub enum BankSegment {
    MessageHeader(MessageHeader),
    MessageEnd(MessageEnd),
    MessageAck(MessageAcknowledgement),
    SegmentAck(SegmentAcknowledgement),
    SignatureHeader(SignatureHeader),
    SignatureEnd(SignatureEnd),
    EncryptionHeader(EncryptionHeader),
    EncryptedData(EncryptedData),
    BankParams(CommonBankParameter),
    SecurityMethods(SecurityMethods),
    CompressionMethods(CompressionMethods),
    BusinessTransactionParams(BusinessTransactionParams),
    UserParams(CommonUserParameter),
    AccountInfo(AccountInformationSegment),
    SyncResponse(SynchronisationResponse),
    Balance(BalanceResponse),
    Transactions(TransactionsResponse),
    KeyTransmission(PublicKeyTransmission),
    RevocationConfirmation(RevocationConfirmation),
    CommunicationAccess(CommunicationAccessResponse),
    /// Well-framed but not in the catalogue; kept verbatim.
    Unknown(RawSegment),
}

impl BankSegment {
    pub fn segment_id(&self) -> &str {
        &self.header().id
    }

    pub fn header(&self) -> &SegmentHeader {
        match self {
            BankSegment::MessageHeader(s) => s.header(),
            BankSegment::MessageEnd(s) => s.header(),
            BankSegment::MessageAck(s) => &s.header,
            BankSegment::SegmentAck(s) => &s.header,
            BankSegment::SignatureHeader(s) => s.header(),
            BankSegment::SignatureEnd(s) => s.header(),
            BankSegment::EncryptionHeader(s) => s.header(),
            BankSegment::EncryptedData(s) => s.header(),
            BankSegment::BankParams(s) => &s.header,
            BankSegment::SecurityMethods(s) => &s.header,
            BankSegment::CompressionMethods(s) => &s.header,
            BankSegment::BusinessTransactionParams(s) => &s.header,
            BankSegment::UserParams(s) => &s.header,
            BankSegment::AccountInfo(s) => &s.header,
            BankSegment::SyncResponse(s) => &s.header,
            BankSegment::Balance(s) => &s.header,
            BankSegment::Transactions(s) => &s.header,
            BankSegment::KeyTransmission(s) => &s.header,
            BankSegment::RevocationConfirmation(s) => &s.header,
            BankSegment::CommunicationAccess(s) => &s.header,
            BankSegment::Unknown(s) => &s.header,
        }
    }
}

/// Decodes one lexed segment. A schema failure for a known `(id, version)`
/// pair is an error; an unknown pair is data.
pub fn decode(raw: RawSegment) -> Result<BankSegment> {
    let id = raw.header.id.clone();
    let decoded = match (id.as_str(), raw.header.version) {
        ("HNHBK", 3) => BankSegment::MessageHeader(MessageHeader::parse(&raw)?),
        ("HNHBS", 1) => BankSegment::MessageEnd(MessageEnd::parse(&raw)?),
        ("HIRMG", 2) => BankSegment::MessageAck(MessageAcknowledgement::parse(&raw)?),
        ("HIRMS", 2) => BankSegment::SegmentAck(SegmentAcknowledgement::parse(&raw)?),
        ("HNSHK", 3) => BankSegment::SignatureHeader(SignatureHeader::parse(&raw)?),
        ("HNSHA", 1) => BankSegment::SignatureEnd(SignatureEnd::parse(&raw)?),
        ("HNVSK", 2) => BankSegment::EncryptionHeader(EncryptionHeader::parse(&raw)?),
        ("HNVSD", 1) => BankSegment::EncryptedData(EncryptedData::parse(&raw)?),
        ("HIBPA", 2) => BankSegment::BankParams(CommonBankParameter::parse(&raw)?),
        ("HISHV", 2) => BankSegment::SecurityMethods(SecurityMethods::parse(&raw)?),
        ("HIKPV", 1) => BankSegment::CompressionMethods(CompressionMethods::parse(&raw)?),
        ("HIUPA", 2) => BankSegment::UserParams(CommonUserParameter::parse(&raw)?),
        ("HIUPD", 4) => BankSegment::AccountInfo(AccountInformationSegment::parse(&raw)?),
        ("HISYN", 3) => BankSegment::SyncResponse(SynchronisationResponse::parse(&raw)?),
        ("HISAL", 5) => BankSegment::Balance(BalanceResponse::parse(&raw)?),
        ("HIKAZ", 5) => BankSegment::Transactions(TransactionsResponse::parse(&raw)?),
        ("HIISA", 2) => BankSegment::KeyTransmission(PublicKeyTransmission::parse(&raw)?),
        ("HISSP", 2) => {
            BankSegment::RevocationConfirmation(RevocationConfirmation::parse(&raw)?)
        }
        ("HIKOM", 3) => {
            BankSegment::CommunicationAccess(CommunicationAccessResponse::parse(&raw)?)
        }
        // Bank-defined business-transaction parameter segments end in "S"
        // and reference HKVVB; their inner layout is bank-defined.
        (id, _) if id.len() == 6 && id.starts_with("HI") && id.ends_with('S') => {
            BankSegment::BusinessTransactionParams(BusinessTransactionParams::parse(&raw)?)
        }
        _ => BankSegment::Unknown(raw),
    };
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_pair_dispatches() {
        let raw = RawSegment::parse(b"HNHBS:4:1+1").unwrap();
        assert!(matches!(
            decode(raw).unwrap(),
            BankSegment::MessageEnd(_)
        ));
    }

    #[test]
    fn unknown_pair_is_carried_not_failed() {
        let raw = RawSegment::parse(b"HITAN:7:6:4+4++unknown:payload").unwrap();
        match decode(raw).unwrap() {
            BankSegment::Unknown(seg) => {
                assert_eq!(seg.header.id, "HITAN");
                assert_eq!(seg.header.version, 6);
            }
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn unknown_version_of_known_id_is_carried() {
        let raw = RawSegment::parse(b"HISAL:5:7:3+future+layout").unwrap();
        assert!(matches!(decode(raw).unwrap(), BankSegment::Unknown(_)));
    }

    #[test]
    fn parameter_segments_match_generically() {
        let raw = RawSegment::parse(b"HISALS:6:5:3+1+1").unwrap();
        assert!(matches!(
            decode(raw).unwrap(),
            BankSegment::BusinessTransactionParams(_)
        ));
    }
}
