//! Decoding a bank response message.

use tracing::{debug, warn};

use crate::domain::{
    AccountInformation, AckClass, Acknowledgement, BankParameterData, UserParameterData,
};
use crate::error::Result;
use crate::extractor::split_segments;
use crate::message::ClientMessage;
use crate::security::CryptoProvider;
use crate::segment::account::{BalanceResponse, TransactionsResponse};
use crate::segment::dialog::SynchronisationResponse;
use crate::segment::message::MessageHeader;
use crate::segment::registry::{decode, BankSegment};
use crate::segment::RawSegment;

/// A decoded bank message: its segments in wire order, with the encryption
/// envelope already unwrapped.
pub struct BankMessage {
    pub segments: Vec<BankSegment>,
}

impl BankMessage {
    /// Lexes and decodes a response. When the message carries an HNVSD
    /// envelope and a provider is given, the payload is decrypted and its
    /// segments take the envelope's place in wire order.
    pub fn parse(bytes: &[u8], crypto: Option<&dyn CryptoProvider>) -> Result<Self> {
        let mut raws = Vec::new();
        for segment in split_segments(bytes)? {
            raws.push(RawSegment::parse(segment)?);
        }

        let mut segments = Vec::with_capacity(raws.len());
        for raw in raws {
            if raw.header.id == "HNVSD" {
                if let Some(provider) = crypto {
                    let envelope = crate::segment::encryption::EncryptedData::parse(&raw)?;
                    let plaintext = provider.decrypt(&envelope.data)?;
                    for inner in split_segments(&plaintext)? {
                        segments.push(decode(RawSegment::parse(inner)?)?);
                    }
                    continue;
                }
                warn!("encrypted payload present but no crypto provider given");
            }
            segments.push(decode(raw)?);
        }

        let message = BankMessage { segments };
        debug!(
            segments = message.segments.len(),
            unknown = message.unknown_segments().count(),
            "decoded bank message"
        );
        Ok(message)
    }

    pub fn message_header(&self) -> Option<&MessageHeader> {
        self.segments.iter().find_map(|s| match s {
            BankSegment::MessageHeader(h) => Some(h),
            _ => None,
        })
    }

    /// All acknowledgements in wire order: message-level first where the
    /// bank sent them first, segment-level entries carrying the request
    /// segment number they reference.
    pub fn acknowledgements(&self) -> Vec<&Acknowledgement> {
        self.segments
            .iter()
            .flat_map(|s| match s {
                BankSegment::MessageAck(a) => a.acknowledgements.as_slice(),
                BankSegment::SegmentAck(a) => a.acknowledgements.as_slice(),
                _ => &[],
            })
            .collect()
    }

    /// The worst class present across all acknowledgements.
    pub fn outcome(&self) -> Option<AckClass> {
        self.acknowledgements()
            .into_iter()
            .map(Acknowledgement::class)
            .max()
    }

    pub fn has_error(&self) -> bool {
        self.outcome() == Some(AckClass::Error)
    }

    /// The first error acknowledgement, if any.
    pub fn first_error(&self) -> Option<&Acknowledgement> {
        self.acknowledgements().into_iter().find(|a| a.is_error())
    }

    /// Acknowledgements attributed to one request segment number.
    pub fn acknowledgements_for(&self, segment_number: u32) -> Vec<&Acknowledgement> {
        self.acknowledgements()
            .into_iter()
            .filter(|a| a.referencing_segment == Some(segment_number))
            .collect()
    }

    pub fn bank_parameter_data(&self) -> Option<&BankParameterData> {
        self.segments.iter().find_map(|s| match s {
            BankSegment::BankParams(p) => Some(&p.data),
            _ => None,
        })
    }

    pub fn user_parameter_data(&self) -> Option<&UserParameterData> {
        self.segments.iter().find_map(|s| match s {
            BankSegment::UserParams(p) => Some(&p.data),
            _ => None,
        })
    }

    pub fn accounts(&self) -> impl Iterator<Item = &AccountInformation> {
        self.segments.iter().filter_map(|s| match s {
            BankSegment::AccountInfo(a) => Some(&a.account),
            _ => None,
        })
    }

    pub fn sync_response(&self) -> Option<&SynchronisationResponse> {
        self.segments.iter().find_map(|s| match s {
            BankSegment::SyncResponse(r) => Some(r),
            _ => None,
        })
    }

    pub fn balances(&self) -> impl Iterator<Item = &BalanceResponse> {
        self.segments.iter().filter_map(|s| match s {
            BankSegment::Balance(b) => Some(b),
            _ => None,
        })
    }

    pub fn transactions(&self) -> impl Iterator<Item = &TransactionsResponse> {
        self.segments.iter().filter_map(|s| match s {
            BankSegment::Transactions(t) => Some(t),
            _ => None,
        })
    }

    pub fn unknown_segments(&self) -> impl Iterator<Item = &RawSegment> {
        self.segments.iter().filter_map(|s| match s {
            BankSegment::Unknown(raw) => Some(raw),
            _ => None,
        })
    }

    /// The wire segment number of the first segment with the given id.
    pub fn segment_number(&self, segment_id: &str) -> Option<u32> {
        self.segments
            .iter()
            .find(|s| s.segment_id() == segment_id)
            .map(|s| s.header().number)
    }
}

/// Convenience: marshals, signs, and encrypts an outgoing message in one
/// step, yielding the final wire bytes.
pub fn finalize(
    message: &mut ClientMessage,
    signer: &dyn crate::security::SignatureProvider,
    crypter: &dyn CryptoProvider,
) -> Result<Vec<u8>> {
    message.sign(signer)?;
    let mut encrypted = message.encrypt(crypter)?;
    Ok(encrypted.marshal())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &[u8] = b"HNHBK:1:3+000000000199+220+82410923+2+82410923:2'\
HIRMG:2:2+0010::Nachricht entgegengenommen.'\
HIRMS:3:2:3+3920::Zugelassene Verfahren:999'\
HISYN:4:3:3+fenway29'\
HNHBS:5:1+2'";

    #[test]
    fn parses_segments_in_wire_order() {
        let message = BankMessage::parse(RESPONSE, None).unwrap();
        assert_eq!(message.segments.len(), 5);
        assert_eq!(message.segment_number("HISYN"), Some(4));
        assert_eq!(message.segment_number("HIXXX"), None);
        let header = message.message_header().unwrap();
        assert_eq!(header.dialog_id, "82410923");
        assert_eq!(header.message_number, 2);
    }

    #[test]
    fn classifies_worst_outcome() {
        let message = BankMessage::parse(RESPONSE, None).unwrap();
        assert_eq!(message.outcome(), Some(AckClass::Warning));
        assert!(!message.has_error());
        let for_three = message.acknowledgements_for(3);
        assert_eq!(for_three.len(), 1);
        assert_eq!(for_three[0].code, 3920);
        assert_eq!(for_three[0].params, vec!["999"]);
    }

    #[test]
    fn sync_response_is_found() {
        let message = BankMessage::parse(RESPONSE, None).unwrap();
        assert_eq!(
            message.sync_response().unwrap().client_system_id,
            "fenway29"
        );
    }
}
