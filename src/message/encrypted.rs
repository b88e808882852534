//! Applying the encryption envelope: re-wrapping a (signed) message as
//! `[HNHBK, HNVSK, HNVSD, HNHBS]`.

use chrono::Utc;

use crate::domain::{BankId, KeyName, KeyType};
use crate::error::Result;
use crate::message::ClientMessage;
use crate::security::CryptoProvider;
use crate::segment::encryption::{EncryptedData, EncryptionHeader};
use crate::segment::message::{MessageEnd, MessageHeader};
use crate::segment::WireSegment;

fn skeleton_key_name() -> KeyName {
    KeyName {
        bank_id: BankId {
            country_code: 280,
            id: "0".to_owned(),
        },
        user_id: "0".to_owned(),
        key_type: KeyType::Encryption,
        key_number: 0,
        key_version: 0,
    }
}

/// The encrypted form of a client message. The message header and end are
/// carried in the clear; everything between them is the opaque payload of
/// the HNVSD segment.
pub struct EncryptedMessage {
    pub(crate) header: MessageHeader,
    pub(crate) encryption_header: EncryptionHeader,
    pub(crate) data: EncryptedData,
    pub(crate) end: MessageEnd,
}

impl EncryptedMessage {
    fn render(&self) -> Vec<u8> {
        let mut out = self.header.marshal();
        out.extend_from_slice(&self.encryption_header.marshal());
        out.extend_from_slice(&self.data.marshal());
        out.extend_from_slice(&self.end.marshal());
        out
    }

    /// Marshals with the same two-pass sizing contract as the plain form:
    /// the emitted size field equals the emitted length.
    pub fn marshal(&mut self) -> Vec<u8> {
        let draft = self.render();
        self.header.set_size(draft.len() as u64);
        self.render()
    }
}

impl ClientMessage {
    /// Encrypts the payload `[HNSHK, body.., HNSHA]` and re-wraps it.
    ///
    /// The wrapper keeps the outer numbering: the header stays 1, the end
    /// keeps its ordinal from the plain assembly, and the wire pins HNVSK
    /// at 998 and HNVSD at 999.
    pub fn encrypt(&mut self, provider: &dyn CryptoProvider) -> Result<EncryptedMessage> {
        self.renumber();
        let payload = self.encryptable_payload();
        let ciphertext = provider.encrypt(&payload)?;

        let now = Utc::now().naive_utc();
        let mut encryption_header =
            EncryptionHeader::pin_tan("0", now.date(), now.time(), skeleton_key_name());
        provider.write_encryption_header(&mut encryption_header);

        Ok(EncryptedMessage {
            header: self.header.clone(),
            encryption_header,
            data: EncryptedData::new(ciphertext),
            end: self.end.clone(),
        })
    }
}
