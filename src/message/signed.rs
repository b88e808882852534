//! Applying the signature envelope to a client message.

use chrono::Utc;

use crate::domain::{BankId, KeyName, KeyType};
use crate::error::Result;
use crate::message::ClientMessage;
use crate::security::SignatureProvider;
use crate::segment::signature::{SignatureEnd, SignatureHeader};

/// Control reference linking header and trailer. PIN/TAN banks accept a
/// constant; RDH providers may overwrite it via the header skeleton.
const CONTROL_REFERENCE: &str = "1";

fn skeleton_key_name() -> KeyName {
    KeyName {
        bank_id: BankId {
            country_code: 280,
            id: "0".to_owned(),
        },
        user_id: "0".to_owned(),
        key_type: KeyType::Signing,
        key_number: 0,
        key_version: 0,
    }
}

impl ClientMessage {
    /// Inserts the signature envelope and signs the span it covers.
    ///
    /// The resulting sequence is `[header, HNSHK, body.., HNSHA, end]`;
    /// segment numbers are rewritten before the payload is handed to the
    /// provider, so the signed bytes match what is emitted.
    pub fn sign(&mut self, provider: &dyn SignatureProvider) -> Result<()> {
        let now = Utc::now().naive_utc();
        let mut signature_header = SignatureHeader::pin_tan(
            CONTROL_REFERENCE,
            "0",
            now.date(),
            now.time(),
            skeleton_key_name(),
        )?;
        provider.write_signature_header(&mut signature_header);
        let signature_end = SignatureEnd::new(&signature_header.control_reference)?;

        self.signature_header = Some(signature_header);
        self.signature_end = Some(signature_end);
        self.renumber();

        let payload = self.signed_payload();
        let signature = provider.sign(&payload)?;
        let trailer = self
            .signature_end
            .as_mut()
            .expect("signature end inserted above");
        provider.write_signature(trailer, signature)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::BodySegment;
    use crate::security::PinTanSignatureProvider;
    use crate::segment::account::BalanceRequest;
    use crate::segment::WireSegment;

    fn provider() -> PinTanSignatureProvider {
        PinTanSignatureProvider::new(BankId::new(280, "10090000").unwrap(), "user1", "secret")
    }

    fn body_segment() -> BodySegment {
        let account = crate::domain::AccountConnection {
            account_id: "1234567890".into(),
            sub_account_characteristics: String::new(),
            country_code: 280,
            bank_id: "10090000".into(),
        };
        Box::new(BalanceRequest::new(account, false))
    }

    #[test]
    fn signature_envelope_wraps_body() {
        let mut message =
            ClientMessage::new(220, "0", 1, vec![body_segment(), body_segment()]).unwrap();
        message.sign(&provider()).unwrap();

        // [H, SH, B1, B2, SE, E] numbered 1..=6.
        assert_eq!(message.header.header().number, 1);
        assert_eq!(
            message.signature_header.as_ref().unwrap().header().number,
            2
        );
        assert_eq!(message.body[0].header().number, 3);
        assert_eq!(message.body[1].header().number, 4);
        assert_eq!(message.signature_end.as_ref().unwrap().header().number, 5);
        assert_eq!(message.end.header().number, 6);
    }

    #[test]
    fn signed_message_carries_pin() {
        let mut message = ClientMessage::new(220, "0", 1, vec![body_segment()]).unwrap();
        message.sign(&provider()).unwrap();
        let trailer = message.signature_end.as_ref().unwrap();
        assert_eq!(trailer.pin.as_deref(), Some("secret"));
        let bytes = message.marshal();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("HNSHA:4:1+1++secret'"), "{text}");
    }

    #[test]
    fn signed_payload_covers_header_and_body_only() {
        let mut message = ClientMessage::new(220, "0", 1, vec![body_segment()]).unwrap();
        message.sign(&provider()).unwrap();
        let payload = message.signed_payload();
        let text = String::from_utf8_lossy(&payload);
        assert!(text.starts_with("HNSHK:2:3+999+"));
        assert!(text.contains("HKSAL:3:5+"));
        assert!(!text.contains("HNSHA"));
        assert!(!text.contains("HNHBK"));
    }
}
