//! Message assembly: segment sequencing, renumbering, sizing, and the
//! signature and encryption envelopes.

pub mod bank;
pub mod encrypted;
pub mod signed;

pub use bank::BankMessage;
pub use encrypted::EncryptedMessage;

use crate::error::Result;
use crate::segment::message::{MessageEnd, MessageHeader};
use crate::segment::signature::{SignatureEnd, SignatureHeader};
use crate::segment::WireSegment;

/// A body segment: boxed so one message can mix segment types.
pub type BodySegment = Box<dyn WireSegment + Send + Sync>;

/// An outgoing message: header, optional signature envelope, body, end.
///
/// The envelope halves are explicit options; when a signature is present
/// both halves are, by construction.
pub struct ClientMessage {
    pub(crate) header: MessageHeader,
    pub(crate) signature_header: Option<SignatureHeader>,
    pub(crate) body: Vec<BodySegment>,
    pub(crate) signature_end: Option<SignatureEnd>,
    pub(crate) end: MessageEnd,
}

impl ClientMessage {
    pub fn new(
        hbci_version: u16,
        dialog_id: &str,
        message_number: u32,
        body: Vec<BodySegment>,
    ) -> Result<Self> {
        Ok(ClientMessage {
            header: MessageHeader::new(hbci_version, dialog_id, message_number)?,
            signature_header: None,
            body,
            signature_end: None,
            end: MessageEnd::new(message_number),
        })
    }

    /// Rewrites every segment number to its 1-based ordinal position.
    pub fn renumber(&mut self) {
        let mut next = {
            let mut n = 0u32;
            move || {
                n += 1;
                n
            }
        };
        self.header.header_mut().number = next();
        if let Some(signature_header) = &mut self.signature_header {
            signature_header.header_mut().number = next();
        }
        for segment in &mut self.body {
            segment.header_mut().number = next();
        }
        if let Some(signature_end) = &mut self.signature_end {
            signature_end.header_mut().number = next();
        }
        self.end.header_mut().number = next();
    }

    fn render(&self) -> Vec<u8> {
        let mut out = self.header.marshal();
        if let Some(signature_header) = &self.signature_header {
            out.extend_from_slice(&signature_header.marshal());
        }
        for segment in &self.body {
            out.extend_from_slice(&segment.marshal());
        }
        if let Some(signature_end) = &self.signature_end {
            out.extend_from_slice(&signature_end.marshal());
        }
        out.extend_from_slice(&self.end.marshal());
        out
    }

    /// Marshals the full message. Two passes: the first measures, the
    /// second emits with the real size. The size field has a fixed width,
    /// so the measured length is exact.
    pub fn marshal(&mut self) -> Vec<u8> {
        self.renumber();
        let draft = self.render();
        self.header.set_size(draft.len() as u64);
        self.render()
    }

    /// The bytes the signature covers: signature header plus body.
    pub(crate) fn signed_payload(&self) -> Vec<u8> {
        let mut out = Vec::new();
        if let Some(signature_header) = &self.signature_header {
            out.extend_from_slice(&signature_header.marshal());
        }
        for segment in &self.body {
            out.extend_from_slice(&segment.marshal());
        }
        out
    }

    /// The bytes the encrypter receives: signature envelope plus body.
    pub(crate) fn encryptable_payload(&self) -> Vec<u8> {
        let mut out = self.signed_payload();
        if let Some(signature_end) = &self.signature_end {
            out.extend_from_slice(&signature_end.marshal());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::dialog::DialogEnd;

    fn message_with_body(count: usize) -> ClientMessage {
        let body: Vec<BodySegment> = (0..count)
            .map(|_| Box::new(DialogEnd::new("42").unwrap()) as BodySegment)
            .collect();
        ClientMessage::new(220, "42", 3, body).unwrap()
    }

    #[test]
    fn renumbering_is_ordinal() {
        let mut message = message_with_body(2);
        message.renumber();
        assert_eq!(message.header.header().number, 1);
        assert_eq!(message.body[0].header().number, 2);
        assert_eq!(message.body[1].header().number, 3);
        assert_eq!(message.end.header().number, 4);
    }

    #[test]
    fn size_equals_marshalled_length() {
        let mut message = message_with_body(1);
        let bytes = message.marshal();
        assert_eq!(message.header.size, bytes.len() as u64);
        // The emitted size field carries the same value.
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with(&format!("HNHBK:1:3+{:012}+220+42+3'", bytes.len())));
    }

    #[test]
    fn message_number_is_carried_in_header_and_end() {
        let mut message = message_with_body(1);
        let bytes = message.marshal();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.ends_with("HNHBS:3:1+3'"));
    }
}
