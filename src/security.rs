//! Signature and encryption delegates.
//!
//! The message layer never touches key material: it hands the envelope
//! segments and the payload bytes to a [`SignatureProvider`] and a
//! [`CryptoProvider`]. The PIN/TAN implementations live here; RDH
//! implementations hold RSA key material and stay outside this crate.
//! Providers are stateless from the core's point of view; one that keeps
//! internal state must synchronise itself.

use crate::domain::{BankId, KeyName, KeyType};
use crate::error::{Error, Result};
use crate::segment::encryption::EncryptionHeader;
use crate::segment::signature::{SignatureEnd, SignatureHeader};

/// Signs the span between signature header and trailer.
pub trait SignatureProvider: Send + Sync {
    /// Fills the identification and algorithm fields of a skeleton header.
    fn write_signature_header(&self, header: &mut SignatureHeader);

    /// Produces the signature value over the payload bytes.
    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>>;

    /// Places the signature value in the trailer.
    fn write_signature(&self, trailer: &mut SignatureEnd, signature: Vec<u8>) -> Result<()>;

    /// Adopts the client system id assigned during synchronisation.
    fn set_client_system_id(&mut self, _client_system_id: &str) {}
}

/// Encrypts and decrypts the opaque message payload.
pub trait CryptoProvider: Send + Sync {
    /// Fills the identification and algorithm fields of a skeleton header.
    fn write_encryption_header(&self, header: &mut EncryptionHeader);

    fn encrypt(&self, payload: &[u8]) -> Result<Vec<u8>>;

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Adopts the client system id assigned during synchronisation.
    fn set_client_system_id(&mut self, _client_system_id: &str) {}
}

/// A key name that carries no real key: PIN/TAN dialogs have no
/// bank-registered key pair, but the envelope still names one.
pub fn pin_tan_key_name(bank_id: BankId, user_id: impl Into<String>, key_type: KeyType) -> KeyName {
    KeyName {
        bank_id,
        user_id: user_id.into(),
        key_type,
        key_number: 0,
        key_version: 0,
    }
}

/// PIN/TAN signing: the "signature" is the PIN (and optional TAN) carried
/// in the trailer's user-signature field; `sign` produces no bytes.
pub struct PinTanSignatureProvider {
    bank_id: BankId,
    user_id: String,
    client_system_id: String,
    pin: String,
    tan: Option<String>,
}

impl PinTanSignatureProvider {
    pub fn new(bank_id: BankId, user_id: &str, pin: &str) -> Self {
        PinTanSignatureProvider {
            bank_id,
            user_id: user_id.to_owned(),
            client_system_id: "0".to_owned(),
            pin: pin.to_owned(),
            tan: None,
        }
    }

    /// Arms a TAN for the next signed message.
    pub fn set_tan(&mut self, tan: Option<String>) {
        self.tan = tan;
    }
}

impl SignatureProvider for PinTanSignatureProvider {
    fn write_signature_header(&self, header: &mut SignatureHeader) {
        header.security_id.party_id = self.client_system_id.clone();
        header.key_name = pin_tan_key_name(
            self.bank_id.clone(),
            self.user_id.clone(),
            KeyType::Signing,
        );
    }

    fn sign(&self, _payload: &[u8]) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn write_signature(&self, trailer: &mut SignatureEnd, _signature: Vec<u8>) -> Result<()> {
        if self.pin.is_empty() {
            return Err(Error::Crypto("PIN must not be empty".into()));
        }
        trailer.set_pin_tan(&self.pin, self.tan.as_deref());
        Ok(())
    }

    fn set_client_system_id(&mut self, client_system_id: &str) {
        self.client_system_id = client_system_id.to_owned();
    }
}

/// PIN/TAN "encryption": the payload is carried in plaintext (transport
/// security comes from TLS), but the bank still requires the envelope with
/// the proper profile.
pub struct PinTanCryptoProvider {
    bank_id: BankId,
    user_id: String,
    client_system_id: String,
}

impl PinTanCryptoProvider {
    pub fn new(bank_id: BankId, user_id: &str) -> Self {
        PinTanCryptoProvider {
            bank_id,
            user_id: user_id.to_owned(),
            client_system_id: "0".to_owned(),
        }
    }
}

impl CryptoProvider for PinTanCryptoProvider {
    fn write_encryption_header(&self, header: &mut EncryptionHeader) {
        header.security_id.party_id = self.client_system_id.clone();
        header.key_name = pin_tan_key_name(
            self.bank_id.clone(),
            self.user_id.clone(),
            KeyType::Encryption,
        );
    }

    fn encrypt(&self, payload: &[u8]) -> Result<Vec<u8>> {
        Ok(payload.to_vec())
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        Ok(ciphertext.to_vec())
    }

    fn set_client_system_id(&mut self, client_system_id: &str) {
        self.client_system_id = client_system_id.to_owned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> BankId {
        BankId::new(280, "10090000").unwrap()
    }

    #[test]
    fn pin_tan_signature_is_the_pin() {
        let provider = PinTanSignatureProvider::new(bank(), "user1", "secret");
        let signature = provider.sign(b"payload").unwrap();
        assert!(signature.is_empty());
        let mut trailer = SignatureEnd::new("1").unwrap();
        provider.write_signature(&mut trailer, signature).unwrap();
        assert_eq!(trailer.pin.as_deref(), Some("secret"));
        assert_eq!(trailer.tan, None);
    }

    #[test]
    fn empty_pin_is_rejected_at_signing() {
        let provider = PinTanSignatureProvider::new(bank(), "user1", "");
        let mut trailer = SignatureEnd::new("1").unwrap();
        assert!(provider.write_signature(&mut trailer, Vec::new()).is_err());
    }

    #[test]
    fn pin_tan_crypto_is_identity() {
        let provider = PinTanCryptoProvider::new(bank(), "user1");
        let payload = b"HNSHK:2:3+999'".to_vec();
        let ciphertext = provider.encrypt(&payload).unwrap();
        assert_eq!(provider.decrypt(&ciphertext).unwrap(), payload);
    }
}
