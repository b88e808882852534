//! Value types shared across the protocol layers.
//!
//! Bounds are enforced at construction; the rest of the crate can treat a
//! constructed value as valid.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Client id used for anonymous dialogs.
pub const ANONYMOUS_CLIENT_ID: &str = "9999999999";

/// A bank endpoint identification: ISO-3166 numeric country code plus the
/// institute's id (in Germany the Bankleitzahl).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankId {
    pub country_code: u16,
    pub id: String,
}

impl BankId {
    pub fn new(country_code: u16, id: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();
        if id.is_empty() || id.len() > 30 {
            return Err(Error::FieldConstraint {
                field: "BankId.id",
                reason: format!("must be 1..=30 characters, got {}", id.len()),
            });
        }
        Ok(BankId { country_code, id })
    }

    /// German bank with the default country code 280.
    pub fn german(blz: impl Into<String>) -> Result<Self, Error> {
        BankId::new(280, blz)
    }
}

/// Identifies one account at one bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConnection {
    pub account_id: String,
    pub sub_account_characteristics: String,
    pub country_code: u16,
    pub bank_id: String,
}

/// A signed decimal with its ISO-4217 currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: Decimal,
    pub currency: String,
}

impl Amount {
    pub fn new(value: Decimal, currency: impl Into<String>) -> Result<Self, Error> {
        let currency = currency.into();
        if currency.len() != 3 || !currency.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(Error::FieldConstraint {
                field: "Amount.currency",
                reason: format!("must be 3 uppercase ASCII letters, got {currency:?}"),
            });
        }
        Ok(Amount { value, currency })
    }
}

/// A balance as transmitted by the bank. The sign lives in the amount; the
/// wire form combines a D/C indicator with an unsigned magnitude.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub amount: Amount,
    pub transmission_date: NaiveDate,
    pub transmission_time: Option<NaiveTime>,
}

/// Key classes of the RDH security scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    /// "S" — signing key.
    Signing,
    /// "V" — encryption key.
    Encryption,
    /// "B" — both; forbidden in key renewal and revocation segments.
    Both,
}

impl KeyType {
    pub fn code(self) -> &'static str {
        match self {
            KeyType::Signing => "S",
            KeyType::Encryption => "V",
            KeyType::Both => "B",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, Error> {
        match code {
            "S" => Ok(KeyType::Signing),
            "V" => Ok(KeyType::Encryption),
            "B" => Ok(KeyType::Both),
            other => Err(Error::FieldConstraint {
                field: "KeyType",
                reason: format!("unknown key type {other:?}"),
            }),
        }
    }
}

/// Names one key registered at the bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyName {
    pub bank_id: BankId,
    pub user_id: String,
    pub key_type: KeyType,
    pub key_number: u32,
    pub key_version: u32,
}

/// An RSA public key as carried in key-management segments. The raw
/// modulus/exponent stay opaque; interpreting them is the signer's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    pub key_type: KeyType,
    pub modulus: Vec<u8>,
    pub exponent: Vec<u8>,
}

/// Outcome class of an acknowledgement code, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AckClass {
    Info,
    Warning,
    Error,
}

/// One HIRMG/HIRMS entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    /// 4-digit outcome code.
    pub code: u16,
    /// The data element the entry refers to, verbatim.
    pub reference_element: String,
    pub text: String,
    pub params: Vec<String>,
    /// For segment-level entries: the request segment number referenced.
    pub referencing_segment: Option<u32>,
}

impl Acknowledgement {
    /// Class from the leading digit: 0xxx info, 3xxx warning, 9xxx error.
    /// Unknown leading digits default to informational.
    pub fn class(&self) -> AckClass {
        match self.code / 1000 {
            9 => AckClass::Error,
            3 => AckClass::Warning,
            _ => AckClass::Info,
        }
    }

    pub fn is_error(&self) -> bool {
        self.class() == AckClass::Error
    }

    pub fn is_warning(&self) -> bool {
        self.class() == AckClass::Warning
    }
}

/// Worst class present in a set of acknowledgements; `None` when empty.
pub fn worst_class(acks: &[Acknowledgement]) -> Option<AckClass> {
    acks.iter().map(Acknowledgement::class).max()
}

/// Dialog languages the protocol defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    German,
    English,
    French,
}

impl Language {
    pub fn code(self) -> u8 {
        match self {
            Language::German => 1,
            Language::English => 2,
            Language::French => 3,
        }
    }
}

/// Capability snapshot the bank returns at dialog initialization.
/// Read-only for the rest of the dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankParameterData {
    pub version: u32,
    pub bank_id: Option<BankId>,
    pub bank_name: String,
    pub max_transactions_per_message: u32,
    pub supported_languages: Vec<u8>,
    pub supported_hbci_versions: Vec<u16>,
    pub max_message_size: Option<u32>,
}

/// Per-user capability snapshot returned at dialog initialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserParameterData {
    pub user_id: String,
    pub version: u32,
    /// 0 = UPD covers all allowed transactions, 1 = unlisted ones may still
    /// be allowed.
    pub usage: u32,
}

/// One account entry of the UPD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInformation {
    pub account_connection: AccountConnection,
    pub user_id: String,
    pub currency: Option<String>,
    pub name1: String,
    pub name2: Option<String>,
    pub product_id: Option<String>,
    pub limit: Option<Amount>,
    pub allowed_business_transactions: Vec<String>,
}

/// A postal/contact address as carried in bank parameter segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub name1: String,
    pub name2: String,
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub country_code: u16,
    pub phone: String,
    pub fax: String,
    pub email: String,
}

/// Transport endpoint advertised via communication access segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunicationParameter {
    /// 2 = raw TCP, 3 = HTTPS.
    pub protocol: u16,
    pub address: String,
    pub address_addition: String,
    pub filter_function: Option<String>,
    pub filter_version: Option<u32>,
}

/// An inclusive date range for statement requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeframe {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Timeframe {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, Error> {
        if end_date < start_date {
            return Err(Error::FieldConstraint {
                field: "Timeframe",
                reason: format!("end date {end_date} precedes start date {start_date}"),
            });
        }
        Ok(Timeframe {
            start_date,
            end_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn bank_id_bound_is_checked_at_construction() {
        assert!(BankId::new(280, "10090000").is_ok());
        assert!(BankId::new(280, "x".repeat(31)).is_err());
        assert!(BankId::new(280, "").is_err());
    }

    #[test]
    fn amount_currency_must_be_three_uppercase_letters() {
        assert!(Amount::new(dec!(1.23), "EUR").is_ok());
        assert!(Amount::new(dec!(1.23), "eur").is_err());
        assert!(Amount::new(dec!(1.23), "EURO").is_err());
    }

    #[test]
    fn ack_class_from_leading_digit() {
        let ack = |code| Acknowledgement {
            code,
            reference_element: String::new(),
            text: String::new(),
            params: vec![],
            referencing_segment: None,
        };
        assert_eq!(ack(10).class(), AckClass::Info);
        assert_eq!(ack(3920).class(), AckClass::Warning);
        assert_eq!(ack(9800).class(), AckClass::Error);
        // Unknown leading digit falls back to informational.
        assert_eq!(ack(4711).class(), AckClass::Info);
    }

    #[test]
    fn worst_class_is_the_maximum() {
        let ack = |code| Acknowledgement {
            code,
            reference_element: String::new(),
            text: String::new(),
            params: vec![],
            referencing_segment: None,
        };
        assert_eq!(worst_class(&[]), None);
        assert_eq!(worst_class(&[ack(10), ack(3920)]), Some(AckClass::Warning));
        assert_eq!(
            worst_class(&[ack(10), ack(9340), ack(3920)]),
            Some(AckClass::Error)
        );
    }
}
