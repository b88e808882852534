//! Data-element groups: composite wire values.
//!
//! Marshalling is a pure function of a domain value plus the static member
//! order; parsing inverts it from the raw group bytes. No group holds a
//! reference to its owning segment.

use chrono::{NaiveDate, NaiveTime};

use crate::domain::{
    AccountConnection, Address, Amount, Balance, BankId, CommunicationParameter, KeyName, KeyType,
    PublicKey,
};
use crate::element::types::{
    self, AlphaNumeric, Binary, CountryCode, Currency, Identification, Numeric, Value,
};
use crate::element::Elem;
use crate::error::{Error, Result};
use crate::extractor::extract_group_elements;

fn group_err(group: &'static str, reason: impl Into<String>) -> Error {
    Error::FieldConstraint {
        field: group,
        reason: reason.into(),
    }
}

fn opt_text(raw: Option<&Vec<u8>>) -> Result<Option<String>> {
    match raw {
        Some(bytes) if !bytes.is_empty() => {
            Ok(Some(AlphaNumeric::unmarshal(bytes)?.into_string()))
        }
        _ => Ok(None),
    }
}

// --- Bank identification -------------------------------------------------

pub fn bank_identification_elem(bank: &BankId) -> Elem {
    Elem::Group(vec![
        Elem::Dig {
            value: bank.country_code as u64,
            width: 3,
        },
        Elem::Alpha(bank.id.clone()),
    ])
}

pub fn parse_bank_identification(raw: &[u8]) -> Result<BankId> {
    let parts = extract_group_elements(raw)?;
    if parts.len() < 2 {
        return Err(group_err("BankIdentification", "expected 2 members"));
    }
    let country = CountryCode::unmarshal(&parts[0])?;
    let id = AlphaNumeric::unmarshal(&parts[1])?;
    BankId::new(country.value(), id.into_string())
}

// --- Account connection --------------------------------------------------

pub fn account_connection_elem(conn: &AccountConnection) -> Elem {
    Elem::Group(vec![
        Elem::Alpha(conn.account_id.clone()),
        Elem::Alpha(conn.sub_account_characteristics.clone()),
        Elem::Dig {
            value: conn.country_code as u64,
            width: 3,
        },
        Elem::Alpha(conn.bank_id.clone()),
    ])
}

pub fn parse_account_connection(raw: &[u8]) -> Result<AccountConnection> {
    let parts = extract_group_elements(raw)?;
    if parts.len() < 4 {
        return Err(group_err("AccountConnection", "expected 4 members"));
    }
    Ok(AccountConnection {
        account_id: Identification::unmarshal(&parts[0])?.as_str().to_owned(),
        sub_account_characteristics: AlphaNumeric::unmarshal(&parts[1])?.into_string(),
        country_code: CountryCode::unmarshal(&parts[2])?.value(),
        bank_id: AlphaNumeric::unmarshal(&parts[3])?.into_string(),
    })
}

// --- Amount --------------------------------------------------------------

pub fn amount_elem(amount: &Amount) -> Elem {
    Elem::Group(vec![
        Elem::Val(amount.value),
        Elem::Alpha(amount.currency.clone()),
    ])
}

pub fn parse_amount(raw: &[u8]) -> Result<Amount> {
    let parts = extract_group_elements(raw)?;
    if parts.len() != 2 {
        return Err(group_err("Amount", "expected 2 members"));
    }
    let value = Value::unmarshal(&parts[0])?.value();
    let currency = Currency::unmarshal(&parts[1])?;
    Amount::new(value, currency.as_str())
}

// --- Balance -------------------------------------------------------------

/// The wire form carries a D/C indicator plus an unsigned magnitude; the
/// sign of the in-memory amount must survive the round trip.
pub fn balance_elem(balance: &Balance) -> Elem {
    let indicator = if balance.amount.value.is_sign_negative() {
        "D"
    } else {
        "C"
    };
    let mut members = vec![
        Elem::Alpha(indicator.into()),
        Elem::Val(balance.amount.value.abs()),
        Elem::Alpha(balance.amount.currency.clone()),
        Elem::Date(balance.transmission_date),
    ];
    members.push(match balance.transmission_time {
        Some(t) => Elem::Time(t),
        None => Elem::Empty,
    });
    Elem::Group(members)
}

pub fn parse_balance(raw: &[u8]) -> Result<Balance> {
    let parts = extract_group_elements(raw)?;
    if parts.len() < 4 {
        return Err(group_err("Balance", "expected at least 4 members"));
    }
    let magnitude = Value::unmarshal(&parts[1])?.value();
    let signed = match parts[0].as_slice() {
        b"D" => -magnitude,
        b"C" => magnitude,
        other => {
            return Err(group_err(
                "Balance",
                format!("bad debit/credit indicator {:?}", String::from_utf8_lossy(other)),
            ))
        }
    };
    let currency = Currency::unmarshal(&parts[2])?;
    let transmission_time = match parts.get(4) {
        Some(bytes) if !bytes.is_empty() => Some(types::parse_time(bytes)?),
        _ => None,
    };
    Ok(Balance {
        amount: Amount::new(signed, currency.as_str())?,
        transmission_date: types::parse_date(&parts[3])?,
        transmission_time,
    })
}

// --- Address -------------------------------------------------------------

pub fn address_elem(address: &Address) -> Elem {
    Elem::Group(vec![
        Elem::Alpha(address.name1.clone()),
        Elem::Alpha(address.name2.clone()),
        Elem::Alpha(address.street.clone()),
        Elem::Alpha(address.postal_code.clone()),
        Elem::Alpha(address.city.clone()),
        Elem::Dig {
            value: address.country_code as u64,
            width: 3,
        },
        Elem::Alpha(address.phone.clone()),
        Elem::Alpha(address.fax.clone()),
        Elem::Alpha(address.email.clone()),
    ])
}

pub fn parse_address(raw: &[u8]) -> Result<Address> {
    let parts = extract_group_elements(raw)?;
    if parts.len() < 6 {
        return Err(group_err("Address", "expected at least 6 members"));
    }
    let text = |i: usize| -> Result<String> {
        Ok(opt_text(parts.get(i))?.unwrap_or_default())
    };
    Ok(Address {
        name1: text(0)?,
        name2: text(1)?,
        street: text(2)?,
        postal_code: text(3)?,
        city: text(4)?,
        country_code: CountryCode::unmarshal(&parts[5])?.value(),
        phone: text(6)?,
        fax: text(7)?,
        email: text(8)?,
    })
}

// --- Key name ------------------------------------------------------------

pub fn key_name_elem(key: &KeyName) -> Elem {
    Elem::Group(vec![
        Elem::Dig {
            value: key.bank_id.country_code as u64,
            width: 3,
        },
        Elem::Alpha(key.bank_id.id.clone()),
        Elem::Alpha(key.user_id.clone()),
        Elem::Alpha(key.key_type.code().into()),
        Elem::Num(key.key_number as i64),
        Elem::Num(key.key_version as i64),
    ])
}

pub fn parse_key_name(raw: &[u8]) -> Result<KeyName> {
    let parts = extract_group_elements(raw)?;
    if parts.len() < 6 {
        return Err(group_err("KeyName", "expected 6 members"));
    }
    let country = CountryCode::unmarshal(&parts[0])?;
    let bank_id = BankId::new(country.value(), AlphaNumeric::unmarshal(&parts[1])?.into_string())?;
    Ok(KeyName {
        bank_id,
        user_id: Identification::unmarshal(&parts[2])?.as_str().to_owned(),
        key_type: KeyType::from_code(AlphaNumeric::unmarshal(&parts[3])?.as_str())?,
        key_number: Numeric::unmarshal(&parts[4])?.value() as u32,
        key_version: Numeric::unmarshal(&parts[5])?.value() as u32,
    })
}

// --- Reference message ---------------------------------------------------

/// Dialog id plus message number of a referenced message.
pub fn reference_message_elem(dialog_id: &str, message_number: u32) -> Elem {
    Elem::Group(vec![
        Elem::Alpha(dialog_id.to_owned()),
        Elem::Num(message_number as i64),
    ])
}

pub fn parse_reference_message(raw: &[u8]) -> Result<(String, u32)> {
    let parts = extract_group_elements(raw)?;
    if parts.len() != 2 {
        return Err(group_err("ReferenceMessage", "expected 2 members"));
    }
    Ok((
        Identification::unmarshal(&parts[0])?.as_str().to_owned(),
        Numeric::unmarshal(&parts[1])?.value() as u32,
    ))
}

// --- Capability lists ----------------------------------------------------

pub fn supported_languages_elem(languages: &[u8]) -> Elem {
    Elem::Group(languages.iter().map(|&l| Elem::Num(l as i64)).collect())
}

pub fn parse_supported_languages(raw: &[u8]) -> Result<Vec<u8>> {
    extract_group_elements(raw)?
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| Ok(Numeric::unmarshal(p)?.value() as u8))
        .collect()
}

pub fn supported_hbci_versions_elem(versions: &[u16]) -> Elem {
    Elem::Group(versions.iter().map(|&v| Elem::Num(v as i64)).collect())
}

pub fn parse_supported_hbci_versions(raw: &[u8]) -> Result<Vec<u16>> {
    extract_group_elements(raw)?
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| Ok(Numeric::unmarshal(p)?.value() as u16))
        .collect()
}

// --- Communication parameter ---------------------------------------------

pub fn communication_parameter_elem(params: &CommunicationParameter) -> Elem {
    Elem::Group(vec![
        Elem::Num(params.protocol as i64),
        Elem::Alpha(params.address.clone()),
        Elem::Alpha(params.address_addition.clone()),
        match &params.filter_function {
            Some(f) => Elem::Alpha(f.clone()),
            None => Elem::Empty,
        },
        match params.filter_version {
            Some(v) => Elem::Num(v as i64),
            None => Elem::Empty,
        },
    ])
}

pub fn parse_communication_parameter(raw: &[u8]) -> Result<CommunicationParameter> {
    let parts = extract_group_elements(raw)?;
    if parts.len() < 2 {
        return Err(group_err("CommunicationParameter", "expected 2 members"));
    }
    let filter_version = match parts.get(4) {
        Some(bytes) if !bytes.is_empty() => Some(Numeric::unmarshal(bytes)?.value() as u32),
        _ => None,
    };
    Ok(CommunicationParameter {
        protocol: Numeric::unmarshal(&parts[0])?.value() as u16,
        address: AlphaNumeric::unmarshal(&parts[1])?.into_string(),
        address_addition: opt_text(parts.get(2))?.unwrap_or_default(),
        filter_function: opt_text(parts.get(3))?,
        filter_version,
    })
}

// --- Security profile groups (HNSHK / HNVSK) -----------------------------

/// Security identification details: party function, optional CID, party id
/// (for PIN/TAN the client system id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityIdentification {
    pub party: u8,
    pub cid: Vec<u8>,
    pub party_id: String,
}

impl SecurityIdentification {
    /// Message-sender identification carrying the client system id.
    pub fn sender(party_id: impl Into<String>) -> Self {
        SecurityIdentification {
            party: 1,
            cid: Vec::new(),
            party_id: party_id.into(),
        }
    }

    pub fn to_elem(&self) -> Elem {
        Elem::Group(vec![
            Elem::Num(self.party as i64),
            if self.cid.is_empty() {
                Elem::Empty
            } else {
                Elem::Bin(self.cid.clone())
            },
            Elem::Alpha(self.party_id.clone()),
        ])
    }

    pub fn from_wire(raw: &[u8]) -> Result<Self> {
        let parts = extract_group_elements(raw)?;
        if parts.is_empty() {
            return Err(group_err("SecurityIdentification", "empty group"));
        }
        let cid = match parts.get(1) {
            Some(bytes) if !bytes.is_empty() => Binary::unmarshal(bytes)?.into_bytes(),
            _ => Vec::new(),
        };
        Ok(SecurityIdentification {
            party: Numeric::unmarshal(&parts[0])?.value() as u8,
            cid,
            party_id: opt_text(parts.get(2))?.unwrap_or_default(),
        })
    }
}

/// Security timestamp: kind (1 = security timestamp, 6 = certificate
/// revocation time), date, time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityDate {
    pub kind: u8,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
}

impl SecurityDate {
    pub fn timestamp(date: NaiveDate, time: NaiveTime) -> Self {
        SecurityDate {
            kind: 1,
            date,
            time: Some(time),
        }
    }

    pub fn to_elem(&self) -> Elem {
        Elem::Group(vec![
            Elem::Num(self.kind as i64),
            Elem::Date(self.date),
            match self.time {
                Some(t) => Elem::Time(t),
                None => Elem::Empty,
            },
        ])
    }

    pub fn from_wire(raw: &[u8]) -> Result<Self> {
        let parts = extract_group_elements(raw)?;
        if parts.len() < 2 {
            return Err(group_err("SecurityDate", "expected at least 2 members"));
        }
        let time = match parts.get(2) {
            Some(bytes) if !bytes.is_empty() => Some(types::parse_time(bytes)?),
            _ => None,
        };
        Ok(SecurityDate {
            kind: Numeric::unmarshal(&parts[0])?.value() as u8,
            date: types::parse_date(&parts[1])?,
            time,
        })
    }
}

/// Hash algorithm profile. PIN/TAN pins usage 1, algorithm 999 (none),
/// parameter designator 1.
pub fn hash_algorithm_elem(algorithm: u16) -> Elem {
    Elem::Group(vec![
        Elem::Num(1),
        Elem::Num(algorithm as i64),
        Elem::Num(1),
    ])
}

/// Signature algorithm profile. PIN/TAN pins usage 6, algorithm 10 (RSA
/// placeholder), operation mode 16 (ISO 9796-1 placeholder).
pub fn signature_algorithm_elem(algorithm: u16, operation_mode: u16) -> Elem {
    Elem::Group(vec![
        Elem::Num(6),
        Elem::Num(algorithm as i64),
        Elem::Num(operation_mode as i64),
    ])
}

/// Encryption algorithm profile for HNVSK: usage 2 (OSY), operation mode,
/// algorithm, message key (binary), key designator 5, init designator 1.
pub fn encryption_algorithm_elem(operation_mode: u16, algorithm: u16, message_key: &[u8]) -> Elem {
    Elem::Group(vec![
        Elem::Num(2),
        Elem::Num(operation_mode as i64),
        Elem::Num(algorithm as i64),
        Elem::Bin(message_key.to_vec()),
        Elem::Num(5),
        Elem::Num(1),
    ])
}

// --- Public key value ----------------------------------------------------

/// Public key group for key management: usage, operation mode, algorithm,
/// modulus + designator 12, exponent + designator 13.
pub fn public_key_elem(key: &PublicKey) -> Elem {
    let usage = match key.key_type {
        KeyType::Encryption => 5,
        _ => 6,
    };
    Elem::Group(vec![
        Elem::Num(usage),
        Elem::Num(16),
        Elem::Num(10),
        Elem::Bin(key.modulus.clone()),
        Elem::Num(12),
        Elem::Bin(key.exponent.clone()),
        Elem::Num(13),
    ])
}

pub fn parse_public_key(raw: &[u8]) -> Result<PublicKey> {
    let parts = extract_group_elements(raw)?;
    if parts.len() < 6 {
        return Err(group_err("PublicKey", "expected at least 6 members"));
    }
    let usage = Numeric::unmarshal(&parts[0])?.value();
    let key_type = if usage == 5 {
        KeyType::Encryption
    } else {
        KeyType::Signing
    };
    Ok(PublicKey {
        key_type,
        modulus: Binary::unmarshal(&parts[3])?.into_bytes(),
        exponent: Binary::unmarshal(&parts[5])?.into_bytes(),
    })
}

// --- Opaque parameter clusters -------------------------------------------

/// Business-transaction parameters are bank-defined; carry them verbatim.
pub fn raw_parameter_elem(raw: &[u8]) -> Elem {
    Elem::Raw(raw.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn wire(elem: Elem) -> Vec<u8> {
        let mut out = Vec::new();
        elem.marshal_into(&mut out);
        out
    }

    #[test]
    fn bank_identification_round_trip() {
        let bank = BankId::new(280, "10090000").unwrap();
        let bytes = wire(bank_identification_elem(&bank));
        assert_eq!(bytes, b"280:10090000");
        assert_eq!(parse_bank_identification(&bytes).unwrap(), bank);
    }

    #[test]
    fn balance_sign_round_trip() {
        let date = NaiveDate::from_ymd_opt(2023, 4, 12).unwrap();
        for (value, indicator) in [(dec!(-123.45), &b"D"[..]), (dec!(123.45), &b"C"[..])] {
            let balance = Balance {
                amount: Amount::new(value, "EUR").unwrap(),
                transmission_date: date,
                transmission_time: None,
            };
            let bytes = wire(balance_elem(&balance));
            assert!(bytes.starts_with(indicator), "wire {:?}", bytes);
            let parsed = parse_balance(&bytes).unwrap();
            assert_eq!(parsed.amount.value, value);
        }
    }

    #[test]
    fn zero_balance_is_credit() {
        let balance = Balance {
            amount: Amount::new(dec!(0), "EUR").unwrap(),
            transmission_date: NaiveDate::from_ymd_opt(2023, 4, 12).unwrap(),
            transmission_time: None,
        };
        assert!(wire(balance_elem(&balance)).starts_with(b"C"));
    }

    #[test]
    fn key_name_round_trip() {
        let key = KeyName {
            bank_id: BankId::new(280, "10090000").unwrap(),
            user_id: "user1".into(),
            key_type: KeyType::Signing,
            key_number: 1,
            key_version: 3,
        };
        let bytes = wire(key_name_elem(&key));
        assert_eq!(bytes, b"280:10090000:user1:S:1:3");
        assert_eq!(parse_key_name(&bytes).unwrap(), key);
    }

    #[test]
    fn account_connection_round_trip() {
        let conn = AccountConnection {
            account_id: "1234567890".into(),
            sub_account_characteristics: String::new(),
            country_code: 280,
            bank_id: "10090000".into(),
        };
        let bytes = wire(account_connection_elem(&conn));
        assert_eq!(bytes, b"1234567890::280:10090000");
        assert_eq!(parse_account_connection(&bytes).unwrap(), conn);
    }

    #[test]
    fn supported_versions_parse() {
        assert_eq!(
            parse_supported_hbci_versions(b"201:210:220").unwrap(),
            vec![201, 210, 220]
        );
    }
}
