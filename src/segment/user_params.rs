//! User parameter data segments: HIUPA and HIUPD.

use crate::domain::{AccountInformation, UserParameterData};
use crate::element::groups::{parse_account_connection, parse_amount};
use crate::element::types::{AlphaNumeric, Currency, Identification, Numeric};
use crate::error::Result;
use crate::extractor::extract_group_elements;
use crate::segment::{RawSegment, SegmentHeader};

/// HIUPA v2 — the common user parameter snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonUserParameter {
    pub header: SegmentHeader,
    pub data: UserParameterData,
}

impl CommonUserParameter {
    pub fn parse(raw: &RawSegment) -> Result<Self> {
        let user_id = Identification::unmarshal(raw.element(0)?)?.as_str().to_owned();
        let version = Numeric::unmarshal(raw.element(1)?)?.value() as u32;
        let usage = Numeric::unmarshal(raw.element(2)?)?.value() as u32;
        Ok(CommonUserParameter {
            header: raw.header.clone(),
            data: UserParameterData {
                user_id,
                version,
                usage,
            },
        })
    }
}

/// HIUPD v4 — one account the user may address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInformationSegment {
    pub header: SegmentHeader,
    pub account: AccountInformation,
}

impl AccountInformationSegment {
    pub fn parse(raw: &RawSegment) -> Result<Self> {
        let account_connection = parse_account_connection(raw.element(0)?)?;
        let user_id = Identification::unmarshal(raw.element(1)?)?.as_str().to_owned();
        let currency = match raw.optional_element(2) {
            Some(bytes) => Some(Currency::unmarshal(bytes)?.as_str().to_owned()),
            None => None,
        };
        let name1 = match raw.optional_element(3) {
            Some(bytes) => AlphaNumeric::unmarshal(bytes)?.into_string(),
            None => String::new(),
        };
        let name2 = match raw.optional_element(4) {
            Some(bytes) => Some(AlphaNumeric::unmarshal(bytes)?.into_string()),
            None => None,
        };
        let product_id = match raw.optional_element(5) {
            Some(bytes) => Some(AlphaNumeric::unmarshal(bytes)?.into_string()),
            None => None,
        };
        let limit = match raw.optional_element(6) {
            // Limit group: kind, amount, currency, days. The amount group
            // sits at members 1..=2.
            Some(bytes) => {
                let parts = extract_group_elements(bytes)?;
                if parts.len() >= 3 {
                    let joined =
                        [parts[1].as_slice(), &b":"[..], parts[2].as_slice()].concat();
                    Some(parse_amount(&joined)?)
                } else {
                    None
                }
            }
            None => None,
        };
        // Remaining elements name the business transactions allowed for
        // this account, one group each: id, needed signatures, limit...
        let mut allowed_business_transactions = Vec::new();
        for element in raw.elements.iter().skip(7).filter(|e| !e.is_empty()) {
            let parts = extract_group_elements(element)?;
            if let Some(first) = parts.first().filter(|p| !p.is_empty()) {
                allowed_business_transactions.push(AlphaNumeric::unmarshal(first)?.into_string());
            }
        }
        Ok(AccountInformationSegment {
            header: raw.header.clone(),
            account: AccountInformation {
                account_connection,
                user_id,
                currency,
                name1,
                name2,
                product_id,
                limit,
                allowed_business_transactions,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_parameter_parses() {
        let raw = RawSegment::parse(b"HIUPA:5:2:3+user1+4+0").unwrap();
        let parsed = CommonUserParameter::parse(&raw).unwrap();
        assert_eq!(parsed.data.user_id, "user1");
        assert_eq!(parsed.data.version, 4);
        assert_eq!(parsed.data.usage, 0);
    }

    #[test]
    fn account_information_parses() {
        let raw = RawSegment::parse(
            b"HIUPD:6:4:3+1234567890::280:10090000+user1+EUR+MUSTERMANN+MAX++T:1000,:EUR:30+HKSAL:1+HKKAZ:1",
        )
        .unwrap();
        let parsed = AccountInformationSegment::parse(&raw).unwrap();
        let account = &parsed.account;
        assert_eq!(account.account_connection.account_id, "1234567890");
        assert_eq!(account.currency.as_deref(), Some("EUR"));
        assert_eq!(account.name1, "MUSTERMANN");
        assert_eq!(account.name2.as_deref(), Some("MAX"));
        assert_eq!(account.product_id, None);
        assert_eq!(
            account.allowed_business_transactions,
            vec!["HKSAL", "HKKAZ"]
        );
        let limit = account.limit.as_ref().unwrap();
        assert_eq!(limit.currency, "EUR");
    }
}
