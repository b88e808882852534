//! Account business transactions: balance (HKSAL/HISAL) and statement
//! (HKKAZ/HIKAZ) requests and responses.

use crate::domain::{AccountConnection, Amount, Balance, Timeframe};
use crate::element::groups::{
    account_connection_elem, parse_account_connection, parse_amount, parse_balance,
};
use crate::element::types::{AlphaNumeric, Binary, Currency};
use crate::element::Elem;
use crate::error::Result;
use crate::segment::{RawSegment, SegmentHeader, WireSegment};

/// HKSAL v5 — requests the balance of one account (or all).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceRequest {
    header: SegmentHeader,
    pub account: AccountConnection,
    pub all_accounts: bool,
    pub max_entries: Option<u32>,
    pub continuation_reference: Option<String>,
}

impl BalanceRequest {
    pub fn new(account: AccountConnection, all_accounts: bool) -> Self {
        BalanceRequest {
            header: SegmentHeader::new("HKSAL", 5),
            account,
            all_accounts,
            max_entries: None,
            continuation_reference: None,
        }
    }

    /// Continues a paged response using the reference from acknowledgement
    /// code 3040.
    pub fn continued(mut self, reference: impl Into<String>) -> Self {
        self.continuation_reference = Some(reference.into());
        self
    }
}

impl WireSegment for BalanceRequest {
    fn header(&self) -> &SegmentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut SegmentHeader {
        &mut self.header
    }

    fn elements(&self) -> Vec<Elem> {
        vec![
            account_connection_elem(&self.account),
            Elem::YesNo(self.all_accounts),
            match self.max_entries {
                Some(n) => Elem::Num(n as i64),
                None => Elem::Empty,
            },
            match &self.continuation_reference {
                Some(r) => Elem::Alpha(r.clone()),
                None => Elem::Empty,
            },
        ]
    }
}

/// HISAL v5 — the balance response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceResponse {
    pub header: SegmentHeader,
    pub account: AccountConnection,
    pub product_name: String,
    pub currency: String,
    pub booked_balance: Balance,
    pub noted_balance: Option<Balance>,
    pub credit_limit: Option<Amount>,
    pub available_amount: Option<Amount>,
}

impl BalanceResponse {
    pub fn parse(raw: &RawSegment) -> Result<Self> {
        let account = parse_account_connection(raw.element(0)?)?;
        let product_name = AlphaNumeric::unmarshal(raw.element(1)?)?.into_string();
        let currency = Currency::unmarshal(raw.element(2)?)?.as_str().to_owned();
        let booked_balance = parse_balance(raw.element(3)?)?;
        let noted_balance = match raw.optional_element(4) {
            Some(bytes) => Some(parse_balance(bytes)?),
            None => None,
        };
        let credit_limit = match raw.optional_element(5) {
            Some(bytes) => Some(parse_amount(bytes)?),
            None => None,
        };
        let available_amount = match raw.optional_element(6) {
            Some(bytes) => Some(parse_amount(bytes)?),
            None => None,
        };
        Ok(BalanceResponse {
            header: raw.header.clone(),
            account,
            product_name,
            currency,
            booked_balance,
            noted_balance,
            credit_limit,
            available_amount,
        })
    }
}

/// HKKAZ v5 — requests booked and unbooked transactions for a timeframe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionsRequest {
    header: SegmentHeader,
    pub account: AccountConnection,
    pub all_accounts: bool,
    pub timeframe: Option<Timeframe>,
    pub max_entries: Option<u32>,
    pub continuation_reference: Option<String>,
}

impl TransactionsRequest {
    pub fn new(account: AccountConnection, all_accounts: bool, timeframe: Option<Timeframe>) -> Self {
        TransactionsRequest {
            header: SegmentHeader::new("HKKAZ", 5),
            account,
            all_accounts,
            timeframe,
            max_entries: None,
            continuation_reference: None,
        }
    }

    pub fn continued(mut self, reference: impl Into<String>) -> Self {
        self.continuation_reference = Some(reference.into());
        self
    }
}

impl WireSegment for TransactionsRequest {
    fn header(&self) -> &SegmentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut SegmentHeader {
        &mut self.header
    }

    fn elements(&self) -> Vec<Elem> {
        let (start, end) = match self.timeframe {
            Some(tf) => (Elem::Date(tf.start_date), Elem::Date(tf.end_date)),
            None => (Elem::Empty, Elem::Empty),
        };
        vec![
            account_connection_elem(&self.account),
            Elem::YesNo(self.all_accounts),
            start,
            end,
            match self.max_entries {
                Some(n) => Elem::Num(n as i64),
                None => Elem::Empty,
            },
            match &self.continuation_reference {
                Some(r) => Elem::Alpha(r.clone()),
                None => Elem::Empty,
            },
        ]
    }
}

/// HIKAZ v5 — the statement response: booked transactions as an MT940 blob,
/// unbooked transactions as an MT942 blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionsResponse {
    pub header: SegmentHeader,
    pub booked: Vec<u8>,
    pub unbooked: Option<Vec<u8>>,
}

impl TransactionsResponse {
    pub fn parse(raw: &RawSegment) -> Result<Self> {
        let booked = Binary::unmarshal(raw.element(0)?)?.into_bytes();
        let unbooked = match raw.optional_element(1) {
            Some(bytes) => Some(Binary::unmarshal(bytes)?.into_bytes()),
            None => None,
        };
        Ok(TransactionsResponse {
            header: raw.header.clone(),
            booked,
            unbooked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn account() -> AccountConnection {
        AccountConnection {
            account_id: "1234567890".into(),
            sub_account_characteristics: String::new(),
            country_code: 280,
            bank_id: "10090000".into(),
        }
    }

    #[test]
    fn balance_request_marshals() {
        let seg = BalanceRequest::new(account(), false);
        assert_eq!(seg.marshal(), b"HKSAL:1:5+1234567890::280:10090000+N'");
    }

    #[test]
    fn transactions_request_with_timeframe() {
        let tf = Timeframe::new(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 31).unwrap(),
        )
        .unwrap();
        let seg = TransactionsRequest::new(account(), false, Some(tf));
        assert_eq!(
            seg.marshal(),
            b"HKKAZ:1:5+1234567890::280:10090000+N+20230101+20230131'"
        );
    }

    #[test]
    fn balance_response_parses() {
        let raw = RawSegment::parse(
            b"HISAL:5:5:3+1234567890::280:10090000+Girokonto+EUR+C:2473,01:EUR:20230412+++1000,:EUR",
        )
        .unwrap();
        let parsed = BalanceResponse::parse(&raw).unwrap();
        assert_eq!(parsed.booked_balance.amount.value, dec!(2473.01));
        assert_eq!(parsed.noted_balance, None);
        assert_eq!(parsed.credit_limit, None);
        assert_eq!(parsed.available_amount.as_ref().unwrap().value, dec!(1000));
    }

    #[test]
    fn transactions_response_extracts_blobs() {
        let raw = RawSegment::parse(b"HIKAZ:5:5:4+@10@:20:ref'+:6").unwrap();
        let parsed = TransactionsResponse::parse(&raw).unwrap();
        assert_eq!(parsed.booked, b":20:ref'+:6");
        assert_eq!(parsed.unbooked, None);
    }
}
