//! MT942 interim transaction report decoding.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::error::Result;
use crate::swift::mt940::{parse_details, parse_transaction, Transaction};
use crate::swift::{parse_swift_amount, split_records, swift_err, TagRecord};

/// Debit or credit total of an interim report (`:90D:` / `:90C:`):
/// entry count, currency, summed amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionTotal {
    pub count: u32,
    pub currency: String,
    pub amount: Decimal,
}

/// The floor limit (`:34F:`) an entry must exceed to be reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloorLimit {
    pub currency: String,
    /// `D` or `C` when the limit applies to one side only.
    pub indicator: Option<char>,
    pub amount: Decimal,
}

/// One MT942 interim report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterimReport {
    /// `:20:`
    pub reference: String,
    /// `:25:`
    pub account_id: String,
    /// `:28C:` raw statement/sequence value.
    pub statement_number: Option<String>,
    /// `:34F:` — debit limit first; a second record is the credit limit.
    pub floor_limits: Vec<FloorLimit>,
    /// `:13:` / `:13D:` — when the report was created.
    pub created_at: Option<NaiveDateTime>,
    pub transactions: Vec<Transaction>,
    /// `:90D:`
    pub debit_total: Option<TransactionTotal>,
    /// `:90C:`
    pub credit_total: Option<TransactionTotal>,
}

/// Decodes every interim report in an HIKAZ unbooked-transactions blob.
pub fn parse_reports(blob: &[u8]) -> Result<Vec<InterimReport>> {
    split_records(blob)?
        .into_iter()
        .map(|records| parse_report(&records))
        .collect()
}

fn parse_report(records: &[TagRecord]) -> Result<InterimReport> {
    let mut report = InterimReport {
        reference: String::new(),
        account_id: String::new(),
        statement_number: None,
        floor_limits: Vec::new(),
        created_at: None,
        transactions: Vec::new(),
        debit_total: None,
        credit_total: None,
    };
    for record in records {
        match record.tag.as_str() {
            "20" => report.reference = record.value.clone(),
            "25" => report.account_id = record.value.clone(),
            "28C" => report.statement_number = Some(record.value.clone()),
            "34F" => report
                .floor_limits
                .push(parse_floor_limit(&record.value, record.line)?),
            "13" | "13D" => {
                report.created_at = Some(parse_creation_time(&record.value, record.line)?)
            }
            "61" => report
                .transactions
                .push(parse_transaction(&record.value, record.line)?),
            "86" => {
                let transaction = report.transactions.last_mut().ok_or_else(|| {
                    swift_err(record.line, ":86: without a preceding :61:")
                })?;
                transaction.information = record.value.clone();
                transaction.details = parse_details(&record.value);
            }
            "90D" => report.debit_total = Some(parse_total(&record.value, record.line)?),
            "90C" => report.credit_total = Some(parse_total(&record.value, record.line)?),
            _ => {}
        }
    }
    Ok(report)
}

/// `YYMMDDHHMM[+ZZZZ]`; the zone offset is ignored.
fn parse_creation_time(value: &str, line: usize) -> Result<NaiveDateTime> {
    if value.len() < 10 || !value.as_bytes()[..10].iter().all(u8::is_ascii_digit) {
        return Err(swift_err(line, format!("malformed creation time: {value:?}")));
    }
    let date = NaiveDate::parse_from_str(&value[..6], "%y%m%d")
        .map_err(|e| swift_err(line, format!("bad creation date: {e}")))?;
    let time = NaiveTime::parse_from_str(&value[6..10], "%H%M")
        .map_err(|e| swift_err(line, format!("bad creation time: {e}")))?;
    Ok(date.and_time(time))
}

/// `CCY[D|C]amount`.
fn parse_floor_limit(value: &str, line: usize) -> Result<FloorLimit> {
    if value.len() < 4 || !value.is_char_boundary(3) {
        return Err(swift_err(line, format!("malformed floor limit: {value:?}")));
    }
    let (currency, rest) = value.split_at(3);
    let (indicator, amount_text) = match rest.chars().next() {
        Some(c @ ('D' | 'C')) => (Some(c), &rest[1..]),
        _ => (None, rest),
    };
    Ok(FloorLimit {
        currency: currency.to_owned(),
        indicator,
        amount: parse_swift_amount(amount_text, line)?,
    })
}

/// `<count>CCY<amount>`.
fn parse_total(value: &str, line: usize) -> Result<TransactionTotal> {
    let digits_end = value
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| swift_err(line, format!("total has no currency: {value:?}")))?;
    let count = value[..digits_end]
        .parse::<u32>()
        .map_err(|_| swift_err(line, format!("bad entry count in {value:?}")))?;
    if value.len() < digits_end + 3 || !value.is_char_boundary(digits_end + 3) {
        return Err(swift_err(line, format!("total too short: {value:?}")));
    }
    let currency = &value[digits_end..digits_end + 3];
    let amount = parse_swift_amount(&value[digits_end + 3..], line)?;
    Ok(TransactionTotal {
        count,
        currency: currency.to_owned(),
        amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn interim_report_parses() {
        let blob = b":20:REF456\r\n:25:10090000/1234567890\r\n:28C:3\r\n\
:34F:EURD5,\r\n:34F:EURC10,\r\n:13D:2301021530+0100\r\n\
:61:2301020102C250,00NTRFNONREF\r\n\
:86:166?00GUTSCHRIFT?20Gehalt\r\n\
:90D:0EUR0,\r\n:90C:1EUR250,\r\n-\r\n";
        let reports = parse_reports(blob).unwrap();
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.reference, "REF456");
        assert_eq!(report.floor_limits.len(), 2);
        assert_eq!(report.floor_limits[0].indicator, Some('D'));
        assert_eq!(report.floor_limits[0].amount, dec!(5));
        let created = report.created_at.unwrap();
        assert_eq!(
            created.date(),
            NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
        );
        assert_eq!(report.transactions.len(), 1);
        let credit = report.credit_total.as_ref().unwrap();
        assert_eq!(credit.count, 1);
        assert_eq!(credit.amount, dec!(250));
        assert_eq!(report.debit_total.as_ref().unwrap().count, 0);
    }

    #[test]
    fn totals_require_currency() {
        assert!(parse_total("42", 1).is_err());
        let total = parse_total("3EUR99,95", 1).unwrap();
        assert_eq!(total.count, 3);
        assert_eq!(total.currency, "EUR");
        assert_eq!(total.amount, dec!(99.95));
    }
}
