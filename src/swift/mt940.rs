//! MT940 account statement decoding.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::domain::Balance;
use crate::error::Result;
use crate::swift::{
    parse_swift_amount, parse_swift_balance, parse_swift_date, split_records, swift_err, TagRecord,
};

/// Direction of a statement entry, including reversals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitCredit {
    Debit,
    Credit,
    ReverseDebit,
    ReverseCredit,
}

impl DebitCredit {
    pub fn is_debit(self) -> bool {
        matches!(self, DebitCredit::Debit | DebitCredit::ReverseDebit)
    }
}

/// One `:61:` entry with its optional `:86:` remittance details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub value_date: NaiveDate,
    pub entry_date: NaiveDate,
    pub indicator: DebitCredit,
    /// Third letter of the currency when the bank sends it.
    pub funds_code: Option<char>,
    /// Unsigned magnitude; the sign lives in the indicator.
    pub amount: Decimal,
    /// Four-character transaction type, e.g. `NMSC`.
    pub transaction_type: String,
    pub customer_reference: String,
    /// Reference after `//`, when present.
    pub bank_reference: Option<String>,
    /// The raw `:86:` value, verbatim.
    pub information: String,
    /// Structured `:86:` subfields, when the bank sends them.
    pub details: Option<TransactionDetails>,
}

/// Structured `:86:` remittance information (`?00`..`?63`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionDetails {
    /// Leading three-digit business transaction code.
    pub transaction_code: u16,
    /// `?00`
    pub booking_text: String,
    /// `?10`
    pub primanota: String,
    /// `?20`–`?29`, concatenated with internal CRLF stripped.
    pub purpose: String,
    /// `?30`
    pub counterparty_bank_id: Option<String>,
    /// `?31`
    pub counterparty_account_id: Option<String>,
    /// `?32` and `?33`, joined by a single space.
    pub counterparty_name: String,
    /// `?34`
    pub message_key_addition: Option<u16>,
    /// `?60`–`?63`
    pub secondary_purpose: String,
    /// Unknown subfield keys, preserved verbatim.
    pub extras: BTreeMap<String, String>,
}

/// One MT940 statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// `:20:`
    pub reference: String,
    /// `:21:`
    pub related_reference: Option<String>,
    /// `:25:`
    pub account_id: String,
    /// `:28C:` statement number before the `/`.
    pub statement_number: Option<u32>,
    /// `:28C:` sequence number after the `/`.
    pub sequence_number: Option<u32>,
    /// `:60F:` / `:60M:`
    pub opening_balance: Option<Balance>,
    pub transactions: Vec<Transaction>,
    /// `:62F:` / `:62M:`
    pub closing_balance: Option<Balance>,
    /// `:64:`
    pub value_dated_balance: Option<Balance>,
    /// `:65:`
    pub future_balances: Vec<Balance>,
}

/// Decodes every statement in an HIKAZ booked-transactions blob.
pub fn parse_statements(blob: &[u8]) -> Result<Vec<Statement>> {
    split_records(blob)?
        .into_iter()
        .map(|records| parse_statement(&records))
        .collect()
}

fn parse_statement(records: &[TagRecord]) -> Result<Statement> {
    let mut statement = Statement {
        reference: String::new(),
        related_reference: None,
        account_id: String::new(),
        statement_number: None,
        sequence_number: None,
        opening_balance: None,
        transactions: Vec::new(),
        closing_balance: None,
        value_dated_balance: None,
        future_balances: Vec::new(),
    };
    for record in records {
        match record.tag.as_str() {
            "20" => statement.reference = record.value.clone(),
            "21" => statement.related_reference = Some(record.value.clone()),
            "25" => statement.account_id = record.value.clone(),
            "28C" => {
                let (number, sequence) = parse_statement_number(&record.value, record.line)?;
                statement.statement_number = number;
                statement.sequence_number = sequence;
            }
            "60F" | "60M" => {
                statement.opening_balance = Some(parse_swift_balance(&record.value, record.line)?)
            }
            "61" => statement
                .transactions
                .push(parse_transaction(&record.value, record.line)?),
            "86" => {
                let transaction = statement.transactions.last_mut().ok_or_else(|| {
                    swift_err(record.line, ":86: without a preceding :61:")
                })?;
                transaction.information = record.value.clone();
                transaction.details = parse_details(&record.value);
            }
            "62F" | "62M" => {
                statement.closing_balance = Some(parse_swift_balance(&record.value, record.line)?)
            }
            "64" => {
                statement.value_dated_balance =
                    Some(parse_swift_balance(&record.value, record.line)?)
            }
            "65" => statement
                .future_balances
                .push(parse_swift_balance(&record.value, record.line)?),
            // Tags outside the statement vocabulary are skipped.
            _ => {}
        }
    }
    Ok(statement)
}

fn parse_statement_number(value: &str, line: usize) -> Result<(Option<u32>, Option<u32>)> {
    let mut parts = value.splitn(2, '/');
    let number = match parts.next().filter(|p| !p.is_empty()) {
        Some(text) => Some(
            text.parse::<u32>()
                .map_err(|_| swift_err(line, format!("bad statement number {text:?}")))?,
        ),
        None => None,
    };
    let sequence = match parts.next().filter(|p| !p.is_empty()) {
        Some(text) => Some(
            text.parse::<u32>()
                .map_err(|_| swift_err(line, format!("bad sequence number {text:?}")))?,
        ),
        None => None,
    };
    Ok((number, sequence))
}

/// Decodes one `:61:` line. Field-86 subfield escaping does NOT apply
/// here; a `?` in the reference is a literal character.
pub(crate) fn parse_transaction(value: &str, line: usize) -> Result<Transaction> {
    // The value may span a continuation line (supplementary details);
    // only the first line is positional.
    let (first, _rest) = match value.find("\r\n") {
        Some(idx) => (&value[..idx], Some(&value[idx + 2..])),
        None => (value, None),
    };
    let bytes = first.as_bytes();
    if bytes.len() < 6 || !bytes[..6].iter().all(u8::is_ascii_digit) {
        return Err(swift_err(line, format!("malformed transaction date: {first:?}")));
    }
    let value_date = parse_swift_date(&first[..6], line)?;
    let mut pos = 6;

    // Optional 4-digit entry date (MMDD), sharing the value date's year.
    let entry_date = if bytes.len() >= pos + 4
        && bytes[pos..pos + 4].iter().all(u8::is_ascii_digit)
    {
        let month: u32 = first[pos..pos + 2].parse().expect("two digits");
        let day: u32 = first[pos + 2..pos + 4].parse().expect("two digits");
        pos += 4;
        NaiveDate::from_ymd_opt(value_date.year(), month, day)
            .ok_or_else(|| swift_err(line, format!("bad entry date {month:02}{day:02}")))?
    } else {
        value_date
    };

    let indicator = match (bytes.get(pos), bytes.get(pos + 1)) {
        (Some(b'R'), Some(b'D')) => {
            pos += 2;
            DebitCredit::ReverseDebit
        }
        (Some(b'R'), Some(b'C')) => {
            pos += 2;
            DebitCredit::ReverseCredit
        }
        (Some(b'D'), _) => {
            pos += 1;
            DebitCredit::Debit
        }
        (Some(b'C'), _) => {
            pos += 1;
            DebitCredit::Credit
        }
        other => {
            return Err(swift_err(
                line,
                format!("bad debit/credit indicator at {pos}: {other:?}"),
            ))
        }
    };

    // Optional funds code: one letter between indicator and amount.
    let funds_code = match bytes.get(pos) {
        Some(b) if b.is_ascii_uppercase() => {
            pos += 1;
            Some(*b as char)
        }
        _ => None,
    };

    let amount_start = pos;
    while bytes
        .get(pos)
        .is_some_and(|b| b.is_ascii_digit() || *b == b',')
    {
        pos += 1;
    }
    if pos == amount_start {
        return Err(swift_err(line, "transaction amount missing"));
    }
    let amount = parse_swift_amount(&first[amount_start..pos], line)?;

    if bytes.len() < pos + 4 || !first.is_char_boundary(pos + 4) {
        return Err(swift_err(line, "transaction type code missing"));
    }
    let transaction_type = first[pos..pos + 4].to_owned();
    pos += 4;

    let references = &first[pos..];
    let (customer_reference, bank_reference) = match references.split_once("//") {
        Some((customer, bank)) => (customer.to_owned(), Some(bank.to_owned())),
        None => (references.to_owned(), None),
    };

    Ok(Transaction {
        value_date,
        entry_date,
        indicator,
        funds_code,
        amount,
        transaction_type,
        customer_reference,
        bank_reference,
        information: String::new(),
        details: None,
    })
}

/// Decodes the structured `:86:` form: a three-digit transaction code
/// followed by `?NN` subfields. Returns `None` for unstructured values.
pub(crate) fn parse_details(value: &str) -> Option<TransactionDetails> {
    let code_text: String = value.chars().take(3).collect();
    if code_text.len() != 3 || !code_text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut details = TransactionDetails {
        transaction_code: code_text.parse().expect("three digits"),
        ..TransactionDetails::default()
    };

    let rest = &value[3..];
    if !rest.starts_with('?') {
        return None;
    }
    let mut name_parts: Vec<String> = Vec::new();
    for field in rest.split('?').skip(1) {
        if field.len() < 2 || !field.is_char_boundary(2) {
            continue;
        }
        let (key, field_value) = field.split_at(2);
        let stripped = field_value.replace("\r\n", "");
        match key {
            "00" => details.booking_text = stripped,
            "10" => details.primanota = stripped,
            "20" | "21" | "22" | "23" | "24" | "25" | "26" | "27" | "28" | "29" => {
                details.purpose.push_str(&stripped)
            }
            "30" => details.counterparty_bank_id = Some(stripped),
            "31" => details.counterparty_account_id = Some(stripped),
            "32" | "33" => name_parts.push(stripped),
            "34" => details.message_key_addition = stripped.parse().ok(),
            "60" | "61" | "62" | "63" => details.secondary_purpose.push_str(&stripped),
            other => {
                details
                    .extras
                    .insert(other.to_owned(), field_value.to_owned());
            }
        }
    }
    details.counterparty_name = name_parts.join(" ");
    Some(details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn transaction_line_with_funds_code() {
        let tx = parse_transaction("2301010101DR123,45NMSCREF?", 1).unwrap();
        assert_eq!(tx.value_date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(tx.entry_date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(tx.indicator, DebitCredit::Debit);
        assert_eq!(tx.funds_code, Some('R'));
        assert_eq!(tx.amount, dec!(123.45));
        assert_eq!(tx.transaction_type, "NMSC");
        // Field-86 escaping does not apply; the trailing ? is literal.
        assert_eq!(tx.customer_reference, "REF?");
        assert_eq!(tx.bank_reference, None);
    }

    #[test]
    fn transaction_line_without_entry_date() {
        let tx = parse_transaction("230101C99,NTRFNONREF//B4711", 1).unwrap();
        assert_eq!(tx.entry_date, tx.value_date);
        assert_eq!(tx.indicator, DebitCredit::Credit);
        assert_eq!(tx.funds_code, None);
        assert_eq!(tx.amount, dec!(99));
        assert_eq!(tx.customer_reference, "NONREF");
        assert_eq!(tx.bank_reference.as_deref(), Some("B4711"));
    }

    #[test]
    fn reversal_indicator() {
        let tx = parse_transaction("2301010102RC50,00NSTOREF", 1).unwrap();
        assert_eq!(tx.indicator, DebitCredit::ReverseCredit);
        assert!(!tx.indicator.is_debit());
    }

    #[test]
    fn details_concatenate_purpose_and_name() {
        let details = parse_details(
            "051?00UEBERWEISUNG?10931?20Rechnung 4711\r\n?21Teil zwei?30100 90000?311234567890?32MUSTER?33MANN?34997",
        )
        .unwrap();
        assert_eq!(details.transaction_code, 51);
        assert_eq!(details.booking_text, "UEBERWEISUNG");
        assert_eq!(details.primanota, "931");
        assert_eq!(details.purpose, "Rechnung 4711Teil zwei");
        assert_eq!(details.counterparty_bank_id.as_deref(), Some("100 90000"));
        assert_eq!(details.counterparty_account_id.as_deref(), Some("1234567890"));
        assert_eq!(details.counterparty_name, "MUSTER MANN");
        assert_eq!(details.message_key_addition, Some(997));
    }

    #[test]
    fn unknown_subfields_are_preserved() {
        let details = parse_details("051?00TEXT?40SOMETHING?41ELSE").unwrap();
        assert_eq!(details.extras.get("40").map(String::as_str), Some("SOMETHING"));
        assert_eq!(details.extras.get("41").map(String::as_str), Some("ELSE"));
        assert_eq!(details.booking_text, "TEXT");
    }

    #[test]
    fn unstructured_information_keeps_details_empty() {
        assert!(parse_details("freeform remittance text").is_none());
    }

    #[test]
    fn full_statement_parses() {
        let blob = b":20:REF123\r\n:25:10090000/1234567890\r\n:28C:5/1\r\n\
:60F:C230101EUR1000,00\r\n\
:61:2301020102D123,45NMSCNONREF\r\n\
:86:051?00UEBERWEISUNG?20Miete Januar?32HAUSVERWALTUNG\r\n\
:62F:C230131EUR876,55\r\n-\r\n";
        let statements = parse_statements(blob).unwrap();
        assert_eq!(statements.len(), 1);
        let statement = &statements[0];
        assert_eq!(statement.reference, "REF123");
        assert_eq!(statement.account_id, "10090000/1234567890");
        assert_eq!(statement.statement_number, Some(5));
        assert_eq!(statement.sequence_number, Some(1));
        assert_eq!(
            statement.opening_balance.as_ref().unwrap().amount.value,
            dec!(1000)
        );
        assert_eq!(statement.transactions.len(), 1);
        let tx = &statement.transactions[0];
        assert_eq!(tx.amount, dec!(123.45));
        let details = tx.details.as_ref().unwrap();
        assert_eq!(details.purpose, "Miete Januar");
        assert_eq!(details.counterparty_name, "HAUSVERWALTUNG");
        assert_eq!(
            statement.closing_balance.as_ref().unwrap().amount.value,
            dec!(876.55)
        );
    }
}
