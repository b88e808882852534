//! SWIFT statement decoding (MT940 / MT942).
//!
//! Banks embed statements as binary blobs in HIKAZ responses. The blobs are
//! tagged line format: each logical record begins with `:NN:` or `:NNx:` on
//! a new line and its value spans continuation lines until the next tag or
//! the record separator `-`.

pub mod mt940;
pub mod mt942;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::charset;
use crate::domain::{Amount, Balance};
use crate::error::{Error, Result};

/// One tagged record: tag id without colons, value with continuation lines
/// joined by CRLF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub tag: String,
    pub value: String,
    /// 1-based line number of the tag line, for error reporting.
    pub line: usize,
}

fn is_tag_line(line: &str) -> Option<(String, &str)> {
    let rest = line.strip_prefix(':')?;
    let close = rest.find(':')?;
    let tag = &rest[..close];
    let ok = matches!(tag.len(), 2 | 3)
        && tag.as_bytes()[..2].iter().all(u8::is_ascii_digit)
        && (tag.len() == 2 || tag.as_bytes()[2].is_ascii_alphabetic());
    if !ok {
        return None;
    }
    Some((tag.to_owned(), &rest[close + 1..]))
}

/// Splits a statement blob into records, one `Vec<TagRecord>` per
/// statement (statements are separated by a `-` line).
pub fn split_records(blob: &[u8]) -> Result<Vec<Vec<TagRecord>>> {
    let text = charset::to_utf8(blob);
    let mut statements = Vec::new();
    let mut current: Vec<TagRecord> = Vec::new();
    for (index, line) in text.split(['\n']).enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line == "-" {
            if !current.is_empty() {
                statements.push(std::mem::take(&mut current));
            }
            continue;
        }
        if line.is_empty() {
            continue;
        }
        if let Some((tag, value)) = is_tag_line(line) {
            current.push(TagRecord {
                tag,
                value: value.to_owned(),
                line: index + 1,
            });
        } else if let Some(last) = current.last_mut() {
            last.value.push_str("\r\n");
            last.value.push_str(line);
        } else {
            return Err(Error::Swift {
                line: index + 1,
                reason: format!("content before first tag: {line:?}"),
            });
        }
    }
    if !current.is_empty() {
        statements.push(current);
    }
    Ok(statements)
}

pub(crate) fn swift_err(line: usize, reason: impl Into<String>) -> Error {
    Error::Swift {
        line,
        reason: reason.into(),
    }
}

/// Parses a SWIFT decimal: comma separator, possibly trailing.
pub(crate) fn parse_swift_amount(text: &str, line: usize) -> Result<Decimal> {
    let normalized = text.replace(',', ".");
    let normalized = normalized.strip_suffix('.').unwrap_or(&normalized);
    normalized
        .parse::<Decimal>()
        .map_err(|e| swift_err(line, format!("bad amount {text:?}: {e}")))
}

/// Parses a SWIFT short date `YYMMDD`.
pub(crate) fn parse_swift_date(text: &str, line: usize) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%y%m%d")
        .map_err(|e| swift_err(line, format!("bad date {text:?}: {e}")))
}

/// Parses a balance record value: `D/C + YYMMDD + CCY + amount`
/// (tags `:60F:`, `:60M:`, `:62F:`, `:62M:`, `:64:`, `:65:`).
pub(crate) fn parse_swift_balance(value: &str, line: usize) -> Result<Balance> {
    if value.len() < 10 || !value.as_bytes()[..10].is_ascii() {
        return Err(swift_err(line, format!("malformed balance: {value:?}")));
    }
    let (indicator, rest) = value.split_at(1);
    let (date, rest) = rest.split_at(6);
    let (currency, amount_text) = rest.split_at(3);
    let magnitude = parse_swift_amount(amount_text, line)?;
    let signed = match indicator {
        "D" => -magnitude,
        "C" => magnitude,
        other => {
            return Err(swift_err(
                line,
                format!("bad debit/credit indicator {other:?}"),
            ))
        }
    };
    Ok(Balance {
        amount: Amount::new(signed, currency)
            .map_err(|e| swift_err(line, e.to_string()))?,
        transmission_date: parse_swift_date(date, line)?,
        transmission_time: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn records_split_on_tags_and_separator() {
        let blob = b":20:REF1\r\n:86:line one\r\ncontinued\r\n-\r\n:20:REF2\r\n-\r\n";
        let statements = split_records(blob).unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0][0].tag, "20");
        assert_eq!(statements[0][0].value, "REF1");
        assert_eq!(statements[0][1].value, "line one\r\ncontinued");
        assert_eq!(statements[1][0].value, "REF2");
    }

    #[test]
    fn letter_option_tags_are_recognized() {
        let blob = b":28C:5/1\r\n:60F:C230101EUR100,00\r\n";
        let statements = split_records(blob).unwrap();
        assert_eq!(statements[0][0].tag, "28C");
        assert_eq!(statements[0][1].tag, "60F");
    }

    #[test]
    fn balance_parses_sign_and_magnitude() {
        let balance = parse_swift_balance("D230405EUR1234,56", 1).unwrap();
        assert_eq!(balance.amount.value, dec!(-1234.56));
        assert_eq!(balance.amount.currency, "EUR");
        let balance = parse_swift_balance("C230405EUR0,", 1).unwrap();
        assert_eq!(balance.amount.value, dec!(0));
    }

    #[test]
    fn content_before_first_tag_is_an_error() {
        assert!(split_records(b"garbage\r\n:20:REF\r\n").is_err());
    }
}
