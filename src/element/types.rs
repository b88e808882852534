//! Typed data-element leaves.
//!
//! Each leaf validates at construction, marshals to wire bytes, and parses
//! back from raw (still-escaped) element bytes. Construction is the only
//! place bounds are checked; a constructed leaf marshals infallibly.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;

use crate::charset;
use crate::error::{Error, Result};
use crate::extractor::{escape_into, parse_binary, unescape};

fn constraint(field: &'static str, reason: impl Into<String>) -> Error {
    Error::FieldConstraint {
        field,
        reason: reason.into(),
    }
}

fn decode_text(raw: &[u8]) -> Result<String> {
    Ok(charset::to_utf8(&unescape(raw)?))
}

/// Bounded alphanumeric field. CR/LF are not permitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphaNumeric(String);

impl AlphaNumeric {
    pub fn new(value: impl Into<String>, max_len: usize) -> Result<Self> {
        let value = value.into();
        if value.chars().count() > max_len {
            return Err(constraint(
                "AlphaNumeric",
                format!("exceeds bound of {max_len} characters"),
            ));
        }
        if value.contains(['\r', '\n']) {
            return Err(constraint("AlphaNumeric", "CR/LF not permitted"));
        }
        charset::to_iso8859_1(&value)?;
        Ok(AlphaNumeric(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn marshal(&self, out: &mut Vec<u8>) {
        let encoded = charset::to_iso8859_1(&self.0).expect("validated at construction");
        escape_into(&encoded, out);
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        let value = decode_text(raw)?;
        if value.contains(['\r', '\n']) {
            return Err(constraint("AlphaNumeric", "CR/LF not permitted"));
        }
        Ok(AlphaNumeric(value))
    }
}

/// Free text; unlike [`AlphaNumeric`] it may contain CR/LF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text(String);

impl Text {
    pub fn new(value: impl Into<String>, max_len: usize) -> Result<Self> {
        let value = value.into();
        if value.chars().count() > max_len {
            return Err(constraint("Text", format!("exceeds bound of {max_len}")));
        }
        charset::to_iso8859_1(&value)?;
        Ok(Text(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn marshal(&self, out: &mut Vec<u8>) {
        let encoded = charset::to_iso8859_1(&self.0).expect("validated at construction");
        escape_into(&encoded, out);
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        Ok(Text(decode_text(raw)?))
    }
}

/// Number without leading zeros on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Numeric(i64);

impl Numeric {
    pub fn new(value: i64, max_digits: usize) -> Result<Self> {
        if value.unsigned_abs().to_string().len() > max_digits {
            return Err(constraint(
                "Numeric",
                format!("{value} exceeds {max_digits} digits"),
            ));
        }
        Ok(Numeric(value))
    }

    pub fn value(self) -> i64 {
        self.0
    }

    pub fn marshal(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.0.to_string().as_bytes());
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        let s = charset::to_utf8(raw);
        if s.len() > 1 && s.starts_with('0') {
            return Err(constraint("Numeric", format!("leading zero in {s:?}")));
        }
        let value = s
            .parse::<i64>()
            .map_err(|e| constraint("Numeric", format!("{s:?}: {e}")))?;
        Ok(Numeric(value))
    }
}

/// Digit string with fixed width and leading-zero padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digit {
    value: u64,
    width: usize,
}

impl Digit {
    pub fn new(value: u64, width: usize) -> Result<Self> {
        if value.to_string().len() > width {
            return Err(constraint(
                "Digit",
                format!("{value} does not fit width {width}"),
            ));
        }
        Ok(Digit { value, width })
    }

    pub fn value(self) -> u64 {
        self.value
    }

    pub fn width(self) -> usize {
        self.width
    }

    pub fn marshal(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(format!("{:0width$}", self.value, width = self.width).as_bytes());
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        let s = charset::to_utf8(raw);
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(constraint("Digit", format!("not a digit string: {s:?}")));
        }
        let value = s
            .parse::<u64>()
            .map_err(|e| constraint("Digit", e.to_string()))?;
        Ok(Digit {
            value,
            width: s.len(),
        })
    }
}

/// Formats a decimal for the wire: `.` becomes `,`.
pub fn format_value(value: &Decimal) -> String {
    value.to_string().replace('.', ",")
}

/// Signed decimal value; wire form uses the comma separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Value(Decimal);

impl Value {
    pub fn new(value: Decimal) -> Self {
        Value(value)
    }

    pub fn value(self) -> Decimal {
        self.0
    }

    pub fn marshal(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(format_value(&self.0).as_bytes());
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        let s = charset::to_utf8(raw).replace(',', ".");
        // The wire may end in a bare separator ("123,").
        let trimmed = s.strip_suffix('.').unwrap_or(&s);
        let value = trimmed
            .parse::<Decimal>()
            .map_err(|e| constraint("Value", format!("{s:?}: {e}")))?;
        Ok(Value(value))
    }
}

/// ISO-4217 currency: exactly three uppercase ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl Into<String>) -> Result<Self> {
        let code = code.into();
        if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(constraint(
                "Currency",
                format!("must be 3 uppercase ASCII letters, got {code:?}"),
            ));
        }
        Ok(Currency(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn marshal(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.0.as_bytes());
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        Currency::new(charset::to_utf8(raw))
    }
}

/// Wire date `YYYYMMDD`.
pub fn parse_date(raw: &[u8]) -> Result<NaiveDate> {
    let s = charset::to_utf8(raw);
    NaiveDate::parse_from_str(&s, "%Y%m%d")
        .map_err(|e| constraint("Date", format!("{s:?}: {e}")))
}

/// Wire time `HHMMSS`.
pub fn parse_time(raw: &[u8]) -> Result<NaiveTime> {
    let s = charset::to_utf8(raw);
    NaiveTime::parse_from_str(&s, "%H%M%S")
        .map_err(|e| constraint("Time", format!("{s:?}: {e}")))
}

/// Alphanumeric identification, at most 30 characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identification(AlphaNumeric);

impl Identification {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        Ok(Identification(AlphaNumeric::new(value, 30)?))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn marshal(&self, out: &mut Vec<u8>) {
        self.0.marshal(out);
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        Ok(Identification(AlphaNumeric::unmarshal(raw)?))
    }
}

/// ISO-3166 numeric country code, three wire digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountryCode(u16);

impl CountryCode {
    pub fn new(code: u16) -> Result<Self> {
        if code == 0 || code > 999 {
            return Err(constraint("CountryCode", format!("{code} out of range")));
        }
        Ok(CountryCode(code))
    }

    pub fn value(self) -> u16 {
        self.0
    }

    pub fn marshal(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(format!("{:03}", self.0).as_bytes());
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        let digit = Digit::unmarshal(raw)?;
        CountryCode::new(digit.value() as u16)
    }
}

/// Boolean, `J` / `N` on the wire.
pub fn parse_yes_no(raw: &[u8]) -> Result<bool> {
    match raw {
        b"J" => Ok(true),
        b"N" => Ok(false),
        other => Err(constraint(
            "YesNo",
            format!("expected J or N, got {:?}", charset::to_utf8(other)),
        )),
    }
}

/// Binary element: raw bytes behind an `@<len>@` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary(Vec<u8>);

impl Binary {
    pub fn new(data: Vec<u8>) -> Self {
        Binary(data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn marshal(&self, out: &mut Vec<u8>) {
        out.push(b'@');
        out.extend_from_slice(self.0.len().to_string().as_bytes());
        out.push(b'@');
        out.extend_from_slice(&self.0);
    }

    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        Ok(Binary(parse_binary(raw)?))
    }
}
