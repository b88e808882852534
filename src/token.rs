//! Lexical classes of the HBCI wire grammar.

use std::fmt;

/// Every lexical class the extractor distinguishes.
///
/// The syntactic classes cover the framing characters; the value classes
/// name the typed data-element formats a schema can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // Syntactic classes
    DataElement,
    DataElementSeparator,
    GroupDataElement,
    GroupDataElementSeparator,
    Segment,
    SegmentHeader,
    SegmentEndMarker,
    EscapeSequence,
    EscapeCharacter,
    EscapedCharacter,
    BinaryDataLength,
    BinaryData,
    BinaryDataMarker,
    // Value classes
    AlphaNumeric,
    Text,
    Numeric,
    Digit,
    Float,
    YesNo,
    Date,
    Time,
    Identification,
    CountryCode,
    Currency,
    Value,
    Eof,
}

/// Segment terminator.
pub const SEGMENT_END: u8 = b'\'';
/// Data-element separator.
pub const ELEMENT_SEPARATOR: u8 = b'+';
/// Group-data-element separator.
pub const GROUP_SEPARATOR: u8 = b':';
/// Escape character; the following byte is literal.
pub const ESCAPE: u8 = b'?';
/// Binary-length delimiter: `@<n>@` introduces n raw bytes.
pub const BINARY_MARKER: u8 = b'@';

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenType::DataElement => "dataElement",
            TokenType::DataElementSeparator => "dataElementSeparator",
            TokenType::GroupDataElement => "groupDataElement",
            TokenType::GroupDataElementSeparator => "groupDataElementSeparator",
            TokenType::Segment => "segment",
            TokenType::SegmentHeader => "segmentHeader",
            TokenType::SegmentEndMarker => "segmentEndMarker",
            TokenType::EscapeSequence => "escapeSequence",
            TokenType::EscapeCharacter => "escapeCharacter",
            TokenType::EscapedCharacter => "escapedCharacter",
            TokenType::BinaryDataLength => "binaryDataLength",
            TokenType::BinaryData => "binaryData",
            TokenType::BinaryDataMarker => "binaryDataMarker",
            TokenType::AlphaNumeric => "alphaNumeric",
            TokenType::Text => "text",
            TokenType::Numeric => "numeric",
            TokenType::Digit => "digit",
            TokenType::Float => "float",
            TokenType::YesNo => "yesNo",
            TokenType::Date => "date",
            TokenType::Time => "time",
            TokenType::Identification => "identification",
            TokenType::CountryCode => "countryCode",
            TokenType::Currency => "currency",
            TokenType::Value => "value",
            TokenType::Eof => "eof",
        };
        f.write_str(name)
    }
}
