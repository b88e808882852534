use thiserror::Error;

use crate::transport::TransportError;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the HBCI core.
///
/// Codec errors are fatal for the message that produced them. Dialog-level
/// failures mark the dialog unusable; retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// The byte stream violates the lexical grammar of the wire format.
    #[error("malformed framing at byte {offset}: {reason}")]
    MalformedFraming { offset: usize, reason: String },

    /// A data element exceeds its declared bound or fails its format.
    #[error("field constraint violated for {field}: {reason}")]
    FieldConstraint { field: &'static str, reason: String },

    /// A well-framed segment could not be decoded against its schema.
    #[error("malformed {id} segment: {reason}")]
    Segment { id: String, reason: String },

    /// The bank answered dialog initialization with a 9xxx code.
    #[error("dialog initialization failed: {code} {text}")]
    DialogInitFailed { code: u16, text: String },

    /// The bank answered a business transaction with a 9xxx code.
    #[error("bank error {code}: {text}")]
    Bank { code: u16, text: String },

    /// A message was sent through a dialog that cannot accept it.
    #[error("dialog is {state}, cannot send")]
    DialogState { state: &'static str },

    /// Network failure, timeout, or non-2xx transport outcome.
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),

    /// A signature or encryption delegate failed.
    #[error("crypto provider failed: {0}")]
    Crypto(String),

    /// Text cannot be represented in the wire charset.
    #[error("charset error: {0}")]
    Charset(String),

    /// A SWIFT statement blob could not be decoded.
    #[error("swift parse error at line {line}: {reason}")]
    Swift { line: usize, reason: String },
}
