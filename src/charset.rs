//! Mapping between the wire's ISO-8859-1 alphabet and in-memory UTF-8.
//!
//! Latin-1 is a strict prefix of Unicode: every byte value maps to the
//! scalar with the same number, so the decode direction cannot fail.

use crate::error::Error;

/// Decodes ISO-8859-1 wire bytes into a UTF-8 string.
pub fn to_utf8(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Encodes a UTF-8 string into ISO-8859-1 wire bytes.
///
/// Scalars above U+00FF have no Latin-1 representation and are rejected.
pub fn to_iso8859_1(s: &str) -> Result<Vec<u8>, Error> {
    let mut out = Vec::with_capacity(s.len());
    for c in s.chars() {
        let code = c as u32;
        if code > 0xFF {
            return Err(Error::Charset(format!(
                "character {c:?} (U+{code:04X}) is not representable in ISO-8859-1"
            )));
        }
        out.push(code as u8);
    }
    Ok(out)
}
