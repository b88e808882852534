//! Transport pipes: HTTPS and raw TCP.
//!
//! The dialog hands a transport the final wire bytes and consumes the reply
//! bytes; framing differs per pipe. HTTPS carries base64 with the
//! `application/vnd.hbci` content type; the raw pipe sends the bytes
//! verbatim and reads a size-prefixed response.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response framing error: {0}")]
    Framing(String),

    #[error("base64 decoding failed: {0}")]
    Decode(String),
}

/// A request/response pipe. The only suspension point of the core: all
/// codec and state-machine work is synchronous.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one marshalled message and awaits the reply bytes. The
    /// deadline covers the whole round trip.
    async fn round_trip(
        &self,
        payload: &[u8],
        deadline: Duration,
    ) -> Result<Vec<u8>, TransportError>;
}

/// HTTPS pipe: POST base64 body, decode base64 reply.
pub struct HttpsTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        HttpsTransport {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Transport for HttpsTransport {
    async fn round_trip(
        &self,
        payload: &[u8],
        deadline: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let body = BASE64.encode(payload);
        debug!(url = %self.url, bytes = payload.len(), "posting message");
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/vnd.hbci")
            .timeout(deadline)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(deadline)
                } else {
                    TransportError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "bank endpoint returned non-2xx");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        // Banks wrap the base64 body; tolerate embedded line breaks.
        let compact: String = text.split_whitespace().collect();
        BASE64
            .decode(compact.as_bytes())
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// Raw TCP pipe: `<bytes>\r\n\r\n` out; the response starts with a header
/// segment terminated by `'` whose second `+`-separated field is the
/// decimal byte count of the remaining payload.
pub struct TcpTransport {
    address: String,
}

impl TcpTransport {
    pub fn new(address: impl Into<String>) -> Self {
        TcpTransport {
            address: address.into(),
        }
    }

    async fn exchange(&self, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
        let stream = TcpStream::connect(&self.address)
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let mut stream = BufReader::new(stream);

        stream
            .get_mut()
            .write_all(payload)
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        stream
            .get_mut()
            .write_all(b"\r\n\r\n")
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let mut header = Vec::new();
        loop {
            let byte = stream
                .read_u8()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;
            header.push(byte);
            if byte == b'\'' {
                break;
            }
            if header.len() > 4096 {
                return Err(TransportError::Framing(
                    "response header not terminated within 4096 bytes".into(),
                ));
            }
        }

        let size = parse_response_size(&header)?;
        let mut body = vec![0u8; size];
        stream
            .read_exact(&mut body)
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let mut reply = header;
        reply.extend_from_slice(&body);
        Ok(reply)
    }
}

/// The header's second `+`-separated field is the byte count of the rest
/// of the message.
fn parse_response_size(header: &[u8]) -> Result<usize, TransportError> {
    let mut fields = header.split(|&b| b == b'+');
    let size_field = fields.nth(1).ok_or_else(|| {
        TransportError::Framing("response header has no size field".into())
    })?;
    let text = std::str::from_utf8(size_field)
        .map_err(|_| TransportError::Framing("size field is not ASCII".into()))?;
    text.parse::<usize>().map_err(|_| {
        TransportError::Framing(format!("cannot parse message size from {text:?}"))
    })
}

#[async_trait]
impl Transport for TcpTransport {
    async fn round_trip(
        &self,
        payload: &[u8],
        deadline: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        match tokio::time::timeout(deadline, self.exchange(payload)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(deadline)),
        }
    }
}
