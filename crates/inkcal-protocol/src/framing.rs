//! Length-prefixed framing for the display transfer.
//!
//! A frame is an ASCII header line followed by the JSON payload:
//!
//! ```text
//! +---------------+------------------------+
//! | LEN:<n>\n     |  n bytes of UTF-8 JSON |
//! +---------------+------------------------+
//! ```
//!
//! The peripheral has no other way of knowing when reception is complete, so
//! `n` must be the exact byte length of the payload. A transfer may be
//! preceded by a `TIME:<unix-epoch>\n` line that sets the display clock.

use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::error::{ProtocolError, ProtocolResult};
use crate::{LEN_PREFIX, TIME_PREFIX};

/// Longest header line accepted before a newline must appear.
pub(crate) const MAX_HEADER_LEN: usize = 32;

/// A framed payload ready for transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    header: Vec<u8>,
    body: Vec<u8>,
}

impl Frame {
    /// Serializes `records` to compact JSON and frames it.
    ///
    /// Fails with [`ProtocolError::PayloadTooLarge`] when the JSON exceeds
    /// `max_payload` bytes.
    ///
    /// # Example
    ///
    /// ```rust
    /// use inkcal_protocol::Frame;
    ///
    /// let frame = Frame::encode(&vec!["a", "b"], 1024).unwrap();
    /// assert_eq!(frame.to_bytes(), b"LEN:9\n[\"a\",\"b\"]");
    /// ```
    pub fn encode<T: Serialize + ?Sized>(records: &T, max_payload: usize) -> ProtocolResult<Self> {
        let body = serde_json::to_vec(records)?;
        Self::from_body(body, max_payload)
    }

    /// Frames an already serialized payload.
    pub fn from_body(body: Vec<u8>, max_payload: usize) -> ProtocolResult<Self> {
        if body.len() > max_payload {
            return Err(ProtocolError::PayloadTooLarge {
                size: body.len(),
                max: max_payload,
            });
        }

        let header = encode_header(body.len());
        debug!(payload_bytes = body.len(), "framed payload");
        Ok(Self { header, body })
    }

    /// The `LEN:<n>\n` header.
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// The JSON payload.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Payload length announced in the header.
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Header plus payload length.
    pub fn total_len(&self) -> usize {
        self.header.len() + self.body.len()
    }

    /// Header and payload as one contiguous buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.total_len());
        buffer.extend_from_slice(&self.header);
        buffer.extend_from_slice(&self.body);
        buffer
    }
}

/// A parsed `LEN:` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Announced payload length.
    pub payload_len: usize,
    /// Bytes taken by the header line, newline included.
    pub header_len: usize,
}

/// Builds `LEN:<n>\n`.
pub fn encode_header(payload_len: usize) -> Vec<u8> {
    format!("{LEN_PREFIX}{payload_len}\n").into_bytes()
}

/// Builds `TIME:<epoch>\n`.
pub fn time_header(unix_epoch: i64) -> Vec<u8> {
    format!("{TIME_PREFIX}{unix_epoch}\n").into_bytes()
}

/// Parses the `LEN:` header at the start of `data`.
pub fn parse_header(data: &[u8]) -> ProtocolResult<FrameHeader> {
    let line = header_line(data)?;
    let payload_len = parse_decimal(line, LEN_PREFIX)?;
    Ok(FrameHeader {
        payload_len: usize::try_from(payload_len)
            .map_err(|_| ProtocolError::InvalidHeader(String::from_utf8_lossy(line).into_owned()))?,
        header_len: line.len() + 1,
    })
}

/// Parses a `TIME:` line at the start of `data`, returning the epoch and the
/// bytes consumed.
pub fn parse_time_header(data: &[u8]) -> ProtocolResult<(i64, usize)> {
    let line = header_line(data)?;
    let epoch = parse_decimal(line, TIME_PREFIX)?;
    Ok((epoch, line.len() + 1))
}

/// Decodes a complete frame (header + payload).
///
/// # Example
///
/// ```rust
/// use inkcal_protocol::{Frame, decode_frame};
///
/// let frame = Frame::encode(&vec![1, 2, 3], 1024).unwrap();
/// let decoded: Vec<u32> = decode_frame(&frame.to_bytes()).unwrap();
/// assert_eq!(decoded, vec![1, 2, 3]);
/// ```
pub fn decode_frame<T: DeserializeOwned>(data: &[u8]) -> ProtocolResult<T> {
    let header = parse_header(data)?;
    let body = &data[header.header_len..];

    if body.len() < header.payload_len {
        return Err(ProtocolError::IncompleteMessage {
            expected: header.payload_len,
            received: body.len(),
        });
    }
    if body.len() > header.payload_len {
        return Err(ProtocolError::TrailingData {
            expected: header.payload_len,
            received: body.len(),
        });
    }

    Ok(serde_json::from_slice(body)?)
}

/// Returns the header line without its newline.
pub(crate) fn header_line(data: &[u8]) -> ProtocolResult<&[u8]> {
    match data.iter().position(|&b| b == b'\n') {
        Some(pos) if pos <= MAX_HEADER_LEN => Ok(&data[..pos]),
        Some(pos) => Err(ProtocolError::InvalidHeader(format!(
            "header line is {pos} bytes long"
        ))),
        None if data.len() > MAX_HEADER_LEN => Err(ProtocolError::InvalidHeader(
            "no newline within header limit".to_string(),
        )),
        None => Err(ProtocolError::IncompleteHeader),
    }
}

fn parse_decimal(line: &[u8], prefix: &str) -> ProtocolResult<i64> {
    let invalid = || ProtocolError::InvalidHeader(String::from_utf8_lossy(line).into_owned());

    let digits = line.strip_prefix(prefix.as_bytes()).ok_or_else(invalid)?;
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(invalid)
}
