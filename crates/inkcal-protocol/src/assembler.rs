//! Receiving side of the transfer.
//!
//! The display sees a transfer as a series of BLE writes whose boundaries
//! have nothing to do with the header: the header may arrive alone, glued to
//! the body, or the whole frame may come in a single write. [`FrameAssembler`]
//! accepts writes as they arrive and reports when the announced payload is
//! complete.

use serde::de::DeserializeOwned;
use tracing::trace;

use crate::error::{ProtocolError, ProtocolResult};
use crate::framing::{header_line, parse_header, parse_time_header};
use crate::{LEN_PREFIX, TIME_PREFIX};

/// Progress of a reassembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    /// More bytes are needed.
    NeedMore,
    /// The announced payload has fully arrived.
    Complete,
}

/// Reassembles a frame from arbitrarily split writes.
#[derive(Debug)]
pub struct FrameAssembler {
    max_payload: usize,
    pending: Vec<u8>,
    time: Option<i64>,
    expected: Option<usize>,
    body: Vec<u8>,
}

impl FrameAssembler {
    /// Creates an assembler accepting payloads up to `max_payload` bytes.
    pub fn new(max_payload: usize) -> Self {
        Self {
            max_payload,
            pending: Vec::new(),
            time: None,
            expected: None,
            body: Vec::new(),
        }
    }

    /// Feeds one received write.
    pub fn push(&mut self, chunk: &[u8]) -> ProtocolResult<AssemblyState> {
        match self.expected {
            Some(_) => self.body.extend_from_slice(chunk),
            None => {
                self.pending.extend_from_slice(chunk);
                self.consume_headers()?;
            }
        }
        self.state()
    }

    /// Epoch received in a `TIME:` line, if any.
    pub fn time(&self) -> Option<i64> {
        self.time
    }

    /// Payload length announced by the `LEN:` header, once seen.
    pub fn expected_len(&self) -> Option<usize> {
        self.expected
    }

    /// Payload bytes received so far.
    pub fn received_len(&self) -> usize {
        self.body.len()
    }

    /// Returns true once the whole payload arrived.
    pub fn is_complete(&self) -> bool {
        self.expected == Some(self.body.len())
    }

    /// Returns the payload if complete.
    pub fn into_body(self) -> Option<Vec<u8>> {
        if self.is_complete() {
            Some(self.body)
        } else {
            None
        }
    }

    /// Parses the completed payload as JSON.
    pub fn decode<T: DeserializeOwned>(&self) -> ProtocolResult<T> {
        match self.expected {
            Some(expected) if expected == self.body.len() => Ok(serde_json::from_slice(&self.body)?),
            Some(expected) => Err(ProtocolError::IncompleteMessage {
                expected,
                received: self.body.len(),
            }),
            None => Err(ProtocolError::IncompleteHeader),
        }
    }

    fn consume_headers(&mut self) -> ProtocolResult<()> {
        while self.expected.is_none() {
            let line = match header_line(&self.pending) {
                Ok(line) => line,
                Err(ProtocolError::IncompleteHeader) => return Ok(()),
                Err(err) => return Err(err),
            };

            if line.starts_with(TIME_PREFIX.as_bytes()) && self.time.is_none() {
                let (epoch, consumed) = parse_time_header(&self.pending)?;
                trace!(epoch, "received time header");
                self.time = Some(epoch);
                self.pending.drain(..consumed);
            } else if line.starts_with(LEN_PREFIX.as_bytes()) {
                let header = parse_header(&self.pending)?;
                if header.payload_len > self.max_payload {
                    return Err(ProtocolError::PayloadTooLarge {
                        size: header.payload_len,
                        max: self.max_payload,
                    });
                }
                trace!(payload_len = header.payload_len, "received length header");
                self.expected = Some(header.payload_len);
                self.body = self.pending.split_off(header.header_len);
                self.pending.clear();
            } else {
                return Err(ProtocolError::InvalidHeader(
                    String::from_utf8_lossy(line).into_owned(),
                ));
            }
        }
        Ok(())
    }

    fn state(&self) -> ProtocolResult<AssemblyState> {
        match self.expected {
            Some(expected) if self.body.len() > expected => Err(ProtocolError::TrailingData {
                expected,
                received: self.body.len(),
            }),
            Some(expected) if self.body.len() == expected => Ok(AssemblyState::Complete),
            _ => Ok(AssemblyState::NeedMore),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::{Frame, time_header};

    fn frame() -> Frame {
        Frame::encode(&vec!["Sprint Review", "Übergabe", "1:1"], 1024).unwrap()
    }

    #[test]
    fn whole_frame_in_one_write() {
        let mut assembler = FrameAssembler::new(1024);
        let state = assembler.push(&frame().to_bytes()).unwrap();

        assert_eq!(state, AssemblyState::Complete);
        let decoded: Vec<String> = assembler.decode().unwrap();
        assert_eq!(decoded, vec!["Sprint Review", "Übergabe", "1:1"]);
    }

    #[test]
    fn header_then_small_chunks() {
        let frame = frame();
        let mut assembler = FrameAssembler::new(1024);

        assert_eq!(assembler.push(frame.header()).unwrap(), AssemblyState::NeedMore);
        assert_eq!(assembler.expected_len(), Some(frame.body_len()));

        let chunks: Vec<_> = frame.body().chunks(5).collect();
        let (last, rest) = chunks.split_last().unwrap();
        for chunk in rest {
            assert_eq!(assembler.push(chunk).unwrap(), AssemblyState::NeedMore);
        }
        assert_eq!(assembler.push(last).unwrap(), AssemblyState::Complete);
        assert_eq!(assembler.into_body().unwrap(), frame.body());
    }

    #[test]
    fn header_split_across_writes() {
        let bytes = frame().to_bytes();
        let mut assembler = FrameAssembler::new(1024);

        assembler.push(&bytes[..2]).unwrap();
        assert_eq!(assembler.expected_len(), None);
        assembler.push(&bytes[2..]).unwrap();
        assert!(assembler.is_complete());
    }

    #[test]
    fn time_header_precedes_frame() {
        let mut assembler = FrameAssembler::new(1024);
        assembler.push(&time_header(1_757_588_400)).unwrap();
        assert_eq!(assembler.time(), Some(1_757_588_400));
        assert_eq!(assembler.expected_len(), None);

        assembler.push(&frame().to_bytes()).unwrap();
        assert!(assembler.is_complete());
    }

    #[test]
    fn time_only_transfer_never_completes() {
        let mut assembler = FrameAssembler::new(1024);
        let state = assembler.push(&time_header(42)).unwrap();
        assert_eq!(state, AssemblyState::NeedMore);
        assert!(assembler.into_body().is_none());
    }

    #[test]
    fn rejects_bytes_beyond_announced_length() {
        let mut bytes = frame().to_bytes();
        bytes.push(b' ');
        let err = FrameAssembler::new(1024).push(&bytes).unwrap_err();
        assert!(matches!(err, ProtocolError::TrailingData { .. }));
    }

    #[test]
    fn rejects_announced_length_above_limit() {
        let err = FrameAssembler::new(10).push(b"LEN:11\n").unwrap_err();
        assert!(matches!(err, ProtocolError::PayloadTooLarge { size: 11, max: 10 }));
    }

    #[test]
    fn rejects_unknown_header() {
        let err = FrameAssembler::new(10).push(b"HELLO\n").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidHeader(_)));
    }

    #[test]
    fn decode_before_completion_fails() {
        let mut assembler = FrameAssembler::new(1024);
        assert!(matches!(
            assembler.decode::<serde_json::Value>(),
            Err(ProtocolError::IncompleteHeader)
        ));
        assembler.push(b"LEN:4\n[]").unwrap();
        assert!(matches!(
            assembler.decode::<serde_json::Value>(),
            Err(ProtocolError::IncompleteMessage {
                expected: 4,
                received: 2
            })
        ));
    }
}
