//! Wire framing for pushing condensed calendars to the display.
//!
//! The display receives its data over a single BLE write characteristic and
//! cannot take a whole calendar in one write. Transfers are therefore framed
//! so the peripheral can tell when it has everything:
//!
//! ```text
//! [TIME:<unix-epoch>\n]   optional, sets the display clock
//! LEN:<n>\n               exact byte length of the payload
//! <n bytes of JSON>       delivered in one or more writes
//! ```
//!
//! # Example
//!
//! ```rust
//! use inkcal_protocol::{Frame, FrameAssembler, AssemblyState};
//!
//! let frame = Frame::encode(&vec!["standup"], 1024).unwrap();
//!
//! let mut assembler = FrameAssembler::new(1024);
//! assembler.push(frame.header()).unwrap();
//! assert_eq!(assembler.push(frame.body()).unwrap(), AssemblyState::Complete);
//! ```

mod assembler;
mod error;
mod framing;

pub use assembler::{AssemblyState, FrameAssembler};
pub use error::{ProtocolError, ProtocolResult};
pub use framing::{
    Frame, FrameHeader, decode_frame, encode_header, parse_header, parse_time_header, time_header,
};

/// Prefix of the payload length header.
pub const LEN_PREFIX: &str = "LEN:";

/// Prefix of the optional clock header.
pub const TIME_PREFIX: &str = "TIME:";

/// Default maximum payload size (64 KiB), what the display's JSON buffer holds.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024;
