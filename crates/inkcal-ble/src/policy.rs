//! Transfer policy resolution.
//!
//! The display firmware copes badly with long bursts of unacknowledged
//! writes, so large payloads are sent more carefully than small ones. The
//! adjustments are computed once, up front, by [`resolve_policy`]; the
//! caller's [`TransferSettings`] are never modified.

use std::time::Duration;

use crate::radio::WriteMode;

/// Size thresholds that shape a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Frames up to this many bytes (header included) go out in one write.
    pub combined_max_frame: usize,
    /// Bodies above this many bytes are "large".
    pub large_payload: usize,
    /// Chunk size ceiling for large bodies.
    pub large_chunk_cap: usize,
    /// Inter-chunk delay used for large bodies when none is configured.
    pub large_min_delay: Duration,
    /// Chunks shorter than this are always acknowledged.
    pub small_chunk_ack: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            combined_max_frame: 40,
            large_payload: 4000,
            large_chunk_cap: 200,
            large_min_delay: Duration::from_millis(50),
            small_chunk_ack: 30,
        }
    }
}

/// Transfer settings as requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSettings {
    /// Body bytes per write.
    pub chunk_size: usize,
    /// Acknowledge every chunk.
    pub force_ack: bool,
    /// Pause between chunks.
    pub chunk_delay: Duration,
    pub thresholds: Thresholds,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            force_ack: false,
            chunk_delay: Duration::ZERO,
            thresholds: Thresholds::default(),
        }
    }
}

impl TransferSettings {
    /// Fits a 185 byte ATT MTU with room to spare.
    pub const DEFAULT_CHUNK_SIZE: usize = 180;

    /// Validates the settings.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be at least 1");
        }
        if self.thresholds.large_chunk_cap == 0 {
            return Err("large_chunk_cap must be at least 1");
        }
        Ok(())
    }
}

/// How the frame is put on the air.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Header and body in a single acknowledged write.
    Combined,
    /// Acknowledged header, then the body in chunks.
    Split,
}

/// The effective parameters of one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPolicy {
    pub mode: TransferMode,
    /// Body bytes per write in split mode.
    pub chunk_size: usize,
    /// Acknowledge every chunk.
    pub ack_chunks: bool,
    /// Pause between chunks.
    pub chunk_delay: Duration,
    /// The large-payload adjustments were applied.
    pub large_payload: bool,
    small_chunk_ack: usize,
}

impl TransferPolicy {
    /// Write mode for a body chunk of `len` bytes.
    pub fn chunk_write_mode(&self, len: usize) -> WriteMode {
        if self.ack_chunks || len < self.small_chunk_ack {
            WriteMode::WithResponse
        } else {
            WriteMode::WithoutResponse
        }
    }

    /// Number of body writes needed for `body_len` bytes in split mode.
    pub fn chunk_count(&self, body_len: usize) -> usize {
        body_len.div_ceil(self.chunk_size)
    }
}

/// Computes the policy for a frame of `frame_len` bytes whose body is
/// `body_len` bytes.
pub fn resolve_policy(frame_len: usize, body_len: usize, requested: &TransferSettings) -> TransferPolicy {
    let thresholds = &requested.thresholds;
    let mode = if frame_len <= thresholds.combined_max_frame {
        TransferMode::Combined
    } else {
        TransferMode::Split
    };
    let large_payload = body_len > thresholds.large_payload;
    let chunk_size = requested.chunk_size.max(1);

    let (chunk_size, ack_chunks, chunk_delay) = if large_payload {
        let delay = if requested.chunk_delay.is_zero() {
            thresholds.large_min_delay
        } else {
            requested.chunk_delay
        };
        (chunk_size.min(thresholds.large_chunk_cap.max(1)), true, delay)
    } else {
        (chunk_size, requested.force_ack, requested.chunk_delay)
    };

    TransferPolicy {
        mode,
        chunk_size,
        ack_chunks,
        chunk_delay,
        large_payload,
        small_chunk_ack: thresholds.small_chunk_ack,
    }
}
