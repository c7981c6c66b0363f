//! CAN Frame Definition

use crate::error::BusError;
use serde::{Deserialize, Serialize};

/// Highest identifier representable with an 11-bit standard ID
pub const MAX_STANDARD_ID: u32 = 0x7FF;

/// Data length of a classic CAN frame
pub const MAX_DATA_LEN: usize = 8;

/// A classic CAN frame with a standard identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanFrame {
    /// Arbitration ID (11-bit)
    id: u32,
    /// Frame payload, at most 8 bytes
    data: Vec<u8>,
    /// Timestamp set by the transport on send (Unix ms)
    pub timestamp_ms: Option<u64>,
}

impl CanFrame {
    /// Create a frame, validating the identifier and payload length
    pub fn new(id: u32, data: &[u8]) -> Result<Self, BusError> {
        if id > MAX_STANDARD_ID {
            return Err(BusError::InvalidId(id));
        }
        if data.len() > MAX_DATA_LEN {
            return Err(BusError::PayloadTooLong(data.len()));
        }
        Ok(Self {
            id,
            data: data.to_vec(),
            timestamp_ms: None,
        })
    }

    /// Create a frame whose payload is zero-padded to the full 8 bytes
    pub fn padded(id: u32, data: &[u8]) -> Result<Self, BusError> {
        let mut frame = Self::new(id, data)?;
        frame.data.resize(MAX_DATA_LEN, 0x00);
        Ok(frame)
    }

    /// Arbitration ID
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Payload bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Attach a timestamp
    pub fn with_timestamp(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }
}
