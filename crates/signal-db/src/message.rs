//! Message Definitions and Payload Codec

use crate::error::{CatalogError, DecodeError, EncodeError};
use crate::signal::SignalDef;
use crate::SignalValues;
use serde::{Deserialize, Serialize};

/// Largest payload of a classic CAN frame
const MAX_MESSAGE_LEN: u8 = 8;

/// A CAN message layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDef {
    /// Message name, unique within the catalog
    pub name: String,
    /// 11-bit frame identifier
    pub frame_id: u32,
    /// Payload length in bytes
    pub length: u8,
    /// Signals in declaration order
    #[serde(default, rename = "signal")]
    pub signals: Vec<SignalDef>,
}

impl MessageDef {
    /// Create a message with no signals
    pub fn new(name: &str, frame_id: u32, length: u8) -> Self {
        Self {
            name: name.to_string(),
            frame_id,
            length,
            signals: Vec::new(),
        }
    }

    /// Append a signal
    pub fn with_signal(mut self, signal: SignalDef) -> Self {
        self.signals.push(signal);
        self
    }

    /// Look up a signal by name
    pub fn signal(&self, name: &str) -> Option<&SignalDef> {
        self.signals.iter().find(|s| s.name == name)
    }

    /// Encode physical values into a payload of `length` bytes
    ///
    /// Every signal of the message must have a value. Values for names the
    /// message does not define are ignored.
    pub fn encode(&self, values: &SignalValues) -> Result<Vec<u8>, EncodeError> {
        let mut word: u64 = 0;

        for signal in &self.signals {
            let value = *values
                .get(&signal.name)
                .ok_or_else(|| EncodeError::MissingSignal(signal.name.clone()))?;
            signal.check_range(value)?;
            let raw = signal.to_raw(value)?;
            let mask = signal.mask() << signal.start_bit;
            word = (word & !mask) | ((raw << signal.start_bit) & mask);
        }

        Ok(word.to_le_bytes()[..usize::from(self.length)].to_vec())
    }

    /// Decode a payload into physical values
    pub fn decode(&self, data: &[u8]) -> Result<SignalValues, DecodeError> {
        let expected = usize::from(self.length);
        if data.len() < expected {
            return Err(DecodeError::ShortPayload {
                message: self.name.clone(),
                expected,
                actual: data.len(),
            });
        }

        let mut bytes = [0u8; 8];
        bytes[..expected].copy_from_slice(&data[..expected]);
        let word = u64::from_le_bytes(bytes);

        Ok(self
            .signals
            .iter()
            .map(|signal| {
                let bits = (word >> signal.start_bit) & signal.mask();
                (signal.name.clone(), signal.from_raw(bits))
            })
            .collect())
    }

    /// Check the layout of the message and all its signals
    pub(crate) fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |reason: String| CatalogError::InvalidMessage {
            message: self.name.clone(),
            reason,
        };

        if self.frame_id > 0x7FF {
            return Err(invalid(format!(
                "frame ID 0x{:X} is not an 11-bit identifier",
                self.frame_id
            )));
        }
        if self.length == 0 || self.length > MAX_MESSAGE_LEN {
            return Err(invalid(format!("length {} not in 1..=8", self.length)));
        }

        let mut occupied: u64 = 0;
        for (idx, signal) in self.signals.iter().enumerate() {
            signal.validate(&self.name, self.length)?;

            if self.signals[..idx].iter().any(|s| s.name == signal.name) {
                return Err(invalid(format!("duplicate signal {}", signal.name)));
            }
            let bits = signal.mask() << signal.start_bit;
            if occupied & bits != 0 {
                return Err(invalid(format!("signal {} overlaps another signal", signal.name)));
            }
            occupied |= bits;
        }
        Ok(())
    }
}
