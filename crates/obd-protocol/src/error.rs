//! OBD-II Error Types

use thiserror::Error;

/// Errors that can occur while framing or interpreting OBD-II messages
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObdError {
    /// Payload does not fit a single frame
    #[error("Payload of {0} bytes does not fit a single frame (max 7)")]
    PayloadTooLong(usize),

    /// Invalid response from the ECU
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Negative response (0x7F) from the ECU
    #[error("Negative response to service {service:02X}: NRC {code:02X}")]
    NegativeResponse { service: u8, code: u8 },

    /// PID not supported by vehicle
    #[error("PID {0:02X} not supported by vehicle")]
    PidNotSupported(u8),
}
