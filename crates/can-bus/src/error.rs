//! Bus Error Types

use thiserror::Error;

/// Errors raised by a CAN bus transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// Identifier does not fit the 11-bit standard range
    #[error("CAN ID 0x{0:X} exceeds the 11-bit standard range")]
    InvalidId(u32),

    /// Payload longer than a classic CAN frame
    #[error("Payload of {0} bytes exceeds 8-byte CAN frame")]
    PayloadTooLong(usize),

    /// Endpoint has been shut down
    #[error("Bus endpoint is shut down")]
    Closed,

    /// Requested interface is not available
    #[error("Unsupported CAN interface: {0}")]
    UnsupportedInterface(String),

    /// Transport-specific send failure
    #[error("Failed to send frame: {0}")]
    Send(String),
}
