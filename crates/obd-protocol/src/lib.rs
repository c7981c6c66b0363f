//! OBD-II Protocol Implementation
//!
//! Single-frame ISO 15765-4 codec for 11-bit CAN identifiers: building and
//! parsing length-prefixed requests and responses, plus the canned response
//! table of the simulated ECU.

mod error;
mod frame;
mod pid;
mod response;

pub use error::ObdError;
pub use frame::{
    build_request, build_response_frame, parse_request, parse_response, ObdRequest, ObdResponse,
};
pub use pid::{Pid, PidResponse};
pub use response::{simulate_response, supported_pid_mask, ECU_NAME};

/// Functional (broadcast) request identifier
pub const OBD_BROADCAST_ID: u32 = 0x7DF;

/// Response identifier of the first ECU
pub const OBD_RESPONSE_BASE_ID: u32 = 0x7E8;

/// Bytes in a classic CAN frame
pub const FRAME_LEN: usize = 8;

/// Largest payload carried by a single frame (after the length byte)
pub const MAX_SINGLE_FRAME_PAYLOAD: usize = FRAME_LEN - 1;

/// OBD-II mode constants
pub mod mode {
    /// Current data
    pub const CURRENT_DATA: u8 = 0x01;
    /// Freeze frame data
    pub const FREEZE_FRAME: u8 = 0x02;
    /// Diagnostic trouble codes
    pub const READ_DTC: u8 = 0x03;
    /// Vehicle information
    pub const VEHICLE_INFO: u8 = 0x09;

    /// Positive response service ID for a request service
    pub const fn positive_response(service: u8) -> u8 {
        service.wrapping_add(0x40)
    }
}
