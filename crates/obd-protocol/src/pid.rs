//! OBD-II PID Definitions and Response Parsing
//!
//! Mode 01 Parameter IDs known to the simulator and their decoding formulas.

use crate::error::ObdError;
use crate::frame::ObdResponse;
use crate::mode;
use serde::{Deserialize, Serialize};

/// Mode 01 (current data) PIDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Pid {
    /// PIDs supported 0x01-0x20 (0x00)
    SupportedPids = 0x00,
    /// Calculated engine load (0x04)
    EngineLoad = 0x04,
    /// Engine coolant temperature (0x05)
    CoolantTemp = 0x05,
    /// Engine RPM (0x0C)
    Rpm = 0x0C,
    /// Vehicle speed (0x0D)
    Speed = 0x0D,
    /// Throttle position (0x11)
    ThrottlePosition = 0x11,
    /// Fuel tank level input (0x2F)
    FuelLevel = 0x2F,
    /// Fuel type (0x51)
    FuelType = 0x51,
}

impl Pid {
    /// Look up a PID by its hex value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Pid::SupportedPids),
            0x04 => Some(Pid::EngineLoad),
            0x05 => Some(Pid::CoolantTemp),
            0x0C => Some(Pid::Rpm),
            0x0D => Some(Pid::Speed),
            0x11 => Some(Pid::ThrottlePosition),
            0x2F => Some(Pid::FuelLevel),
            0x51 => Some(Pid::FuelType),
            _ => None,
        }
    }

    /// Get the PID hex value
    pub fn as_hex(&self) -> u8 {
        *self as u8
    }

    /// Get the number of response data bytes for this PID
    pub fn response_bytes(&self) -> usize {
        match self {
            Pid::SupportedPids => 4,
            Pid::Rpm => 2,
            _ => 1,
        }
    }

    /// Engineering unit of the decoded value
    pub fn unit(&self) -> &'static str {
        match self {
            Pid::SupportedPids | Pid::FuelType => "",
            Pid::EngineLoad | Pid::ThrottlePosition | Pid::FuelLevel => "%",
            Pid::CoolantTemp => "degC",
            Pid::Rpm => "rpm",
            Pid::Speed => "km/h",
        }
    }
}

/// Decoded value of a Mode 01 response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PidResponse {
    /// The PID that was queried
    pub pid: u8,
    /// Timestamp when the response was received (Unix ms)
    pub timestamp_ms: u64,
    /// Decoded value
    pub value: f64,
    /// Raw data bytes from the response
    pub raw_bytes: Vec<u8>,
}

impl PidResponse {
    /// Create a new PID response by decoding raw bytes
    pub fn decode(pid: u8, raw_bytes: Vec<u8>, timestamp_ms: u64) -> Self {
        let value = Self::decode_value(pid, &raw_bytes);
        Self {
            pid,
            timestamp_ms,
            value,
            raw_bytes,
        }
    }

    /// Decode a parsed Mode 01 response frame
    pub fn from_response(response: &ObdResponse, timestamp_ms: u64) -> Result<Self, ObdError> {
        if response.request_service() != mode::CURRENT_DATA {
            return Err(ObdError::InvalidResponse(format!(
                "service {:02X} is not a current data response",
                response.service()
            )));
        }
        let pid = response
            .pid()
            .ok_or_else(|| ObdError::InvalidResponse("missing PID".to_string()))?;
        let known = Pid::from_u8(pid).ok_or(ObdError::PidNotSupported(pid))?;

        let data = response.data();
        if data.len() < known.response_bytes() {
            return Err(ObdError::InvalidResponse(format!(
                "PID {:02X} expects {} data bytes, got {}",
                pid,
                known.response_bytes(),
                data.len()
            )));
        }

        Ok(Self::decode(pid, data.to_vec(), timestamp_ms))
    }

    /// Decode the raw bytes to a value based on the PID formula
    fn decode_value(pid: u8, bytes: &[u8]) -> f64 {
        match pid {
            // RPM: ((A*256)+B)/4
            0x0C if bytes.len() >= 2 => ((bytes[0] as f64 * 256.0) + bytes[1] as f64) / 4.0,
            // Speed: A (km/h)
            0x0D if !bytes.is_empty() => bytes[0] as f64,
            // Coolant Temp: A - 40 (°C)
            0x05 if !bytes.is_empty() => bytes[0] as f64 - 40.0,
            // Engine Load / Throttle / Fuel level: A * 100 / 255 (%)
            0x04 | 0x11 | 0x2F if !bytes.is_empty() => bytes[0] as f64 * 100.0 / 255.0,
            // Fuel type: enumerated code
            0x51 if !bytes.is_empty() => bytes[0] as f64,
            _ => 0.0,
        }
    }
}
