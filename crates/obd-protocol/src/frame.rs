//! Single-Frame ISO-TP Codec
//!
//! A single frame carries `[length, payload.., padding]` in exactly 8 bytes,
//! where `length` counts the meaningful payload bytes (1..=7).

use crate::error::ObdError;
use crate::{mode, FRAME_LEN, MAX_SINGLE_FRAME_PAYLOAD, OBD_BROADCAST_ID};
use serde::{Deserialize, Serialize};

/// A decoded diagnostic request
///
/// `service == 0` with no PID is the reserved no-op value produced for
/// malformed input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObdRequest {
    /// Service (mode) ID
    pub service: u8,
    /// Parameter ID, if the request carried one
    pub pid: Option<u8>,
}

impl ObdRequest {
    pub fn new(service: u8, pid: Option<u8>) -> Self {
        Self { service, pid }
    }

    /// Whether this is the no-op value of a malformed request
    pub fn is_noop(&self) -> bool {
        self.service == 0 && self.pid.is_none()
    }
}

/// A decoded single-frame response payload (length byte stripped)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObdResponse {
    /// Response payload starting with the positive response service ID
    pub payload: Vec<u8>,
}

impl ObdResponse {
    /// Positive response service ID (request service + 0x40)
    pub fn service(&self) -> u8 {
        self.payload.first().copied().unwrap_or(0)
    }

    /// Service ID of the request this answers
    pub fn request_service(&self) -> u8 {
        self.service().wrapping_sub(0x40)
    }

    /// Echoed PID, for services that address one
    pub fn pid(&self) -> Option<u8> {
        match self.request_service() {
            mode::CURRENT_DATA | mode::FREEZE_FRAME | mode::VEHICLE_INFO => {
                self.payload.get(1).copied()
            }
            _ => None,
        }
    }

    /// Data bytes following the service and PID
    pub fn data(&self) -> &[u8] {
        let start = if self.pid().is_some() { 2 } else { 1 };
        &self.payload[start.min(self.payload.len())..]
    }
}

fn single_frame(payload: &[u8]) -> Result<[u8; FRAME_LEN], ObdError> {
    if payload.len() > MAX_SINGLE_FRAME_PAYLOAD {
        return Err(ObdError::PayloadTooLong(payload.len()));
    }
    let mut frame = [0u8; FRAME_LEN];
    frame[0] = payload.len() as u8;
    frame[1..=payload.len()].copy_from_slice(payload);
    Ok(frame)
}

/// Extract the length-prefixed payload of a single frame
///
/// A length byte claiming more bytes than are present is rejected rather
/// than read as whatever bytes remain.
fn single_frame_payload(data: &[u8]) -> Option<&[u8]> {
    let (&length, rest) = data.split_first()?;
    let length = usize::from(length);
    if length == 0 || length > MAX_SINGLE_FRAME_PAYLOAD || length > rest.len() {
        return None;
    }
    Some(&rest[..length])
}

/// Build a broadcast request frame
///
/// Returns the broadcast identifier and the 8-byte payload.
pub fn build_request(service: u8, pid: Option<u8>) -> (u32, [u8; FRAME_LEN]) {
    let mut frame = [0u8; FRAME_LEN];
    match pid {
        Some(pid) => {
            frame[0] = 2;
            frame[1] = service;
            frame[2] = pid;
        }
        None => {
            frame[0] = 1;
            frame[1] = service;
        }
    }
    (OBD_BROADCAST_ID, frame)
}

/// Parse a single-frame request
///
/// Never fails: empty, zero-length, truncated or multi-frame input yields
/// the no-op request `(0, None)`.
pub fn parse_request(data: &[u8]) -> ObdRequest {
    match single_frame_payload(data) {
        Some(payload) => ObdRequest {
            service: payload[0],
            pid: payload.get(1).copied(),
        },
        None => ObdRequest::default(),
    }
}

/// Frame a response payload for transmission from `responder_id`
pub fn build_response_frame(
    payload: &[u8],
    responder_id: u32,
) -> Result<(u32, [u8; FRAME_LEN]), ObdError> {
    Ok((responder_id, single_frame(payload)?))
}

/// Parse a single-frame response
pub fn parse_response(data: &[u8]) -> Result<ObdResponse, ObdError> {
    let payload = single_frame_payload(data).ok_or_else(|| {
        ObdError::InvalidResponse(format!("not a single-frame response: {:02X?}", data))
    })?;

    if payload[0] == 0x7F {
        return match payload {
            [_, service, code, ..] => Err(ObdError::NegativeResponse {
                service: *service,
                code: *code,
            }),
            _ => Err(ObdError::InvalidResponse(
                "truncated negative response".to_string(),
            )),
        };
    }
    if payload[0] < 0x40 {
        return Err(ObdError::InvalidResponse(format!(
            "service {:02X} is not a positive response",
            payload[0]
        )));
    }

    Ok(ObdResponse {
        payload: payload.to_vec(),
    })
}
