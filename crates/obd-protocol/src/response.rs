//! Simulated ECU Responses
//!
//! Canned answers for the small set of services and PIDs the simulated ECU
//! supports. Anything else gets no answer, as a real ECU does for PIDs it
//! does not implement.

use crate::mode;
use crate::pid::Pid;
use tracing::trace;

/// ECU name reported by service 0x09 PID 0x0A
pub const ECU_NAME: &[u8] = b"MCP-ECU";

/// Name bytes that fit the single-frame answer
const ECU_NAME_FRAME_LEN: usize = 5;

/// Mode 01 PIDs answered by the simulator
const CURRENT_DATA_PIDS: [u8; 4] = [0x05, 0x0D, 0x2F, 0x51];

/// Mode 09 PIDs advertised by the simulator
const VEHICLE_INFO_PIDS: [u8; 2] = [0x02, 0x0A];

const COOLANT_TEMP_C: i16 = 90;
const VEHICLE_SPEED_KMH: u8 = 50;
const FUEL_LEVEL_PCT: f64 = 50.0;
const FUEL_TYPE_GASOLINE: u8 = 0x01;

/// Pack PIDs 0x01..=0x20 into the 4-byte "PIDs supported" bitmask
///
/// PID `n` maps to byte `(n-1)/8`, bit `7 - (n-1)%8`. PIDs outside the
/// range are ignored.
pub fn supported_pid_mask(pids: &[u8]) -> [u8; 4] {
    let mut mask = [0u8; 4];
    for &pid in pids.iter().filter(|&&p| (0x01..=0x20).contains(&p)) {
        let idx = usize::from((pid - 1) / 8);
        let bit = 7 - ((pid - 1) % 8);
        mask[idx] |= 1 << bit;
    }
    mask
}

fn supported_response(service: u8, pids: &[u8]) -> Vec<u8> {
    let mut payload = vec![mode::positive_response(service), 0x00];
    payload.extend_from_slice(&supported_pid_mask(pids));
    payload
}

fn current_data(pid: u8) -> Option<Vec<u8>> {
    let sid = mode::positive_response(mode::CURRENT_DATA);
    let value = match Pid::from_u8(pid)? {
        Pid::SupportedPids => return Some(supported_response(mode::CURRENT_DATA, &CURRENT_DATA_PIDS)),
        // A - 40
        Pid::CoolantTemp => (COOLANT_TEMP_C + 40) as u8,
        Pid::Speed => VEHICLE_SPEED_KMH,
        // 100/255 * A
        Pid::FuelLevel => (FUEL_LEVEL_PCT * 255.0 / 100.0).round() as u8,
        Pid::FuelType => FUEL_TYPE_GASOLINE,
        _ => return None,
    };
    Some(vec![sid, pid, value])
}

fn vehicle_info(pid: u8) -> Option<Vec<u8>> {
    let sid = mode::positive_response(mode::VEHICLE_INFO);
    match pid {
        0x00 => Some(supported_response(mode::VEHICLE_INFO, &VEHICLE_INFO_PIDS)),
        // Truncated to fit one frame; the full name needs a segmented transfer.
        0x0A => {
            let mut payload = vec![sid, pid];
            payload.extend_from_slice(&ECU_NAME[..ECU_NAME_FRAME_LEN]);
            Some(payload)
        }
        // VIN (0x02) is advertised but always multi-frame
        _ => None,
    }
}

/// Canned response payload (without length byte) for a request
///
/// `None` means the ECU stays silent.
pub fn simulate_response(service: u8, pid: Option<u8>) -> Option<Vec<u8>> {
    let payload = match (service, pid) {
        (mode::CURRENT_DATA, Some(pid)) => current_data(pid),
        (mode::READ_DTC, _) => Some(vec![mode::positive_response(mode::READ_DTC)]),
        (mode::VEHICLE_INFO, Some(pid)) => vehicle_info(pid),
        _ => None,
    };
    trace!(service, ?pid, ?payload, "Simulated response lookup");
    payload
}
