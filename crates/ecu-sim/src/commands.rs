//! Subcommand implementations for ecu-sim

use anyhow::{anyhow, Context, Result};
use can_bus::{open_network, CanBus, CanFrame, SharedBus, VirtualBus, VirtualNetwork, MAX_STANDARD_ID};
use ecu_sim::{Settings, Simulation, TransmissionProfile};
use obd_protocol::{build_request, parse_response, Pid, PidResponse};
use serde::Serialize;
use signal_db::{SignalDatabase, SignalValues};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Upper bound on a single receive while capturing
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Period used by `monitor` for messages missing from the default profile
const MONITOR_PERIOD_S: f64 = 0.1;

#[derive(Serialize)]
struct FrameRecord {
    timestamp: Option<f64>,
    arbitration_id: String,
    data: Vec<u8>,
}

impl From<&CanFrame> for FrameRecord {
    fn from(frame: &CanFrame) -> Self {
        Self {
            timestamp: frame_timestamp(frame),
            arbitration_id: format_id(frame.id()),
            data: frame.data().to_vec(),
        }
    }
}

#[derive(Serialize)]
struct DecodedFrame<'a> {
    message: &'a str,
    arbitration_id: String,
    signals: SignalValues,
}

#[derive(Serialize)]
struct SignalSample<'a> {
    timestamp: Option<f64>,
    signal: &'a str,
    value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<&'a str>,
}

#[derive(Serialize)]
struct ObdReply {
    status: &'static str,
    arbitration_id: String,
    data: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    service: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pid: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Run the simulator until Ctrl-C
pub async fn simulate(settings: &Settings, profile: Option<&Path>) -> Result<ExitCode> {
    let catalog = settings.catalog()?;
    let profile = match profile {
        Some(path) => TransmissionProfile::from_toml_file(path)
            .with_context(|| format!("Failed to load profile {}", path.display()))?,
        None => TransmissionProfile::default(),
    };

    let network = open(settings)?;
    let simulation = start(settings, &network, &catalog, &profile)?;
    info!("Simulation running, press Ctrl-C to stop");

    let report = simulation
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
            }
        })
        .await;

    for (message, stats) in &report.schedulers {
        info!(
            message = %message,
            sent = stats.sent,
            encode_failures = stats.encode_failures,
            send_failures = stats.send_failures,
            "Transmission summary"
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// Capture simulated traffic and print it as a JSON array
pub async fn frames(settings: &Settings, seconds: f64) -> Result<ExitCode> {
    let duration = parse_seconds(seconds)?;
    let catalog = settings.catalog()?;

    let network = open(settings)?;
    let listener = network.connect();
    let simulation = start(settings, &network, &catalog, &TransmissionProfile::default())?;

    let mut records = Vec::new();
    capture(&listener, duration, |frame| {
        records.push(FrameRecord::from(&frame));
        Ok(())
    })
    .await?;

    simulation.shutdown().await;
    listener.shutdown();

    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(ExitCode::SUCCESS)
}

/// Decode one frame against the catalog
pub fn decode(settings: &Settings, id: u32, data: &str) -> Result<ExitCode> {
    let catalog = settings.catalog()?;
    let payload = parse_data_bytes(data).map_err(|e| anyhow!(e))?;

    let message = catalog
        .message_by_id(id)
        .ok_or_else(|| anyhow!("No message with id {} in catalog", format_id(id)))?;
    let signals = message
        .decode(&payload)
        .with_context(|| format!("Failed to decode {}", message.name))?;

    let decoded = DecodedFrame {
        message: &message.name,
        arbitration_id: format_id(id),
        signals,
    };
    println!("{}", serde_json::to_string_pretty(&decoded)?);
    Ok(ExitCode::SUCCESS)
}

/// Print every transmitted value of one signal, one JSON object per line
pub async fn monitor(settings: &Settings, signal: &str, seconds: f64) -> Result<ExitCode> {
    let duration = parse_seconds(seconds)?;
    let catalog = settings.catalog()?;

    let message = find_message_for_signal(&catalog, signal)
        .ok_or_else(|| anyhow!("Signal {} not found in catalog", signal))?;
    let definition = message
        .signal(signal)
        .ok_or_else(|| anyhow!("Signal {} not found in {}", signal, message.name))?;

    let period = TransmissionProfile::default()
        .entries()
        .iter()
        .find(|entry| entry.message == message.name)
        .map(|entry| entry.period_s)
        .unwrap_or(MONITOR_PERIOD_S);
    let profile = TransmissionProfile::from_pairs(&[(message.name.as_str(), period)])?;

    let network = open(settings)?;
    let listener = network.connect();
    let simulation = start(settings, &network, &catalog, &profile)?;

    let result = capture(&listener, duration, |frame| {
        if frame.id() != message.frame_id {
            return Ok(());
        }
        let values = message.decode(frame.data())?;
        if let Some(&value) = values.get(signal) {
            let sample = SignalSample {
                timestamp: frame_timestamp(&frame),
                signal,
                value,
                label: definition.choice_label(value),
                unit: definition.unit.as_deref(),
            };
            println!("{}", serde_json::to_string(&sample)?);
        }
        Ok(())
    })
    .await;

    simulation.shutdown().await;
    listener.shutdown();
    result?;
    Ok(ExitCode::SUCCESS)
}

/// Send one OBD-II request to an in-process responder and print the reply
pub async fn obd_request(
    settings: &Settings,
    service: u8,
    pid: Option<u8>,
    timeout: f64,
) -> Result<ExitCode> {
    let timeout = parse_seconds(timeout)?;
    let catalog = settings.catalog()?;

    let network = open(settings)?;
    let tester = network.connect();
    let simulation = start(settings, &network, &catalog, &TransmissionProfile::new(Vec::new())?)?;

    let (id, data) = build_request(service, pid);
    let request = CanFrame::new(id, &data)?;
    let reply = match tester.send(&request).await {
        Ok(()) => wait_for_id(&tester, settings.responder_id, timeout).await,
        Err(e) => Err(e.into()),
    };

    simulation.shutdown().await;
    tester.shutdown();

    match reply? {
        Some(frame) => {
            println!("{}", serde_json::to_string_pretty(&describe_reply(&frame))?);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("{}", serde_json::json!({ "status": "timeout" }));
            Ok(ExitCode::FAILURE)
        }
    }
}

fn open(settings: &Settings) -> Result<VirtualNetwork> {
    open_network(&settings.can_interface, &settings.can_channel).with_context(|| {
        format!(
            "Failed to open CAN bus {}/{}",
            settings.can_interface, settings.can_channel
        )
    })
}

fn start(
    settings: &Settings,
    network: &VirtualNetwork,
    catalog: &SignalDatabase,
    profile: &TransmissionProfile,
) -> Result<Simulation> {
    let bus: SharedBus = Arc::new(network.connect());
    Simulation::start(profile, catalog, bus, &settings.sim_config()).context("Failed to start simulation")
}

/// Feed every frame received within `duration` to `on_frame`
async fn capture<F>(listener: &VirtualBus, duration: Duration, mut on_frame: F) -> Result<()>
where
    F: FnMut(CanFrame) -> Result<()>,
{
    let deadline = Instant::now() + duration;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(());
        }
        if let Some(frame) = listener.recv(remaining.min(POLL_INTERVAL)).await? {
            on_frame(frame)?;
        }
    }
}

/// First frame carrying `id` within `timeout`
async fn wait_for_id(listener: &VirtualBus, id: u32, timeout: Duration) -> Result<Option<CanFrame>> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(None);
        }
        match listener.recv(remaining.min(POLL_INTERVAL)).await? {
            Some(frame) if frame.id() == id => return Ok(Some(frame)),
            _ => {}
        }
    }
}

fn describe_reply(frame: &CanFrame) -> ObdReply {
    let mut reply = ObdReply {
        status: "ok",
        arbitration_id: format_id(frame.id()),
        data: frame.data().to_vec(),
        service: None,
        pid: None,
        value: None,
        unit: None,
        error: None,
    };

    match parse_response(frame.data()) {
        Ok(response) => {
            reply.service = Some(response.service());
            reply.pid = response.pid();
            let timestamp_ms = frame.timestamp_ms.unwrap_or(0);
            if let Ok(decoded) = PidResponse::from_response(&response, timestamp_ms) {
                reply.value = Some(decoded.value);
                reply.unit = Pid::from_u8(decoded.pid).map(|pid| pid.unit());
            }
        }
        Err(e) => reply.error = Some(e.to_string()),
    }
    reply
}

fn find_message_for_signal(catalog: &SignalDatabase, signal: &str) -> Option<Arc<signal_db::MessageDef>> {
    catalog
        .messages()
        .find(|message| message.signal(signal).is_some())
        .and_then(|message| catalog.message_by_name(&message.name))
}

fn frame_timestamp(frame: &CanFrame) -> Option<f64> {
    frame.timestamp_ms.map(|ms| ms as f64 / 1000.0)
}

fn format_id(id: u32) -> String {
    format!("0x{:03X}", id)
}

fn parse_seconds(seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds).map_err(|_| anyhow!("Invalid duration: {} seconds", seconds))
}

fn parse_number(text: &str) -> Result<u64, String> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid number '{}': {}", text, e))
}

/// Parse an arbitration id given as `0x` hex or decimal
pub fn parse_can_id(text: &str) -> Result<u32, String> {
    let id = parse_number(text)?;
    if id > MAX_STANDARD_ID as u64 {
        return Err(format!("id {} exceeds the 11-bit range", text.trim()));
    }
    Ok(id as u32)
}

/// Parse one byte given as `0x` hex or decimal
pub fn parse_byte(text: &str) -> Result<u8, String> {
    let value = parse_number(text)?;
    u8::try_from(value).map_err(|_| format!("{} does not fit in a byte", text.trim()))
}

/// Parse a payload
///
/// Comma-separated items are `0x` hex or decimal; otherwise the payload is
/// whitespace-separated hex.
pub fn parse_data_bytes(text: &str) -> Result<Vec<u8>, String> {
    let bytes = if text.contains(',') {
        text.split(',')
            .filter(|item| !item.trim().is_empty())
            .map(parse_byte)
            .collect::<Result<Vec<_>, _>>()?
    } else {
        text.split_whitespace()
            .map(|item| {
                let hex = item
                    .strip_prefix("0x")
                    .or_else(|| item.strip_prefix("0X"))
                    .unwrap_or(item);
                u8::from_str_radix(hex, 16).map_err(|e| format!("invalid hex byte '{}': {}", item, e))
            })
            .collect::<Result<Vec<_>, _>>()?
    };

    if bytes.is_empty() {
        return Err("empty payload".to_string());
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_can_id() {
        assert_eq!(parse_can_id("0x100"), Ok(0x100));
        assert_eq!(parse_can_id("0X7df"), Ok(0x7DF));
        assert_eq!(parse_can_id("256"), Ok(256));
        assert!(parse_can_id("0x800").is_err());
        assert!(parse_can_id("engine").is_err());
    }

    #[test]
    fn test_parse_byte() {
        assert_eq!(parse_byte("0x0D"), Ok(0x0D));
        assert_eq!(parse_byte("9"), Ok(9));
        assert!(parse_byte("256").is_err());
    }

    #[test]
    fn test_parse_comma_separated_payload() {
        assert_eq!(parse_data_bytes("0x10,0x27,3"), Ok(vec![0x10, 0x27, 3]));
        assert_eq!(parse_data_bytes("1, 2, 255"), Ok(vec![1, 2, 255]));
        assert!(parse_data_bytes("1,256").is_err());
    }

    #[test]
    fn test_parse_space_separated_hex_payload() {
        assert_eq!(parse_data_bytes("10 27 ff"), Ok(vec![0x10, 0x27, 0xFF]));
        assert_eq!(parse_data_bytes("0x01 0x02"), Ok(vec![1, 2]));
        assert!(parse_data_bytes("zz").is_err());
        assert!(parse_data_bytes("   ").is_err());
    }

    #[test]
    fn test_parse_seconds_rejects_negative() {
        assert!(parse_seconds(-1.0).is_err());
        assert!(parse_seconds(f64::NAN).is_err());
        assert_eq!(parse_seconds(0.5).unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn test_describe_speed_reply() {
        let frame = CanFrame::padded(0x7E8, &[0x03, 0x41, 0x0D, 50]).unwrap();
        let reply = describe_reply(&frame);
        assert_eq!(reply.arbitration_id, "0x7E8");
        assert_eq!(reply.service, Some(0x41));
        assert_eq!(reply.pid, Some(0x0D));
        assert_eq!(reply.value, Some(50.0));
        assert_eq!(reply.unit, Some("km/h"));
    }

    #[test]
    fn test_describe_dtc_reply_has_no_value() {
        let frame = CanFrame::padded(0x7E8, &[0x01, 0x43]).unwrap();
        let reply = describe_reply(&frame);
        assert_eq!(reply.service, Some(0x43));
        assert_eq!(reply.value, None);
        assert_eq!(reply.error, None);
    }

    #[test]
    fn test_find_message_for_signal() {
        let catalog = SignalDatabase::vehicle().unwrap();
        let message = find_message_for_signal(&catalog, "BATTERY_VOLTAGE").unwrap();
        assert_eq!(message.name, "BODY_STATUS");
        assert!(find_message_for_signal(&catalog, "GEAR").is_none());
    }

    #[tokio::test]
    async fn test_capture_sees_default_traffic() {
        let settings = Settings {
            seed: Some(5),
            recv_timeout_ms: 10,
            ..Settings::default()
        };
        let catalog = settings.catalog().unwrap();
        let network = open(&settings).unwrap();
        let listener = network.connect();
        let simulation = start(&settings, &network, &catalog, &TransmissionProfile::default()).unwrap();

        let mut ids = Vec::new();
        capture(&listener, Duration::from_millis(150), |frame| {
            ids.push(frame.id());
            Ok(())
        })
        .await
        .unwrap();
        simulation.shutdown().await;

        for id in [0x100, 0x200, 0x300, 0x400] {
            assert!(ids.contains(&id), "missing 0x{:03X}", id);
        }
    }
}
