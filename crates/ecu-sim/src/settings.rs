//! Host Settings

use crate::error::SimError;
use obd_protocol::OBD_RESPONSE_BASE_ID;
use serde::{Deserialize, Serialize};
use signal_db::SignalDatabase;
use std::time::Duration;
use tracing::info;

/// Settings file looked up in the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "ecu-sim.toml";

/// Prefix of environment overrides, e.g. `ECU_SIM_CAN_CHANNEL`
pub const ENV_PREFIX: &str = "ECU_SIM";

/// Shortest responder receive timeout
const MIN_RECV_TIMEOUT_MS: u64 = 1;

/// Process-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Bus backend
    pub can_interface: String,
    /// Bus channel name
    pub can_channel: String,
    /// TOML catalog replacing the built-in vehicle catalog
    pub catalog_path: Option<String>,
    /// Responder receive timeout in milliseconds
    pub recv_timeout_ms: u64,
    /// Identifier the responder answers from
    pub responder_id: u32,
    /// Fixed seed for reproducible signal values
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            can_interface: can_bus::VIRTUAL_INTERFACE.to_string(),
            can_channel: "bus0".to_string(),
            catalog_path: None,
            recv_timeout_ms: 100,
            responder_id: OBD_RESPONSE_BASE_ID,
            seed: None,
        }
    }
}

impl Settings {
    /// Load from `ecu-sim.toml` (if present) and `ECU_SIM_*` variables
    pub fn load() -> Result<Self, SimError> {
        Self::load_from(DEFAULT_SETTINGS_FILE)
    }

    /// Load from an optional settings file plus environment overrides
    pub fn load_from(path: &str) -> Result<Self, SimError> {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), SimError> {
        if self.recv_timeout_ms == 0 {
            return Err(SimError::InvalidSettings(
                "recv_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.responder_id > can_bus::MAX_STANDARD_ID {
            return Err(SimError::InvalidSettings(format!(
                "responder_id 0x{:X} exceeds the 11-bit range",
                self.responder_id
            )));
        }
        Ok(())
    }

    /// Runtime parameters of a simulation
    pub fn sim_config(&self) -> SimConfig {
        SimConfig {
            recv_timeout: Duration::from_millis(self.recv_timeout_ms.max(MIN_RECV_TIMEOUT_MS)),
            responder_id: self.responder_id,
            seed: self.seed,
        }
    }

    /// Load the configured catalog, defaulting to the built-in vehicle
    pub fn catalog(&self) -> Result<SignalDatabase, SimError> {
        let catalog = match &self.catalog_path {
            Some(path) => {
                info!(path = %path, "Loading signal catalog");
                SignalDatabase::from_toml_file(path)?
            }
            None => SignalDatabase::vehicle()?,
        };
        Ok(catalog)
    }
}

/// Runtime parameters handed to a simulation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Responder receive timeout; also bounds shutdown latency
    pub recv_timeout: Duration,
    /// Identifier the responder answers from
    pub responder_id: u32,
    /// Base seed; scheduler `i` uses `seed + i`
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Settings::default().sim_config()
    }
}
