//! Simulator Error Types

use can_bus::BusError;
use obd_protocol::ObdError;
use signal_db::{CatalogError, EncodeError};
use thiserror::Error;

/// Errors raised by the simulation engine
#[derive(Debug, Error)]
pub enum SimError {
    /// Profile names a message the catalog does not define
    #[error("Unknown message in profile: {0}")]
    UnknownMessage(String),

    /// Profile is malformed
    #[error("Invalid transmission profile: {0}")]
    InvalidProfile(String),

    /// Catalog could not be loaded
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Signal values could not be encoded
    #[error("Encode failed: {0}")]
    Encode(#[from] EncodeError),

    /// Bus transport failure
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// Diagnostic framing failure
    #[error("OBD error: {0}")]
    Obd(#[from] ObdError),

    /// Settings hold an unusable value
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// Settings could not be loaded
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    /// Filesystem failure
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
