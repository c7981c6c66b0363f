//! Signal Database Error Types

use thiserror::Error;

/// Errors encoding physical values into a payload
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    /// No value supplied for a signal of the message
    #[error("Missing value for signal {0}")]
    MissingSignal(String),

    /// Physical value outside the signal's declared range
    #[error("{signal} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        signal: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Raw value does not fit the signal's bit width
    #[error("{signal} raw value {raw} does not fit in {length} bits")]
    RawOverflow { signal: String, raw: i128, length: u8 },
}

/// Errors decoding a payload into physical values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Payload shorter than the message length
    #[error("{message} expects {expected} bytes, got {actual}")]
    ShortPayload {
        message: String,
        expected: usize,
        actual: usize,
    },
}

/// Errors loading or validating a catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Catalog file could not be read
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Catalog file is not valid TOML for the schema
    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    /// Two messages share a name
    #[error("Duplicate message name: {0}")]
    DuplicateName(String),

    /// Two messages share a frame identifier
    #[error("Duplicate frame ID: 0x{0:03X}")]
    DuplicateId(u32),

    /// Message definition violates a layout constraint
    #[error("Invalid message {message}: {reason}")]
    InvalidMessage { message: String, reason: String },

    /// Signal definition violates a layout constraint
    #[error("Invalid signal {message}.{signal}: {reason}")]
    InvalidSignal {
        message: String,
        signal: String,
        reason: String,
    },
}
