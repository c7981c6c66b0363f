//! CAN Signal Database
//!
//! Read-only catalog of CAN messages and their bit-packed signals, with
//! encode/decode between physical signal values and frame payloads.
//! Signals are Intel (little-endian) bit fields inside classic 8-byte frames.

mod database;
mod error;
mod message;
mod signal;
mod vehicle;

use std::collections::BTreeMap;

pub use database::SignalDatabase;
pub use error::{CatalogError, DecodeError, EncodeError};
pub use message::MessageDef;
pub use signal::{SignalChoice, SignalDef};

/// Physical signal values keyed by signal name
pub type SignalValues = BTreeMap<String, f64>;
