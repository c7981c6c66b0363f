//! Bus Transport Abstraction

use crate::error::BusError;
use crate::frame::CanFrame;
use crate::virtual_bus::VirtualNetwork;
use crate::VIRTUAL_INTERFACE;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Duplex CAN transport shared between sender tasks.
///
/// Implementations must accept concurrent `send` calls from multiple tasks.
/// `recv` is expected to have a single consumer.
#[async_trait]
pub trait CanBus: Send + Sync {
    /// Transmit one frame
    async fn send(&self, frame: &CanFrame) -> Result<(), BusError>;

    /// Wait up to `timeout` for the next frame; `Ok(None)` on timeout
    async fn recv(&self, timeout: Duration) -> Result<Option<CanFrame>, BusError>;

    /// Release the transport. Idempotent and infallible.
    fn shutdown(&self);
}

/// Bus handle shared across tasks
pub type SharedBus = Arc<dyn CanBus>;

/// Open the network behind an interface/channel pair
///
/// # Arguments
/// * `interface` - Transport backend (only `"virtual"` is available)
/// * `channel` - Channel name, used to label the virtual network
pub fn open_network(interface: &str, channel: &str) -> Result<VirtualNetwork, BusError> {
    match interface {
        VIRTUAL_INTERFACE => {
            info!(interface, channel, "Opening virtual CAN network");
            Ok(VirtualNetwork::new(channel))
        }
        other => Err(BusError::UnsupportedInterface(other.to_string())),
    }
}

/// Open a single bus endpoint for the given interface and channel
pub fn make_bus(interface: &str, channel: &str) -> Result<SharedBus, BusError> {
    let network = open_network(interface, channel)?;
    Ok(Arc::new(network.connect()))
}
