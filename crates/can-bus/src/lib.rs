//! CAN Bus Transport
//!
//! Wire frame type and the transport abstraction shared by the ECU
//! simulator tasks. Ships an in-process virtual bus that behaves like a
//! broadcast medium between endpoints.

mod bus;
mod error;
mod frame;
mod virtual_bus;

pub use bus::{make_bus, open_network, CanBus, SharedBus};
pub use error::BusError;
pub use frame::{CanFrame, MAX_DATA_LEN, MAX_STANDARD_ID};
pub use virtual_bus::{VirtualBus, VirtualNetwork};

/// Interface name selecting the in-process virtual bus
pub const VIRTUAL_INTERFACE: &str = "virtual";
