//! ECU Network Simulator
//!
//! Broadcasts randomly sampled vehicle state frames on a CAN bus at
//! per-message periods and answers OBD-II broadcast requests with canned
//! single-frame responses.
//!
//! A [`Simulation`] owns one [`MessageScheduler`] task per profile entry and
//! one [`ObdResponder`] task, all sharing a single bus handle.

mod codec;
mod error;
mod generator;
mod logging;
mod profile;
mod responder;
mod scheduler;
mod settings;
mod supervisor;

pub use codec::next_frame;
pub use error::SimError;
pub use generator::SignalGenerator;
pub use logging::init_logging;
pub use profile::{ProfileEntry, TransmissionProfile};
pub use responder::{respond_to, ObdResponder, ResponderStats};
pub use scheduler::{MessageScheduler, SchedulerState, TickStats};
pub use settings::{Settings, SimConfig};
pub use supervisor::{Simulation, SimulationReport};
