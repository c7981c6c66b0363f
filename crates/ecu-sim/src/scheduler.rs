//! Periodic Message Transmission

use crate::codec::next_frame;
use crate::error::SimError;
use crate::generator::SignalGenerator;
use can_bus::{CanBus, CanFrame, SharedBus};
use rand::rngs::StdRng;
use rand::Rng;
use signal_db::MessageDef;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

/// Lifecycle of a message scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Created, not yet started
    Idle,
    /// Transmitting every period
    Running,
    /// Cancelled
    Stopped,
}

/// Per-scheduler transmission counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Frames handed to the bus
    pub sent: u64,
    /// Ticks skipped because values could not be encoded
    pub encode_failures: u64,
    /// Ticks whose frame the bus refused
    pub send_failures: u64,
}

/// Transmits one catalog message at a fixed period
pub struct MessageScheduler<R = StdRng> {
    /// Message layout being simulated
    message: Arc<MessageDef>,
    /// Delay between the end of one tick and the start of the next
    period: Duration,
    /// Source of signal values
    generator: SignalGenerator<R>,
    state: SchedulerState,
    stats: TickStats,
}

impl<R: Rng + Send + 'static> MessageScheduler<R> {
    /// Create an idle scheduler
    pub fn new(message: Arc<MessageDef>, period: Duration, generator: SignalGenerator<R>) -> Self {
        Self {
            message,
            period,
            generator,
            state: SchedulerState::Idle,
            stats: TickStats::default(),
        }
    }

    /// Name of the simulated message
    pub fn message_name(&self) -> &str {
        &self.message.name
    }

    /// Transmission period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Current lifecycle state
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Counters accumulated so far
    pub fn stats(&self) -> TickStats {
        self.stats
    }

    /// Sample, encode and send one frame
    pub async fn tick(&mut self, bus: &dyn CanBus) -> Result<CanFrame, SimError> {
        let (frame, values) = next_frame(&self.message, &mut self.generator)?;
        bus.send(&frame).await?;
        trace!(message = %self.message.name, ?values, "Sent");
        Ok(frame)
    }

    fn record(&mut self, result: Result<CanFrame, SimError>) {
        match result {
            Ok(_) => self.stats.sent += 1,
            Err(SimError::Encode(e)) => {
                self.stats.encode_failures += 1;
                warn!(message = %self.message.name, error = %e, "Skipping tick, encode failed");
            }
            Err(e) => {
                self.stats.send_failures += 1;
                warn!(message = %self.message.name, error = %e, "Error sending frame");
            }
        }
    }

    /// Transmit every period until `shutdown` flips to `true` or its sender
    /// is dropped
    ///
    /// A failed tick is logged and counted; the next tick happens on schedule.
    pub async fn run(mut self, bus: SharedBus, mut shutdown: watch::Receiver<bool>) -> TickStats {
        self.state = SchedulerState::Running;
        info!(
            message = %self.message.name,
            frame_id = format!("0x{:03X}", self.message.frame_id),
            period_ms = self.period.as_millis() as u64,
            "Scheduler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let result = self.tick(bus.as_ref()).await;
            self.record(result);

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(self.period) => {}
            }
        }

        self.state = SchedulerState::Stopped;
        debug!(message = %self.message.name, stats = ?self.stats, "Scheduler stopped");
        self.stats
    }
}
