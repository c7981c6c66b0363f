//! Simulation Supervisor
//!
//! Owns the scheduler tasks and the responder task that share one bus.
//! Shutdown is broadcast over a `watch` channel; every task observes it
//! within one period or receive timeout, after which the bus is released.

use crate::error::SimError;
use crate::generator::SignalGenerator;
use crate::profile::TransmissionProfile;
use crate::responder::{ObdResponder, ResponderStats};
use crate::scheduler::{MessageScheduler, TickStats};
use crate::settings::SimConfig;
use can_bus::SharedBus;
use signal_db::SignalDatabase;
use std::future::Future;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Counters collected from every task at shutdown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationReport {
    /// Per-message counters, in profile order
    pub schedulers: Vec<(String, TickStats)>,
    /// Responder counters
    pub responder: ResponderStats,
}

impl SimulationReport {
    /// Frames transmitted by all schedulers
    pub fn frames_sent(&self) -> u64 {
        self.schedulers.iter().map(|(_, stats)| stats.sent).sum()
    }
}

/// A running simulation
///
/// Dropping it without calling [`Simulation::shutdown`] still stops the tasks,
/// but leaves the bus open.
pub struct Simulation {
    bus: SharedBus,
    shutdown_tx: watch::Sender<bool>,
    schedulers: Vec<(String, JoinHandle<TickStats>)>,
    responder: JoinHandle<ResponderStats>,
}

impl Simulation {
    /// Spawn one scheduler per profile entry plus the OBD responder
    ///
    /// Every profile entry is resolved before anything is spawned; an unknown
    /// message name fails the whole start.
    pub fn start(
        profile: &TransmissionProfile,
        catalog: &SignalDatabase,
        bus: SharedBus,
        config: &SimConfig,
    ) -> Result<Self, SimError> {
        let resolved = profile
            .entries()
            .iter()
            .map(|entry| -> Result<_, SimError> {
                let message = catalog
                    .message_by_name(&entry.message)
                    .ok_or_else(|| SimError::UnknownMessage(entry.message.clone()))?;
                Ok((message, entry.period()?))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let schedulers = resolved
            .into_iter()
            .enumerate()
            .map(|(index, (message, period))| {
                let generator = match config.seed {
                    Some(seed) => SignalGenerator::seeded(seed.wrapping_add(index as u64)),
                    None => SignalGenerator::from_entropy(),
                };
                let name = message.name.clone();
                let scheduler = MessageScheduler::new(message, period, generator);
                let handle = tokio::spawn(scheduler.run(bus.clone(), shutdown_rx.clone()));
                (name, handle)
            })
            .collect::<Vec<_>>();

        let responder = ObdResponder::new(config.responder_id, config.recv_timeout);
        let responder = tokio::spawn(responder.run(bus.clone(), shutdown_rx));

        info!(
            messages = schedulers.len(),
            responder_id = format!("0x{:03X}", config.responder_id),
            "Simulation started"
        );

        Ok(Self {
            bus,
            shutdown_tx,
            schedulers,
            responder,
        })
    }

    /// The bus shared by all tasks
    pub fn bus(&self) -> &SharedBus {
        &self.bus
    }

    /// Names of the scheduled messages, in profile order
    pub fn message_names(&self) -> impl Iterator<Item = &str> {
        self.schedulers.iter().map(|(name, _)| name.as_str())
    }

    /// Cancel every task, wait for them to finish, then release the bus
    pub async fn shutdown(self) -> SimulationReport {
        let _ = self.shutdown_tx.send(true);

        let mut report = SimulationReport::default();
        for (name, handle) in self.schedulers {
            let stats = handle.await.unwrap_or_else(|e| {
                warn!(message = %name, error = %e, "Scheduler task failed");
                TickStats::default()
            });
            report.schedulers.push((name, stats));
        }

        report.responder = self.responder.await.unwrap_or_else(|e| {
            warn!(error = %e, "Responder task failed");
            ResponderStats::default()
        });

        self.bus.shutdown();
        info!(
            frames_sent = report.frames_sent(),
            requests_answered = report.responder.answered,
            "Simulation stopped"
        );
        report
    }

    /// Run until `stop` completes, then shut down
    pub async fn run_until<F>(self, stop: F) -> SimulationReport
    where
        F: Future<Output = ()>,
    {
        stop.await;
        info!("Shutting down simulation...");
        self.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use can_bus::{BusError, CanBus, CanFrame, VirtualNetwork};
    use obd_protocol::OBD_BROADCAST_ID;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Records sends and shutdowns; serves queued frames to `recv`
    #[derive(Default)]
    struct RecordingBus {
        sent: Mutex<Vec<CanFrame>>,
        inbox: Mutex<VecDeque<CanFrame>>,
        shutdowns: AtomicUsize,
    }

    impl RecordingBus {
        fn push(&self, frame: CanFrame) {
            self.inbox.lock().unwrap().push_back(frame);
        }

        fn sent(&self) -> Vec<CanFrame> {
            self.sent.lock().unwrap().clone()
        }

        fn shutdowns(&self) -> usize {
            self.shutdowns.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CanBus for RecordingBus {
        async fn send(&self, frame: &CanFrame) -> Result<(), BusError> {
            self.sent.lock().unwrap().push(frame.clone());
            Ok(())
        }

        async fn recv(&self, timeout: Duration) -> Result<Option<CanFrame>, BusError> {
            let next = self.inbox.lock().unwrap().pop_front();
            if next.is_none() {
                tokio::time::sleep(timeout).await;
            }
            Ok(next)
        }

        fn shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fast_config() -> SimConfig {
        SimConfig {
            recv_timeout: Duration::from_millis(10),
            seed: Some(99),
            ..SimConfig::default()
        }
    }

    #[tokio::test]
    async fn test_engine_frames_within_first_period() {
        let catalog = SignalDatabase::vehicle().unwrap();
        let bus = Arc::new(RecordingBus::default());
        let profile = TransmissionProfile::from_pairs(&[("ENGINE_STATUS", 0.01)]).unwrap();

        let sim = Simulation::start(&profile, &catalog, bus.clone(), &fast_config()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let report = sim.shutdown().await;

        let engine = catalog.message_by_name("ENGINE_STATUS").unwrap();
        let frames = bus.sent();
        assert!(!frames.is_empty());
        for frame in &frames {
            assert_eq!(frame.id(), 0x100);
            assert_eq!(frame.data().len(), 8);
            let values = engine.decode(frame.data()).unwrap();
            let speed = values["ENGINE_SPEED"];
            assert!((0.0..=8000.0).contains(&speed));
            let temp = values["ENGINE_TEMP"];
            assert!((-40.0..=215.0).contains(&temp));
        }
        assert_eq!(report.frames_sent(), frames.len() as u64);
    }

    #[tokio::test]
    async fn test_shutdown_stops_sends_and_closes_bus_once() {
        let catalog = SignalDatabase::vehicle().unwrap();
        let bus = Arc::new(RecordingBus::default());
        let sim = Simulation::start(
            &TransmissionProfile::default(),
            &catalog,
            bus.clone(),
            &fast_config(),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        let report = sim.shutdown().await;
        let sent_at_shutdown = bus.sent().len();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(bus.sent().len(), sent_at_shutdown);
        assert_eq!(bus.shutdowns(), 1);
        assert_eq!(report.schedulers.len(), 4);
        assert_eq!(report.schedulers[0].0, "ENGINE_STATUS");
    }

    #[tokio::test]
    async fn test_unknown_message_fails_before_spawning() {
        let catalog = SignalDatabase::vehicle().unwrap();
        let bus = Arc::new(RecordingBus::default());
        let profile =
            TransmissionProfile::from_pairs(&[("ENGINE_STATUS", 0.01), ("GEARBOX_STATUS", 0.1)])
                .unwrap();

        let err = Simulation::start(&profile, &catalog, bus.clone(), &fast_config())
            .err()
            .unwrap();
        assert!(matches!(err, SimError::UnknownMessage(ref name) if name == "GEARBOX_STATUS"));

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(bus.sent().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_request_gets_one_response() {
        let catalog = SignalDatabase::vehicle().unwrap();
        let bus = Arc::new(RecordingBus::default());
        bus.push(CanFrame::padded(OBD_BROADCAST_ID, &[0x02, 0x01, 0x0D]).unwrap());
        bus.push(CanFrame::padded(OBD_BROADCAST_ID, &[0x02, 0x01, 0x0C]).unwrap());

        let profile = TransmissionProfile::new(Vec::new()).unwrap();
        let sim = Simulation::start(&profile, &catalog, bus.clone(), &fast_config()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let report = sim.shutdown().await;

        let frames = bus.sent();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].id(), 0x7E8);
        assert_eq!(frames[0].data(), &[0x03, 0x41, 0x0D, 50, 0, 0, 0, 0]);
        assert_eq!(report.responder.answered, 1);
        assert_eq!(report.responder.ignored, 1);
    }

    #[tokio::test]
    async fn test_seeded_runs_share_first_frames() {
        let catalog = SignalDatabase::vehicle().unwrap();
        let profile = TransmissionProfile::from_pairs(&[("BODY_STATUS", 10.0)]).unwrap();

        let mut first = Vec::new();
        for _ in 0..2 {
            let bus = Arc::new(RecordingBus::default());
            let sim = Simulation::start(&profile, &catalog, bus.clone(), &fast_config()).unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            sim.shutdown().await;
            first.push(bus.sent()[0].data().to_vec());
        }
        assert_eq!(first[0], first[1]);
    }

    #[tokio::test]
    async fn test_run_until_over_virtual_network() {
        let catalog = SignalDatabase::vehicle().unwrap();
        let network = VirtualNetwork::new("bus0");
        let listener = network.connect();
        let ecu: SharedBus = Arc::new(network.connect());

        let profile = TransmissionProfile::from_pairs(&[("AIRBAG_STATUS", 0.01)]).unwrap();
        let sim = Simulation::start(&profile, &catalog, ecu, &fast_config()).unwrap();
        let names: Vec<_> = sim.message_names().map(str::to_string).collect();
        assert_eq!(names, vec!["AIRBAG_STATUS".to_string()]);

        let frame = listener.recv(Duration::from_millis(200)).await.unwrap().unwrap();
        assert_eq!(frame.id(), 0x300);

        let report = sim
            .run_until(tokio::time::sleep(Duration::from_millis(20)))
            .await;
        assert!(report.frames_sent() >= 1);
    }
}
