//! In-Process Virtual CAN Bus
//!
//! A broadcast medium shared by any number of endpoints. A frame sent by one
//! endpoint is delivered to every other endpoint on the same network, never
//! back to its sender.

use crate::bus::CanBus;
use crate::error::BusError;
use crate::frame::CanFrame;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, trace, warn};

/// Frames buffered per endpoint before slow receivers start lagging
const NETWORK_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
struct Envelope {
    source: u64,
    frame: CanFrame,
}

/// A virtual CAN network that endpoints connect to
#[derive(Debug, Clone)]
pub struct VirtualNetwork {
    channel: String,
    tx: broadcast::Sender<Envelope>,
    next_endpoint: Arc<AtomicU64>,
}

impl VirtualNetwork {
    /// Create an empty network
    pub fn new(channel: &str) -> Self {
        let (tx, _) = broadcast::channel(NETWORK_CAPACITY);
        Self {
            channel: channel.to_string(),
            tx,
            next_endpoint: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Channel name of this network
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Attach a new endpoint
    pub fn connect(&self) -> VirtualBus {
        let endpoint = self.next_endpoint.fetch_add(1, Ordering::Relaxed);
        debug!(channel = %self.channel, endpoint, "Endpoint connected");
        VirtualBus {
            endpoint,
            channel: self.channel.clone(),
            tx: self.tx.clone(),
            rx: Mutex::new(self.tx.subscribe()),
            closed: AtomicBool::new(false),
        }
    }
}

/// One endpoint on a [`VirtualNetwork`]
#[derive(Debug)]
pub struct VirtualBus {
    endpoint: u64,
    channel: String,
    tx: broadcast::Sender<Envelope>,
    rx: Mutex<broadcast::Receiver<Envelope>>,
    closed: AtomicBool,
}

impl VirtualBus {
    /// Whether `shutdown` has been called on this endpoint
    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn next_foreign_frame(&self) -> Result<CanFrame, BusError> {
        let mut rx = self.rx.lock().await;
        loop {
            match rx.recv().await {
                Ok(envelope) if envelope.source == self.endpoint => continue,
                Ok(envelope) => return Ok(envelope.frame),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(channel = %self.channel, skipped, "Receiver lagged, frames dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return Err(BusError::Closed),
            }
        }
    }
}

#[async_trait]
impl CanBus for VirtualBus {
    async fn send(&self, frame: &CanFrame) -> Result<(), BusError> {
        if self.is_shut_down() {
            return Err(BusError::Closed);
        }

        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let envelope = Envelope {
            source: self.endpoint,
            frame: frame.clone().with_timestamp(timestamp_ms),
        };

        trace!(channel = %self.channel, id = frame.id(), data = ?frame.data(), "TX");
        self.tx
            .send(envelope)
            .map(|_| ())
            .map_err(|e| BusError::Send(e.to_string()))
    }

    async fn recv(&self, timeout: Duration) -> Result<Option<CanFrame>, BusError> {
        if self.is_shut_down() {
            return Err(BusError::Closed);
        }

        match tokio::time::timeout(timeout, self.next_foreign_frame()).await {
            Ok(frame) => frame.map(Some),
            Err(_) => Ok(None),
        }
    }

    fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!(channel = %self.channel, endpoint = self.endpoint, "Endpoint shut down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frame_reaches_other_endpoint() {
        let network = VirtualNetwork::new("bus0");
        let a = network.connect();
        let b = network.connect();

        let frame = CanFrame::padded(0x100, &[1, 2, 3]).unwrap();
        a.send(&frame).await.unwrap();

        let received = b.recv(Duration::from_millis(100)).await.unwrap().unwrap();
        assert_eq!(received.id(), 0x100);
        assert_eq!(received.data(), frame.data());
        assert!(received.timestamp_ms.is_some());
    }

    #[tokio::test]
    async fn test_sender_does_not_receive_own_frame() {
        let network = VirtualNetwork::new("bus0");
        let a = network.connect();
        let _b = network.connect();

        a.send(&CanFrame::padded(0x100, &[1]).unwrap()).await.unwrap();
        let received = a.recv(Duration::from_millis(20)).await.unwrap();
        assert!(received.is_none());
    }

    #[tokio::test]
    async fn test_recv_times_out_on_idle_bus() {
        let network = VirtualNetwork::new("bus0");
        let a = network.connect();
        assert!(a.recv(Duration::from_millis(10)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent_and_closes_endpoint() {
        let network = VirtualNetwork::new("bus0");
        let a = network.connect();
        a.shutdown();
        a.shutdown();
        assert!(a.is_shut_down());

        let frame = CanFrame::padded(0x100, &[1]).unwrap();
        assert_eq!(a.send(&frame).await.unwrap_err(), BusError::Closed);
        assert_eq!(
            a.recv(Duration::from_millis(10)).await.unwrap_err(),
            BusError::Closed
        );
    }
}
