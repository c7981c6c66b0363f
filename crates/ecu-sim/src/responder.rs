//! OBD-II Request Responder

use crate::error::SimError;
use can_bus::{CanBus, CanFrame, SharedBus};
use obd_protocol::{build_response_frame, parse_request, simulate_response, OBD_BROADCAST_ID};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

/// Build the reply to a received frame, if any
///
/// Only single-frame requests on the broadcast identifier are considered.
/// Anything the canned table does not cover yields `Ok(None)`.
pub fn respond_to(frame: &CanFrame, responder_id: u32) -> Result<Option<CanFrame>, SimError> {
    if frame.id() != OBD_BROADCAST_ID || frame.data().is_empty() {
        return Ok(None);
    }

    let request = parse_request(frame.data());
    let Some(payload) = simulate_response(request.service, request.pid) else {
        return Ok(None);
    };

    let (id, data) = build_response_frame(&payload, responder_id)?;
    Ok(Some(CanFrame::new(id, &data)?))
}

/// Responder counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponderStats {
    /// Requests answered
    pub answered: u64,
    /// Frames that needed no reply
    pub ignored: u64,
    /// Receive, framing or send failures
    pub failed: u64,
}

/// Listens for OBD-II broadcast requests and answers them
#[derive(Debug, Clone)]
pub struct ObdResponder {
    responder_id: u32,
    recv_timeout: Duration,
    stats: ResponderStats,
}

impl ObdResponder {
    /// Create a responder transmitting replies from `responder_id`
    ///
    /// `recv_timeout` bounds each receive, and so how quickly the loop
    /// notices cancellation.
    pub fn new(responder_id: u32, recv_timeout: Duration) -> Self {
        Self {
            responder_id,
            recv_timeout,
            stats: ResponderStats::default(),
        }
    }

    /// Counters accumulated so far
    pub fn stats(&self) -> ResponderStats {
        self.stats
    }

    /// Reply to one received frame
    pub async fn handle(&mut self, bus: &dyn CanBus, frame: &CanFrame) {
        match respond_to(frame, self.responder_id) {
            Ok(Some(response)) => match bus.send(&response).await {
                Ok(()) => {
                    self.stats.answered += 1;
                    debug!(request = ?frame.data(), response = ?response.data(), "Answered OBD request");
                }
                Err(e) => {
                    self.stats.failed += 1;
                    warn!(error = %e, "Failed to send OBD response");
                }
            },
            Ok(None) => {
                self.stats.ignored += 1;
                trace!(id = format!("0x{:03X}", frame.id()), "Ignoring frame");
            }
            Err(e) => {
                self.stats.failed += 1;
                warn!(error = %e, "Failed to build OBD response");
            }
        }
    }

    /// Serve requests until `shutdown` flips to `true` or its sender is
    /// dropped
    pub async fn run(mut self, bus: SharedBus, mut shutdown: watch::Receiver<bool>) -> ResponderStats {
        info!(
            responder_id = format!("0x{:03X}", self.responder_id),
            "OBD responder started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let received = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                received = bus.recv(self.recv_timeout) => received,
            };

            match received {
                Ok(Some(frame)) => self.handle(bus.as_ref(), &frame).await,
                Ok(None) => {}
                Err(e) => {
                    self.stats.failed += 1;
                    warn!(error = %e, "Error receiving frame");
                    tokio::time::sleep(self.recv_timeout).await;
                }
            }
        }

        debug!(stats = ?self.stats, "OBD responder stopped");
        self.stats
    }
}
