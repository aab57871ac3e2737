//! # Robot Transport
//!
//! Delivers classified control records to the robot server as a POST with the
//! record encoded in the query string. Delivery is fire-and-forget: the
//! response body is never read, failures are logged and dropped.
//!
//! ```text
//! transport/
//! ├── config.rs        - Endpoint and send policy
//! └── http_handler.rs  - Worker task, HTTP and dry-run transmitters
//! ```
//!
//! ## Flow Control
//!
//! The processor hands records over through a bounded queue and never waits:
//! when the queue is full the record is dropped. The worker spaces requests
//! by at least `min_interval_ms`. While it waits, newer motion records replace
//! older pending ones, so a jittery stick produces one request per interval
//! carrying the latest state. Connection and debug-key records are never
//! replaced.

pub mod config;
pub mod http_handler;

pub use config::TransportConfig;
pub use http_handler::{HttpTransmitter, LogTransmitter, TransportHandle};

use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;

use crate::motion::ControlState;

/// Why a record is being sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendReason {
    /// Gamepad attached or detached
    Connection,
    /// Movement while an enabling trigger is held
    Motion,
    /// Enabling trigger released
    Release,
    /// Key typed on the debug channel
    DebugKey,
}

/// A record queued for the robot
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub state: ControlState,
    pub reason: SendReason,
    pub debug_key: Option<String>,
}

impl Outbound {
    pub fn new(state: ControlState, reason: SendReason) -> Self {
        Self {
            state,
            reason,
            debug_key: None,
        }
    }

    pub fn debug_key(state: ControlState, key: String) -> Self {
        Self {
            state,
            reason: SendReason::DebugKey,
            debug_key: Some(key),
        }
    }

    /// May be replaced by a newer record while waiting for the rate limiter
    pub fn is_coalescable(&self) -> bool {
        matches!(self.reason, SendReason::Motion | SendReason::Release)
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = self.state.to_query_pairs();
        if let Some(key) = &self.debug_key {
            pairs.push(("debug_key", key.clone()));
        }
        pairs
    }

    /// Query string as sent, for logging
    pub fn query_string(&self) -> String {
        self.query_pairs()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v.replace(' ', "+")))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Transport errors; none of them is fatal to the control loop
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Robot answered with status {0}")]
    Status(u16),

    #[error("Invalid transport configuration: {0}")]
    Configuration(String),

    #[error("Send queue full, record dropped")]
    QueueFull,

    #[error("Transport stopped")]
    Closed,
}

/// Something that can deliver one record
///
/// Implementations block; the worker runs them off the async executor.
pub trait Transmit: Send + Sync + 'static {
    fn transmit(&self, outbound: &Outbound) -> Result<(), TransportError>;

    fn name(&self) -> &str;
}

/// Hands `outbound` to the worker without waiting
pub fn enqueue(sender: &mpsc::Sender<Outbound>, outbound: Outbound) -> Result<(), TransportError> {
    sender.try_send(outbound).map_err(|e| match e {
        TrySendError::Full(_) => TransportError::QueueFull,
        TrySendError::Closed(_) => TransportError::Closed,
    })
}

/// Fixed-interval rate limiter for outbound requests
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Minimum spacing between two requests
    min_interval: Duration,

    /// When the last request went out
    last_event_time: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval: Duration::from_millis(min_interval_ms),
            last_event_time: None,
        }
    }

    /// How long until the next request may go out
    pub fn time_until_ready(&self) -> Duration {
        match self.last_event_time {
            None => Duration::ZERO,
            Some(last) => self
                .min_interval
                .saturating_sub(Instant::now().saturating_duration_since(last)),
        }
    }

    pub fn mark(&mut self) {
        self.last_event_time = Some(Instant::now());
    }
}

/// Queues `outbound`, replacing the newest pending record if both may be
/// coalesced
pub fn push_coalesced(pending: &mut VecDeque<Outbound>, outbound: Outbound) {
    match pending.back_mut() {
        Some(last) if last.is_coalescable() && outbound.is_coalescable() => *last = outbound,
        _ => pending.push_back(outbound),
    }
}
