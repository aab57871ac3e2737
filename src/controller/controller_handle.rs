//! Controller Handle - Unified API for gamepad input processing
//!
//! Provides a high-level interface for the two-stage controller architecture:
//! gamepad sampling and motion processing. Manages the lifecycle of both
//! subsystems and the explicit stop of the control loop.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub use super::event_collector::{CollectorError, CollectorHandle, CollectorSettings, DeviceEvent};
pub use super::event_processor::{ProcessorHandle, ProcessorSettings};
use crate::motion::{ControlState, SamplerSettings};
use crate::transport::Outbound;

/// Configuration settings for the complete controller subsystem
///
/// Settings are distributed to the collector and processor on spawn.
///
/// # Examples
///
/// ```rust
/// use joyremote::controller::ControllerSettings;
///
/// // Snappier polling for a fast robot
/// let settings = ControllerSettings {
///     collection_interval_ms: 50,
///     ..ControllerSettings::default()
/// };
/// assert_eq!(settings.event_queue_capacity, 100);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Polling interval of the gamepad in milliseconds
    ///
    /// Values between 16 (one frame) and 250 are accepted. The device
    /// timestamp only advances when the gamepad reports a change, so faster
    /// polling does not by itself produce more traffic.
    pub collection_interval_ms: u64,

    /// Which connected gamepad to follow, the first one if unset
    pub gamepad_index: Option<usize>,

    /// Capacity of the collector to processor queue
    pub event_queue_capacity: usize,

    /// Seconds between processor stats lines, 0 disables them
    pub stats_interval_secs: u64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            collection_interval_ms: 125,
            gamepad_index: None,
            event_queue_capacity: 100,
            stats_interval_secs: 30,
        }
    }
}

/// Errors that can occur during controller initialization
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// Gamepad backend could not be started
    #[error("Collector error: {0}")]
    CollectorError(#[from] CollectorError),
}

/// Handle for the running control loop
///
/// # Threading Model
///
/// 1. **Collector thread**: polls gilrs at `collection_interval_ms`
/// 2. **Processor task**: samples, classifies and queues records
///
/// Both stop when [`stop`](Self::stop) is called or the cancellation token
/// passed to [`spawn`](Self::spawn) is cancelled.
pub struct ControllerHandle {
    state_receiver: watch::Receiver<ControlState>,
    event_sender: mpsc::Sender<DeviceEvent>,
    processor: ProcessorHandle,
    cancel: CancellationToken,
}

impl ControllerHandle {
    /// Spawns the collector and the processor
    ///
    /// Records worth sending are queued on `transport`.
    ///
    /// # Errors
    ///
    /// [`ControllerError::CollectorError`] if gilrs cannot be initialized.
    pub async fn spawn(
        settings: Option<ControllerSettings>,
        sampler: SamplerSettings,
        transport: mpsc::Sender<Outbound>,
        cancel: CancellationToken,
    ) -> Result<Self, ControllerError> {
        info!("Initializing Controller system with settings: {:?}", settings);
        let settings = settings.unwrap_or_default();

        let collector_settings = CollectorSettings {
            collection_interval_ms: settings.collection_interval_ms,
            gamepad_index: settings.gamepad_index,
        };
        let processor_settings = ProcessorSettings {
            sampler,
            stats_interval_secs: settings.stats_interval_secs,
        };
        debug!(
            "Split settings: collector={:?}, processor={:?}",
            collector_settings, processor_settings
        );

        let (event_sender, event_receiver) = mpsc::channel(settings.event_queue_capacity.max(1));
        debug!(
            "Created event channel with buffer capacity {}",
            settings.event_queue_capacity
        );

        // Processor first, so the collector's initial connect edge has a reader
        info!("Creating Event Processor");
        let processor = ProcessorHandle::spawn(
            event_receiver,
            transport,
            Some(processor_settings),
            cancel.clone(),
        );
        let state_receiver = processor.subscribe();

        info!("Creating Event Collector");
        let collector =
            CollectorHandle::spawn(Some(collector_settings), event_sender, cancel.clone()).await?;

        info!("Controller system initialized successfully");
        Ok(Self {
            state_receiver,
            event_sender: collector.event_sender(),
            processor,
            cancel,
        })
    }

    /// Receiver for the latest control record
    pub fn subscribe(&self) -> watch::Receiver<ControlState> {
        debug!("New subscriber to control state");
        self.state_receiver.clone()
    }

    /// Sender for events that do not come from the gamepad
    pub fn event_sender(&self) -> mpsc::Sender<DeviceEvent> {
        self.event_sender.clone()
    }

    /// Stops the control loop
    pub fn stop(&self) {
        info!("Stopping controller");
        self.cancel.cancel();
    }

    /// Stops the control loop and waits for the processor to finish
    pub async fn shutdown(self) {
        self.stop();
        self.processor.join().await;
    }
}
