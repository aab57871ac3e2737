//! Motion core: from raw gamepad snapshots to records worth sending
//!
//! ```text
//! DeviceSnapshot ──► Sampler ──► classify ──► ChangeDetector ──► Option<ControlState>
//!                   (normalize)  (intent)     (edge trigger)
//! ```
//!
//! [`MotionCore`] owns the only [`ControlState`] and [`ChangeDetectionContext`]
//! of a session; nothing else mutates them.

pub mod classifier;
pub mod error;
pub mod sampler;
pub mod state;

pub use classifier::{classify, ChangeDetector};
pub use error::{InputKind, MotionError};
pub use sampler::{
    round_to, ButtonSample, DeviceSnapshot, HeadAxisSource, HeadInput, Sampler, SamplerSettings,
};
pub use state::{
    ChangeDetectionContext, ConnectionStatus, ControlState, DirectionLabel, MotionState,
};

use tracing::{debug, info};

/// Owner of the control record and the change detection context
#[derive(Debug, Clone, Default)]
pub struct MotionCore {
    state: ControlState,
    detector: ChangeDetector,
    sampler: Sampler,
}

impl MotionCore {
    pub fn new(settings: SamplerSettings) -> Self {
        Self {
            state: ControlState::disconnected(),
            detector: ChangeDetector::new(),
            sampler: Sampler::new(settings),
        }
    }

    /// Latest record, for presentation
    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn context(&self) -> &ChangeDetectionContext {
        self.detector.context()
    }

    /// Resets to the connected defaults; the result must always be sent
    pub fn on_connected(&mut self) -> ControlState {
        info!("Gamepad connected, resetting control state");
        self.state = ControlState::connected();
        self.detector.mark_sent(&self.state);
        self.state.clone()
    }

    /// Resets to the disconnected defaults; the result must always be sent
    pub fn on_disconnected(&mut self) -> ControlState {
        info!("Gamepad disconnected, resetting control state");
        self.state = ControlState::disconnected();
        self.detector.mark_sent(&self.state);
        self.state.clone()
    }

    /// Runs one sample through the pipeline
    ///
    /// Returns the record to transmit, if the change detector asks for one.
    /// On a validation error the previous record is kept untouched.
    pub fn on_sample(
        &mut self,
        snapshot: &DeviceSnapshot,
    ) -> Result<Option<ControlState>, MotionError> {
        let head = self.sampler.sample(snapshot, &mut self.state)?;
        classify(&mut self.state, head);

        if self.detector.evaluate(&self.state) {
            debug!(
                "Change detected: {} / {} at {}",
                self.state.motion_state, self.state.direction, self.state.timestamp
            );
            Ok(Some(self.state.clone()))
        } else {
            Ok(None)
        }
    }
}
