//! Status reporter
//!
//! Renders the latest [`ControlState`] to the log: a line at info level
//! whenever connection, motion or direction changes, and the full record at
//! debug level on every update.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::motion::{ConnectionStatus, ControlState, DirectionLabel, MotionState};

/// Part of the record worth an info line when it changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Headline {
    connection: ConnectionStatus,
    motion: MotionState,
    direction: DirectionLabel,
}

impl From<&ControlState> for Headline {
    fn from(state: &ControlState) -> Self {
        Self {
            connection: state.connection_status,
            motion: state.motion_state,
            direction: state.direction,
        }
    }
}

/// One display line for `state`
pub fn render(state: &ControlState) -> String {
    format!(
        "Controller: {} | Robot's Motion State: {} | Robot's Direction: {} | Timestamp {} | Applied Force: {}",
        state.connection_status,
        state.motion_state,
        state.direction,
        state.timestamp,
        state.force
    )
}

pub struct StatusReporter;

impl StatusReporter {
    pub fn spawn(
        mut receiver: watch::Receiver<ControlState>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut last: Option<Headline> = None;
            loop {
                let state = receiver.borrow_and_update().clone();
                let headline = Headline::from(&state);
                if last != Some(headline) {
                    info!("{}", render(&state));
                    last = Some(headline);
                } else {
                    debug!("{}", render(&state));
                }

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = receiver.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("Status reporter stopped");
        })
    }
}
