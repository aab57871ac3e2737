//! Motion state record shared between the sampler, the classifier and the
//! transport.
//!
//! [`ControlState`] is the flat record the robot server understands. Its wire
//! encoding (see [`ControlState::to_query_pairs`]) keeps the key names and
//! label strings the robot side parses, so the Rust names can stay idiomatic
//! while the query string stays compatible.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a gamepad is currently attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Connected => "Connected",
        }
    }
}

/// Coarse motion state of the robot as derived from the stick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotionState {
    #[default]
    WaitingForDevice,
    Stopped,
    Moving,
    /// Trigger held with force but no vertical deflection. Only reachable
    /// if the record was corrupted between sampling and classification.
    Invalid,
}

impl MotionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MotionState::WaitingForDevice => "Waiting for Joystick",
            MotionState::Stopped => "Stopped",
            MotionState::Moving => "Moving",
            MotionState::Invalid => "Invalid",
        }
    }
}

/// Direction of travel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DirectionLabel {
    #[default]
    None,
    Stopped,
    Forward,
    ForwardLeft,
    ForwardRight,
    Backward,
    BackwardLeft,
    BackwardRight,
    Invalid,
}

impl DirectionLabel {
    /// Label as sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectionLabel::None => "None",
            DirectionLabel::Stopped => "Stopped",
            DirectionLabel::Forward => "Directly Forward",
            DirectionLabel::ForwardLeft => "Forward-Left",
            DirectionLabel::ForwardRight => "Forward-Right",
            DirectionLabel::Backward => "Directly Backward",
            DirectionLabel::BackwardLeft => "Backward-Left",
            DirectionLabel::BackwardRight => "Backward-Right",
            DirectionLabel::Invalid => "Invalid",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for MotionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DirectionLabel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized controller record
///
/// Sign convention for the body axes: `x_axis < 0` is left, `x_axis > 0` is
/// right, `y_axis < 0` is forward and `y_axis > 0` is backward. Triggers are
/// stored as `0`/`1`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlState {
    pub connection_status: ConnectionStatus,
    pub motion_state: MotionState,
    pub direction: DirectionLabel,
    /// Device sample counter, whole milliseconds
    pub timestamp: i64,
    pub x_axis: f64,
    pub y_axis: f64,
    pub head_x_axis: f64,
    pub head_y_axis: f64,
    /// Magnitude of the vertical deflection, zeroed while stopped
    pub force: f64,
    /// Motion enable
    pub primary_trigger: u8,
    /// Full trigger press; passed through for the robot to pick its speed
    pub turbo_trigger: u8,
    /// Pinky switch enabling head motion
    pub head_enable: u8,
}

impl ControlState {
    /// Record as it looks while no gamepad is attached
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Record as it looks right after a gamepad was attached
    pub fn connected() -> Self {
        Self {
            connection_status: ConnectionStatus::Connected,
            motion_state: MotionState::Stopped,
            ..Self::default()
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection_status == ConnectionStatus::Connected
    }

    /// Primary trigger or head enable currently held
    pub fn trigger_active(&self) -> bool {
        self.primary_trigger == 1 || self.head_enable == 1
    }

    /// Ordered key/value pairs for the robot's query string
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("controller_status", self.connection_status.to_string()),
            ("motion_state", self.motion_state.to_string()),
            ("angle_dir", self.direction.to_string()),
            ("time_stamp", self.timestamp.to_string()),
            ("x_axis", format_number(self.x_axis)),
            ("y_axis", format_number(self.y_axis)),
            ("head_x_axis", format_number(self.head_x_axis)),
            ("head_y_axis", format_number(self.head_y_axis)),
            ("force", format_number(self.force)),
            ("trigger_1", self.primary_trigger.to_string()),
            ("trigger_2", self.turbo_trigger.to_string()),
            ("head_enable", self.head_enable.to_string()),
        ]
    }
}

/// Formats like the robot server expects: shortest form, no negative zero
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}

/// Bookkeeping for the edge-triggered transmit decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeDetectionContext {
    /// Timestamp of the last record handed to the transport
    pub last_sent_timestamp: i64,
    /// Primary trigger or head enable was held on the previous evaluation
    pub last_trigger_active: bool,
}
