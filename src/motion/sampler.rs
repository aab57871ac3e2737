//! Sampler/Normalizer
//!
//! Reads one [`DeviceSnapshot`] and writes the normalized fields of a
//! [`ControlState`]: rounding, x-axis dead-zone and force derivation. The
//! classification fields (`motion_state`, `direction`, head axes) are left for
//! the classifier.

use serde::{Deserialize, Serialize};

use super::error::{InputKind, MotionError};
use super::state::ControlState;

/// One button as reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ButtonSample {
    pub pressed: bool,
    /// Analog value in `[0, 1]`; digital buttons report 0 or 1
    pub value: f64,
}

impl ButtonSample {
    pub fn new(pressed: bool, value: f64) -> Self {
        Self { pressed, value }
    }
}

/// Raw device state at one point in time
///
/// Axes are in `[-1, 1]` with index 0 horizontal (negative left) and index 1
/// vertical (negative forward).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceSnapshot {
    /// Time of the latest change reported by the device, in milliseconds
    pub timestamp: f64,
    pub axes: Vec<f64>,
    pub buttons: Vec<ButtonSample>,
}

/// Where head motion takes its axes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum HeadAxisSource {
    /// Mirror the (dead-zoned) body axes
    #[default]
    MirrorStick,
    /// Dedicated orientation axes, e.g. a hat or the right stick
    OrientationAxes { x: usize, y: usize },
}

/// Per-variant sampling behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerSettings {
    /// Decimal places kept on every axis (2 or 3)
    pub precision: u32,
    /// Values of the x axis below this magnitude become 0; `None` disables
    pub x_dead_zone: Option<f64>,
    pub x_axis_index: usize,
    pub y_axis_index: usize,
    pub primary_trigger_index: usize,
    pub turbo_trigger_index: usize,
    pub head_enable_index: usize,
    pub head_axes: HeadAxisSource,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            precision: 2,
            x_dead_zone: Some(0.2),
            x_axis_index: 0,
            y_axis_index: 1,
            primary_trigger_index: 0,
            turbo_trigger_index: 14,
            head_enable_index: 5,
            head_axes: HeadAxisSource::MirrorStick,
        }
    }
}

/// Candidate values for the head axes of the current sample
///
/// Only copied into the record when the classifier allows head motion.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HeadInput {
    pub x: f64,
    pub y: f64,
}

impl HeadInput {
    /// Head input mirroring the body axes of `state`
    pub fn from_body(state: &ControlState) -> Self {
        Self {
            x: state.x_axis,
            y: state.y_axis,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Sampler {
    settings: SamplerSettings,
}

impl Sampler {
    pub fn new(settings: SamplerSettings) -> Self {
        Self { settings }
    }

    /// Normalizes `snapshot` into `state`
    ///
    /// The snapshot is validated before anything is written, so on error the
    /// previous record stays intact.
    pub fn sample(
        &self,
        snapshot: &DeviceSnapshot,
        state: &mut ControlState,
    ) -> Result<HeadInput, MotionError> {
        let s = &self.settings;

        let raw_x = axis(snapshot, s.x_axis_index)?;
        let raw_y = axis(snapshot, s.y_axis_index)?;
        let primary = button(snapshot, s.primary_trigger_index)?;
        let turbo = button(snapshot, s.turbo_trigger_index)?;
        let head_enable = button(snapshot, s.head_enable_index)?;
        let raw_head = match s.head_axes {
            HeadAxisSource::MirrorStick => None,
            HeadAxisSource::OrientationAxes { x, y } => {
                Some((axis(snapshot, x)?, axis(snapshot, y)?))
            }
        };

        state.timestamp = snapshot.timestamp.round() as i64;
        state.x_axis = round_to(raw_x, s.precision);
        state.y_axis = round_to(raw_y, s.precision);
        state.force = state.y_axis.abs();
        state.primary_trigger = trigger_bit(primary.value);
        state.turbo_trigger = trigger_bit(turbo.value);
        state.head_enable = trigger_bit(head_enable.value);

        if let Some(dead_zone) = s.x_dead_zone {
            if state.x_axis.abs() < dead_zone {
                state.x_axis = 0.0;
            }
        }

        Ok(match raw_head {
            None => HeadInput::from_body(state),
            Some((x, y)) => HeadInput {
                x: round_to(x, s.precision),
                y: round_to(y, s.precision),
            },
        })
    }
}

fn axis(snapshot: &DeviceSnapshot, index: usize) -> Result<f64, MotionError> {
    snapshot
        .axes
        .get(index)
        .copied()
        .ok_or(MotionError::Validation {
            kind: InputKind::Axis,
            index,
            len: snapshot.axes.len(),
        })
}

fn button(snapshot: &DeviceSnapshot, index: usize) -> Result<ButtonSample, MotionError> {
    snapshot
        .buttons
        .get(index)
        .copied()
        .ok_or(MotionError::Validation {
            kind: InputKind::Button,
            index,
            len: snapshot.buttons.len(),
        })
}

/// Rounds half away from zero to `decimals` places, never yielding `-0.0`
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

fn trigger_bit(value: f64) -> u8 {
    if value.round() >= 1.0 {
        1
    } else {
        0
    }
}
