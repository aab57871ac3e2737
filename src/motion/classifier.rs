//! Intent classifier and change detector
//!
//! [`classify`] turns trigger and stick position into a [`MotionState`] and a
//! [`DirectionLabel`]. [`ChangeDetector`] decides whether the classified record
//! is worth sending: only while an enabling trigger is held and the device
//! reported something new, plus once on the release edge.

use tracing::{debug, warn};

use super::sampler::HeadInput;
use super::state::{ChangeDetectionContext, ControlState, DirectionLabel, MotionState};

/// Derives motion state and direction in place
///
/// Force zero or a released primary trigger always means stopped. Head axes
/// are copied from `head` only while head enable is held and the primary
/// trigger is released; otherwise they keep their previous values.
pub fn classify(state: &mut ControlState, head: HeadInput) {
    if state.force == 0.0 || state.primary_trigger == 0 {
        state.motion_state = MotionState::Stopped;
        state.direction = DirectionLabel::Stopped;
        state.force = 0.0;
    } else {
        state.motion_state = MotionState::Moving;
        state.direction = if state.y_axis < 0.0 {
            if state.x_axis > 0.0 {
                DirectionLabel::ForwardRight
            } else if state.x_axis < 0.0 {
                DirectionLabel::ForwardLeft
            } else {
                DirectionLabel::Forward
            }
        } else if state.y_axis > 0.0 {
            if state.x_axis > 0.0 {
                DirectionLabel::BackwardRight
            } else if state.x_axis < 0.0 {
                DirectionLabel::BackwardLeft
            } else {
                DirectionLabel::Backward
            }
        } else {
            warn!(
                "Force {} without vertical deflection, forcing stop",
                state.force
            );
            state.motion_state = MotionState::Invalid;
            state.force = 0.0;
            DirectionLabel::Invalid
        };
    }

    if state.head_enable == 1 && state.primary_trigger == 0 {
        state.head_x_axis = head.x;
        state.head_y_axis = head.y;
    }
}

/// Edge detector deciding which classified records reach the transport
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    context: ChangeDetectionContext,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self) -> &ChangeDetectionContext {
        &self.context
    }

    /// Returns `true` if `state` should be transmitted
    ///
    /// A noisy axis that keeps changing the device timestamp while a trigger
    /// is held still transmits every cycle; throttling is the transport's job.
    pub fn evaluate(&mut self, state: &ControlState) -> bool {
        if state.trigger_active() {
            if state.timestamp != self.context.last_sent_timestamp {
                self.context.last_sent_timestamp = state.timestamp;
                self.context.last_trigger_active = true;
                return true;
            }
            false
        } else if self.context.last_trigger_active {
            debug!("Trigger released at {}", state.timestamp);
            self.context.last_sent_timestamp = state.timestamp;
            self.context.last_trigger_active = false;
            true
        } else {
            false
        }
    }

    /// Records a transmission that bypassed [`evaluate`](Self::evaluate)
    pub fn mark_sent(&mut self, state: &ControlState) {
        self.context.last_sent_timestamp = state.timestamp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(x: f64, y: f64) -> ControlState {
        ControlState {
            x_axis: x,
            y_axis: y,
            force: y.abs(),
            primary_trigger: 1,
            ..ControlState::connected()
        }
    }

    fn run(state: &mut ControlState) {
        let head = HeadInput::from_body(state);
        classify(state, head);
    }

    #[test]
    fn straight_forward() {
        let mut state = held(0.0, -0.5);
        run(&mut state);
        assert_eq!(state.motion_state, MotionState::Moving);
        assert_eq!(state.direction, DirectionLabel::Forward);
        assert_eq!(state.force, 0.5);
    }

    #[test]
    fn backward_right() {
        let mut state = held(0.3, 0.4);
        run(&mut state);
        assert_eq!(state.direction, DirectionLabel::BackwardRight);
        assert_eq!(state.force, 0.4);
    }

    #[test]
    fn released_trigger_stops_regardless_of_axes() {
        let mut state = held(0.1, -0.1);
        state.primary_trigger = 0;
        run(&mut state);
        assert_eq!(state.motion_state, MotionState::Stopped);
        assert_eq!(state.direction, DirectionLabel::Stopped);
        assert_eq!(state.force, 0.0);
    }

    #[test]
    fn zero_force_stops_even_with_trigger_held() {
        let mut state = held(0.9, 0.0);
        run(&mut state);
        assert_eq!(state.motion_state, MotionState::Stopped);
        assert_eq!(state.direction, DirectionLabel::Stopped);
    }

    #[test]
    fn direction_follows_axis_signs() {
        let cases = [
            (-0.5, -0.5, DirectionLabel::ForwardLeft),
            (0.0, -0.5, DirectionLabel::Forward),
            (0.5, -0.5, DirectionLabel::ForwardRight),
            (-0.5, 0.5, DirectionLabel::BackwardLeft),
            (0.0, 0.5, DirectionLabel::Backward),
            (0.5, 0.5, DirectionLabel::BackwardRight),
        ];
        for (x, y, expected) in cases {
            let mut state = held(x, y);
            run(&mut state);
            assert_eq!(state.direction, expected, "x={} y={}", x, y);
            assert_eq!(state.force, y.abs());
        }
    }

    #[test]
    fn force_without_deflection_is_invalid() {
        let mut state = held(0.4, 0.0);
        state.force = 0.3;
        run(&mut state);
        assert_eq!(state.motion_state, MotionState::Invalid);
        assert_eq!(state.direction, DirectionLabel::Invalid);
        assert_eq!(state.force, 0.0);
    }

    #[test]
    fn classification_is_idempotent() {
        for (x, y, trigger) in [(0.3, -0.7, 1), (0.0, 0.2, 0), (-0.6, 0.9, 1)] {
            let mut once = held(x, y);
            once.primary_trigger = trigger;
            run(&mut once);
            let mut twice = once.clone();
            run(&mut twice);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn head_mirrors_only_with_head_enable_and_released_trigger() {
        let mut state = held(0.5, -0.5);
        state.primary_trigger = 0;
        state.head_enable = 1;
        run(&mut state);
        assert_eq!((state.head_x_axis, state.head_y_axis), (0.5, -0.5));

        // Trigger held: body motion wins, head keeps its last value.
        let mut moving = state.clone();
        moving.primary_trigger = 1;
        moving.x_axis = -0.8;
        moving.y_axis = 0.8;
        moving.force = 0.8;
        run(&mut moving);
        assert_eq!((moving.head_x_axis, moving.head_y_axis), (0.5, -0.5));

        // Head enable released: head keeps its last value.
        let mut idle = state.clone();
        idle.head_enable = 0;
        idle.x_axis = 0.9;
        run(&mut idle);
        assert_eq!((idle.head_x_axis, idle.head_y_axis), (0.5, -0.5));
    }

    #[test]
    fn head_takes_dedicated_axes_when_given() {
        let mut state = held(0.5, -0.5);
        state.primary_trigger = 0;
        state.head_enable = 1;
        classify(&mut state, HeadInput { x: -0.2, y: 0.7 });
        assert_eq!((state.head_x_axis, state.head_y_axis), (-0.2, 0.7));
    }

    #[test]
    fn detector_sends_each_timestamp_once_while_held() {
        let mut detector = ChangeDetector::new();
        let mut state = held(0.0, -0.5);

        state.timestamp = 10;
        assert!(detector.evaluate(&state));
        assert!(!detector.evaluate(&state));
        assert!(!detector.evaluate(&state));

        state.timestamp = 11;
        assert!(detector.evaluate(&state));
        assert_eq!(detector.context().last_sent_timestamp, 11);
        assert!(detector.context().last_trigger_active);
    }

    #[test]
    fn detector_sends_release_edge_exactly_once() {
        let mut detector = ChangeDetector::new();
        let mut state = held(0.0, -0.5);
        state.timestamp = 10;
        assert!(detector.evaluate(&state));

        state.primary_trigger = 0;
        state.timestamp = 12;
        assert!(detector.evaluate(&state));
        assert!(!detector.context().last_trigger_active);

        state.timestamp = 13;
        assert!(!detector.evaluate(&state));
        assert!(!detector.evaluate(&state));
    }

    #[test]
    fn head_enable_also_counts_as_active_trigger() {
        let mut detector = ChangeDetector::new();
        let mut state = ControlState::connected();
        state.head_enable = 1;
        state.timestamp = 5;
        assert!(detector.evaluate(&state));

        state.head_enable = 0;
        state.timestamp = 6;
        assert!(detector.evaluate(&state));
        assert!(!detector.evaluate(&state));
    }

    #[test]
    fn idle_stick_never_transmits() {
        let mut detector = ChangeDetector::new();
        let mut state = ControlState::connected();
        for ts in 1..20 {
            state.timestamp = ts;
            state.y_axis = -0.4;
            assert!(!detector.evaluate(&state));
        }
    }
}
