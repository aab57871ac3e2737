//! End-to-end runs of the motion core: sample, classify, detect changes

use joyremote::motion::{
    ButtonSample, ConnectionStatus, DeviceSnapshot, DirectionLabel, HeadAxisSource, MotionCore,
    MotionError, MotionState, SamplerSettings,
};

fn snapshot(timestamp: f64, x: f64, y: f64, trigger: f64, head: f64) -> DeviceSnapshot {
    let mut buttons = vec![ButtonSample::default(); 17];
    buttons[0] = ButtonSample::new(trigger >= 0.5, trigger);
    buttons[5] = ButtonSample::new(head >= 0.5, head);
    DeviceSnapshot {
        timestamp,
        axes: vec![x, y, 0.0, 0.0, 0.0, 0.0],
        buttons,
    }
}

fn connected_core() -> MotionCore {
    let mut core = MotionCore::new(SamplerSettings::default());
    core.on_connected();
    core
}

#[test]
fn connect_and_disconnect_reset_the_record() {
    let mut core = MotionCore::new(SamplerSettings::default());
    assert_eq!(core.state().motion_state, MotionState::WaitingForDevice);

    let sent = core.on_connected();
    assert_eq!(sent.connection_status, ConnectionStatus::Connected);
    assert_eq!(sent.motion_state, MotionState::Stopped);
    assert_eq!(sent.direction, DirectionLabel::None);

    core.on_sample(&snapshot(50.0, 0.5, -0.5, 1.0, 0.0)).unwrap();
    assert_eq!(core.state().motion_state, MotionState::Moving);

    let sent = core.on_disconnected();
    assert_eq!(sent.connection_status, ConnectionStatus::Disconnected);
    assert_eq!(sent.motion_state, MotionState::WaitingForDevice);
    assert_eq!(sent.x_axis, 0.0);
    assert_eq!(sent.timestamp, 0);
}

#[test]
fn forward_scenario() {
    let mut core = connected_core();
    let sent = core
        .on_sample(&snapshot(100.0, 0.0, -0.5, 1.0, 0.0))
        .unwrap()
        .expect("moving with trigger held is sent");
    assert_eq!(sent.motion_state, MotionState::Moving);
    assert_eq!(sent.direction, DirectionLabel::Forward);
    assert_eq!(sent.force, 0.5);
}

#[test]
fn backward_right_scenario() {
    let mut core = connected_core();
    let sent = core
        .on_sample(&snapshot(100.0, 0.3, 0.4, 1.0, 0.0))
        .unwrap()
        .unwrap();
    assert_eq!(sent.direction, DirectionLabel::BackwardRight);
    assert_eq!(sent.force, 0.4);
}

#[test]
fn released_trigger_scenario() {
    let mut core = connected_core();
    let sent = core.on_sample(&snapshot(100.0, 0.1, -0.1, 0.0, 0.0)).unwrap();
    assert!(sent.is_none());
    assert_eq!(core.state().motion_state, MotionState::Stopped);
    assert_eq!(core.state().direction, DirectionLabel::Stopped);
    assert_eq!(core.state().force, 0.0);
}

#[test]
fn dead_zone_scenario() {
    let mut core = connected_core();
    let sent = core
        .on_sample(&snapshot(100.0, 0.15, -0.6, 1.0, 0.0))
        .unwrap()
        .unwrap();
    assert_eq!(sent.x_axis, 0.0);
    assert_eq!(sent.direction, DirectionLabel::Forward);
}

#[test]
fn held_trigger_sends_once_per_device_timestamp() {
    let mut core = connected_core();
    let mut sent = 0;
    for ts in [10.0, 10.0, 10.2, 11.0, 11.0, 11.4, 12.0] {
        if core.on_sample(&snapshot(ts, 0.5, -0.5, 1.0, 0.0)).unwrap().is_some() {
            sent += 1;
        }
    }
    // 10, 11 and 12 after rounding
    assert_eq!(sent, 3);
}

#[test]
fn release_edge_is_sent_exactly_once() {
    let mut core = connected_core();
    assert!(core
        .on_sample(&snapshot(10.0, 0.0, -0.5, 1.0, 0.0))
        .unwrap()
        .is_some());

    let release = core
        .on_sample(&snapshot(11.0, 0.0, -0.5, 0.0, 0.0))
        .unwrap()
        .expect("release edge is sent");
    assert_eq!(release.primary_trigger, 0);
    assert_eq!(release.motion_state, MotionState::Stopped);
    assert_eq!(release.force, 0.0);

    for ts in 12..20 {
        assert!(core
            .on_sample(&snapshot(ts as f64, 0.0, -0.5, 0.0, 0.0))
            .unwrap()
            .is_none());
    }
    assert!(!core.context().last_trigger_active);
}

#[test]
fn head_axes_hold_their_last_value() {
    let mut core = connected_core();

    // Head enabled, body trigger released: head follows the stick
    let sent = core
        .on_sample(&snapshot(10.0, 0.5, -0.4, 0.0, 1.0))
        .unwrap()
        .unwrap();
    assert_eq!((sent.head_x_axis, sent.head_y_axis), (0.5, -0.4));
    assert_eq!(sent.motion_state, MotionState::Stopped);

    // Body trigger pressed as well: body moves, head keeps its position
    let sent = core
        .on_sample(&snapshot(11.0, -0.7, 0.9, 1.0, 1.0))
        .unwrap()
        .unwrap();
    assert_eq!(sent.direction, DirectionLabel::BackwardLeft);
    assert_eq!((sent.head_x_axis, sent.head_y_axis), (0.5, -0.4));

    // Head enable released: release edge, head still unchanged
    let sent = core
        .on_sample(&snapshot(12.0, 0.9, 0.9, 0.0, 0.0))
        .unwrap()
        .unwrap();
    assert_eq!((sent.head_x_axis, sent.head_y_axis), (0.5, -0.4));
}

#[test]
fn head_can_follow_dedicated_axes() {
    let mut core = MotionCore::new(SamplerSettings {
        head_axes: HeadAxisSource::OrientationAxes { x: 3, y: 4 },
        ..SamplerSettings::default()
    });
    core.on_connected();

    let mut snap = snapshot(10.0, 0.9, 0.9, 0.0, 1.0);
    snap.axes[3] = 0.25;
    snap.axes[4] = -0.75;
    let sent = core.on_sample(&snap).unwrap().unwrap();
    assert_eq!((sent.head_x_axis, sent.head_y_axis), (0.25, -0.75));
}

#[test]
fn rejected_sample_keeps_previous_record() {
    let mut core = connected_core();
    core.on_sample(&snapshot(10.0, 0.5, -0.5, 1.0, 0.0)).unwrap();
    let before = core.state().clone();

    let short = DeviceSnapshot {
        timestamp: 20.0,
        axes: vec![0.0, 0.0],
        buttons: vec![ButtonSample::default(); 3],
    };
    assert!(matches!(
        core.on_sample(&short),
        Err(MotionError::Validation { .. })
    ));
    assert_eq!(core.state(), &before);
}

#[test]
fn force_matches_vertical_deflection_while_moving() {
    let mut core = connected_core();
    for (i, y) in [-1.0, -0.75, -0.33, 0.33, 0.75, 1.0].iter().enumerate() {
        core.on_sample(&snapshot(i as f64 + 1.0, 0.0, *y, 1.0, 0.0))
            .unwrap();
        let state = core.state();
        assert_eq!(state.motion_state, MotionState::Moving);
        assert_eq!(state.force, state.y_axis.abs());
    }
}
