use gilrs::{Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs};
use statum::{machine, state};
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::motion::{ButtonSample, DeviceSnapshot};

// Events handed from the collector thread to the processor
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    Connected { name: String },
    Disconnected,
    Sample(DeviceSnapshot),
    // Typed on the keyboard debug channel, never classified
    DebugKey(String),
}

// Axis layout of a snapshot. Y axes are flipped so that forward is negative.
const SNAPSHOT_AXES: [Axis; 6] = [
    Axis::LeftStickX,
    Axis::LeftStickY,
    Axis::LeftZ,
    Axis::RightStickX,
    Axis::RightStickY,
    Axis::RightZ,
];

// Standard gamepad button order
const SNAPSHOT_BUTTONS: [Button; 17] = [
    Button::South,
    Button::East,
    Button::West,
    Button::North,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger2,
    Button::Select,
    Button::Start,
    Button::LeftThumb,
    Button::RightThumb,
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
    Button::Mode,
];

// Collector settings
#[derive(Clone, Debug)]
pub struct CollectorSettings {
    pub collection_interval_ms: u64,
    // Index into the list of connected gamepads, first one if None
    pub gamepad_index: Option<usize>,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            collection_interval_ms: 125,
            gamepad_index: None,
        }
    }
}

// Collector errors
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to initialize collector: {0}")]
    InitializationError(String),

    #[error("Failed to send event: {0}")]
    EventSendError(String),
}

#[state]
#[derive(Debug, Clone)]
pub enum CollectionState {
    Initializing,
    Collecting,
}

#[machine]
#[derive(Debug)]
pub struct EventCollector<S: CollectionState> {
    // Gilrs context
    gilrs: Gilrs,

    // Gamepad whose samples are forwarded
    active_gamepad: Option<GamepadId>,

    settings: CollectorSettings,

    // Channel to the processor
    event_sender: mpsc::Sender<DeviceEvent>,

    // Reference point for snapshot timestamps
    started: SystemTime,

    // Time of the latest gilrs event from the active gamepad
    last_event_time: Option<SystemTime>,
}

impl<S: CollectionState> EventCollector<S> {
    // Connection edges must reach the processor, so wait for queue space
    fn send_edge(&self, event: DeviceEvent) -> Result<(), CollectorError> {
        self.event_sender
            .blocking_send(event)
            .map_err(|e| CollectorError::EventSendError(e.to_string()))
    }

    // Follow the configured pad among the connected ones, skipping `gone`
    fn select_gamepad(&mut self, gone: Option<GamepadId>) -> Result<(), CollectorError> {
        let gamepads: Vec<(GamepadId, String)> = self
            .gilrs
            .gamepads()
            .filter(|(id, _)| Some(*id) != gone)
            .map(|(id, gamepad)| (id, gamepad.name().to_string()))
            .collect();

        if gamepads.is_empty() {
            warn!("No gamepad connected, waiting for one");
            return Ok(());
        }

        info!("Found {} gamepads:", gamepads.len());
        for (idx, (id, name)) in gamepads.iter().enumerate() {
            info!("  [{}] ID: {}, Name: {}", idx, id, name);
        }

        match pick_gamepad(&gamepads, self.settings.gamepad_index) {
            Some((id, name)) => {
                info!("Selected gamepad: {} ({})", name, id);
                self.active_gamepad = Some(*id);
                self.send_edge(DeviceEvent::Connected { name: name.clone() })
            }
            None => {
                warn!(
                    "Configured gamepad index {:?} not present, waiting for a connection",
                    self.settings.gamepad_index
                );
                Ok(())
            }
        }
    }
}

impl EventCollector<Initializing> {
    pub fn create(
        settings: Option<CollectorSettings>,
        event_sender: mpsc::Sender<DeviceEvent>,
    ) -> Result<Self, CollectorError> {
        let settings = settings.unwrap_or_default();
        debug!("Creating Event Collector with settings: {:?}", settings);

        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(CollectorError::InitializationError(e.to_string()));
            }
        };

        Ok(Self::new(
            gilrs,
            None,
            settings,
            event_sender,
            SystemTime::now(),
            None,
        ))
    }

    // Pick the gamepad to follow and transition to Collecting state
    pub fn initialize(mut self) -> Result<EventCollector<Collecting>, CollectorError> {
        self.select_gamepad(None)?;

        info!("Event Collector initialized, transitioning to Collecting state");
        Ok(self.transition())
    }
}

impl EventCollector<Collecting> {
    // Drain gilrs events, then forward one snapshot of the active gamepad
    pub fn poll_cycle(&mut self) -> Result<(), CollectorError> {
        while let Some(Event { id, event, time, .. }) = self.gilrs.next_event() {
            match event {
                EventType::Connected => {
                    if self.active_gamepad.is_none() {
                        let name = self.gilrs.gamepad(id).name().to_string();
                        info!("Gamepad connected: {} ({})", name, id);
                        self.active_gamepad = Some(id);
                        self.last_event_time = Some(time);
                        self.send_edge(DeviceEvent::Connected { name })?;
                    } else {
                        debug!("Ignoring additional gamepad {}", id);
                    }
                }
                EventType::Disconnected => {
                    if self.active_gamepad == Some(id) {
                        warn!("Active gamepad {} disconnected", id);
                        self.active_gamepad = None;
                        self.last_event_time = None;
                        self.send_edge(DeviceEvent::Disconnected)?;
                        self.select_gamepad(Some(id))?;
                    }
                }
                _ => {
                    if self.active_gamepad == Some(id) {
                        debug!("gilrs event: {:?}", event);
                        self.last_event_time = Some(time);
                    }
                }
            }
        }

        let Some(id) = self.active_gamepad else {
            return Ok(());
        };
        let Some(gamepad) = self.gilrs.connected_gamepad(id) else {
            return Ok(());
        };

        let snapshot = build_snapshot(&gamepad, self.timestamp_ms());
        match self.event_sender.try_send(DeviceEvent::Sample(snapshot)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Processor queue full, dropping sample");
                Ok(())
            }
            Err(e) => Err(CollectorError::EventSendError(e.to_string())),
        }
    }

    pub fn run_collection_loop(&mut self, cancel: &CancellationToken) {
        info!(
            "Starting Event Collector loop with {} ms interval",
            self.settings.collection_interval_ms
        );
        let interval = Duration::from_millis(self.settings.collection_interval_ms);

        while !cancel.is_cancelled() {
            if let Err(e) = self.poll_cycle() {
                error!("Error collecting event: {}", e);
                if self.event_sender.is_closed() {
                    break;
                }
            }
            std::thread::sleep(interval);
        }
        info!("Event Collector loop stopped");
    }

    fn timestamp_ms(&self) -> f64 {
        self.last_event_time
            .and_then(|t| t.duration_since(self.started).ok())
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }
}

// Entry at `index`, the first one if unset
fn pick_gamepad<T>(candidates: &[T], index: Option<usize>) -> Option<&T> {
    candidates.get(index.unwrap_or(0))
}

fn build_snapshot(gamepad: &Gamepad<'_>, timestamp: f64) -> DeviceSnapshot {
    let axes = SNAPSHOT_AXES
        .iter()
        .map(|axis| {
            let value = f64::from(gamepad.value(*axis));
            match axis {
                Axis::LeftStickY | Axis::RightStickY => -value,
                _ => value,
            }
        })
        .collect();

    let buttons = SNAPSHOT_BUTTONS
        .iter()
        .map(|button| match gamepad.button_data(*button) {
            Some(data) => ButtonSample::new(data.is_pressed(), f64::from(data.value())),
            None => ButtonSample::default(),
        })
        .collect();

    DeviceSnapshot {
        timestamp,
        axes,
        buttons,
    }
}

// Public interface for spawning and running the collector
pub struct CollectorHandle {
    event_sender: mpsc::Sender<DeviceEvent>,
}

impl CollectorHandle {
    // gilrs stays on its own thread; initialization is reported back before returning
    pub async fn spawn(
        settings: Option<CollectorSettings>,
        event_sender: mpsc::Sender<DeviceEvent>,
        cancel: CancellationToken,
    ) -> Result<Self, CollectorError> {
        info!("Spawning Event Collector with settings: {:?}", settings);

        let sender_clone = event_sender.clone();
        let (init_tx, init_rx) = oneshot::channel();

        std::thread::Builder::new()
            .name("gamepad-collector".to_string())
            .spawn(move || {
                let collector = match EventCollector::create(settings, event_sender) {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = init_tx.send(Err(e));
                        return;
                    }
                };
                let _ = init_tx.send(Ok(()));

                match collector.initialize() {
                    Ok(mut collecting_state) => collecting_state.run_collection_loop(&cancel),
                    Err(e) => error!("Failed to initialize Event Collector: {}", e),
                }
            })
            .map_err(|e| CollectorError::InitializationError(e.to_string()))?;

        match init_rx.await {
            Ok(Ok(())) => info!("Event Collector successfully started"),
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(CollectorError::InitializationError(
                    "collector thread exited during startup".to_string(),
                ))
            }
        }

        Ok(Self {
            event_sender: sender_clone,
        })
    }

    // Sender for injecting events next to the gamepad, e.g. debug keys
    pub fn event_sender(&self) -> mpsc::Sender<DeviceEvent> {
        self.event_sender.clone()
    }
}
