use chrono::Local;
use statum::{machine, state};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::controller::event_collector::DeviceEvent;
use crate::motion::{ControlState, MotionCore, SamplerSettings};
use crate::transport::{enqueue, Outbound, SendReason};

// Event batch for the processing state
#[derive(Debug, Clone)]
pub struct EventBatch {
    pub events: Vec<DeviceEvent>,
}

// Processor settings
#[derive(Clone, Debug)]
pub struct ProcessorSettings {
    pub sampler: SamplerSettings,
    // 0 disables the periodic stats line
    pub stats_interval_secs: u64,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            sampler: SamplerSettings::default(),
            stats_interval_secs: 30,
        }
    }
}

// Processor errors
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("Failed to receive events: {0}")]
    EventReceiveError(String),
}

// Counters for the periodic stats line
#[derive(Debug, Clone, Default)]
pub struct ProcessorStats {
    pub samples: u64,
    pub rejected_samples: u64,
    pub queued: u64,
    pub dropped: u64,
}

#[state]
#[derive(Debug, Clone)]
pub enum ProcessingState {
    Waiting,
    Processing(EventBatch),
    Updating,
}

#[machine]
#[derive(Debug)]
pub struct EventProcessor<S: ProcessingState> {
    event_receiver: mpsc::Receiver<DeviceEvent>,

    settings: ProcessorSettings,

    // Owner of the control record and change detection context
    core: MotionCore,

    // Latest record for presentation
    state_sender: watch::Sender<ControlState>,

    // Records waiting to be handed to the transport
    outbox: Vec<Outbound>,

    transport: mpsc::Sender<Outbound>,

    stats: ProcessorStats,
}

impl<S: ProcessingState> EventProcessor<S> {
    pub fn subscribe(&self) -> watch::Receiver<ControlState> {
        self.state_sender.subscribe()
    }

    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    // Counters since the last call
    pub fn take_stats(&mut self) -> ProcessorStats {
        std::mem::take(&mut self.stats)
    }
}

impl EventProcessor<Waiting> {
    pub fn create(
        event_receiver: mpsc::Receiver<DeviceEvent>,
        transport: mpsc::Sender<Outbound>,
        settings: Option<ProcessorSettings>,
    ) -> Self {
        let settings = settings.unwrap_or_default();
        info!("Creating Event Processor with settings: {:?}", settings);

        let core = MotionCore::new(settings.sampler.clone());
        let (state_sender, _) = watch::channel(core.state().clone());
        debug!("Created watch channel for control state broadcasts");

        Self::new(
            event_receiver,
            settings,
            core,
            state_sender,
            Vec::new(),
            transport,
            ProcessorStats::default(),
        )
    }

    // Wait for the next event, then take everything else already queued
    pub async fn wait_and_collect(mut self) -> Result<EventProcessor<Processing>, ProcessorError> {
        let first = match self.event_receiver.recv().await {
            Some(event) => event,
            None => {
                error!("Event channel disconnected!");
                return Err(ProcessorError::EventReceiveError(
                    "Event channel disconnected".to_string(),
                ));
            }
        };

        let mut events = vec![first];
        while let Ok(event) = self.event_receiver.try_recv() {
            events.push(event);
        }
        debug!("Collected batch of {} events", events.len());

        Ok(self.transition_with(EventBatch { events }))
    }
}

impl EventProcessor<Processing> {
    // Run every event of the batch through the motion core
    pub fn process_events(mut self) -> EventProcessor<Updating> {
        let events = match self.get_state_data() {
            Some(batch) => batch.events.clone(),
            None => {
                warn!("No event batch found in state data, this should not happen");
                Vec::new()
            }
        };

        for event in events {
            self.process_event(event);
        }

        self.transition()
    }

    fn process_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Connected { name } => {
                info!("Controller '{}' connected", name);
                let state = self.core.on_connected();
                self.outbox.push(Outbound::new(state, SendReason::Connection));
            }
            DeviceEvent::Disconnected => {
                warn!("Controller disconnected");
                let state = self.core.on_disconnected();
                self.outbox.push(Outbound::new(state, SendReason::Connection));
            }
            DeviceEvent::Sample(snapshot) => {
                self.stats.samples += 1;
                if !self.core.state().is_connected() {
                    debug!("Sample without connected gamepad ignored");
                    return;
                }
                match self.core.on_sample(&snapshot) {
                    Ok(Some(state)) => {
                        let reason = if state.trigger_active() {
                            SendReason::Motion
                        } else {
                            SendReason::Release
                        };
                        self.outbox.push(Outbound::new(state, reason));
                    }
                    Ok(None) => {}
                    Err(e) => {
                        self.stats.rejected_samples += 1;
                        warn!("Skipping sample: {}", e);
                    }
                }
            }
            DeviceEvent::DebugKey(key) => {
                info!("Debug key '{}'", key);
                let state = self.core.state().clone();
                self.outbox.push(Outbound::debug_key(state, key));
            }
        }
    }
}

impl EventProcessor<Updating> {
    // Publish the record and hand the outbox to the transport
    pub fn update_state(mut self) -> EventProcessor<Waiting> {
        let state = self.core.state();
        debug!(
            "State: {} / {} ts={} x={} y={} force={}",
            state.motion_state,
            state.direction,
            state.timestamp,
            state.x_axis,
            state.y_axis,
            state.force
        );
        self.state_sender.send_replace(state.clone());

        for outbound in self.outbox.drain(..) {
            let reason = outbound.reason;
            let timestamp = outbound.state.timestamp;
            match enqueue(&self.transport, outbound) {
                Ok(()) => self.stats.queued += 1,
                Err(e) => {
                    self.stats.dropped += 1;
                    warn!("{:?} record at {} dropped: {}", reason, timestamp, e);
                }
            }
        }

        self.transition()
    }
}

// Public interface for spawning and running the processor
pub struct ProcessorHandle {
    state_receiver: watch::Receiver<ControlState>,
    task: tokio::task::JoinHandle<()>,
}

impl ProcessorHandle {
    pub fn spawn(
        event_receiver: mpsc::Receiver<DeviceEvent>,
        transport: mpsc::Sender<Outbound>,
        settings: Option<ProcessorSettings>,
        cancel: CancellationToken,
    ) -> Self {
        info!("Spawning Event Processor with settings: {:?}", settings);

        let processor = EventProcessor::create(event_receiver, transport, settings);
        let state_receiver = processor.subscribe();

        let task = tokio::spawn(async move {
            info!("Event Processor task started");
            if let Err(e) = run_processor_loop(processor, cancel).await {
                error!("Processor task terminated with error: {}", e);
            } else {
                info!("Event Processor task finished");
            }
        });

        Self {
            state_receiver,
            task,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ControlState> {
        self.state_receiver.clone()
    }

    pub async fn join(self) {
        if let Err(e) = self.task.await {
            error!("Event Processor panicked: {}", e);
        }
    }
}

async fn run_processor_loop(
    mut processor: EventProcessor<Waiting>,
    cancel: CancellationToken,
) -> Result<(), ProcessorError> {
    let stats_interval = chrono::Duration::seconds(processor.settings().stats_interval_secs as i64);
    let mut last_stats_time = Local::now();
    let mut cycles: u64 = 0;

    info!("Entering main processor loop");
    loop {
        let processing_state = tokio::select! {
            _ = cancel.cancelled() => {
                info!("Processor cancelled");
                return Ok(());
            }
            collected = processor.wait_and_collect() => collected?,
        };

        let updating_state = processing_state.process_events();
        processor = updating_state.update_state();
        cycles += 1;

        let now = Local::now();
        if stats_interval > chrono::Duration::zero() && now - last_stats_time > stats_interval {
            let stats = processor.take_stats();
            info!(
                "Processor stats: {} cycles, {} samples ({} rejected), {} queued, {} dropped in {} seconds",
                cycles,
                stats.samples,
                stats.rejected_samples,
                stats.queued,
                stats.dropped,
                (now - last_stats_time).num_seconds()
            );
            cycles = 0;
            last_stats_time = now;
        }
    }
}
