//! Controller subsystem for gamepad input handling
//!
//! Implements a two-stage processing pipeline:
//!
//! 1. [`event_collector`] - Gamepad polling and snapshot collection
//! 2. [`event_processor`] - Sampling, classification and change detection
//! 3. [`controller_handle`] - Unified API and lifecycle management
//!
//! # Architecture
//!
//! ```text
//! Gamepad ──► Collector ──► Processor ──► Transport
//!             (Snapshots)   (Records)  └─► watch<ControlState>
//! ```
//!
//! [`keyboard_debug`] feeds typed key names into the processor queue.

pub mod controller_handle;
pub mod event_collector;
pub mod event_processor;
pub mod keyboard_debug;

pub use controller_handle::{ControllerError, ControllerHandle, ControllerSettings};
pub use event_collector::{CollectorError, CollectorHandle, CollectorSettings, DeviceEvent};
pub use event_processor::{ProcessorError, ProcessorHandle, ProcessorSettings, ProcessorStats};
