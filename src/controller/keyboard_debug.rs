//! Keyboard debug channel
//!
//! Every line typed on stdin is sent to the robot right away as a
//! `debug_key`, next to the current control record. Classification is not
//! involved and the record's motion state is left alone.
//!
//! stdin is read on its own thread. A blocking read cannot be cancelled, so
//! the thread is left detached and never holds up runtime shutdown.

use std::io::BufRead;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::event_collector::DeviceEvent;

pub fn spawn(
    sender: mpsc::Sender<DeviceEvent>,
    cancel: CancellationToken,
) -> std::io::Result<JoinHandle<()>> {
    info!("Keyboard debug channel enabled, type a key name and press enter");
    std::thread::Builder::new()
        .name("keyboard-debug".to_string())
        .spawn(move || read_keys(std::io::stdin().lock(), &sender, &cancel))
}

// Forward key names until stop, end of input or a closed processor
fn read_keys<R: BufRead>(
    reader: R,
    sender: &mpsc::Sender<DeviceEvent>,
    cancel: &CancellationToken,
) {
    for line in reader.lines() {
        if cancel.is_cancelled() {
            break;
        }
        match line {
            Ok(line) => {
                if let Some(event) = parse_key(&line) {
                    if sender.blocking_send(event).is_err() {
                        debug!("Processor gone, closing keyboard debug channel");
                        break;
                    }
                }
            }
            Err(e) => {
                warn!("Failed to read stdin: {}", e);
                break;
            }
        }
    }
    debug!("Keyboard debug channel closed");
}

fn parse_key(line: &str) -> Option<DeviceEvent> {
    let key = line.trim();
    if key.is_empty() {
        None
    } else {
        Some(DeviceEvent::DebugKey(key.to_string()))
    }
}
