use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use ureq::{Agent, AgentBuilder};

use super::config::TransportConfig;
use super::{push_coalesced, Outbound, RateLimiter, Transmit, TransportError};

/// Posts records to the robot with the record in the query string
pub struct HttpTransmitter {
    agent: Agent,
    endpoint: String,
}

impl HttpTransmitter {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let endpoint = config.endpoint();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(TransportError::Configuration(format!(
                "unsupported server address: {}",
                config.server_address
            )));
        }

        let agent = AgentBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build();

        Ok(Self { agent, endpoint })
    }
}

impl Transmit for HttpTransmitter {
    fn transmit(&self, outbound: &Outbound) -> Result<(), TransportError> {
        let mut request = self.agent.post(&self.endpoint);
        for (key, value) in outbound.query_pairs() {
            request = request.query(key, &value);
        }

        match request.call() {
            Ok(response) => {
                debug!("Robot answered {}", response.status());
                Ok(())
            }
            Err(ureq::Error::Status(code, _)) => Err(TransportError::Status(code)),
            Err(e) => Err(TransportError::Request(e.to_string())),
        }
    }

    fn name(&self) -> &str {
        &self.endpoint
    }
}

/// Dry-run transmitter, only logs what would be sent
#[derive(Debug, Default)]
pub struct LogTransmitter;

impl Transmit for LogTransmitter {
    fn transmit(&self, outbound: &Outbound) -> Result<(), TransportError> {
        info!("[dry-run] ?{}", outbound.query_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}

/// Handle to the transport worker task
pub struct TransportHandle {
    sender: mpsc::Sender<Outbound>,
    task: JoinHandle<()>,
}

impl TransportHandle {
    /// Spawns the worker with the transmitter selected by `config`
    pub fn spawn(
        config: &TransportConfig,
        cancel: CancellationToken,
    ) -> Result<Self, TransportError> {
        let transmitter: Arc<dyn Transmit> = if config.enabled {
            Arc::new(HttpTransmitter::new(config)?)
        } else {
            warn!("Transport disabled, records will only be logged");
            Arc::new(LogTransmitter)
        };
        Ok(Self::spawn_with(config, transmitter, cancel))
    }

    /// Spawns the worker around any transmitter
    pub fn spawn_with(
        config: &TransportConfig,
        transmitter: Arc<dyn Transmit>,
        cancel: CancellationToken,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        info!(
            "Starting transport to {} (min interval {} ms, queue {})",
            transmitter.name(),
            config.min_interval_ms,
            config.queue_capacity
        );

        let limiter = RateLimiter::new(config.min_interval_ms);
        let task = tokio::spawn(async move {
            run_transport_loop(receiver, transmitter, limiter, cancel).await;
            info!("Transport worker finished");
        });

        Self { sender, task }
    }

    /// Sender the processor queues records on
    pub fn sender(&self) -> mpsc::Sender<Outbound> {
        self.sender.clone()
    }

    /// Drops this handle's sender and waits for the worker to drain
    pub async fn join(self) {
        drop(self.sender);
        if let Err(e) = self.task.await {
            error!("Transport worker panicked: {}", e);
        }
    }
}

async fn run_transport_loop(
    mut receiver: mpsc::Receiver<Outbound>,
    transmitter: Arc<dyn Transmit>,
    mut limiter: RateLimiter,
    cancel: CancellationToken,
) {
    let mut pending: VecDeque<Outbound> = VecDeque::new();
    let mut closed = false;
    let mut sent: u64 = 0;
    let mut failed: u64 = 0;

    loop {
        if pending.is_empty() {
            if closed {
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                msg = receiver.recv() => match msg {
                    Some(outbound) => pending.push_back(outbound),
                    None => {
                        closed = true;
                        continue;
                    }
                },
            }
        }

        // Collect whatever arrives until the limiter lets the next one out
        let wait = limiter.time_until_ready();
        if !wait.is_zero() {
            let sleep = tokio::time::sleep(wait);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Transport cancelled with {} pending records", pending.len());
                        return;
                    }
                    _ = &mut sleep => break,
                    msg = receiver.recv(), if !closed => match msg {
                        Some(outbound) => push_coalesced(&mut pending, outbound),
                        None => closed = true,
                    },
                }
            }
        }
        while let Ok(outbound) = receiver.try_recv() {
            push_coalesced(&mut pending, outbound);
        }

        let Some(outbound) = pending.pop_front() else {
            continue;
        };
        limiter.mark();
        debug!("Sending {:?}: ?{}", outbound.reason, outbound.query_string());

        let worker = transmitter.clone();
        match tokio::task::spawn_blocking(move || worker.transmit(&outbound)).await {
            Ok(Ok(())) => sent += 1,
            Ok(Err(e)) => {
                failed += 1;
                warn!("Dropping record: {}", e);
            }
            Err(e) => {
                failed += 1;
                error!("Transmit task failed: {}", e);
            }
        }
        debug!("Transport totals: {} sent, {} failed", sent, failed);
    }

    info!(
        "Transport loop ended after {} sent and {} failed records",
        sent, failed
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::ControlState;
    use crate::transport::SendReason;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Outbound>>,
    }

    impl Transmit for Recorder {
        fn transmit(&self, outbound: &Outbound) -> Result<(), TransportError> {
            self.seen.lock().unwrap().push(outbound.clone());
            Ok(())
        }

        fn name(&self) -> &str {
            "recorder"
        }
    }

    #[derive(Default)]
    struct Failing {
        attempts: AtomicUsize,
    }

    impl Transmit for Failing {
        fn transmit(&self, _outbound: &Outbound) -> Result<(), TransportError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::Request("connection refused".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn motion(ts: i64) -> Outbound {
        Outbound::new(
            ControlState {
                timestamp: ts,
                ..ControlState::connected()
            },
            SendReason::Motion,
        )
    }

    #[tokio::test]
    async fn burst_is_coalesced_to_first_and_latest() {
        let recorder = Arc::new(Recorder::default());
        let config = TransportConfig {
            min_interval_ms: 50,
            ..TransportConfig::default()
        };
        let handle =
            TransportHandle::spawn_with(&config, recorder.clone(), CancellationToken::new());

        let sender = handle.sender();
        sender
            .send(Outbound::new(ControlState::connected(), SendReason::Connection))
            .await
            .unwrap();
        for ts in 1..=5 {
            sender.send(motion(ts)).await.unwrap();
        }
        drop(sender);
        handle.join().await;

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.first().map(|o| o.reason), Some(SendReason::Connection));
        assert_eq!(seen.last().map(|o| o.state.timestamp), Some(5));
        assert!(seen.len() <= 6);
    }

    #[tokio::test]
    async fn connection_edges_survive_coalescing() {
        let recorder = Arc::new(Recorder::default());
        let config = TransportConfig {
            min_interval_ms: 20,
            ..TransportConfig::default()
        };
        let handle =
            TransportHandle::spawn_with(&config, recorder.clone(), CancellationToken::new());

        let sender = handle.sender();
        sender.send(motion(1)).await.unwrap();
        sender.send(motion(2)).await.unwrap();
        sender
            .send(Outbound::new(
                ControlState::disconnected(),
                SendReason::Connection,
            ))
            .await
            .unwrap();
        sender
            .send(Outbound::new(ControlState::connected(), SendReason::Connection))
            .await
            .unwrap();
        drop(sender);
        handle.join().await;

        let seen = recorder.seen.lock().unwrap();
        let connections = seen
            .iter()
            .filter(|o| o.reason == SendReason::Connection)
            .count();
        assert_eq!(connections, 2);
        assert_eq!(seen.last().map(|o| o.state.is_connected()), Some(true));
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_worker() {
        let failing = Arc::new(Failing::default());
        let config = TransportConfig {
            min_interval_ms: 1,
            ..TransportConfig::default()
        };
        let handle =
            TransportHandle::spawn_with(&config, failing.clone(), CancellationToken::new());

        // Debug keys are never coalesced, so every one must be attempted
        let sender = handle.sender();
        for key in ["a", "b", "c"] {
            sender
                .send(Outbound::debug_key(ControlState::connected(), key.to_string()))
                .await
                .unwrap();
        }
        drop(sender);
        handle.join().await;

        assert_eq!(failing.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancel_stops_an_idle_worker() {
        let cancel = CancellationToken::new();
        let handle = TransportHandle::spawn_with(
            &TransportConfig::default(),
            Arc::new(LogTransmitter),
            cancel.clone(),
        );
        cancel.cancel();
        handle.join().await;
    }

    #[test]
    fn http_transmitter_rejects_unknown_schemes() {
        let config = TransportConfig {
            server_address: "ftp://robot".to_string(),
            ..TransportConfig::default()
        };
        assert!(matches!(
            HttpTransmitter::new(&config),
            Err(TransportError::Configuration(_))
        ));
    }
}
