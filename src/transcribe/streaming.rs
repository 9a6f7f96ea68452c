use base64::Engine;
use futures::stream::StreamExt;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::messages::{AudioFrameMessage, StreamEvent, StreamStatus};
use crate::config::StreamSettings;

/// Streaming channel lifecycle
///
/// `Connecting → Open → (Degraded ⇄ Open) → Closed`. A missed heartbeat
/// degrades the channel; a bounded number of fixed-backoff probes either
/// restores `Open` or closes it for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Degraded,
    Closed,
}

/// Shared channel state, written by the heartbeat and event-pump tasks
struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: ChannelState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn set(&self, state: ChannelState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    fn get(&self) -> ChannelState {
        match self.0.load(Ordering::SeqCst) {
            0 => ChannelState::Connecting,
            1 => ChannelState::Open,
            2 => ChannelState::Degraded,
            _ => ChannelState::Closed,
        }
    }
}

/// Signals forwarded from the channel to the orchestrator
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    Connected,
    Degraded { attempt: u32 },
    Transcript { text: String, is_final: bool },
    Closed { reason: String },
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("failed to connect to streaming backend: {0}")]
    ConnectFailed(String),

    #[error("streaming channel is not open")]
    NotOpen,

    #[error("failed to publish audio frame: {0}")]
    Publish(String),
}

/// Persistent connection to the real-time transcription backend
///
/// Pushes raw audio frames continuously and receives incremental
/// transcript events, decoded once at this boundary and forwarded to
/// the orchestrator in backend-emission order.
pub struct StreamingChannel {
    session_id: String,
    client: async_nats::Client,
    state: Arc<StateCell>,
    sequence: AtomicU32,
    pump_task: Option<JoinHandle<()>>,
    heartbeat_task: Option<JoinHandle<()>>,
}

impl StreamingChannel {
    /// Open the persistent connection and start the event pump and
    /// heartbeat tasks. Returns the channel plus the event receiver the
    /// orchestrator listens on.
    pub async fn connect(
        settings: &StreamSettings,
        session_id: &str,
    ) -> Result<(Self, mpsc::Receiver<ChannelEvent>), StreamError> {
        info!(
            "Connecting to streaming transcription backend at {}",
            settings.nats_url
        );

        let client = async_nats::connect(&settings.nats_url)
            .await
            .map_err(|e| StreamError::ConnectFailed(e.to_string()))?;

        let subject = format!("stt.events.{}", session_id);
        let mut subscriber = client
            .subscribe(subject.clone())
            .await
            .map_err(|e| StreamError::ConnectFailed(e.to_string()))?;

        info!("Streaming channel open, subscribed to {}", subject);

        let state = Arc::new(StateCell::new(ChannelState::Open));
        let (events_tx, events_rx) = mpsc::channel(100);

        let _ = events_tx.send(ChannelEvent::Connected).await;

        // Event pump: decode tagged events and forward them in
        // backend-emission order
        let pump_state = Arc::clone(&state);
        let pump_tx = events_tx.clone();
        let pump_task = tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                match serde_json::from_slice::<StreamEvent>(&msg.payload) {
                    Ok(StreamEvent::Transcript { text, is_final }) => {
                        if pump_tx
                            .send(ChannelEvent::Transcript { text, is_final })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Ok(StreamEvent::Status { status }) => {
                        if status == StreamStatus::Disconnected {
                            warn!("Backend signaled disconnect");
                            pump_state.set(ChannelState::Degraded);
                        }
                    }
                    Ok(StreamEvent::Error { message }) => {
                        warn!("Backend stream error: {}", message);
                    }
                    Err(e) => {
                        warn!("Failed to parse stream event: {}", e);
                    }
                }
            }
        });

        let heartbeat_task = tokio::spawn(heartbeat_loop(
            client.clone(),
            Arc::clone(&state),
            events_tx,
            settings.clone(),
        ));

        Ok((
            Self {
                session_id: session_id.to_string(),
                client,
                state,
                sequence: AtomicU32::new(0),
                pump_task: Some(pump_task),
                heartbeat_task: Some(heartbeat_task),
            },
            events_rx,
        ))
    }

    /// Push a raw audio frame to the backend
    pub async fn send_audio(
        &self,
        pcm_bytes: &[u8],
        sample_rate: u32,
        channels: u16,
        final_frame: bool,
    ) -> Result<(), StreamError> {
        if self.state.get() != ChannelState::Open {
            return Err(StreamError::NotOpen);
        }

        let subject = format!("stt.audio.{}", self.session_id);
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);

        let message = AudioFrameMessage {
            session_id: self.session_id.clone(),
            sequence,
            pcm: base64::engine::general_purpose::STANDARD.encode(pcm_bytes),
            sample_rate,
            channels,
            timestamp: chrono::Utc::now().to_rfc3339(),
            final_frame,
        };

        let payload =
            serde_json::to_vec(&message).map_err(|e| StreamError::Publish(e.to_string()))?;

        self.client
            .publish(subject, payload.into())
            .await
            .map_err(|e| StreamError::Publish(e.to_string()))?;

        Ok(())
    }

    pub fn is_healthy(&self) -> bool {
        self.state.get() == ChannelState::Open
    }

    pub fn state(&self) -> ChannelState {
        self.state.get()
    }

    /// Stop heartbeat and pump tasks and release the connection.
    /// Valid at any state.
    pub fn close(&mut self) {
        self.state.set(ChannelState::Closed);
        if let Some(task) = self.heartbeat_task.take() {
            task.abort();
        }
        if let Some(task) = self.pump_task.take() {
            task.abort();
        }
        info!("Streaming channel closed");
    }
}

impl Drop for StreamingChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Fixed-interval liveness loop
///
/// A probe miss degrades the channel and switches to bounded
/// fixed-backoff retries; exhausting them closes the channel and emits
/// the terminal event the orchestrator uses to fail over.
async fn heartbeat_loop(
    client: async_nats::Client,
    state: Arc<StateCell>,
    events_tx: mpsc::Sender<ChannelEvent>,
    settings: StreamSettings,
) {
    let interval = Duration::from_secs(settings.heartbeat_interval_secs);
    let probe_timeout = Duration::from_secs(settings.heartbeat_timeout_secs);
    let backoff = Duration::from_secs(settings.reconnect_backoff_secs);

    loop {
        tokio::time::sleep(interval).await;

        match state.get() {
            ChannelState::Closed => return,
            ChannelState::Open | ChannelState::Connecting => {
                if probe(&client, probe_timeout).await {
                    continue;
                }
                state.set(ChannelState::Degraded);
            }
            ChannelState::Degraded => {}
        }

        let mut recovered = false;
        for attempt in 1..=settings.max_reconnect_attempts {
            let _ = events_tx.send(ChannelEvent::Degraded { attempt }).await;
            tokio::time::sleep(backoff).await;

            if state.get() == ChannelState::Closed {
                return;
            }

            if probe(&client, probe_timeout).await {
                info!("Streaming channel recovered after {} probe(s)", attempt);
                state.set(ChannelState::Open);
                recovered = true;
                break;
            }

            warn!(
                "Liveness probe {}/{} failed",
                attempt, settings.max_reconnect_attempts
            );
        }

        if !recovered {
            state.set(ChannelState::Closed);
            let _ = events_tx
                .send(ChannelEvent::Closed {
                    reason: "liveness probes exhausted".to_string(),
                })
                .await;
            return;
        }
    }
}

/// One request/reply liveness probe; a timeout counts as a miss
async fn probe(client: &async_nats::Client, probe_timeout: Duration) -> bool {
    let request = client.request("stt.health".to_string(), "ping".into());
    match tokio::time::timeout(probe_timeout, request).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            warn!("Heartbeat request failed: {}", e);
            false
        }
        Err(_) => {
            warn!("Heartbeat timed out after {:?}", probe_timeout);
            false
        }
    }
}
