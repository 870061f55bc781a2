//! The channel instance actor.
//!
//! All per-channel state — connection generation, retry budget, outbound
//! queue, subscribers, indicator — is owned by one task. Commands from
//! handles and events from connection attempts arrive on queues and are
//! handled to completion one at a time, so logically-concurrent operations
//! can interleave but never mutate state in parallel.
//!
//! Every connection attempt is an owned generation. Events are tagged with
//! the generation that produced them and events from any other generation are
//! ignored, so a stale transport can never affect state after replacement and
//! duplicate close/error reports schedule at most one reconnect.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use socklink_transport::Transport;
use socklink_wire::{decode_frame, WireFrame};

use crate::config::ChannelConfig;
use crate::error::{ChannelError, Result};
use crate::indicator::{IndicatorAction, IndicatorCoordinator};
use crate::registry::ChannelKey;
use crate::state::{ChannelStatus, ConnectionState};
use crate::subscriber::{SubscriberFn, SubscriberSet, SubscriptionToken};
use crate::token::{self, TokenSource};

pub(crate) enum Command {
    /// Pre-serialized payload; token already attached at submission time.
    Submit(String),
    Subscribe(SubscriberFn, oneshot::Sender<SubscriptionToken>),
    Unsubscribe(SubscriptionToken),
    /// Reconnect if the stored connection is not usable; resets the retry
    /// budget. Sent by the registry on every lookup of an existing instance.
    EnsureConnected,
    Status(oneshot::Sender<ChannelStatus>),
}

enum ConnEvent {
    Opened {
        generation: u64,
    },
    Inbound {
        generation: u64,
        frame: WireFrame,
    },
    Closed {
        generation: u64,
        reason: String,
    },
    RetryDue {
        generation: u64,
    },
}

/// Everything an instance needs at spawn time.
pub(crate) struct InstanceSettings {
    pub key: ChannelKey,
    pub config: ChannelConfig,
    pub transport: Arc<dyn Transport>,
    pub token_source: Option<Arc<dyn TokenSource>>,
    pub indicator: Option<IndicatorCoordinator>,
}

/// Cloneable handle to a channel instance.
///
/// All handles for one `(endpoint, logicalId)` key talk to the same actor;
/// the instance itself lives for the rest of the process.
#[derive(Clone)]
pub struct ChannelHandle {
    key: ChannelKey,
    commands: mpsc::UnboundedSender<Command>,
    token_source: Option<Arc<dyn TokenSource>>,
}

impl ChannelHandle {
    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    /// Submit a payload for transmission.
    ///
    /// If the connection is open the payload goes straight out; while
    /// connecting it is queued; when closed or failed it is queued and a
    /// reconnect is arranged. The session token, if any, is attached here —
    /// the token as of submission is what eventually hits the wire.
    pub fn submit(&self, payload: Value) -> Result<()> {
        let mut payload = payload;
        if let Some(source) = &self.token_source {
            if let Some(token) = source.current_token() {
                token::attach(&mut payload, &token);
            }
        }
        let text = serde_json::to_string(&payload)?;
        self.commands
            .send(Command::Submit(text))
            .map_err(|_| ChannelError::InstanceGone)
    }

    /// Register a subscriber for every decoded inbound message.
    ///
    /// Side effect: announces the subscriber to the backend by submitting the
    /// `{"id": <logicalId>}` handshake through the normal outbound path.
    pub async fn subscribe(
        &self,
        subscriber: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Result<SubscriptionToken> {
        let (reply, token) = oneshot::channel();
        self.commands
            .send(Command::Subscribe(Arc::new(subscriber), reply))
            .map_err(|_| ChannelError::InstanceGone)?;
        token.await.map_err(|_| ChannelError::InstanceGone)
    }

    /// Remove a subscriber. Has no effect on the connection.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> Result<()> {
        self.commands
            .send(Command::Unsubscribe(token))
            .map_err(|_| ChannelError::InstanceGone)
    }

    /// Snapshot the instance state.
    pub async fn status(&self) -> Result<ChannelStatus> {
        let (reply, status) = oneshot::channel();
        self.commands
            .send(Command::Status(reply))
            .map_err(|_| ChannelError::InstanceGone)?;
        status.await.map_err(|_| ChannelError::InstanceGone)
    }

    /// Returns true if both handles talk to the same instance actor.
    pub fn same_instance(&self, other: &ChannelHandle) -> bool {
        self.commands.same_channel(&other.commands)
    }

    pub(crate) fn ensure_connected(&self) -> Result<()> {
        self.commands
            .send(Command::EnsureConnected)
            .map_err(|_| ChannelError::InstanceGone)
    }
}

/// Spawn the instance actor and hand back its first handle.
pub(crate) fn spawn(settings: InstanceSettings) -> ChannelHandle {
    let (commands, command_queue) = mpsc::unbounded_channel();
    let handle = ChannelHandle {
        key: settings.key.clone(),
        commands,
        token_source: settings.token_source.clone(),
    };
    tokio::spawn(run(settings, command_queue));
    handle
}

struct Instance {
    settings: InstanceSettings,
    state: ConnectionState,
    generation: u64,
    retry_count: u32,
    outbound: VecDeque<String>,
    /// Writer channel of the current generation; present from attempt start,
    /// used only once the attempt reports `Opened`.
    writer: Option<mpsc::UnboundedSender<WireFrame>>,
    subscribers: SubscriberSet,
    events: mpsc::UnboundedSender<ConnEvent>,
}

async fn run(settings: InstanceSettings, mut commands: mpsc::UnboundedReceiver<Command>) {
    let (events, mut event_queue) = mpsc::unbounded_channel();
    let mut instance = Instance {
        settings,
        state: ConnectionState::Connecting,
        generation: 0,
        retry_count: 0,
        outbound: VecDeque::new(),
        writer: None,
        subscribers: SubscriberSet::default(),
        events,
    };
    instance.start_attempt();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => instance.handle_command(command),
                // Every handle is gone; tear the connection down and stop.
                None => break,
            },
            Some(event) = event_queue.recv() => instance.handle_event(event),
        }
    }
}

impl Instance {
    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit(text) => self.submit(text),
            Command::Subscribe(subscriber, reply) => {
                self.announce();
                let token = self.subscribers.add(subscriber);
                let _ = reply.send(token);
            }
            Command::Unsubscribe(token) => {
                self.subscribers.remove(token);
            }
            Command::EnsureConnected => self.ensure_connected(),
            Command::Status(reply) => {
                let _ = reply.send(self.status());
            }
        }
    }

    /// Submit the `{"id": <logicalId>}` handshake announcing a subscriber.
    /// It takes the same path as caller payloads so it obeys queueing and
    /// FIFO ordering, and precedes anything submitted afterwards.
    fn announce(&mut self) {
        let mut payload = json!({ "id": self.settings.key.logical_id });
        if let Some(source) = &self.settings.token_source {
            if let Some(token) = source.current_token() {
                token::attach(&mut payload, &token);
            }
        }
        match serde_json::to_string(&payload) {
            Ok(text) => self.submit(text),
            Err(err) => warn!(key = %self.settings.key, error = %err, "handshake payload failed to serialize"),
        }
    }

    fn submit(&mut self, text: String) {
        if let Some(indicator) = &self.settings.indicator {
            indicator.push(IndicatorAction::Open);
        }
        match self.state {
            ConnectionState::Open => self.transmit(WireFrame::Text(text)),
            // Expected while the connection is still coming up.
            ConnectionState::Connecting => self.enqueue(text),
            // A reconnect is already scheduled for Closed; Failed needs an
            // explicit restart with a fresh retry budget.
            ConnectionState::Closed => self.enqueue(text),
            ConnectionState::Failed => {
                self.enqueue(text);
                self.ensure_connected();
            }
        }
    }

    fn enqueue(&mut self, text: String) {
        if self.outbound.len() >= self.settings.config.max_queued {
            self.outbound.pop_front();
            warn!(
                key = %self.settings.key,
                max = self.settings.config.max_queued,
                "outbound queue full, evicting oldest payload"
            );
        }
        self.outbound.push_back(text);
    }

    fn transmit(&mut self, frame: WireFrame) {
        if let Some(writer) = &self.writer {
            // A failed send means the writer task is gone; its Closed event
            // is already in flight and will reschedule.
            if writer.send(frame).is_err() {
                debug!(key = %self.settings.key, "writer gone, transmit deferred to reconnect");
            }
        }
    }

    fn ensure_connected(&mut self) {
        match self.state {
            ConnectionState::Open | ConnectionState::Connecting => {}
            ConnectionState::Closed | ConnectionState::Failed => {
                self.retry_count = 0;
                self.start_attempt();
            }
        }
    }

    fn start_attempt(&mut self) {
        self.generation += 1;
        self.state = ConnectionState::Connecting;

        let (writer, writer_queue) = mpsc::unbounded_channel();
        self.writer = Some(writer);

        let url = self.settings.key.url();
        info!(url = %url, generation = self.generation, "connecting");
        tokio::spawn(run_attempt(
            Arc::clone(&self.settings.transport),
            url,
            self.generation,
            self.settings.config.connect_timeout,
            self.events.clone(),
            writer_queue,
        ));
    }

    fn schedule_retry(&self) {
        let events = self.events.clone();
        let generation = self.generation;
        let delay = self.settings.config.reconnect_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(ConnEvent::RetryDue { generation });
        });
    }

    /// Drain the outbound queue in submission order. Runs to completion
    /// before the actor looks at any other command, so nothing submitted
    /// later can jump ahead of queued traffic.
    fn flush(&mut self) {
        while let Some(text) = self.outbound.pop_front() {
            self.transmit(WireFrame::Text(text));
        }
    }

    fn handle_event(&mut self, event: ConnEvent) {
        match event {
            ConnEvent::Opened { generation } => {
                if generation != self.generation || self.state != ConnectionState::Connecting {
                    return;
                }
                self.state = ConnectionState::Open;
                self.retry_count = 0;
                info!(key = %self.settings.key, generation, "channel open");
                self.flush();
            }
            ConnEvent::Inbound { generation, frame } => {
                if generation != self.generation || self.state != ConnectionState::Open {
                    return;
                }
                if let Some(indicator) = &self.settings.indicator {
                    indicator.push(IndicatorAction::Close);
                }
                match decode_frame(&frame) {
                    Ok(message) => self.subscribers.dispatch(&message),
                    Err(err) => {
                        warn!(key = %self.settings.key, error = %err, "dropping undecodable inbound frame");
                    }
                }
            }
            ConnEvent::Closed { generation, reason } => {
                if generation != self.generation {
                    return;
                }
                // Error and close may both fire for one transport; the
                // second report must not schedule another reconnect.
                if matches!(self.state, ConnectionState::Closed | ConnectionState::Failed) {
                    return;
                }
                self.writer = None;
                self.retry_count += 1;
                if self.retry_count < self.settings.config.max_retries {
                    self.state = ConnectionState::Closed;
                    warn!(
                        key = %self.settings.key,
                        generation,
                        reason = %reason,
                        retry = self.retry_count,
                        delay_ms = self.settings.config.reconnect_delay.as_millis() as u64,
                        "connection lost, reconnect scheduled"
                    );
                    self.schedule_retry();
                } else {
                    self.state = ConnectionState::Failed;
                    error!(
                        key = %self.settings.key,
                        reason = %reason,
                        attempts = self.retry_count,
                        "retries exhausted, channel failed"
                    );
                }
            }
            ConnEvent::RetryDue { generation } => {
                if generation != self.generation || self.state != ConnectionState::Closed {
                    return;
                }
                self.start_attempt();
            }
        }
    }

    fn status(&self) -> ChannelStatus {
        ChannelStatus {
            state: self.state,
            retry_count: self.retry_count,
            queued: self.outbound.len(),
            subscribers: self.subscribers.len(),
            generation: self.generation,
            indicator_visible: self
                .settings
                .indicator
                .as_ref()
                .map(IndicatorCoordinator::is_visible),
        }
    }
}

/// One connection generation: connect under the watchdog, then pump frames
/// both ways until the transport goes away.
async fn run_attempt(
    transport: Arc<dyn Transport>,
    url: String,
    generation: u64,
    connect_timeout: Duration,
    events: mpsc::UnboundedSender<ConnEvent>,
    mut writer_queue: mpsc::UnboundedReceiver<WireFrame>,
) {
    let (mut sink, mut stream) = match timeout(connect_timeout, transport.connect(&url)).await {
        Ok(Ok(halves)) => halves,
        Ok(Err(err)) => {
            let _ = events.send(ConnEvent::Closed {
                generation,
                reason: err.to_string(),
            });
            return;
        }
        Err(_) => {
            let _ = events.send(ConnEvent::Closed {
                generation,
                reason: format!("connect timed out after {connect_timeout:?}"),
            });
            return;
        }
    };

    let _ = events.send(ConnEvent::Opened { generation });

    let writer_events = events.clone();
    let writer = tokio::spawn(async move {
        while let Some(frame) = writer_queue.recv().await {
            if let Err(err) = sink.send(frame).await {
                let _ = writer_events.send(ConnEvent::Closed {
                    generation,
                    reason: err.to_string(),
                });
                return;
            }
        }
        // The instance dropped the writer channel; close politely.
        let _ = sink.close().await;
    });

    while let Some(result) = stream.next_frame().await {
        match result {
            Ok(frame) => {
                let _ = events.send(ConnEvent::Inbound { generation, frame });
            }
            Err(err) => {
                let _ = events.send(ConnEvent::Closed {
                    generation,
                    reason: err.to_string(),
                });
                writer.abort();
                return;
            }
        }
    }

    let _ = events.send(ConnEvent::Closed {
        generation,
        reason: "connection closed by peer".to_string(),
    });
    writer.abort();
}
