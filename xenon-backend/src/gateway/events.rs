use crate::gateway::protocol::GatewayEvent;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Max number of recent events kept for late subscribers
const EVENT_BUFFER_SIZE: usize = 200;

/// Per-subscriber channel capacity
const SUBSCRIBER_CAPACITY: usize = 1000;

/// Fans orchestration events out to every subscriber.
///
/// `broadcast()` never blocks: events go through an unbounded channel to a
/// background task that buffers them and delivers to each subscriber. A full
/// subscriber drops the event; a closed one is removed.
pub struct EventBroadcaster {
    cmd_tx: mpsc::UnboundedSender<GatewayEvent>,
    subscribers: Arc<DashMap<String, mpsc::Sender<GatewayEvent>>>,
    recent_events: Arc<Mutex<VecDeque<GatewayEvent>>>,
}

impl EventBroadcaster {
    /// Must be called inside a tokio runtime
    pub fn new() -> Self {
        let subscribers: Arc<DashMap<String, mpsc::Sender<GatewayEvent>>> =
            Arc::new(DashMap::new());
        let recent_events = Arc::new(Mutex::new(VecDeque::with_capacity(EVENT_BUFFER_SIZE)));

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        tokio::spawn(Self::run_loop(cmd_rx, subscribers.clone(), recent_events.clone()));

        Self {
            cmd_tx,
            subscribers,
            recent_events,
        }
    }

    /// Subscribe and return (subscriber_id, receiver)
    pub fn subscribe(&self) -> (String, mpsc::Receiver<GatewayEvent>) {
        let subscriber_id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        self.subscribers.insert(subscriber_id.clone(), tx);
        log::debug!("[BROADCAST] Subscriber {} added", subscriber_id);
        (subscriber_id, rx)
    }

    pub fn unsubscribe(&self, subscriber_id: &str) {
        self.subscribers.remove(subscriber_id);
        log::debug!("[BROADCAST] Subscriber {} removed", subscriber_id);
    }

    /// Snapshot of the most recent events, oldest first
    pub fn recent_events(&self) -> Vec<GatewayEvent> {
        self.recent_events.lock().iter().cloned().collect()
    }

    /// Queue an event for delivery
    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.cmd_tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    async fn run_loop(
        mut cmd_rx: mpsc::UnboundedReceiver<GatewayEvent>,
        subscribers: Arc<DashMap<String, mpsc::Sender<GatewayEvent>>>,
        recent_events: Arc<Mutex<VecDeque<GatewayEvent>>>,
    ) {
        while let Some(event) = cmd_rx.recv().await {
            {
                let mut buffer = recent_events.lock();
                if buffer.len() >= EVENT_BUFFER_SIZE {
                    buffer.pop_front();
                }
                buffer.push_back(event.clone());
            }

            if log::log_enabled!(log::Level::Debug) {
                if let Ok(json) = serde_json::to_string(&event) {
                    log::debug!(
                        "[BROADCAST] '{}' to {} subscriber(s): {}",
                        event.event,
                        subscribers.len(),
                        json
                    );
                }
            }

            let mut closed = Vec::new();
            for entry in subscribers.iter() {
                match entry.value().try_send(event.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        log::warn!(
                            "[BROADCAST] Channel full for subscriber {}, dropping '{}' event",
                            entry.key(),
                            event.event
                        );
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => closed.push(entry.key().clone()),
                }
            }

            for subscriber_id in closed {
                subscribers.remove(&subscriber_id);
                log::debug!("[BROADCAST] Removed closed subscriber {}", subscriber_id);
            }
        }

        log::info!("[BROADCAST] Background broadcast loop shutting down");
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
