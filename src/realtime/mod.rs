//! Real-time fan-out of sensor updates to connected clients

mod ws_handler;

pub use self::ws_handler::ws_handler;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::SensorUpdate;

/// Frame sent to every client: `{"event": "sensor-update", "data": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RealtimeMessage {
    pub event: String,
    pub data: SensorUpdate,
}

/// Broadcast channel shared by all client sessions.
///
/// Publishing never waits on clients; a receiver that falls more than
/// `capacity` messages behind skips the oldest ones.
#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<RealtimeMessage>,
    topic: String,
}

impl Broadcaster {
    pub fn new(capacity: usize, topic: impl Into<String>) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            topic: topic.into(),
        }
    }

    /// Returns the number of clients that will see the update
    pub fn publish(&self, update: SensorUpdate) -> usize {
        let message = RealtimeMessage {
            event: self.topic.clone(),
            data: update,
        };
        match self.tx.send(message) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!("[Realtime] No connected clients, update dropped");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeMessage> {
        self.tx.subscribe()
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
