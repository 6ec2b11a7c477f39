//! Client hub - per-connection outboxes and fan-out delivery

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::ws::protocol::ServerMsg;

/// Frames buffered per connection before new ones are dropped
pub const OUTBOX_CAPACITY: usize = 64;

/// Delivery primitives the arena relies on.
///
/// Implementations must not block: a slow or gone recipient loses the
/// message, the others still get it.
pub trait Outbound: Send + Sync + 'static {
    /// Deliver to one connection
    fn send_to(&self, conn_id: Uuid, msg: &ServerMsg);

    /// Deliver to every connection
    fn broadcast(&self, msg: &ServerMsg);

    /// Deliver to every connection except `excluded`
    fn broadcast_except(&self, excluded: Uuid, msg: &ServerMsg);
}

/// Why a frame did not reach a connection's outbox
#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("outbox full")]
    Full,

    #[error("connection closed")]
    Closed,

    #[error("unknown connection")]
    Unknown,
}

/// Registry of live connections and their outboxes
pub struct ClientHub {
    outboxes: DashMap<Uuid, mpsc::Sender<Arc<str>>>,
}

impl ClientHub {
    pub fn new() -> Self {
        Self {
            outboxes: DashMap::new(),
        }
    }

    /// Register a connection; the receiver feeds its socket writer
    pub fn register(&self, conn_id: Uuid) -> mpsc::Receiver<Arc<str>> {
        let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);
        self.outboxes.insert(conn_id, tx);
        rx
    }

    pub fn unregister(&self, conn_id: &Uuid) {
        self.outboxes.remove(conn_id);
    }

    pub fn connection_count(&self) -> usize {
        self.outboxes.len()
    }

    fn push(tx: &mpsc::Sender<Arc<str>>, frame: &Arc<str>) -> Result<(), OutboxError> {
        tx.try_send(frame.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => OutboxError::Full,
            mpsc::error::TrySendError::Closed(_) => OutboxError::Closed,
        })
    }

    fn deliver(&self, conn_id: Uuid, frame: &Arc<str>) -> Result<(), OutboxError> {
        let tx = self.outboxes.get(&conn_id).ok_or(OutboxError::Unknown)?;
        Self::push(tx.value(), frame)
    }

    fn fan_out(&self, excluded: Option<Uuid>, msg: &ServerMsg) {
        let Some(frame) = encode(msg) else {
            return;
        };

        for entry in self.outboxes.iter() {
            if Some(*entry.key()) == excluded {
                continue;
            }
            if let Err(e) = Self::push(entry.value(), &frame) {
                log_drop(*entry.key(), &e);
            }
        }
    }
}

impl Default for ClientHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Outbound for ClientHub {
    fn send_to(&self, conn_id: Uuid, msg: &ServerMsg) {
        let Some(frame) = encode(msg) else {
            return;
        };
        if let Err(e) = self.deliver(conn_id, &frame) {
            log_drop(conn_id, &e);
        }
    }

    fn broadcast(&self, msg: &ServerMsg) {
        self.fan_out(None, msg);
    }

    fn broadcast_except(&self, excluded: Uuid, msg: &ServerMsg) {
        self.fan_out(Some(excluded), msg);
    }
}

impl<T: Outbound> Outbound for Arc<T> {
    fn send_to(&self, conn_id: Uuid, msg: &ServerMsg) {
        (**self).send_to(conn_id, msg)
    }

    fn broadcast(&self, msg: &ServerMsg) {
        (**self).broadcast(msg)
    }

    fn broadcast_except(&self, excluded: Uuid, msg: &ServerMsg) {
        (**self).broadcast_except(excluded, msg)
    }
}

/// Serialize once, share the text across every outbox
fn encode(msg: &ServerMsg) -> Option<Arc<str>> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            error!(error = %e, "Failed to encode server message");
            None
        }
    }
}

fn log_drop(conn_id: Uuid, e: &OutboxError) {
    match e {
        OutboxError::Full => warn!(conn_id = %conn_id, "Outbox full, dropping frame"),
        _ => debug!(conn_id = %conn_id, error = %e, "Frame not delivered"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_type(frame: &str) -> String {
        let value: serde_json::Value = serde_json::from_str(frame).unwrap();
        value["type"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_send_to_reaches_only_target() {
        let hub = ClientHub::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut rx_a = hub.register(a);
        let mut rx_b = hub.register(b);

        hub.send_to(a, &ServerMsg::PlayerLeft(b));

        assert_eq!(frame_type(&rx_a.recv().await.unwrap()), "playerLeft");
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_except_skips_excluded() {
        let hub = ClientHub::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut rx_a = hub.register(a);
        let mut rx_b = hub.register(b);

        hub.broadcast_except(a, &ServerMsg::StateUpdate(Default::default()));

        assert!(rx_a.try_recv().is_err());
        assert_eq!(frame_type(&rx_b.recv().await.unwrap()), "stateUpdate");
    }

    #[tokio::test]
    async fn test_full_outbox_does_not_block_others() {
        let hub = ClientHub::new();
        let slow = Uuid::new_v4();
        let fast = Uuid::new_v4();
        let _rx_slow = hub.register(slow);
        let mut rx_fast = hub.register(fast);

        let msg = ServerMsg::StateUpdate(Default::default());
        for _ in 0..OUTBOX_CAPACITY + 10 {
            hub.broadcast(&msg);
            assert!(rx_fast.recv().await.is_some());
        }
    }

    #[tokio::test]
    async fn test_unregister_and_closed_receivers() {
        let hub = ClientHub::new();
        let a = Uuid::new_v4();
        let rx = hub.register(a);
        drop(rx);

        // Closed outbox is skipped silently
        hub.broadcast(&ServerMsg::PlayerLeft(a));
        assert_eq!(hub.connection_count(), 1);

        hub.unregister(&a);
        hub.unregister(&a);
        assert_eq!(hub.connection_count(), 0);
        hub.send_to(a, &ServerMsg::PlayerLeft(a));
    }
}
