use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::models::{PeerId, ServerEvent};

/// Message sender for one peer's signaling connection
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// In-memory fan-out hub: one unbounded outbound queue per connected peer.
/// Senders that turn out dead are pruned on the next send.
#[derive(Clone, Default)]
pub struct PeerHub {
    peers: Arc<DashMap<PeerId, EventSender>>,
}

impl PeerHub {
    #[must_use]
    pub fn new() -> Self {
        Self {
            peers: Arc::new(DashMap::new()),
        }
    }

    /// Attach a peer's outbound queue, returning the receiving end the
    /// connection task drains. Re-attaching replaces the previous queue.
    pub fn attach(&self, peer_id: PeerId) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.peers.insert(peer_id, tx);
        rx
    }

    pub fn detach(&self, peer_id: &PeerId) {
        self.peers.remove(peer_id);
    }

    /// Queue an event for one peer. Returns false when the peer has no live
    /// connection; the stale sender is dropped on the spot.
    pub fn send_to(&self, peer_id: &PeerId, event: ServerEvent) -> bool {
        let Some(sender) = self.peers.get(peer_id) else {
            debug!(peer_id = %peer_id, event_type = event.event_type(), "no connection for event");
            return false;
        };

        if sender.send(event).is_err() {
            drop(sender);
            self.peers.remove(peer_id);
            warn!(peer_id = %peer_id, "outbound queue closed, pruning connection");
            return false;
        }
        true
    }

    /// Queue an event for several peers, returning how many got it
    pub fn send_to_each<'a>(
        &self,
        peer_ids: impl IntoIterator<Item = &'a PeerId>,
        event: &ServerEvent,
    ) -> usize {
        let mut sent = 0;
        for peer_id in peer_ids {
            if self.send_to(peer_id, event.clone()) {
                sent += 1;
            }
        }
        sent
    }

    #[must_use]
    pub fn is_attached(&self, peer_id: &PeerId) -> bool {
        self.peers.contains_key(peer_id)
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.peers.len()
    }
}
