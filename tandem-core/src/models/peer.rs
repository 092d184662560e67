use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::id::{ConsumerId, PeerId, ProducerId, RoomCode, TransportId};
use crate::{Error, Result};

/// Negotiation state of one relay transport, tracked per direction by the
/// client but flat here: a transport is created, then connected, and media
/// handles hang off it until it closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportPhase {
    Created,
    Connected,
}

#[derive(Debug, Default)]
struct TransportState {
    phase: Option<TransportPhase>,
    producers: Vec<ProducerId>,
    consumers: Vec<ConsumerId>,
}

/// Media handles released by a teardown, to be closed on the relay by the
/// caller (outside any lock)
#[derive(Debug, Default, Clone)]
pub struct MediaHandles {
    pub transports: Vec<TransportId>,
    pub producers: Vec<ProducerId>,
    pub consumers: Vec<ConsumerId>,
}

impl MediaHandles {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transports.is_empty() && self.producers.is_empty() && self.consumers.is_empty()
    }
}

struct PeerState {
    display_name: String,
    language: String,
    room: Option<RoomCode>,
    transports: IndexMap<TransportId, TransportState>,
}

/// One connected participant. Media handles are owned exclusively by their
/// peer; nothing outside this struct mutates them.
pub struct Peer {
    pub id: PeerId,
    pub connected_at: DateTime<Utc>,
    state: Mutex<PeerState>,
}

impl Peer {
    #[must_use]
    pub fn new(id: PeerId) -> Self {
        Self {
            id,
            connected_at: Utc::now(),
            state: Mutex::new(PeerState {
                display_name: "User".to_string(),
                language: "en".to_string(),
                room: None,
                transports: IndexMap::new(),
            }),
        }
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        self.state.lock().display_name.clone()
    }

    #[must_use]
    pub fn language(&self) -> String {
        self.state.lock().language.clone()
    }

    /// Set at create/join time; empty names fall back to the default.
    pub fn set_profile(&self, display_name: &str, language: &str) {
        let mut state = self.state.lock();
        state.display_name = if display_name.trim().is_empty() {
            "User".to_string()
        } else {
            display_name.trim().to_string()
        };
        state.language = language.to_string();
    }

    pub fn set_language(&self, language: &str) {
        self.state.lock().language = language.to_string();
    }

    #[must_use]
    pub fn room(&self) -> Option<RoomCode> {
        self.state.lock().room.clone()
    }

    pub fn set_room(&self, code: RoomCode) {
        self.state.lock().room = Some(code);
    }

    pub fn clear_room(&self) -> Option<RoomCode> {
        self.state.lock().room.take()
    }

    pub fn add_transport(&self, transport_id: TransportId) {
        self.state.lock().transports.insert(
            transport_id,
            TransportState {
                phase: Some(TransportPhase::Created),
                producers: Vec::new(),
                consumers: Vec::new(),
            },
        );
    }

    #[must_use]
    pub fn transport_phase(&self, transport_id: &TransportId) -> Option<TransportPhase> {
        self.state
            .lock()
            .transports
            .get(transport_id)
            .and_then(|t| t.phase)
    }

    /// Called only after the relay accepted the DTLS handshake; a failed
    /// connect leaves the transport in CREATED so the caller can retry.
    pub fn mark_transport_connected(&self, transport_id: &TransportId) -> Result<()> {
        let mut state = self.state.lock();
        let transport = state
            .transports
            .get_mut(transport_id)
            .ok_or_else(|| Error::TransportNotFound(transport_id.clone()))?;
        transport.phase = Some(TransportPhase::Connected);
        Ok(())
    }

    pub fn add_producer(&self, transport_id: &TransportId, producer_id: ProducerId) -> Result<()> {
        let mut state = self.state.lock();
        let transport = state
            .transports
            .get_mut(transport_id)
            .ok_or_else(|| Error::TransportNotFound(transport_id.clone()))?;
        transport.producers.push(producer_id);
        Ok(())
    }

    pub fn add_consumer(&self, transport_id: &TransportId, consumer_id: ConsumerId) -> Result<()> {
        let mut state = self.state.lock();
        let transport = state
            .transports
            .get_mut(transport_id)
            .ok_or_else(|| Error::TransportNotFound(transport_id.clone()))?;
        transport.consumers.push(consumer_id);
        Ok(())
    }

    /// Remove a transport and yield everything created on it. Closing a
    /// transport that is already gone is a no-op (None).
    pub fn close_transport(&self, transport_id: &TransportId) -> Option<MediaHandles> {
        let mut state = self.state.lock();
        let transport = state.transports.shift_remove(transport_id)?;
        Some(MediaHandles {
            transports: vec![transport_id.clone()],
            producers: transport.producers,
            consumers: transport.consumers,
        })
    }

    /// Strip every media handle the peer owns, in one pass. Used by the
    /// disconnect flow; calling it twice yields an empty set the second time.
    pub fn take_all_media(&self) -> MediaHandles {
        let mut state = self.state.lock();
        let mut handles = MediaHandles::default();
        for (transport_id, transport) in state.transports.drain(..) {
            handles.transports.push(transport_id);
            handles.producers.extend(transport.producers);
            handles.consumers.extend(transport.consumers);
        }
        handles
    }

    #[must_use]
    pub fn transport_count(&self) -> usize {
        self.state.lock().transports.len()
    }
}

impl std::fmt::Debug for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peer")
            .field("id", &self.id)
            .field("room", &self.room())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> Peer {
        Peer::new(PeerId::from_string("p1".to_string()))
    }

    fn tid(s: &str) -> TransportId {
        TransportId::from_string(s.to_string())
    }

    #[test]
    fn test_default_profile() {
        let peer = peer();
        assert_eq!(peer.display_name(), "User");
        assert_eq!(peer.language(), "en");

        peer.set_profile("  ", "es");
        assert_eq!(peer.display_name(), "User");
        assert_eq!(peer.language(), "es");

        peer.set_profile(" Ana ", "es");
        assert_eq!(peer.display_name(), "Ana");
    }

    #[test]
    fn test_transport_lifecycle() {
        let peer = peer();
        peer.add_transport(tid("t1"));
        assert_eq!(peer.transport_phase(&tid("t1")), Some(TransportPhase::Created));

        peer.mark_transport_connected(&tid("t1")).unwrap();
        assert_eq!(peer.transport_phase(&tid("t1")), Some(TransportPhase::Connected));

        let err = peer.mark_transport_connected(&tid("missing")).unwrap_err();
        assert!(matches!(err, Error::TransportNotFound(_)));
    }

    #[test]
    fn test_close_transport_transitive() {
        let peer = peer();
        peer.add_transport(tid("t1"));
        peer.add_producer(&tid("t1"), ProducerId::from_string("prod1".to_string()))
            .unwrap();
        peer.add_consumer(&tid("t1"), ConsumerId::from_string("cons1".to_string()))
            .unwrap();

        let handles = peer.close_transport(&tid("t1")).unwrap();
        assert_eq!(handles.transports, vec![tid("t1")]);
        assert_eq!(handles.producers.len(), 1);
        assert_eq!(handles.consumers.len(), 1);

        // Double close is a no-op.
        assert!(peer.close_transport(&tid("t1")).is_none());
    }

    #[test]
    fn test_take_all_media_drains_everything() {
        let peer = peer();
        peer.add_transport(tid("t1"));
        peer.add_transport(tid("t2"));
        peer.add_producer(&tid("t1"), ProducerId::from_string("prod1".to_string()))
            .unwrap();
        peer.add_consumer(&tid("t2"), ConsumerId::from_string("cons1".to_string()))
            .unwrap();

        let handles = peer.take_all_media();
        assert_eq!(handles.transports.len(), 2);
        assert_eq!(handles.producers.len(), 1);
        assert_eq!(handles.consumers.len(), 1);

        assert!(peer.take_all_media().is_empty());
        assert_eq!(peer.transport_count(), 0);
    }
}
