use dashmap::DashMap;
use std::sync::Arc;

use crate::models::{Peer, PeerId, Room, RoomCode};

/// Owns every live Room and Peer. Pure in-memory state; nothing survives
/// the process.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    peers: Arc<DashMap<PeerId, Arc<Peer>>>,
    rooms: Arc<DashMap<RoomCode, Arc<Room>>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            peers: Arc::new(DashMap::new()),
            rooms: Arc::new(DashMap::new()),
        }
    }

    /// Idempotent: registering an id that already exists returns the
    /// existing peer unchanged (browsers re-fire connect events).
    pub fn register_peer(&self, peer_id: PeerId) -> Arc<Peer> {
        self.peers
            .entry(peer_id.clone())
            .or_insert_with(|| Arc::new(Peer::new(peer_id)))
            .clone()
    }

    #[must_use]
    pub fn peer(&self, peer_id: &PeerId) -> Option<Arc<Peer>> {
        self.peers.get(peer_id).map(|entry| entry.clone())
    }

    /// Idempotent: the second removal of the same id returns None.
    pub fn remove_peer(&self, peer_id: &PeerId) -> Option<Arc<Peer>> {
        self.peers.remove(peer_id).map(|(_, peer)| peer)
    }

    pub fn insert_room(&self, room: Arc<Room>) {
        self.rooms.insert(room.code.clone(), room);
    }

    #[must_use]
    pub fn lookup_room(&self, code: &RoomCode) -> Option<Arc<Room>> {
        self.rooms.get(code).map(|entry| entry.clone())
    }

    /// Drop a room iff its pending reclaim still applies. The decision runs
    /// under the map entry's lock, so a join cannot slip between the
    /// emptiness check and the removal.
    pub fn reclaim_room(&self, code: &RoomCode, drain_epoch: u64) -> Option<Arc<Room>> {
        self.rooms
            .remove_if(code, |_, room| room.begin_reclaim(drain_epoch))
            .map(|(_, room)| room)
    }

    pub fn remove_room(&self, code: &RoomCode) -> Option<Arc<Room>> {
        self.rooms.remove(code).map(|(_, room)| room)
    }

    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MemberInfo, SessionKind};

    #[test]
    fn test_register_peer_idempotent() {
        let registry = SessionRegistry::new();
        let id = PeerId::from_string("p1".to_string());

        let first = registry.register_peer(id.clone());
        first.set_profile("Sam", "en");

        let second = registry.register_peer(id.clone());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.display_name(), "Sam");
        assert_eq!(registry.peer_count(), 1);
    }

    #[test]
    fn test_remove_peer_idempotent() {
        let registry = SessionRegistry::new();
        let id = PeerId::from_string("p1".to_string());
        registry.register_peer(id.clone());

        assert!(registry.remove_peer(&id).is_some());
        assert!(registry.remove_peer(&id).is_none());
    }

    #[test]
    fn test_lookup_missing_room() {
        let registry = SessionRegistry::new();
        assert!(registry
            .lookup_room(&RoomCode::from_string("ZZZZZZZZ".to_string()))
            .is_none());
    }

    #[test]
    fn test_reclaim_respects_epoch() {
        let registry = SessionRegistry::new();
        let room = Arc::new(Room::new(SessionKind::Voice));
        let code = room.code.clone();
        registry.insert_room(room.clone());

        let p1 = PeerId::from_string("p1".to_string());
        room.try_add_member(MemberInfo::new(p1.clone(), "User", "en"))
            .unwrap();
        let left = room.remove_member(&p1).unwrap();
        assert!(left.now_empty);

        // Someone joins back inside the grace window.
        room.try_add_member(MemberInfo::new(
            PeerId::from_string("p2".to_string()),
            "User",
            "es",
        ))
        .unwrap();

        // The stale reclaim must not remove the revived room.
        assert!(registry.reclaim_room(&code, left.drain_epoch).is_none());
        assert!(registry.lookup_room(&code).is_some());
    }

    #[test]
    fn test_reclaim_removes_idle_room() {
        let registry = SessionRegistry::new();
        let room = Arc::new(Room::new(SessionKind::Voice));
        let code = room.code.clone();
        registry.insert_room(room.clone());

        let p1 = PeerId::from_string("p1".to_string());
        room.try_add_member(MemberInfo::new(p1.clone(), "User", "en"))
            .unwrap();
        let left = room.remove_member(&p1).unwrap();

        assert!(registry.reclaim_room(&code, left.drain_epoch).is_some());
        assert!(registry.lookup_room(&code).is_none());
        assert_eq!(registry.room_count(), 0);
    }
}
