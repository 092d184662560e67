use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::hub::PeerHub;
use crate::models::{
    MediaHandles, MemberInfo, Peer, PeerId, Room, RoomCode, RoomSnapshot, ServerEvent, SessionKind,
};
use crate::registry::SessionRegistry;
use crate::relay::{self, MediaRelay};
use crate::service::reaper::ReclaimScheduler;
use crate::{Error, Result};

/// Room lifecycle: creation, membership, host election and deferred
/// reclamation of empty rooms. All membership fan-out happens here so both
/// sides of a two-party room always hear about each other symmetrically.
#[derive(Clone)]
pub struct RoomSupervisor {
    registry: SessionRegistry,
    hub: PeerHub,
    reaper: ReclaimScheduler,
    relay: Arc<dyn MediaRelay>,
}

impl RoomSupervisor {
    pub fn new(
        registry: SessionRegistry,
        hub: PeerHub,
        reaper: ReclaimScheduler,
        relay: Arc<dyn MediaRelay>,
    ) -> Self {
        Self {
            registry,
            hub,
            reaper,
            relay,
        }
    }

    /// Open a fresh room with the caller as sole member and host. The room
    /// becomes visible in the registry only once its creator is seated.
    pub fn create_room(
        &self,
        peer_id: &PeerId,
        name: &str,
        language: &str,
        kind: SessionKind,
    ) -> Result<RoomSnapshot> {
        let peer = self
            .registry
            .peer(peer_id)
            .ok_or_else(|| Error::PeerNotFound(peer_id.clone()))?;
        if let Some(current) = peer.room() {
            return Err(Error::AlreadyMember(current));
        }

        peer.set_profile(name, language);
        let room = Arc::new(Room::new(kind));
        let member = MemberInfo::new(peer.id.clone(), peer.display_name(), peer.language());
        let outcome = room.try_add_member(member)?;
        peer.set_room(room.code.clone());
        self.registry.insert_room(Arc::clone(&room));

        info!(
            room_id = %room.code,
            peer_id = %peer.id,
            kind = %room.kind.as_str(),
            "room created"
        );

        let host_id = outcome
            .snapshot
            .host_id
            .clone()
            .unwrap_or_else(|| peer.id.clone());
        self.hub.send_to(
            &peer.id,
            ServerEvent::JoinedRoom {
                room_id: room.code.clone(),
                kind: room.kind,
                host_id,
                members: outcome.snapshot.members.clone(),
                timestamp: Utc::now(),
            },
        );

        Ok(outcome.snapshot)
    }

    /// Create an empty room ahead of its first member. The code expires
    /// after the grace window unless someone claims it by joining.
    pub fn reserve_room(&self, kind: SessionKind) -> RoomSnapshot {
        let room = Arc::new(Room::new_reserved(kind));
        let snapshot = room.snapshot();
        self.registry.insert_room(Arc::clone(&room));
        self.schedule_reclaim(room.code.clone(), 0);

        info!(room_id = %room.code, kind = %room.kind.as_str(), "room reserved");
        snapshot
    }

    /// Seat a peer in an existing room. Notifies the pre-existing member
    /// with `partner-joined`, the newcomer with the full membership, and
    /// everyone with a fresh snapshot.
    pub fn join_room(
        &self,
        peer_id: &PeerId,
        code: &RoomCode,
        name: &str,
        language: &str,
    ) -> Result<RoomSnapshot> {
        let peer = self
            .registry
            .peer(peer_id)
            .ok_or_else(|| Error::PeerNotFound(peer_id.clone()))?;
        if let Some(current) = peer.room() {
            return Err(Error::AlreadyMember(current));
        }
        let room = self
            .registry
            .lookup_room(code)
            .ok_or_else(|| Error::RoomNotFound(code.clone()))?;

        peer.set_profile(name, language);
        let member = MemberInfo::new(peer.id.clone(), peer.display_name(), peer.language());
        let display_name = member.display_name.clone();
        let member_language = member.language.clone();

        let outcome = room.try_add_member(member)?;
        peer.set_room(room.code.clone());
        if outcome.revived {
            self.reaper.cancel(&room.code);
        }

        info!(
            room_id = %room.code,
            peer_id = %peer.id,
            language = %member_language,
            revived = outcome.revived,
            "peer joined room"
        );

        let timestamp = Utc::now();
        for other in &outcome.others {
            self.hub.send_to(
                &other.peer_id,
                ServerEvent::PartnerJoined {
                    room_id: room.code.clone(),
                    peer_id: peer.id.clone(),
                    display_name: display_name.clone(),
                    language: member_language.clone(),
                    timestamp,
                },
            );
        }
        let host_id = outcome
            .snapshot
            .host_id
            .clone()
            .unwrap_or_else(|| peer.id.clone());
        self.hub.send_to(
            &peer.id,
            ServerEvent::JoinedRoom {
                room_id: room.code.clone(),
                kind: room.kind,
                host_id: host_id.clone(),
                members: outcome.snapshot.members.clone(),
                timestamp,
            },
        );
        let member_ids: Vec<PeerId> = outcome
            .snapshot
            .members
            .iter()
            .map(|m| m.peer_id.clone())
            .collect();
        self.hub.send_to_each(
            &member_ids,
            &ServerEvent::RoomUpdate {
                room_id: room.code.clone(),
                host_id: Some(host_id),
                members: outcome.snapshot.members.clone(),
                timestamp,
            },
        );

        Ok(outcome.snapshot)
    }

    /// Explicit leave. The peer must actually be seated in the named room.
    pub async fn leave_room(&self, peer_id: &PeerId, code: &RoomCode) -> Result<()> {
        let peer = self
            .registry
            .peer(peer_id)
            .ok_or_else(|| Error::PeerNotFound(peer_id.clone()))?;
        let room = self
            .registry
            .lookup_room(code)
            .ok_or_else(|| Error::RoomNotFound(code.clone()))?;
        if peer.room().as_ref() != Some(code) {
            return Err(Error::NotInRoom(peer_id.clone()));
        }

        self.depart(&peer, &room).await;
        Ok(())
    }

    /// Unseat a peer: membership removal, host handover, remaining-member
    /// notifications, relay teardown of everything the peer produced, and
    /// the reclaim timer when the room empties. Idempotent; a peer that is
    /// no longer a member departs silently.
    pub(crate) async fn depart(&self, peer: &Peer, room: &Room) {
        peer.clear_room();
        let Some(outcome) = room.remove_member(&peer.id) else {
            return;
        };

        info!(
            room_id = %room.code,
            peer_id = %peer.id,
            now_empty = outcome.now_empty,
            "peer left room"
        );

        let timestamp = Utc::now();
        let remaining: Vec<PeerId> = outcome
            .snapshot
            .members
            .iter()
            .map(|m| m.peer_id.clone())
            .collect();
        self.hub.send_to_each(
            &remaining,
            &ServerEvent::PartnerLeft {
                room_id: room.code.clone(),
                peer_id: outcome.removed.peer_id.clone(),
                display_name: outcome.removed.display_name.clone(),
                host_id: outcome.host_id.clone(),
                timestamp,
            },
        );
        self.hub.send_to_each(
            &remaining,
            &ServerEvent::RoomUpdate {
                room_id: room.code.clone(),
                host_id: outcome.host_id.clone(),
                members: outcome.snapshot.members.clone(),
                timestamp,
            },
        );

        // Relay teardown runs after the fan-out, outside every lock.
        let handles = peer.take_all_media();
        room.take_producers_of(&peer.id);
        if !handles.is_empty() {
            relay::close_media(self.relay.as_ref(), &handles).await;
        }

        if outcome.now_empty {
            self.schedule_reclaim(room.code.clone(), outcome.drain_epoch);
        }
    }

    fn schedule_reclaim(&self, code: RoomCode, drain_epoch: u64) {
        let registry = self.registry.clone();
        let relay = Arc::clone(&self.relay);
        self.reaper.schedule(code.clone(), async move {
            let Some(room) = registry.reclaim_room(&code, drain_epoch) else {
                debug!(room_id = %code, "reclaim skipped, room was revived");
                return;
            };

            // Close whatever media outlived its members.
            let orphaned = MediaHandles {
                producers: room.take_all_producers(),
                ..MediaHandles::default()
            };
            if !orphaned.is_empty() {
                relay::close_media(relay.as_ref(), &orphaned).await;
            }
            if let Some(router) = room.take_router() {
                if let Err(err) = relay.close_router(&router).await {
                    debug!(room_id = %code, error = %err, "router close failed");
                }
            }

            info!(room_id = %code, "empty room reclaimed");
        });
    }
}
