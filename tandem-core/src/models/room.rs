use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::id::{PeerId, ProducerId, RoomCode, RouterId};
use crate::{Error, Result};

/// Hard cap on room membership. Conversations are strictly two-party.
pub const ROOM_CAPACITY: usize = 2;

/// Media flavor of a room, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    #[default]
    Voice,
    Video,
}

impl SessionKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Voice => "voice",
            Self::Video => "video",
        }
    }
}

/// Kind of media stream carried by a producer or consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

/// Room lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomPhase {
    /// At least one member present
    Active,
    /// Empty, surviving a grace window in case someone comes back
    Draining,
    /// Grace window elapsed; the room is gone and cannot be joined
    Reclaimed,
}

/// One member as the room tracks it (insertion order = join order)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    pub peer_id: PeerId,
    pub display_name: String,
    pub language: String,
    pub joined_at: DateTime<Utc>,
}

impl MemberInfo {
    pub fn new(peer_id: PeerId, display_name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            peer_id,
            display_name: display_name.into(),
            language: language.into(),
            joined_at: Utc::now(),
        }
    }
}

/// Point-in-time view of a room, safe to hold across awaits and to serialize
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: RoomCode,
    pub kind: SessionKind,
    pub phase: RoomPhase,
    pub host_id: Option<PeerId>,
    pub members: Vec<MemberInfo>,
    pub created_at: DateTime<Utc>,
}

/// What a successful `try_add_member` observed
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// Members present before this join, in join order
    pub others: Vec<MemberInfo>,
    /// True when the join pulled the room out of DRAINING
    pub revived: bool,
    pub snapshot: RoomSnapshot,
}

/// What `remove_member` observed
#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    pub removed: MemberInfo,
    /// Host after the removal (None when the room emptied)
    pub host_id: Option<PeerId>,
    pub now_empty: bool,
    /// Drain epoch to hand to the reclaim scheduler when `now_empty`
    pub drain_epoch: u64,
    pub snapshot: RoomSnapshot,
}

struct RoomState {
    phase: RoomPhase,
    members: IndexMap<PeerId, MemberInfo>,
    host_id: Option<PeerId>,
    router_id: Option<RouterId>,
    producers: IndexMap<ProducerId, (PeerId, MediaKind)>,
    /// Bumped on every DRAINING entry/exit; lets a pending reclaim detect
    /// that the room was revived after it was scheduled.
    drain_epoch: u64,
}

/// A two-party session container. All mutation goes through the internal
/// mutex; the lock is never held across an await.
pub struct Room {
    pub code: RoomCode,
    pub kind: SessionKind,
    pub created_at: DateTime<Utc>,
    state: Mutex<RoomState>,
}

impl Room {
    #[must_use]
    pub fn new(kind: SessionKind) -> Self {
        Self::with_code(RoomCode::new(), kind)
    }

    #[must_use]
    pub fn with_code(code: RoomCode, kind: SessionKind) -> Self {
        Self {
            code,
            kind,
            created_at: Utc::now(),
            state: Mutex::new(RoomState {
                phase: RoomPhase::Active,
                members: IndexMap::new(),
                host_id: None,
                router_id: None,
                producers: IndexMap::new(),
                drain_epoch: 0,
            }),
        }
    }

    /// A room reserved ahead of its first member. Starts in DRAINING so an
    /// unclaimed code expires after the usual grace window; the first join
    /// revives it like any other draining room.
    #[must_use]
    pub fn new_reserved(kind: SessionKind) -> Self {
        let room = Self::new(kind);
        room.state.lock().phase = RoomPhase::Draining;
        room
    }

    /// Insert a member, enforcing the capacity invariant. The first member
    /// (and the first member after a revive) becomes host.
    pub fn try_add_member(&self, member: MemberInfo) -> Result<JoinOutcome> {
        let mut state = self.state.lock();
        if state.phase == RoomPhase::Reclaimed {
            return Err(Error::RoomNotFound(self.code.clone()));
        }
        if state.members.contains_key(&member.peer_id) {
            return Err(Error::AlreadyMember(self.code.clone()));
        }
        if state.members.len() >= ROOM_CAPACITY {
            return Err(Error::RoomFull(self.code.clone()));
        }

        let others: Vec<MemberInfo> = state.members.values().cloned().collect();
        let revived = state.phase == RoomPhase::Draining;
        if revived {
            state.phase = RoomPhase::Active;
            state.drain_epoch += 1;
        }
        if state.host_id.is_none() {
            state.host_id = Some(member.peer_id.clone());
        }
        state.members.insert(member.peer_id.clone(), member);

        Ok(JoinOutcome {
            others,
            revived,
            snapshot: self.snapshot_locked(&state),
        })
    }

    /// Remove a member. Reassigns the host to the earliest remaining joiner
    /// and enters DRAINING when the room empties. Returns None if the peer
    /// was not a member (removal is idempotent).
    pub fn remove_member(&self, peer_id: &PeerId) -> Option<LeaveOutcome> {
        let mut state = self.state.lock();
        let removed = state.members.shift_remove(peer_id)?;

        if state.host_id.as_ref() == Some(peer_id) {
            state.host_id = state.members.keys().next().cloned();
        }

        let now_empty = state.members.is_empty();
        if now_empty {
            state.phase = RoomPhase::Draining;
            state.drain_epoch += 1;
            state.host_id = None;
        }

        Some(LeaveOutcome {
            removed,
            host_id: state.host_id.clone(),
            now_empty,
            drain_epoch: state.drain_epoch,
            snapshot: self.snapshot_locked(&state),
        })
    }

    /// Atomically decide whether a scheduled reclaim may go through. Flips
    /// the room to RECLAIMED (terminal) when the epoch still matches and
    /// nobody came back; a stale epoch means the room was revived.
    pub fn begin_reclaim(&self, drain_epoch: u64) -> bool {
        let mut state = self.state.lock();
        if state.phase == RoomPhase::Draining
            && state.drain_epoch == drain_epoch
            && state.members.is_empty()
        {
            state.phase = RoomPhase::Reclaimed;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn member_count(&self) -> usize {
        self.state.lock().members.len()
    }

    #[must_use]
    pub fn is_member(&self, peer_id: &PeerId) -> bool {
        self.state.lock().members.contains_key(peer_id)
    }

    #[must_use]
    pub fn member(&self, peer_id: &PeerId) -> Option<MemberInfo> {
        self.state.lock().members.get(peer_id).cloned()
    }

    /// Members other than `peer_id`, in join order
    #[must_use]
    pub fn others(&self, peer_id: &PeerId) -> Vec<MemberInfo> {
        self.state
            .lock()
            .members
            .values()
            .filter(|m| &m.peer_id != peer_id)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn host_id(&self) -> Option<PeerId> {
        self.state.lock().host_id.clone()
    }

    #[must_use]
    pub fn phase(&self) -> RoomPhase {
        self.state.lock().phase
    }

    /// Language stays mutable only while the room is short of capacity.
    /// Returns false once both seats are taken.
    pub fn update_member_language(&self, peer_id: &PeerId, language: &str) -> bool {
        let mut state = self.state.lock();
        if state.members.len() >= ROOM_CAPACITY {
            return false;
        }
        match state.members.get_mut(peer_id) {
            Some(member) => {
                member.language = language.to_string();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn router_id(&self) -> Option<RouterId> {
        self.state.lock().router_id.clone()
    }

    /// First writer wins; a racing second router is returned to the caller
    /// for disposal.
    pub fn install_router(&self, router_id: RouterId) -> RouterId {
        let mut state = self.state.lock();
        match &state.router_id {
            Some(existing) => existing.clone(),
            None => {
                state.router_id = Some(router_id.clone());
                router_id
            }
        }
    }

    pub fn take_router(&self) -> Option<RouterId> {
        self.state.lock().router_id.take()
    }

    pub fn register_producer(&self, producer_id: ProducerId, owner: PeerId, kind: MediaKind) {
        self.state
            .lock()
            .producers
            .insert(producer_id, (owner, kind));
    }

    pub fn remove_producer(&self, producer_id: &ProducerId) -> Option<(PeerId, MediaKind)> {
        self.state.lock().producers.shift_remove(producer_id)
    }

    /// Producers registered by `peer_id`, removed from the room's registry
    pub fn take_producers_of(&self, peer_id: &PeerId) -> Vec<ProducerId> {
        let mut state = self.state.lock();
        let ids: Vec<ProducerId> = state
            .producers
            .iter()
            .filter(|(_, (owner, _))| owner == peer_id)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &ids {
            state.producers.shift_remove(id);
        }
        ids
    }

    /// Every producer still registered under the room, regardless of whether
    /// the owning peer already departed
    pub fn take_all_producers(&self) -> Vec<ProducerId> {
        let mut state = self.state.lock();
        state.producers.drain(..).map(|(id, _)| id).collect()
    }

    #[must_use]
    pub fn snapshot(&self) -> RoomSnapshot {
        self.snapshot_locked(&self.state.lock())
    }

    fn snapshot_locked(&self, state: &RoomState) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.code.clone(),
            kind: self.kind,
            phase: state.phase,
            host_id: state.host_id.clone(),
            members: state.members.values().cloned().collect(),
            created_at: self.created_at,
        }
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("code", &self.code)
            .field("kind", &self.kind)
            .field("members", &self.member_count())
            .finish()
    }
}
