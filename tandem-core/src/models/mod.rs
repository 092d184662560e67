pub mod event;
pub mod id;
pub mod peer;
pub mod room;

pub use event::{ClientCommand, ServerEvent};
pub use id::{
    generate_id, generate_room_code, ConsumerId, PeerId, ProducerId, RoomCode, RouterId,
    TransportId,
};
pub use peer::{MediaHandles, Peer, TransportPhase};
pub use room::{
    JoinOutcome, LeaveOutcome, MediaKind, MemberInfo, Room, RoomPhase, RoomSnapshot, SessionKind,
    ROOM_CAPACITY,
};
