use thiserror::Error;

use crate::models::{PeerId, ProducerId, RoomCode, TransportId};
use crate::relay::RelayError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Room not found: {0}")]
    RoomNotFound(RoomCode),

    #[error("Room {0} is full")]
    RoomFull(RoomCode),

    #[error("Already a member of room {0}")]
    AlreadyMember(RoomCode),

    #[error("Peer not found: {0}")]
    PeerNotFound(PeerId),

    #[error("Peer {0} is not in the room")]
    NotInRoom(PeerId),

    #[error("Transport not found: {0}")]
    TransportNotFound(TransportId),

    #[error("Cannot consume producer {0}: capability check rejected the pairing")]
    CannotConsume(ProducerId),

    #[error("Room {0} has no media router yet")]
    RouterNotReady(RoomCode),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    /// Swallowed inside the translation gateway, which degrades to the
    /// original text; callers never observe this variant.
    #[error("Translation unavailable: {0}")]
    TranslationUnavailable(String),
}

impl Error {
    /// Machine-readable reason code carried on wire-level error events
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::RoomNotFound(_) => "room-not-found",
            Self::RoomFull(_) => "room-full",
            Self::AlreadyMember(_) => "already-member",
            Self::PeerNotFound(_) => "peer-not-found",
            Self::NotInRoom(_) => "not-in-room",
            Self::TransportNotFound(_) => "transport-not-found",
            Self::CannotConsume(_) => "cannot-consume",
            Self::RouterNotReady(_) => "router-not-ready",
            Self::Relay(_) => "relay-error",
            Self::TranslationUnavailable(_) => "translation-unavailable",
        }
    }

    /// True when the error means the relay process is gone and the server
    /// should shut down for a supervisory restart
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Relay(RelayError::WorkerDied))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
