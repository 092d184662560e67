use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::id::{ConsumerId, PeerId, ProducerId, RoomCode, TransportId};
use super::room::{MediaKind, MemberInfo, SessionKind};
use crate::translate::TranslationTier;

/// Commands a client sends over its signaling channel. Tag and field names
/// match what the browser clients emit (`{"type":"join-room","roomId":...}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    /// Open a fresh room with the sender as sole member and host
    CreateRoom {
        language: String,
        name: String,
        #[serde(default)]
        kind: SessionKind,
    },

    /// Enter an existing room by its shareable code
    JoinRoom {
        room_id: RoomCode,
        language: String,
        name: String,
    },

    LeaveRoom {
        room_id: RoomCode,
    },

    /// Typed chat text
    SendMessage {
        room_id: RoomCode,
        text: String,
    },

    /// A finished speech-recognition transcript. `language` overrides the
    /// stored peer language for this utterance when present.
    SpeechData {
        room_id: RoomCode,
        transcript: String,
        #[serde(default)]
        language: Option<String>,
    },

    /// Fetch the room router's RTP capability blob (needed before consuming)
    RouterRtpCapabilities {
        room_id: RoomCode,
    },

    CreateTransport,

    ConnectTransport {
        transport_id: TransportId,
        dtls_parameters: JsonValue,
    },

    ProduceAudio {
        transport_id: TransportId,
        kind: MediaKind,
        rtp_parameters: JsonValue,
    },

    ConsumeAudio {
        transport_id: TransportId,
        producer_id: ProducerId,
        rtp_capabilities: JsonValue,
    },
}

impl ClientCommand {
    /// Get the room this command targets, if it names one
    #[must_use]
    pub const fn room_id(&self) -> Option<&RoomCode> {
        match self {
            Self::JoinRoom { room_id, .. }
            | Self::LeaveRoom { room_id, .. }
            | Self::SendMessage { room_id, .. }
            | Self::SpeechData { room_id, .. }
            | Self::RouterRtpCapabilities { room_id } => Some(room_id),
            Self::CreateRoom { .. }
            | Self::CreateTransport
            | Self::ConnectTransport { .. }
            | Self::ProduceAudio { .. }
            | Self::ConsumeAudio { .. } => None,
        }
    }

    /// Get a short description of the command type
    #[must_use]
    pub const fn command_type(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "create-room",
            Self::JoinRoom { .. } => "join-room",
            Self::LeaveRoom { .. } => "leave-room",
            Self::SendMessage { .. } => "send-message",
            Self::SpeechData { .. } => "speech-data",
            Self::RouterRtpCapabilities { .. } => "router-rtp-capabilities",
            Self::CreateTransport => "create-transport",
            Self::ConnectTransport { .. } => "connect-transport",
            Self::ProduceAudio { .. } => "produce-audio",
            Self::ConsumeAudio { .. } => "consume-audio",
        }
    }
}

/// Events the server pushes to a client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// First event on every connection, tells the client its peer id
    Connected {
        peer_id: PeerId,
    },

    /// Sent to a peer that just entered a room (creator included), with the
    /// full membership so both sides agree on partner identity
    JoinedRoom {
        room_id: RoomCode,
        kind: SessionKind,
        host_id: PeerId,
        members: Vec<MemberInfo>,
        timestamp: DateTime<Utc>,
    },

    /// Sent to the pre-existing member when someone joins
    PartnerJoined {
        room_id: RoomCode,
        peer_id: PeerId,
        display_name: String,
        language: String,
        timestamp: DateTime<Utc>,
    },

    PartnerLeft {
        room_id: RoomCode,
        peer_id: PeerId,
        display_name: String,
        /// Host after the departure, None when the room emptied
        host_id: Option<PeerId>,
        timestamp: DateTime<Utc>,
    },

    /// Membership snapshot pushed after any lifecycle change
    RoomUpdate {
        room_id: RoomCode,
        host_id: Option<PeerId>,
        members: Vec<MemberInfo>,
        timestamp: DateTime<Utc>,
    },

    /// Chat text fan-out. The sender receives its own copy with
    /// `should_speak = false`; the partner's copy carries the translation
    /// and `should_speak = true`.
    ReceiveMessage {
        room_id: RoomCode,
        sender_id: PeerId,
        sender_name: String,
        text: String,
        original_text: String,
        source_lang: String,
        target_lang: String,
        should_speak: bool,
        timestamp: DateTime<Utc>,
    },

    /// Speech transcript fan-out, same echo/delivery split as
    /// `receive-message`
    PartnerSpeech {
        room_id: RoomCode,
        sender_id: PeerId,
        sender_name: String,
        text: String,
        original_text: String,
        source_lang: String,
        target_lang: String,
        should_speak: bool,
        timestamp: DateTime<Utc>,
    },

    /// A member started producing media; recipients may now consume it
    NewProducer {
        room_id: RoomCode,
        peer_id: PeerId,
        producer_id: ProducerId,
        kind: MediaKind,
    },

    /// Tells the sender which tier translated its last utterance
    TranslationResult {
        room_id: RoomCode,
        original_text: String,
        text: String,
        source_lang: String,
        target_lang: String,
        tier: TranslationTier,
        timestamp: DateTime<Utc>,
    },

    JoinError {
        room_id: Option<RoomCode>,
        reason: String,
        message: String,
    },

    TransportCreated {
        transport_id: TransportId,
        /// ICE/DTLS material from the relay, forwarded verbatim
        parameters: JsonValue,
    },

    TransportConnected {
        transport_id: TransportId,
    },

    Produced {
        transport_id: TransportId,
        producer_id: ProducerId,
    },

    Consumed {
        transport_id: TransportId,
        consumer_id: ConsumerId,
        producer_id: ProducerId,
        /// Consumer RTP parameters from the relay, forwarded verbatim
        parameters: JsonValue,
    },

    RouterRtpCapabilities {
        room_id: RoomCode,
        capabilities: JsonValue,
    },

    /// Request-scoped failure for anything that is not a join
    CommandError {
        command: String,
        reason: String,
        message: String,
    },
}

impl ServerEvent {
    /// Get the room this event belongs to, if any
    #[must_use]
    pub const fn room_id(&self) -> Option<&RoomCode> {
        match self {
            Self::JoinedRoom { room_id, .. }
            | Self::PartnerJoined { room_id, .. }
            | Self::PartnerLeft { room_id, .. }
            | Self::RoomUpdate { room_id, .. }
            | Self::ReceiveMessage { room_id, .. }
            | Self::PartnerSpeech { room_id, .. }
            | Self::NewProducer { room_id, .. }
            | Self::TranslationResult { room_id, .. }
            | Self::RouterRtpCapabilities { room_id, .. } => Some(room_id),
            Self::JoinError { room_id, .. } => room_id.as_ref(),
            Self::Connected { .. }
            | Self::TransportCreated { .. }
            | Self::TransportConnected { .. }
            | Self::Produced { .. }
            | Self::Consumed { .. }
            | Self::CommandError { .. } => None,
        }
    }

    /// Get a short description of the event type
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::JoinedRoom { .. } => "joined-room",
            Self::PartnerJoined { .. } => "partner-joined",
            Self::PartnerLeft { .. } => "partner-left",
            Self::RoomUpdate { .. } => "room-update",
            Self::ReceiveMessage { .. } => "receive-message",
            Self::PartnerSpeech { .. } => "partner-speech",
            Self::NewProducer { .. } => "new-producer",
            Self::TranslationResult { .. } => "translation-result",
            Self::JoinError { .. } => "join-error",
            Self::TransportCreated { .. } => "transport-created",
            Self::TransportConnected { .. } => "transport-connected",
            Self::Produced { .. } => "produced",
            Self::Consumed { .. } => "consumed",
            Self::RouterRtpCapabilities { .. } => "router-rtp-capabilities",
            Self::CommandError { .. } => "command-error",
        }
    }
}
