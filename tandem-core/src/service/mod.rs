pub mod lifecycle;
pub mod negotiator;
pub mod reaper;
pub mod router;

pub use lifecycle::RoomSupervisor;
pub use negotiator::TransportNegotiator;
pub use reaper::ReclaimScheduler;
pub use router::MessageRouter;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

use crate::hub::PeerHub;
use crate::models::{
    ClientCommand, Peer, PeerId, RoomCode, RoomSnapshot, ServerEvent, SessionKind,
};
use crate::registry::SessionRegistry;
use crate::relay::{self, MediaRelay};
use crate::translate::TranslationGateway;
use crate::Result;

/// Front door for signaling connections. One instance serves the whole
/// process; the transport layer registers a peer per connection, feeds it
/// raw command text and destroys it on disconnect. Replies and fan-out all
/// travel through the per-peer event queues handed out at registration.
pub struct SessionService {
    registry: SessionRegistry,
    hub: PeerHub,
    supervisor: RoomSupervisor,
    negotiator: TransportNegotiator,
    messages: MessageRouter,
    relay: Arc<dyn MediaRelay>,
}

impl SessionService {
    pub fn new(
        relay: Arc<dyn MediaRelay>,
        gateway: Arc<TranslationGateway>,
        reclaim_grace: Duration,
    ) -> Self {
        let registry = SessionRegistry::new();
        let hub = PeerHub::new();
        let reaper = ReclaimScheduler::new(reclaim_grace);
        let supervisor = RoomSupervisor::new(
            registry.clone(),
            hub.clone(),
            reaper,
            Arc::clone(&relay),
        );
        let negotiator =
            TransportNegotiator::new(registry.clone(), hub.clone(), Arc::clone(&relay));
        let messages = MessageRouter::new(registry.clone(), hub.clone(), gateway);
        Self {
            registry,
            hub,
            supervisor,
            negotiator,
            messages,
            relay,
        }
    }

    /// Register a fresh connection. The returned receiver carries every
    /// event for this peer, starting with `connected`.
    pub fn register_peer(&self, peer_id: PeerId) -> (Arc<Peer>, UnboundedReceiver<ServerEvent>) {
        let peer = self.registry.register_peer(peer_id.clone());
        let events = self.hub.attach(peer_id.clone());
        self.hub.send_to(
            &peer_id,
            ServerEvent::Connected {
                peer_id: peer_id.clone(),
            },
        );
        (peer, events)
    }

    /// Parse and run one raw command frame. Parse failures go back to the
    /// sender as `command-error`; they never tear the connection down.
    pub async fn handle_text(&self, peer_id: &PeerId, text: &str) {
        match serde_json::from_str::<ClientCommand>(text) {
            Ok(command) => self.handle_command(peer_id, command).await,
            Err(err) => {
                debug!(peer_id = %peer_id, error = %err, "unparseable command");
                self.hub.send_to(
                    peer_id,
                    ServerEvent::CommandError {
                        command: "unknown".to_string(),
                        reason: "bad-command".to_string(),
                        message: format!("could not parse command: {err}"),
                    },
                );
            }
        }
    }

    /// Run one command, reporting failures on the peer's own queue. Join
    /// and create failures use the dedicated `join-error` shape the clients
    /// key their lobby UI off.
    pub async fn handle_command(&self, peer_id: &PeerId, command: ClientCommand) {
        let kind = command.command_type();
        let room_id = command.room_id().cloned();

        if let Err(err) = self.dispatch(peer_id, command).await {
            warn!(peer_id = %peer_id, command = kind, error = %err, "command failed");
            let event = match kind {
                "create-room" | "join-room" => ServerEvent::JoinError {
                    room_id,
                    reason: err.reason().to_string(),
                    message: err.to_string(),
                },
                _ => ServerEvent::CommandError {
                    command: kind.to_string(),
                    reason: err.reason().to_string(),
                    message: err.to_string(),
                },
            };
            self.hub.send_to(peer_id, event);
        }
    }

    async fn dispatch(&self, peer_id: &PeerId, command: ClientCommand) -> Result<()> {
        match command {
            ClientCommand::CreateRoom {
                language,
                name,
                kind,
            } => {
                self.supervisor.create_room(peer_id, &name, &language, kind)?;
                Ok(())
            }
            ClientCommand::JoinRoom {
                room_id,
                language,
                name,
            } => {
                self.supervisor
                    .join_room(peer_id, &room_id, &name, &language)?;
                Ok(())
            }
            ClientCommand::LeaveRoom { room_id } => {
                self.supervisor.leave_room(peer_id, &room_id).await
            }
            ClientCommand::SendMessage { room_id, text } => {
                self.messages.relay_text(peer_id, &room_id, &text).await
            }
            ClientCommand::SpeechData {
                room_id,
                transcript,
                language,
            } => {
                self.messages
                    .relay_speech(peer_id, &room_id, &transcript, language.as_deref())
                    .await
            }
            ClientCommand::RouterRtpCapabilities { room_id } => {
                let capabilities = self
                    .negotiator
                    .router_rtp_capabilities(peer_id, &room_id)
                    .await?;
                self.hub.send_to(
                    peer_id,
                    ServerEvent::RouterRtpCapabilities {
                        room_id,
                        capabilities,
                    },
                );
                Ok(())
            }
            ClientCommand::CreateTransport => {
                let created = self.negotiator.create_transport(peer_id).await?;
                self.hub.send_to(
                    peer_id,
                    ServerEvent::TransportCreated {
                        transport_id: created.id,
                        parameters: created.parameters,
                    },
                );
                Ok(())
            }
            ClientCommand::ConnectTransport {
                transport_id,
                dtls_parameters,
            } => {
                self.negotiator
                    .connect_transport(peer_id, &transport_id, &dtls_parameters)
                    .await?;
                self.hub
                    .send_to(peer_id, ServerEvent::TransportConnected { transport_id });
                Ok(())
            }
            ClientCommand::ProduceAudio {
                transport_id,
                kind,
                rtp_parameters,
            } => {
                let producer_id = self
                    .negotiator
                    .produce(peer_id, &transport_id, kind, &rtp_parameters)
                    .await?;
                self.hub.send_to(
                    peer_id,
                    ServerEvent::Produced {
                        transport_id,
                        producer_id,
                    },
                );
                Ok(())
            }
            ClientCommand::ConsumeAudio {
                transport_id,
                producer_id,
                rtp_capabilities,
            } => {
                let consumer = self
                    .negotiator
                    .consume(peer_id, &transport_id, &producer_id, &rtp_capabilities)
                    .await?;
                self.hub.send_to(
                    peer_id,
                    ServerEvent::Consumed {
                        transport_id,
                        consumer_id: consumer.id,
                        producer_id: consumer.producer_id,
                        parameters: consumer.parameters,
                    },
                );
                Ok(())
            }
        }
    }

    /// Tear down a disconnected peer: leave its room (with the usual
    /// fan-out and reclaim scheduling) and release its relay handles.
    /// Safe to call more than once.
    pub async fn destroy_peer(&self, peer_id: &PeerId) {
        let Some(peer) = self.registry.remove_peer(peer_id) else {
            self.hub.detach(peer_id);
            return;
        };

        match peer.room().and_then(|code| self.registry.lookup_room(&code)) {
            Some(room) => self.supervisor.depart(&peer, &room).await,
            None => {
                // Never seated, or the room is already gone; the handles
                // still have to go.
                let handles = peer.take_all_media();
                if !handles.is_empty() {
                    relay::close_media(self.relay.as_ref(), &handles).await;
                }
            }
        }

        self.hub.detach(peer_id);
        debug!(peer_id = %peer_id, "peer destroyed");
    }

    /// Reserve a room over HTTP, ahead of any signaling connection. The
    /// code expires after the grace window unless someone joins.
    pub fn reserve_room(&self, kind: SessionKind) -> RoomSnapshot {
        self.supervisor.reserve_room(kind)
    }

    #[must_use]
    pub fn room_snapshot(&self, code: &RoomCode) -> Option<RoomSnapshot> {
        self.registry.lookup_room(code).map(|room| room.snapshot())
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.hub.connection_count()
    }
}
