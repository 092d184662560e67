use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, info};

use crate::hub::PeerHub;
use crate::models::{
    MediaKind, Peer, PeerId, ProducerId, Room, RoomCode, RouterId, ServerEvent, TransportId,
};
use crate::registry::SessionRegistry;
use crate::relay::{ConsumerCreated, MediaRelay, TransportCreated};
use crate::{Error, Result};

/// Per-peer SFU negotiation against the media relay. The room-level router
/// is established lazily on first demand; transports, producers and
/// consumers are owned by the peer that asked for them.
#[derive(Clone)]
pub struct TransportNegotiator {
    registry: SessionRegistry,
    hub: PeerHub,
    relay: Arc<dyn MediaRelay>,
}

impl TransportNegotiator {
    pub fn new(registry: SessionRegistry, hub: PeerHub, relay: Arc<dyn MediaRelay>) -> Self {
        Self {
            registry,
            hub,
            relay,
        }
    }

    /// Fetch the room router's RTP capability blob, establishing the router
    /// if this is the first media operation in the room.
    pub async fn router_rtp_capabilities(
        &self,
        peer_id: &PeerId,
        code: &RoomCode,
    ) -> Result<JsonValue> {
        let (_peer, room) = self.seated_room(peer_id)?;
        if &room.code != code {
            return Err(Error::NotInRoom(peer_id.clone()));
        }

        let router = self.ensure_router(&room).await?;
        Ok(self.relay.router_rtp_capabilities(&router).await?)
    }

    /// Allocate a relay transport for the peer and hand back the ICE/DTLS
    /// material verbatim.
    pub async fn create_transport(&self, peer_id: &PeerId) -> Result<TransportCreated> {
        let (peer, room) = self.seated_room(peer_id)?;
        let router = self.ensure_router(&room).await?;

        let created = self.relay.create_transport(&router).await?;
        peer.add_transport(created.id.clone());

        debug!(
            room_id = %room.code,
            peer_id = %peer.id,
            transport_id = %created.id,
            "transport created"
        );
        Ok(created)
    }

    /// Complete the DTLS handshake for a transport the peer owns. A refused
    /// handshake leaves the transport in CREATED so the client may retry.
    pub async fn connect_transport(
        &self,
        peer_id: &PeerId,
        transport_id: &TransportId,
        dtls_parameters: &JsonValue,
    ) -> Result<()> {
        let (peer, room) = self.seated_room(peer_id)?;
        if peer.transport_phase(transport_id).is_none() {
            return Err(Error::TransportNotFound(transport_id.clone()));
        }

        self.relay
            .connect_transport(transport_id, dtls_parameters)
            .await?;
        peer.mark_transport_connected(transport_id)?;

        debug!(
            room_id = %room.code,
            peer_id = %peer.id,
            transport_id = %transport_id,
            "transport connected"
        );
        Ok(())
    }

    /// Start producing media on one of the peer's transports. Every other
    /// member hears about it through `new-producer`.
    pub async fn produce(
        &self,
        peer_id: &PeerId,
        transport_id: &TransportId,
        kind: MediaKind,
        rtp_parameters: &JsonValue,
    ) -> Result<ProducerId> {
        let (peer, room) = self.seated_room(peer_id)?;
        if room.router_id().is_none() {
            return Err(Error::RouterNotReady(room.code.clone()));
        }
        if peer.transport_phase(transport_id).is_none() {
            return Err(Error::TransportNotFound(transport_id.clone()));
        }

        let producer_id = self
            .relay
            .produce(transport_id, kind, rtp_parameters)
            .await?;
        peer.add_producer(transport_id, producer_id.clone())?;
        room.register_producer(producer_id.clone(), peer.id.clone(), kind);

        info!(
            room_id = %room.code,
            peer_id = %peer.id,
            producer_id = %producer_id,
            kind = %kind.as_str(),
            "producer started"
        );

        let others: Vec<PeerId> = room
            .others(&peer.id)
            .into_iter()
            .map(|m| m.peer_id)
            .collect();
        self.hub.send_to_each(
            &others,
            &ServerEvent::NewProducer {
                room_id: room.code.clone(),
                peer_id: peer.id.clone(),
                producer_id: producer_id.clone(),
                kind,
            },
        );

        Ok(producer_id)
    }

    /// Consume a partner's producer on one of the peer's transports. The
    /// relay's capability check gates the pairing.
    pub async fn consume(
        &self,
        peer_id: &PeerId,
        transport_id: &TransportId,
        producer_id: &ProducerId,
        rtp_capabilities: &JsonValue,
    ) -> Result<ConsumerCreated> {
        let (peer, room) = self.seated_room(peer_id)?;
        let router = room
            .router_id()
            .ok_or_else(|| Error::RouterNotReady(room.code.clone()))?;
        if peer.transport_phase(transport_id).is_none() {
            return Err(Error::TransportNotFound(transport_id.clone()));
        }

        if !self
            .relay
            .can_consume(&router, producer_id, rtp_capabilities)
            .await?
        {
            return Err(Error::CannotConsume(producer_id.clone()));
        }

        let consumer = self
            .relay
            .consume(transport_id, producer_id, rtp_capabilities)
            .await?;
        peer.add_consumer(transport_id, consumer.id.clone())?;

        debug!(
            room_id = %room.code,
            peer_id = %peer.id,
            consumer_id = %consumer.id,
            producer_id = %producer_id,
            "consumer created"
        );
        Ok(consumer)
    }

    fn seated_room(&self, peer_id: &PeerId) -> Result<(Arc<Peer>, Arc<Room>)> {
        let peer = self
            .registry
            .peer(peer_id)
            .ok_or_else(|| Error::PeerNotFound(peer_id.clone()))?;
        let code = peer
            .room()
            .ok_or_else(|| Error::NotInRoom(peer_id.clone()))?;
        let room = self
            .registry
            .lookup_room(&code)
            .ok_or(Error::RoomNotFound(code))?;
        Ok((peer, room))
    }

    /// Install the room router, first writer wins. The loser of a racing
    /// double-create disposes of its spare before anyone can use it.
    async fn ensure_router(&self, room: &Room) -> Result<RouterId> {
        if let Some(router) = room.router_id() {
            return Ok(router);
        }

        let fresh = self.relay.create_router().await?;
        let installed = room.install_router(fresh.clone());
        if installed != fresh {
            if let Err(err) = self.relay.close_router(&fresh).await {
                debug!(router_id = %fresh, error = %err, "spare router close failed");
            }
        } else {
            info!(room_id = %room.code, router_id = %installed, "room router established");
        }
        Ok(installed)
    }
}
