//! Test helpers and fixtures for tandem-core tests
//!
//! Shared doubles for the service-layer tests, mainly an in-memory relay
//! that hands out sequential ids and counts what got closed.

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::models::{
    ConsumerId, MediaKind, PeerId, ProducerId, RouterId, ServerEvent, TransportId,
};
use crate::relay::{ConsumerCreated, MediaRelay, RelayError, TransportCreated};

/// Create a test peer ID
pub fn test_peer_id(id: &str) -> PeerId {
    PeerId::from_string(id.to_string())
}

/// Drain everything currently queued for a peer, without awaiting
pub fn drain_events(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// In-memory relay double. Behavior toggles cover the refusal paths; the
/// close counters let tests assert teardown went all the way through.
#[derive(Default)]
pub struct StubRelay {
    ids: AtomicUsize,
    pub routers_created: AtomicUsize,
    pub transports_created: AtomicUsize,
    pub producers_created: AtomicUsize,
    pub consumers_created: AtomicUsize,
    pub transports_closed: AtomicUsize,
    pub producers_closed: AtomicUsize,
    pub consumers_closed: AtomicUsize,
    pub routers_closed: AtomicUsize,
    /// When set, `connect_transport` answers with a rejection
    pub reject_connect: AtomicBool,
    /// When set, `can_consume` answers false
    pub deny_consume: AtomicBool,
}

impl StubRelay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.ids.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl MediaRelay for StubRelay {
    async fn create_router(&self) -> Result<RouterId, RelayError> {
        self.routers_created.fetch_add(1, Ordering::SeqCst);
        Ok(RouterId::from_string(self.next_id("router")))
    }

    async fn router_rtp_capabilities(&self, _router: &RouterId) -> Result<JsonValue, RelayError> {
        Ok(json!({ "codecs": [{ "mimeType": "audio/opus" }] }))
    }

    async fn create_transport(&self, _router: &RouterId) -> Result<TransportCreated, RelayError> {
        self.transports_created.fetch_add(1, Ordering::SeqCst);
        let id = TransportId::from_string(self.next_id("transport"));
        Ok(TransportCreated {
            parameters: json!({ "id": id.as_str(), "iceParameters": {}, "dtlsParameters": {} }),
            id,
        })
    }

    async fn connect_transport(
        &self,
        _transport: &TransportId,
        _dtls_parameters: &JsonValue,
    ) -> Result<(), RelayError> {
        if self.reject_connect.load(Ordering::SeqCst) {
            return Err(RelayError::Rejected {
                operation: "connect_transport",
                message: "dtls handshake refused".to_string(),
            });
        }
        Ok(())
    }

    async fn produce(
        &self,
        _transport: &TransportId,
        _kind: MediaKind,
        _rtp_parameters: &JsonValue,
    ) -> Result<ProducerId, RelayError> {
        self.producers_created.fetch_add(1, Ordering::SeqCst);
        Ok(ProducerId::from_string(self.next_id("producer")))
    }

    async fn can_consume(
        &self,
        _router: &RouterId,
        _producer: &ProducerId,
        _rtp_capabilities: &JsonValue,
    ) -> Result<bool, RelayError> {
        Ok(!self.deny_consume.load(Ordering::SeqCst))
    }

    async fn consume(
        &self,
        _transport: &TransportId,
        producer: &ProducerId,
        _rtp_capabilities: &JsonValue,
    ) -> Result<ConsumerCreated, RelayError> {
        self.consumers_created.fetch_add(1, Ordering::SeqCst);
        Ok(ConsumerCreated {
            id: ConsumerId::from_string(self.next_id("consumer")),
            producer_id: producer.clone(),
            parameters: json!({ "rtpParameters": {} }),
        })
    }

    async fn close_transport(&self, _transport: &TransportId) -> Result<(), RelayError> {
        self.transports_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close_producer(&self, _producer: &ProducerId) -> Result<(), RelayError> {
        self.producers_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close_consumer(&self, _consumer: &ConsumerId) -> Result<(), RelayError> {
        self.consumers_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close_router(&self, _router: &RouterId) -> Result<(), RelayError> {
        self.routers_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn died(&self) {
        std::future::pending().await
    }
}
