//! Media relay (SFU) boundary
//!
//! The core never touches media bytes. It brokers opaque ICE/DTLS/RTP
//! parameter blobs between clients and the relay and tracks handle
//! ownership; everything else is the relay's problem.

pub mod http;

pub use http::HttpRelay;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::models::{ConsumerId, MediaHandles, MediaKind, ProducerId, RouterId, TransportId};

/// Errors surfaced by relay calls
#[derive(Debug, Error)]
pub enum RelayError {
    /// The relay could not be reached (connect failure or timeout);
    /// transient, the caller may retry the same operation
    #[error("Relay unreachable: {0}")]
    Unreachable(String),

    /// The relay answered and refused the operation
    #[error("Relay rejected {operation}: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },

    /// The relay worker process is gone; unrecoverable at room level
    #[error("Relay worker died")]
    WorkerDied,
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Unreachable(err.to_string())
    }
}

/// Transport allocation result: the relay-assigned id plus the ICE/DTLS
/// material the client needs, forwarded verbatim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportCreated {
    pub id: TransportId,
    pub parameters: JsonValue,
}

/// Consumer allocation result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerCreated {
    pub id: ConsumerId,
    pub producer_id: ProducerId,
    pub parameters: JsonValue,
}

/// The SFU seam. One router per room; transports, producers and consumers
/// hang off it. All parameter blobs are opaque.
#[async_trait]
pub trait MediaRelay: Send + Sync {
    async fn create_router(&self) -> Result<RouterId, RelayError>;

    async fn router_rtp_capabilities(&self, router: &RouterId) -> Result<JsonValue, RelayError>;

    async fn create_transport(&self, router: &RouterId) -> Result<TransportCreated, RelayError>;

    async fn connect_transport(
        &self,
        transport: &TransportId,
        dtls_parameters: &JsonValue,
    ) -> Result<(), RelayError>;

    async fn produce(
        &self,
        transport: &TransportId,
        kind: MediaKind,
        rtp_parameters: &JsonValue,
    ) -> Result<ProducerId, RelayError>;

    /// Capability-compatibility check; false means a consume for this
    /// pairing would be refused
    async fn can_consume(
        &self,
        router: &RouterId,
        producer: &ProducerId,
        rtp_capabilities: &JsonValue,
    ) -> Result<bool, RelayError>;

    async fn consume(
        &self,
        transport: &TransportId,
        producer: &ProducerId,
        rtp_capabilities: &JsonValue,
    ) -> Result<ConsumerCreated, RelayError>;

    /// Closes are idempotent: closing an unknown or already-closed handle
    /// succeeds quietly.
    async fn close_transport(&self, transport: &TransportId) -> Result<(), RelayError>;

    async fn close_producer(&self, producer: &ProducerId) -> Result<(), RelayError>;

    async fn close_consumer(&self, consumer: &ConsumerId) -> Result<(), RelayError>;

    async fn close_router(&self, router: &RouterId) -> Result<(), RelayError>;

    /// Resolves only when the relay worker is gone for good. The server's
    /// supervisor awaits this and shuts the process down.
    async fn died(&self);
}

/// Close every handle in the set, children before parents. Failures are
/// logged and swallowed: a handle that is already gone is not an error.
pub async fn close_media(relay: &dyn MediaRelay, handles: &MediaHandles) {
    for consumer in &handles.consumers {
        if let Err(err) = relay.close_consumer(consumer).await {
            tracing::debug!(consumer_id = %consumer, error = %err, "consumer close failed");
        }
    }
    for producer in &handles.producers {
        if let Err(err) = relay.close_producer(producer).await {
            tracing::debug!(producer_id = %producer, error = %err, "producer close failed");
        }
    }
    for transport in &handles.transports {
        if let Err(err) = relay.close_transport(transport).await {
            tracing::debug!(transport_id = %transport, error = %err, "transport close failed");
        }
    }
}
