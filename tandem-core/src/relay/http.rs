//! HTTP client for the SFU sidecar
//!
//! The sidecar exposes one route per relay operation and answers plain JSON.
//! Deletes are idempotent on the wire: a 404 on close means the handle is
//! already gone, which is success here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use super::{ConsumerCreated, MediaRelay, RelayError, TransportCreated};
use crate::config::RelayConfig;
use crate::models::{ConsumerId, MediaKind, ProducerId, RouterId, TransportId};

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TransportResponse {
    id: String,
    parameters: JsonValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConsumerResponse {
    id: String,
    producer_id: String,
    parameters: JsonValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanConsumeResponse {
    can_consume: bool,
}

pub struct HttpRelay {
    base_url: String,
    client: Client,
    health_interval: Duration,
    health_failure_threshold: u32,
}

impl HttpRelay {
    pub fn new(config: &RelayConfig) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            health_interval: Duration::from_secs(config.health_interval_secs),
            health_failure_threshold: config.health_failure_threshold,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        body: &JsonValue,
    ) -> Result<T, RelayError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RelayError::Rejected { operation, message });
        }
        Ok(response.json::<T>().await?)
    }

    async fn post_unit(
        &self,
        operation: &'static str,
        path: &str,
        body: &JsonValue,
    ) -> Result<(), RelayError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RelayError::Rejected { operation, message });
        }
        Ok(())
    }

    async fn delete(&self, operation: &'static str, path: &str) -> Result<(), RelayError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.delete(&url).send().await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        Err(RelayError::Rejected { operation, message })
    }
}

#[async_trait]
impl MediaRelay for HttpRelay {
    async fn create_router(&self) -> Result<RouterId, RelayError> {
        let resp: CreatedResponse = self
            .post("create_router", "/routers", &json!({}))
            .await?;
        Ok(RouterId::from_string(resp.id))
    }

    async fn router_rtp_capabilities(&self, router: &RouterId) -> Result<JsonValue, RelayError> {
        let url = format!("{}/routers/{}/rtp-capabilities", self.base_url, router);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RelayError::Rejected {
                operation: "router_rtp_capabilities",
                message,
            });
        }
        Ok(response.json::<JsonValue>().await?)
    }

    async fn create_transport(&self, router: &RouterId) -> Result<TransportCreated, RelayError> {
        let resp: TransportResponse = self
            .post(
                "create_transport",
                &format!("/routers/{router}/transports"),
                &json!({}),
            )
            .await?;
        Ok(TransportCreated {
            id: TransportId::from_string(resp.id),
            parameters: resp.parameters,
        })
    }

    async fn connect_transport(
        &self,
        transport: &TransportId,
        dtls_parameters: &JsonValue,
    ) -> Result<(), RelayError> {
        self.post_unit(
            "connect_transport",
            &format!("/transports/{transport}/connect"),
            &json!({ "dtlsParameters": dtls_parameters }),
        )
        .await
    }

    async fn produce(
        &self,
        transport: &TransportId,
        kind: MediaKind,
        rtp_parameters: &JsonValue,
    ) -> Result<ProducerId, RelayError> {
        let resp: CreatedResponse = self
            .post(
                "produce",
                &format!("/transports/{transport}/producers"),
                &json!({ "kind": kind, "rtpParameters": rtp_parameters }),
            )
            .await?;
        Ok(ProducerId::from_string(resp.id))
    }

    async fn can_consume(
        &self,
        router: &RouterId,
        producer: &ProducerId,
        rtp_capabilities: &JsonValue,
    ) -> Result<bool, RelayError> {
        let resp: CanConsumeResponse = self
            .post(
                "can_consume",
                &format!("/routers/{router}/can-consume"),
                &json!({ "producerId": producer, "rtpCapabilities": rtp_capabilities }),
            )
            .await?;
        Ok(resp.can_consume)
    }

    async fn consume(
        &self,
        transport: &TransportId,
        producer: &ProducerId,
        rtp_capabilities: &JsonValue,
    ) -> Result<ConsumerCreated, RelayError> {
        let resp: ConsumerResponse = self
            .post(
                "consume",
                &format!("/transports/{transport}/consumers"),
                &json!({ "producerId": producer, "rtpCapabilities": rtp_capabilities }),
            )
            .await?;
        Ok(ConsumerCreated {
            id: ConsumerId::from_string(resp.id),
            producer_id: ProducerId::from_string(resp.producer_id),
            parameters: resp.parameters,
        })
    }

    async fn close_transport(&self, transport: &TransportId) -> Result<(), RelayError> {
        self.delete("close_transport", &format!("/transports/{transport}"))
            .await
    }

    async fn close_producer(&self, producer: &ProducerId) -> Result<(), RelayError> {
        self.delete("close_producer", &format!("/producers/{producer}"))
            .await
    }

    async fn close_consumer(&self, consumer: &ConsumerId) -> Result<(), RelayError> {
        self.delete("close_consumer", &format!("/consumers/{consumer}"))
            .await
    }

    async fn close_router(&self, router: &RouterId) -> Result<(), RelayError> {
        self.delete("close_router", &format!("/routers/{router}"))
            .await
    }

    async fn died(&self) {
        let url = format!("{}/health", self.base_url);
        let mut failures: u32 = 0;
        loop {
            tokio::time::sleep(self.health_interval).await;
            match self.client.get(&url).send().await {
                Ok(response) if response.status().is_success() => failures = 0,
                _ => {
                    failures += 1;
                    if failures >= self.health_failure_threshold {
                        tracing::error!(
                            failures,
                            url = %url,
                            "relay health checks exhausted, reporting worker death"
                        );
                        return;
                    }
                    tracing::warn!(failures, url = %url, "relay health check failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> RelayConfig {
        RelayConfig {
            base_url,
            timeout_secs: 2,
            health_interval_secs: 1,
            health_failure_threshold: 3,
        }
    }

    #[tokio::test]
    async fn test_create_transport_returns_verbatim_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/routers/router1/transports"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "t1",
                "parameters": {"iceParameters": {"usernameFragment": "abc"}}
            })))
            .mount(&server)
            .await;

        let relay = HttpRelay::new(&config(server.uri())).unwrap();
        let created = relay
            .create_transport(&RouterId::from_string("router1".to_string()))
            .await
            .unwrap();

        assert_eq!(created.id.as_str(), "t1");
        assert_eq!(
            created.parameters["iceParameters"]["usernameFragment"],
            "abc"
        );
    }

    #[tokio::test]
    async fn test_connect_rejection_is_not_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transports/t1/connect"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad dtls role"))
            .mount(&server)
            .await;

        let relay = HttpRelay::new(&config(server.uri())).unwrap();
        let err = relay
            .connect_transport(
                &TransportId::from_string("t1".to_string()),
                &serde_json::json!({"role": "server"}),
            )
            .await
            .unwrap_err();

        match err {
            RelayError::Rejected { operation, message } => {
                assert_eq!(operation, "connect_transport");
                assert_eq!(message, "bad dtls role");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_produce_sends_kind_and_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transports/t1/producers"))
            .and(body_partial_json(serde_json::json!({"kind": "audio"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "prod1"})),
            )
            .mount(&server)
            .await;

        let relay = HttpRelay::new(&config(server.uri())).unwrap();
        let producer = relay
            .produce(
                &TransportId::from_string("t1".to_string()),
                MediaKind::Audio,
                &serde_json::json!({"codecs": []}),
            )
            .await
            .unwrap();
        assert_eq!(producer.as_str(), "prod1");
    }

    #[tokio::test]
    async fn test_close_treats_missing_handle_as_success() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/producers/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let relay = HttpRelay::new(&config(server.uri())).unwrap();
        relay
            .close_producer(&ProducerId::from_string("gone".to_string()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_can_consume_false() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/routers/router1/can-consume"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"canConsume": false})),
            )
            .mount(&server)
            .await;

        let relay = HttpRelay::new(&config(server.uri())).unwrap();
        let ok = relay
            .can_consume(
                &RouterId::from_string("router1".to_string()),
                &ProducerId::from_string("prod1".to_string()),
                &serde_json::json!({"codecs": []}),
            )
            .await
            .unwrap();
        assert!(!ok);
    }
}
