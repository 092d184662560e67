//! LibreTranslate-style free API client (secondary tier)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::provider::{ProviderError, TranslationProvider};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: String,
}

pub struct LibreTranslateProvider {
    base_url: String,
    client: Client,
}

impl LibreTranslateProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl TranslationProvider for LibreTranslateProvider {
    fn name(&self) -> &'static str {
        "libretranslate"
    }

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/translate", self.base_url);
        let body = json!({
            "q": text,
            "source": source,
            "target": target,
            "format": "text",
        });

        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Api(format!("status {status}")));
        }

        let resp: TranslateResponse = response.json().await?;
        Ok(resp.translated_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_translate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .and(body_partial_json(serde_json::json!({
                "q": "hello",
                "source": "en",
                "target": "es",
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"translatedText": "hola"})),
            )
            .mount(&server)
            .await;

        let provider = LibreTranslateProvider::new(server.uri(), Duration::from_secs(2)).unwrap();
        let text = provider.translate("hello", "en", "es").await.unwrap();
        assert_eq!(text, "hola");
    }

    #[tokio::test]
    async fn test_malformed_body_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let provider = LibreTranslateProvider::new(server.uri(), Duration::from_secs(2)).unwrap();
        assert!(provider.translate("hello", "en", "es").await.is_err());
    }
}
