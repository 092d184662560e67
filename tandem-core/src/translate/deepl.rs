//! DeepL-style keyed API client (primary tier)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::provider::{ProviderError, TranslationProvider};

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    text: String,
}

pub struct DeepLProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl DeepLProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }
}

#[async_trait]
impl TranslationProvider for DeepLProvider {
    fn name(&self) -> &'static str {
        "deepl"
    }

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/v2/translate", self.base_url);
        let body = json!({
            "text": [text],
            "source_lang": source.to_uppercase(),
            "target_lang": target.to_uppercase(),
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Api(format!("status {status}")));
        }

        let resp: TranslateResponse = response.json().await?;
        resp.translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or_else(|| ProviderError::Malformed("empty translations array".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_translate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .and(header("Authorization", "DeepL-Auth-Key test-key"))
            .and(body_partial_json(serde_json::json!({
                "source_lang": "EN",
                "target_lang": "ES",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": [{"detected_source_language": "EN", "text": "hola"}]
            })))
            .mount(&server)
            .await;

        let provider =
            DeepLProvider::new(server.uri(), "test-key", Duration::from_secs(2)).unwrap();
        let text = provider.translate("hello", "en", "es").await.unwrap();
        assert_eq!(text, "hola");
    }

    #[tokio::test]
    async fn test_non_200_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .respond_with(ResponseTemplate::new(456))
            .mount(&server)
            .await;

        let provider =
            DeepLProvider::new(server.uri(), "test-key", Duration::from_secs(2)).unwrap();
        let err = provider.translate("hello", "en", "es").await.unwrap_err();
        assert!(matches!(err, ProviderError::Api(_)));
    }

    #[tokio::test]
    async fn test_empty_translations_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"translations": []})),
            )
            .mount(&server)
            .await;

        let provider =
            DeepLProvider::new(server.uri(), "test-key", Duration::from_secs(2)).unwrap();
        let err = provider.translate("hello", "en", "es").await.unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }
}
