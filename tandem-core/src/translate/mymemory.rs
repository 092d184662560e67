//! MyMemory-style free API client (tertiary tier)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::provider::{ProviderError, TranslationProvider};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetResponse {
    response_status: i64,
    response_data: ResponseData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseData {
    translated_text: String,
}

pub struct MyMemoryProvider {
    base_url: String,
    client: Client,
}

impl MyMemoryProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl TranslationProvider for MyMemoryProvider {
    fn name(&self) -> &'static str {
        "mymemory"
    }

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/get", self.base_url);
        let langpair = format!("{source}|{target}");
        let response = self
            .client
            .get(&url)
            .query(&[("q", text), ("langpair", &langpair)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Api(format!("status {status}")));
        }

        let resp: GetResponse = response.json().await?;
        // MyMemory signals quota and lookup failures inside a 200 body.
        if resp.response_status != 200 {
            return Err(ProviderError::Api(format!(
                "response status {}",
                resp.response_status
            )));
        }
        Ok(resp.response_data.translated_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_translate_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .and(query_param("q", "hello"))
            .and(query_param("langpair", "en|es"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "responseStatus": 200,
                "responseData": {"translatedText": "hola"}
            })))
            .mount(&server)
            .await;

        let provider = MyMemoryProvider::new(server.uri(), Duration::from_secs(2)).unwrap();
        let text = provider.translate("hello", "en", "es").await.unwrap();
        assert_eq!(text, "hola");
    }

    #[tokio::test]
    async fn test_inner_status_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "responseStatus": 403,
                "responseData": {"translatedText": "MYMEMORY WARNING: YOU USED ALL AVAILABLE FREE TRANSLATIONS FOR TODAY"}
            })))
            .mount(&server)
            .await;

        let provider = MyMemoryProvider::new(server.uri(), Duration::from_secs(2)).unwrap();
        let err = provider.translate("hello", "en", "es").await.unwrap_err();
        assert!(matches!(err, ProviderError::Api(_)));
    }
}
