use async_trait::async_trait;

/// Remote-provider errors. Every variant means the same thing to the
/// gateway: this tier is out, fall through to the next one.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Provider API error: {0}")]
    Api(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl From<ProviderError> for crate::Error {
    fn from(err: ProviderError) -> Self {
        Self::TranslationUnavailable(err.to_string())
    }
}

/// One remote translation tier. Implementations are stateless and
/// side-effect free; a single attempt per request, no retries.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Provider name used in logs and tier accounting
    fn name(&self) -> &'static str;

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, ProviderError>;
}
