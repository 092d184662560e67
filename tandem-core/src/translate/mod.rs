//! Tiered translation gateway
//!
//! Tiers are evaluated strictly in order and short-circuit on the first
//! success: identity, static phrase table, up to three remote providers,
//! then a last-resort dictionary. The gateway never fails: when every tier
//! is out, the original text comes back with tier `none`. No caching, no
//! request deduplication.

pub mod deepl;
pub mod libre;
pub mod mymemory;
mod phrasebook;
pub mod provider;

pub use deepl::DeepLProvider;
pub use libre::LibreTranslateProvider;
pub use mymemory::MyMemoryProvider;
pub use provider::{ProviderError, TranslationProvider};

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which tier produced a translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationTier {
    /// Source and target agree, or there was nothing to translate
    Identity,
    /// Static phrase table
    Phrase,
    /// First remote provider
    Primary,
    /// Second remote provider
    Secondary,
    /// Third remote provider
    Tertiary,
    /// Last-resort dictionary
    Fallback,
    /// Every tier failed; the text went out untranslated
    None,
}

impl TranslationTier {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Phrase => "phrase",
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Tertiary => "tertiary",
            Self::Fallback => "fallback",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for TranslationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const fn remote_tier(index: usize) -> TranslationTier {
    match index {
        0 => TranslationTier::Primary,
        1 => TranslationTier::Secondary,
        _ => TranslationTier::Tertiary,
    }
}

pub struct TranslationGateway {
    /// Remote tiers in priority order (primary first)
    providers: Vec<Arc<dyn TranslationProvider>>,
    /// Outer bound per remote tier; a hung provider must not block the
    /// fall-through to the dictionary
    tier_timeout: Duration,
}

impl TranslationGateway {
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn TranslationProvider>>, tier_timeout: Duration) -> Self {
        Self {
            providers,
            tier_timeout,
        }
    }

    /// Translate `text`, reporting which tier produced the result. Never
    /// errors and never returns an empty string for non-empty input.
    pub async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> (String, TranslationTier) {
        if text.trim().is_empty() || source.eq_ignore_ascii_case(target) {
            return (text.to_string(), TranslationTier::Identity);
        }

        if let Some(phrase) = phrasebook::phrase_match(text, source, target) {
            return (phrase.to_string(), TranslationTier::Phrase);
        }

        for (index, provider) in self.providers.iter().enumerate() {
            let attempt =
                tokio::time::timeout(self.tier_timeout, provider.translate(text, source, target))
                    .await;
            match attempt {
                Ok(Ok(translated)) if !translated.trim().is_empty() => {
                    let tier = remote_tier(index);
                    tracing::debug!(provider = provider.name(), %tier, "translation tier hit");
                    return (translated, tier);
                }
                Ok(Ok(_)) => {
                    tracing::warn!(provider = provider.name(), "provider returned empty text");
                }
                Ok(Err(err)) => {
                    tracing::warn!(provider = provider.name(), error = %err, "provider failed");
                }
                Err(_) => {
                    tracing::warn!(provider = provider.name(), "provider timed out");
                }
            }
        }

        if let Some(word) = phrasebook::fallback_match(text, source, target) {
            return (word.to_string(), TranslationTier::Fallback);
        }

        (text.to_string(), TranslationTier::None)
    }
}
