//! Text generation providers.
//!
//! The handler only sees [`TextProvider`]; the production backend is Gemini,
//! and [`mock::MockTextProvider`] stands in for it in tests.

pub mod gemini;
pub mod mock;

use crate::services::prompt::PromptSegment;
use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Result of a provider call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    /// First text part of the first candidate, if the response had one.
    pub text: Option<String>,

    /// Input tokens consumed.
    pub input_tokens: i32,

    /// Output tokens generated.
    pub output_tokens: i32,

    pub finish_reason: FinishReason,
}

/// Reason why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Complete,
    Length,
    ContentFilter,
    Other,
}

impl FinishReason {
    pub fn from_api(reason: Option<&str>) -> Self {
        match reason {
            Some("STOP") | None => FinishReason::Complete,
            Some("MAX_TOKENS") => FinishReason::Length,
            Some("SAFETY") | Some("PROHIBITED_CONTENT") | Some("BLOCKLIST") => {
                FinishReason::ContentFilter
            }
            Some(_) => FinishReason::Other,
        }
    }
}

/// Trait for text generation backends.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Model identifier used for every call.
    fn model(&self) -> &str;

    /// Generate text from an ordered prompt.
    async fn generate(&self, segments: &[PromptSegment]) -> Result<ProviderResponse, ProviderError>;

    /// Verify the backend is reachable and credentials are accepted.
    async fn health_check(&self) -> Result<(), ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_reasons_map_from_api_strings() {
        assert_eq!(FinishReason::from_api(Some("STOP")), FinishReason::Complete);
        assert_eq!(FinishReason::from_api(None), FinishReason::Complete);
        assert_eq!(FinishReason::from_api(Some("MAX_TOKENS")), FinishReason::Length);
        assert_eq!(FinishReason::from_api(Some("SAFETY")), FinishReason::ContentFilter);
        assert_eq!(FinishReason::from_api(Some("RECITATION")), FinishReason::Other);
    }
}
