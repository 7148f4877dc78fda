//! Mock provider implementation for testing.

use super::{FinishReason, ProviderError, ProviderResponse, TextProvider};
use crate::services::prompt::PromptSegment;
use async_trait::async_trait;
use std::sync::Mutex;

/// What the mock answers with.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    Reply(String),
    /// A well-formed response without any text part.
    NoText,
    Fail(String),
}

/// Mock text provider that records every prompt it receives.
pub struct MockTextProvider {
    behavior: MockBehavior,
    prompts: Mutex<Vec<Vec<PromptSegment>>>,
}

impl MockTextProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(MockBehavior::Reply(text.to_string()))
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<Vec<PromptSegment>> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, segments: &[PromptSegment]) -> Result<ProviderResponse, ProviderError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(segments.to_vec());
        }

        match &self.behavior {
            MockBehavior::Reply(text) => Ok(ProviderResponse {
                text: Some(text.clone()),
                input_tokens: segments.len() as i32,
                output_tokens: 10,
                finish_reason: FinishReason::Complete,
            }),
            MockBehavior::NoText => Ok(ProviderResponse {
                text: None,
                input_tokens: segments.len() as i32,
                output_tokens: 0,
                finish_reason: FinishReason::ContentFilter,
            }),
            MockBehavior::Fail(message) => Err(ProviderError::ApiError(message.clone())),
        }
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        match &self.behavior {
            MockBehavior::Fail(message) => Err(ProviderError::NetworkError(message.clone())),
            _ => Ok(()),
        }
    }
}
