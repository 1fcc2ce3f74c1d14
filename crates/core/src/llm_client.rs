//! Language-model collaborator interface.
//!
//! The interview engine never talks to a provider directly; everything goes
//! through [`LlmClient`] so the dialogue engine and evaluator can be tested
//! against mocks and the service can switch between OpenAI-compatible
//! backends at startup.

use crate::stage::{Speaker, TranscriptEntry};
use anyhow::{Context, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;

/// A generic chat-completion client.
///
/// `history` is a bounded slice of the session transcript; `instruction` is
/// the stage-specific prompt appended as the final user message.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, instruction: &str, history: &[TranscriptEntry]) -> Result<String>;
}

/// An implementation of [`LlmClient`] for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - API key and base URL for the provider endpoint.
    /// * `model` - The chat model identifier (e.g., "gpt-4o").
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAICompatibleClient {
    async fn generate(&self, instruction: &str, history: &[TranscriptEntry]) -> Result<String> {
        let mut messages: Vec<ChatCompletionRequestMessage> =
            Vec::with_capacity(history.len() + 1);
        for entry in history {
            let message = match entry.speaker {
                Speaker::Candidate => ChatCompletionRequestUserMessageArgs::default()
                    .content(entry.text.clone())
                    .build()?
                    .into(),
                Speaker::Interviewer => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(entry.text.clone())
                    .build()?
                    .into(),
            };
            messages.push(message);
        }
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(instruction.to_string())
                .build()?
                .into(),
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(0.5)
            .messages(messages)
            .build()?;

        let response = self.client.chat().create(request).await?;
        let content = response
            .choices
            .first()
            .context("No response choice from LLM")?
            .message
            .content
            .clone()
            .context("No content in LLM response")?;
        Ok(content)
    }
}
