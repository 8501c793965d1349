//! OpenAI-Compatible Completion Client
//!
//! Implementation of `CompletionClient` over any OpenAI-compatible chat
//! API. Construct it only when an API key exists; with no key the core
//! should receive no client at all and run its deterministic fallbacks.

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
    Client,
};
use async_trait::async_trait;

use metagent_core::completion::{ChatTurn, CompletionClient, Role};
use metagent_core::error::{AgentError, Result};

/// Default chat model; override through configuration
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Chat completions against OpenAI or any compatible endpoint
pub struct OpenAiCompletion {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiCompletion {
    /// Client for the hosted OpenAI API
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model: model.into(),
        }
    }

    /// Client for a compatible endpoint behind a different base URL
    /// (proxies, self-hosted gateways)
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);
        Self {
            client: Client::with_config(config),
            model: model.into(),
        }
    }

    /// Convert core turns to wire messages, with the system context as
    /// the leading message
    fn build_messages(
        system: &str,
        turns: &[ChatTurn],
    ) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(turns.len() + 1);
        messages.push(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| AgentError::Completion(e.to_string()))?
                .into(),
        );
        for turn in turns {
            let message: ChatCompletionRequestMessage = match turn.role {
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(turn.content.clone())
                    .build()
                    .map_err(|e| AgentError::Completion(e.to_string()))?
                    .into(),
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(turn.content.clone())
                    .build()
                    .map_err(|e| AgentError::Completion(e.to_string()))?
                    .into(),
            };
            messages.push(message);
        }
        Ok(messages)
    }

    /// First-choice message content, rejecting blank payloads
    fn usable_content(response: CreateChatCompletionResponse) -> Result<String> {
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                tracing::warn!("chat completion returned no usable content");
                AgentError::Completion("empty completion response".into())
            })
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletion {
    async fn complete(&self, system: &str, turns: &[ChatTurn], temperature: f32) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .temperature(temperature)
            .messages(Self::build_messages(system, turns)?)
            .build()
            .map_err(|e| AgentError::Completion(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AgentError::Completion(e.to_string()))?;

        // one attempt per call: empty content is the caller's cue to
        // fall back, same as a transport failure
        Self::usable_content(response)
    }
}
