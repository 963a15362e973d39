//! Response generation for a finished user utterance.

use anyhow::{Context, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;

/// Generates the assistant's spoken reply to a user transcript.
///
/// Callers treat `think` as fire-and-forget: a fault is logged by the caller
/// and never tears anything down.
#[async_trait]
pub trait Thinker: Send + Sync {
    async fn think(&self, transcript: &str) -> Result<String>;
}

/// A [`Thinker`] backed by any OpenAI-compatible chat completion endpoint.
pub struct LlmThinker {
    client: Client<OpenAIConfig>,
    model: String,
    system_prompt: String,
}

impl LlmThinker {
    pub fn new(config: OpenAIConfig, model: String, system_prompt: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
            system_prompt,
        }
    }
}

#[async_trait]
impl Thinker for LlmThinker {
    async fn think(&self, transcript: &str) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(self.system_prompt.as_str())
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(transcript)
                    .build()?
                    .into(),
            ])
            .build()?;

        let response = self.client.chat().create(request).await?;

        let reply = response
            .choices
            .first()
            .context("No response choice from LLM")?
            .message
            .content
            .as_ref()
            .context("No content in LLM response")?;

        Ok(reply.clone())
    }
}
