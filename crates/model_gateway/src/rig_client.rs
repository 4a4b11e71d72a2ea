//! Rig gateway adapter.
//!
//! Flattens role/content messages into a single prompt and drives Rig's
//! Agent for the configured provider.

use async_trait::async_trait;

use taskforge_core::{
    traits::{ChatMessage, Completion, CompletionOptions, ModelGateway},
    Error, Result,
};

use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;

/// Supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigProvider {
    OpenAI,
    Anthropic,
}

/// Configuration for the Rig gateway.
#[derive(Debug, Clone)]
pub struct RigGatewayConfig {
    /// Provider to use.
    pub provider: RigProvider,
    /// Model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Default max output tokens, overridable per call.
    pub max_tokens: Option<u32>,
}

impl RigGatewayConfig {
    pub fn new(provider: RigProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: Some(0.7),
            max_tokens: None,
        }
    }

    pub fn openai(model: impl Into<String>) -> Self {
        Self::new(RigProvider::OpenAI, model)
    }

    pub fn anthropic(model: impl Into<String>) -> Self {
        Self::new(RigProvider::Anthropic, model)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Rig-based model gateway.
pub struct RigGateway {
    config: RigGatewayConfig,
}

impl RigGateway {
    pub fn new(config: RigGatewayConfig) -> Self {
        Self { config }
    }

    /// Flatten messages into a role-labelled prompt string. The first system
    /// message becomes the agent preamble instead.
    fn build_prompt(messages: &[ChatMessage]) -> (Option<String>, String) {
        let mut preamble = None;
        let mut prompt = String::new();

        for msg in messages {
            match msg.role.as_str() {
                "system" if preamble.is_none() => {
                    preamble = Some(msg.content.clone());
                }
                "user" => {
                    prompt.push_str(&msg.content);
                    prompt.push_str("\n\n");
                }
                "assistant" => {
                    prompt.push_str(&format!("Assistant: {}\n\n", msg.content));
                }
                _ => {
                    prompt.push_str(&format!("{}: {}\n\n", msg.role, msg.content));
                }
            }
        }

        (preamble, prompt.trim_end().to_string())
    }

    async fn call_openai(
        &self,
        preamble: Option<&str>,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String> {
        use rig::providers::openai;

        if std::env::var("OPENAI_API_KEY").is_err() {
            return Err(Error::gateway("OPENAI_API_KEY not set"));
        }

        let client = openai::Client::from_env();
        let mut builder = client.agent(&self.config.model);
        if let Some(preamble) = preamble {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = options.temperature.or(self.config.temperature) {
            builder = builder.temperature(temperature as f64);
        }
        if let Some(max_tokens) = options.max_tokens.or(self.config.max_tokens) {
            builder = builder.max_tokens(max_tokens as u64);
        }

        builder
            .build()
            .prompt(prompt)
            .await
            .map_err(|e| Error::gateway(format!("OpenAI error: {e}")))
    }

    async fn call_anthropic(
        &self,
        preamble: Option<&str>,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String> {
        use rig::providers::anthropic;

        if std::env::var("ANTHROPIC_API_KEY").is_err() {
            return Err(Error::gateway("ANTHROPIC_API_KEY not set"));
        }

        let client = anthropic::Client::from_env();
        let mut builder = client.agent(&self.config.model);
        if let Some(preamble) = preamble {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = options.temperature.or(self.config.temperature) {
            builder = builder.temperature(temperature as f64);
        }
        // Anthropic requires an explicit output budget.
        let max_tokens = options.max_tokens.or(self.config.max_tokens).unwrap_or(4096);
        builder = builder.max_tokens(max_tokens as u64);

        builder
            .build()
            .prompt(prompt)
            .await
            .map_err(|e| Error::gateway(format!("Anthropic error: {e}")))
    }
}

#[async_trait]
impl ModelGateway for RigGateway {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Completion> {
        let (preamble, prompt) = Self::build_prompt(messages);

        tracing::debug!(
            provider = ?self.config.provider,
            model = %self.config.model,
            prompt_len = prompt.len(),
            max_tokens = ?options.max_tokens,
            "Calling model"
        );

        let content = match self.config.provider {
            RigProvider::OpenAI => {
                self.call_openai(preamble.as_deref(), &prompt, options).await?
            }
            RigProvider::Anthropic => {
                self.call_anthropic(preamble.as_deref(), &prompt, options).await?
            }
        };

        Ok(Completion { content })
    }
}
