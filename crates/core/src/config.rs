//! Engine configuration.

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level engine configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Directory for task log and report artifacts.
    pub data_dir: String,
    /// Language the model must respond in.
    pub language: Language,
    pub invoker: InvokerConfig,
    pub explore: ExploreConfig,
    pub writer: WriterConfig,
    pub models: ModelAssignments,
}

/// Response language for all generated content.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Chinese,
}

impl Language {
    /// The instruction line appended to every prompt.
    pub fn instruction(&self) -> &'static str {
        match self {
            Self::English => "You MUST respond in English.",
            Self::Chinese => "You MUST respond in Chinese.",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct InvokerConfig {
    /// Attempts per robust invocation before giving up.
    pub max_retries: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExploreConfig {
    /// Iteration cap for the Act-Reflect-Critique loop.
    pub max_steps: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WriterConfig {
    /// Critique/refine rounds per section before accepting the last draft.
    pub max_refine_rounds: u32,
    /// Minimum score (out of 10) every critique criterion must reach.
    pub pass_bar: u8,
}

/// Which model serves which role. `chat` drives all orchestration decisions;
/// `bulk` is the cheaper assignment used for research-mode section
/// generation.
#[derive(Debug, Deserialize, Clone)]
pub struct ModelAssignments {
    pub chat: ModelAssignment,
    pub bulk: ModelAssignment,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelAssignment {
    pub provider: String,
    pub model: String,
    /// Default output-token budget for invocations without an explicit one.
    pub max_tokens: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".into(),
            language: Language::English,
            invoker: InvokerConfig { max_retries: 3 },
            explore: ExploreConfig { max_steps: 10 },
            writer: WriterConfig {
                max_refine_rounds: 10,
                pass_bar: 7,
            },
            models: ModelAssignments {
                chat: ModelAssignment {
                    provider: "openai".into(),
                    model: "gpt-4o".into(),
                    max_tokens: None,
                },
                bulk: ModelAssignment {
                    provider: "openai".into(),
                    model: "gpt-4o-mini".into(),
                    max_tokens: Some(4096),
                },
            },
        }
    }
}

impl EngineConfig {
    /// Load from layered config files plus `TASKFORGE__`-prefixed env vars
    /// (e.g. `TASKFORGE__MODELS__CHAT__MODEL=gpt-4o`).
    pub fn load() -> Result<Self> {
        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("TASKFORGE").separator("__"))
            .build()
            .map_err(|e| Error::config(e.to_string()))?;

        s.try_deserialize().map_err(|e| Error::config(e.to_string()))
    }

    /// Load, falling back to defaults when no config files are present.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(error = %e, "No engine config found, using defaults");
                Self::default()
            }
        }
    }
}
