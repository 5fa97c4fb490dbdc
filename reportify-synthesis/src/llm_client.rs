//! LLM client integration using siumai
//!
//! This module provides a unified interface for interacting with various
//! LLM providers through the siumai framework, and adapts it to the
//! `CompletionModel` oracle contract consumed by the rest of the pipeline.

use crate::types::{SynthesisError, SynthesisResult};
use reportify_core::{async_trait, CompletionModel, LlmConfig, ReportifyError, ReportifyResult};
use siumai::prelude::*;
use std::time::Instant;
use tracing::{debug, info, warn};

const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";

/// Unified LLM client that supports multiple providers
pub struct ReportifyLlmClient {
    client: Box<dyn LlmClient>,
    config: LlmConfig,
}

impl ReportifyLlmClient {
    /// Create a new LLM client
    pub async fn new(config: LlmConfig) -> SynthesisResult<Self> {
        let client = Self::build_client(&config).await?;

        info!(
            "Created LLM client for provider: {} with model: {}",
            config.provider, config.model
        );

        Ok(Self { client, config })
    }

    /// Build the appropriate siumai client based on configuration
    async fn build_client(config: &LlmConfig) -> SynthesisResult<Box<dyn LlmClient>> {
        match config.provider.as_str() {
            // DeepSeek speaks the OpenAI wire protocol
            "deepseek" => {
                let api_key = config
                    .api_key
                    .clone()
                    .or_else(|| std::env::var("DEEPSEEK_API_KEY").ok())
                    .ok_or_else(|| {
                        SynthesisError::Config("DeepSeek API key not found".to_string())
                    })?;

                let base_url = config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| DEEPSEEK_BASE_URL.to_string());

                let mut builder = LlmBuilder::new()
                    .openai()
                    .api_key(&api_key)
                    .base_url(&base_url)
                    .model(&config.model)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder.build().await.map_err(|e| {
                    SynthesisError::Llm(format!("Failed to build DeepSeek client: {}", e))
                })?;

                Ok(Box::new(client))
            }
            "openai" => {
                let api_key = config
                    .api_key
                    .clone()
                    .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                    .ok_or_else(|| {
                        SynthesisError::Config("OpenAI API key not found".to_string())
                    })?;

                let mut builder = LlmBuilder::new()
                    .openai()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                if let Some(base_url) = &config.base_url {
                    builder = builder.base_url(base_url);
                }

                let client = builder.build().await.map_err(|e| {
                    SynthesisError::Llm(format!("Failed to build OpenAI client: {}", e))
                })?;

                Ok(Box::new(client))
            }
            "anthropic" => {
                let api_key = config
                    .api_key
                    .clone()
                    .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
                    .ok_or_else(|| {
                        SynthesisError::Config("Anthropic API key not found".to_string())
                    })?;

                let mut builder = LlmBuilder::new()
                    .anthropic()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder.build().await.map_err(|e| {
                    SynthesisError::Llm(format!("Failed to build Anthropic client: {}", e))
                })?;

                Ok(Box::new(client))
            }
            "ollama" => {
                let base_url = config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434".to_string());

                let mut builder = LlmBuilder::new()
                    .ollama()
                    .model(&config.model)
                    .base_url(&base_url)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder.build().await.map_err(|e| {
                    SynthesisError::Llm(format!("Failed to build Ollama client: {}", e))
                })?;

                Ok(Box::new(client))
            }
            provider => Err(SynthesisError::Config(format!(
                "Unsupported LLM provider: {}",
                provider
            ))),
        }
    }

    /// Generate a response using the LLM
    pub async fn generate(&self, messages: Vec<ChatMessage>) -> SynthesisResult<String> {
        let start_time = Instant::now();

        debug!("Generating response with {} messages", messages.len());

        let response = self
            .client
            .chat(messages)
            .await
            .map_err(|e| SynthesisError::Llm(format!("LLM generation failed: {}", e)))?;

        let generation_time = start_time.elapsed();

        if let Some(content) = response.content_text() {
            info!(
                "Generated response in {:?} ({} chars)",
                generation_time,
                content.len()
            );
            Ok(content.to_string())
        } else {
            Err(SynthesisError::Llm(
                "No text content in LLM response".to_string(),
            ))
        }
    }

    /// Get the current configuration
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Get model information
    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: self.config.provider.clone(),
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }
}

#[async_trait]
impl CompletionModel for ReportifyLlmClient {
    async fn complete(&self, prompt: &str) -> ReportifyResult<String> {
        self.generate(vec![user!(prompt)])
            .await
            .map_err(|e| ReportifyError::Llm {
                message: e.to_string(),
                provider: Some(self.config.provider.clone()),
                model: Some(self.config.model.clone()),
                context: reportify_core::ErrorContext::new("llm_client")
                    .with_operation("complete"),
            })
    }
}

/// Information about the current model
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl ModelInfo {
    pub fn summary(&self) -> String {
        format!(
            "{}/{} (temp: {:.1})",
            self.provider, self.model, self.temperature
        )
    }
}

/// Helper functions for creating common LLM configurations
pub mod configs {
    use super::*;

    /// Create DeepSeek chat configuration (the reference provider)
    pub fn deepseek_chat() -> LlmConfig {
        LlmConfig {
            provider: "deepseek".to_string(),
            model: "deepseek-chat".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.0,
            max_tokens: Some(4000),
        }
    }

    /// Create OpenAI GPT-4o-mini configuration
    pub fn openai_gpt4o_mini() -> LlmConfig {
        LlmConfig {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.0,
            max_tokens: Some(4000),
        }
    }

    /// Create Anthropic Claude Haiku configuration
    pub fn anthropic_claude_haiku() -> LlmConfig {
        LlmConfig {
            provider: "anthropic".to_string(),
            model: "claude-3-5-haiku-latest".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.0,
            max_tokens: Some(4000),
        }
    }

    /// Create Ollama configuration
    pub fn ollama_llama3(base_url: Option<String>) -> LlmConfig {
        LlmConfig {
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            base_url: base_url.or_else(|| Some("http://localhost:11434".to_string())),
            temperature: 0.0,
            max_tokens: Some(4000),
        }
    }
}

/// Helper function to create a client with automatic provider detection
pub async fn create_auto_client() -> SynthesisResult<ReportifyLlmClient> {
    // Try providers in order of preference
    let providers = vec![
        ("deepseek", "DEEPSEEK_API_KEY", configs::deepseek_chat()),
        ("openai", "OPENAI_API_KEY", configs::openai_gpt4o_mini()),
        (
            "anthropic",
            "ANTHROPIC_API_KEY",
            configs::anthropic_claude_haiku(),
        ),
    ];

    for (provider_name, env_var, config) in providers {
        if std::env::var(env_var).is_ok() {
            info!("Auto-detected {} provider", provider_name);
            match ReportifyLlmClient::new(config).await {
                Ok(client) => return Ok(client),
                Err(e) => {
                    warn!("Failed to create {} client: {}", provider_name, e);
                    continue;
                }
            }
        }
    }

    // Try Ollama as fallback (no API key required)
    info!("Trying Ollama as fallback");
    let ollama_config = configs::ollama_llama3(None);
    ReportifyLlmClient::new(ollama_config).await
}
