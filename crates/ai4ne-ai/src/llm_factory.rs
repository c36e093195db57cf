use crate::llm_provider::*;
use ai4ne_core::config_manager::LLMConfig;
use anyhow::{anyhow, Result};
use std::sync::Arc;

#[cfg(feature = "anthropic")]
use crate::anthropic_provider::{AnthropicConfig, AnthropicProvider};

#[cfg(feature = "openai-compatible")]
use crate::openai_compatible_provider::{OpenAICompatibleConfig, OpenAICompatibleProvider};

/// Factory for creating LLM providers based on configuration
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create an LLM provider from configuration
    pub fn create_from_config(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let provider_name = config.provider.to_lowercase();

        match provider_name.as_str() {
            #[cfg(feature = "openai-compatible")]
            "openai" => Self::create_openai_provider(config),
            #[cfg(feature = "openai-compatible")]
            "openai-compatible" => Self::create_openai_compatible_provider(config),
            #[cfg(feature = "openai-compatible")]
            "lmstudio" => Self::create_local_provider(
                config,
                OpenAICompatibleConfig::lm_studio("local-model".to_string()),
            ),
            #[cfg(feature = "openai-compatible")]
            "ollama" => Self::create_local_provider(
                config,
                OpenAICompatibleConfig::ollama("qwen2.5:14b".to_string()),
            ),
            #[cfg(feature = "anthropic")]
            "anthropic" => Self::create_anthropic_provider(config),
            _ => Err(anyhow!(
                "Unsupported LLM provider: {}. Available providers: {}",
                provider_name,
                Self::supported_providers().join(", ")
            )),
        }
    }

    /// Create an OpenAI provider
    #[cfg(feature = "openai-compatible")]
    fn create_openai_provider(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                anyhow!(
                    "OpenAI API key not found. Set 'api_key' in config \
                     or OPENAI_API_KEY environment variable"
                )
            })?;

        let mut openai_config = OpenAICompatibleConfig::openai(
            api_key,
            config.model.clone().unwrap_or_else(|| "gpt-4o".to_string()),
        );
        if let Some(base_url) = &config.base_url {
            openai_config.base_url = base_url.clone();
        }
        openai_config.timeout_secs = config.timeout_secs;
        openai_config.max_retries = config.max_retries;

        Ok(Arc::new(OpenAICompatibleProvider::new(openai_config)?))
    }

    /// Create a provider for a local OpenAI-compatible server (LM Studio, Ollama)
    #[cfg(feature = "openai-compatible")]
    fn create_local_provider(
        config: &LLMConfig,
        mut local: OpenAICompatibleConfig,
    ) -> Result<Arc<dyn LLMProvider>> {
        if let Some(model) = &config.model {
            local.model = model.clone();
        }
        if let Some(base_url) = &config.base_url {
            local.base_url = base_url.clone();
        }
        local.api_key = config.api_key.clone();
        local.timeout_secs = config.timeout_secs;
        local.max_retries = config.max_retries;

        Ok(Arc::new(OpenAICompatibleProvider::new(local)?))
    }

    /// Create an OpenAI-compatible provider
    #[cfg(feature = "openai-compatible")]
    fn create_openai_compatible_provider(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let base_url = config.base_url.clone().ok_or_else(|| {
            anyhow!("OpenAI-compatible base URL not found. Set 'base_url' in the [llm] config")
        })?;

        let compat_config = OpenAICompatibleConfig {
            base_url,
            model: config
                .model
                .clone()
                .ok_or_else(|| anyhow!("Model name is required for OpenAI-compatible provider"))?,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            api_key: config.api_key.clone(),
            provider_name: "openai-compatible".to_string(),
            ..Default::default()
        };

        Ok(Arc::new(OpenAICompatibleProvider::new(compat_config)?))
    }

    /// Create an Anthropic Claude provider
    #[cfg(feature = "anthropic")]
    fn create_anthropic_provider(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .ok_or_else(|| {
                anyhow!(
                    "Anthropic API key not found. Set 'api_key' in config \
                     or ANTHROPIC_API_KEY environment variable"
                )
            })?;

        let mut anthropic_config = AnthropicConfig {
            api_key,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            ..Default::default()
        };
        if let Some(model) = &config.model {
            anthropic_config.model = model.clone();
        }
        if let Some(base_url) = &config.base_url {
            anthropic_config.base_url = base_url.clone();
        }

        Ok(Arc::new(AnthropicProvider::new(anthropic_config)?))
    }

    /// Check if the provider is available
    pub async fn check_availability(provider: &Arc<dyn LLMProvider>) -> bool {
        provider.is_available().await
    }

    /// Get a list of supported providers (based on enabled features)
    pub fn supported_providers() -> Vec<&'static str> {
        #[allow(unused_mut)]
        let mut providers = Vec::new();

        #[cfg(feature = "openai-compatible")]
        providers.extend(["openai", "openai-compatible", "lmstudio", "ollama"]);

        #[cfg(feature = "anthropic")]
        providers.push("anthropic");

        providers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_providers() {
        let providers = LLMProviderFactory::supported_providers();
        assert!(providers.contains(&"ollama"));
        assert!(providers.contains(&"anthropic"));
    }

    #[test]
    fn test_local_provider_creation() {
        let config = LLMConfig {
            provider: "ollama".to_string(),
            model: Some("llama3.1:8b".to_string()),
            ..Default::default()
        };

        let provider = LLMProviderFactory::create_from_config(&config).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "llama3.1:8b");
    }

    #[test]
    fn test_openai_compatible_requires_base_url() {
        let config = LLMConfig {
            provider: "openai-compatible".to_string(),
            model: Some("m".to_string()),
            ..Default::default()
        };

        let err = LLMProviderFactory::create_from_config(&config)
            .err()
            .expect("missing base_url must fail");
        assert!(err.to_string().contains("base URL"));
    }

    #[test]
    fn test_unknown_provider() {
        let config = LLMConfig {
            provider: "carrier-pigeon".to_string(),
            ..Default::default()
        };

        let result = LLMProviderFactory::create_from_config(&config);
        assert!(result.is_err());
    }
}
