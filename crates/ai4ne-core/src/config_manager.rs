use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::decision::{DecisionContract, DecisionMode};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for AI4NE
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Ai4neConfig {
    /// Inventory/topology/routing service
    #[serde(default)]
    pub inventory: InventoryConfig,

    /// LLM provider used as the decision maker
    #[serde(default)]
    pub llm: LLMConfig,

    /// Decision protocol and its limits
    #[serde(default)]
    pub decision: DecisionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Inventory service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Base URL of the inventory service (e.g., "http://localhost:8000")
    #[serde(default = "default_inventory_url")]
    pub base_url: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_inventory_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            base_url: default_inventory_url(),
            timeout_secs: default_inventory_timeout_secs(),
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// LLM provider: "openai", "openai-compatible", "lmstudio", "ollama", "anthropic"
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Model identifier
    /// For OpenAI: model name (e.g., "gpt-4o")
    /// For Anthropic: model name (e.g., "claude-3-5-sonnet-20241022")
    /// For LM Studio / Ollama: local model name (e.g., "qwen2.5:14b")
    #[serde(default)]
    pub model: Option<String>,

    /// Base URL override (required for "openai-compatible")
    #[serde(default)]
    pub base_url: Option<String>,

    /// API key (falls back to OPENAI_API_KEY / ANTHROPIC_API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Temperature for generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate per model turn
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum retries for failed requests
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Ask the provider for schema-constrained JSON where supported
    #[serde(default = "default_true")]
    pub structured_output: bool,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: None,
            base_url: None,
            api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout_secs(),
            max_retries: default_max_retries(),
            structured_output: true,
        }
    }
}

/// Decision protocol configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionConfig {
    /// "direct" or "agentic"
    #[serde(default)]
    pub mode: DecisionMode,

    /// "path" or "devices"
    #[serde(default)]
    pub contract: DecisionContract,

    /// Maximum tool rounds before an agentic session is abandoned
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,

    /// Overall time budget for one decision in seconds
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,

    /// Reject decisions that reference identifiers missing from the snapshots
    #[serde(default = "default_true")]
    pub validate_references: bool,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            mode: DecisionMode::default(),
            contract: DecisionContract::default(),
            max_tool_rounds: default_max_tool_rounds(),
            max_duration_secs: default_max_duration_secs(),
            validate_references: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "json", "compact"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_inventory_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_inventory_timeout_secs() -> u64 {
    30
}
fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_tokens() -> usize {
    4096
}
fn default_llm_timeout_secs() -> u64 {
    120
}
fn default_max_retries() -> u32 {
    3
}
fn default_max_tool_rounds() -> usize {
    8
}
fn default_max_duration_secs() -> u64 {
    300
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}
fn default_true() -> bool {
    true
}

pub const SUPPORTED_LLM_PROVIDERS: &[&str] =
    &["openai", "openai-compatible", "lmstudio", "ollama", "anthropic"];

/// Configuration manager with file discovery and environment overrides
pub struct ConfigManager {
    config: Ai4neConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (.ai4ne.toml)
    /// 3. Sensible defaults
    pub fn load() -> Result<Self, ConfigError> {
        info!("Loading AI4NE configuration...");

        Self::load_dotenv();

        let (config, config_path) = Self::load_config_file()?;
        Self::finish(config, config_path)
    }

    /// Load from an explicit file, still applying environment overrides
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        Self::load_dotenv();

        let config = Self::read_toml_file(path)?;
        Self::finish(config, Some(path.to_path_buf()))
    }

    fn finish(config: Ai4neConfig, config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = Self::apply_env_overrides(config)?;
        Self::validate_config(&config)?;

        info!("Configuration loaded");
        match config_path {
            Some(ref path) => info!("   Config file: {}", path.display()),
            None => info!("   Config file: NONE (using defaults)"),
        }
        info!("   Inventory: {}", config.inventory.base_url);
        info!(
            "   LLM: {} ({})",
            config.llm.provider,
            config.llm.model.as_deref().unwrap_or("provider default")
        );
        info!(
            "   Decision: mode={}, contract={}, max_tool_rounds={}",
            config.decision.mode, config.decision.contract, config.decision.max_tool_rounds
        );

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Load .env file if it exists
    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            } else {
                info!("Loaded .env file from current directory");
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".ai4ne.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .ai4ne.env: {}", e);
                } else {
                    info!("Loaded .ai4ne.env from home directory");
                }
            }
        }
    }

    /// Find and load config file
    /// Search order:
    /// 1. ./.ai4ne.toml (current directory)
    /// 2. ~/.ai4ne/config.toml (user config)
    /// 3. Use defaults
    fn load_config_file() -> Result<(Ai4neConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".ai4ne.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".ai4ne").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        info!("No config file found, using defaults");
        Ok((Ai4neConfig::default(), None))
    }

    /// Read TOML config file
    pub fn read_toml_file(path: &Path) -> Result<Ai4neConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(mut config: Ai4neConfig) -> Result<Ai4neConfig, ConfigError> {
        // Inventory
        if let Ok(url) = std::env::var("AI4NE_INVENTORY_URL") {
            config.inventory.base_url = url;
        }
        if let Ok(timeout) = std::env::var("AI4NE_INVENTORY_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                config.inventory.timeout_secs = secs;
            }
        }

        // LLM
        if let Ok(provider) = std::env::var("AI4NE_LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(model) = std::env::var("AI4NE_MODEL") {
            config.llm.model = Some(model);
        }
        if let Ok(url) = std::env::var("AI4NE_LLM_BASE_URL") {
            config.llm.base_url = Some(url);
        }
        if config.llm.api_key.is_none() {
            let key_var = if config.llm.provider == "anthropic" {
                "ANTHROPIC_API_KEY"
            } else {
                "OPENAI_API_KEY"
            };
            if let Ok(key) = std::env::var(key_var) {
                config.llm.api_key = Some(key);
            }
        }
        if let Ok(temp) = std::env::var("AI4NE_TEMPERATURE") {
            if let Ok(t) = temp.parse() {
                config.llm.temperature = t;
            }
        }

        // Decision
        if let Ok(mode) = std::env::var("AI4NE_DECISION_MODE") {
            config.decision.mode = mode.parse().map_err(ConfigError::ValidationError)?;
        }
        if let Ok(contract) = std::env::var("AI4NE_DECISION_CONTRACT") {
            config.decision.contract = contract.parse().map_err(ConfigError::ValidationError)?;
        }
        if let Ok(rounds) = std::env::var("AI4NE_MAX_TOOL_ROUNDS") {
            if let Ok(n) = rounds.parse() {
                config.decision.max_tool_rounds = n;
            }
        }

        // Logging
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate_config(config: &Ai4neConfig) -> Result<(), ConfigError> {
        url::Url::parse(&config.inventory.base_url).map_err(|e| {
            ConfigError::ValidationError(format!(
                "Invalid inventory base_url '{}': {}",
                config.inventory.base_url, e
            ))
        })?;

        if !SUPPORTED_LLM_PROVIDERS.contains(&config.llm.provider.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid LLM provider: {}. Must be one of: {}",
                config.llm.provider,
                SUPPORTED_LLM_PROVIDERS.join(", ")
            )));
        }

        if let Some(ref base_url) = config.llm.base_url {
            url::Url::parse(base_url).map_err(|e| {
                ConfigError::ValidationError(format!("Invalid LLM base_url '{}': {}", base_url, e))
            })?;
        }

        if !(0.0..=2.0).contains(&config.llm.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid temperature: {}. Must be between 0.0 and 2.0",
                config.llm.temperature
            )));
        }

        if config.inventory.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "inventory.timeout_secs must be at least 1".to_string(),
            ));
        }

        if config.llm.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "llm.timeout_secs must be at least 1".to_string(),
            ));
        }

        if config.decision.max_tool_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "decision.max_tool_rounds must be at least 1".to_string(),
            ));
        }

        if config.decision.max_duration_secs == 0 {
            return Err(ConfigError::ValidationError(
                "decision.max_duration_secs must be at least 1".to_string(),
            ));
        }

        // RUST_LOG may carry a full directive ("ai4ne_agent=debug,info"); only plain levels are checked
        let level = config.logging.level.as_str();
        if !level.contains('=') && !level.contains(',') {
            match level {
                "trace" | "debug" | "info" | "warn" | "error" => {}
                other => {
                    return Err(ConfigError::ValidationError(format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        other
                    )))
                }
            }
        }

        match config.logging.format.as_str() {
            "pretty" | "json" | "compact" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}. Must be one of: pretty, json, compact",
                    other
                )))
            }
        }

        Ok(())
    }

    /// Build a manager around an already assembled configuration
    pub fn from_config(config: Ai4neConfig) -> Result<Self, ConfigError> {
        Self::validate_config(&config)?;
        Ok(Self {
            config,
            config_path: None,
        })
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &Ai4neConfig {
        &self.config
    }

    /// Get the path to the config file that was loaded, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Create a default config file
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let config = Ai4neConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(())
    }
}
