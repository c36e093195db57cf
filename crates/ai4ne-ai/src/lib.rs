pub mod llm_factory;
pub mod llm_provider;
pub mod route_schemas;

// Cloud and local LLM providers
#[cfg(feature = "anthropic")]
pub mod anthropic_provider;
#[cfg(feature = "openai-compatible")]
pub mod openai_compatible_provider;

pub use llm_factory::LLMProviderFactory;
pub use llm_provider::*;
pub use route_schemas::*;
