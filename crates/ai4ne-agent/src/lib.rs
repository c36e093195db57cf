// ABOUTME: Decision orchestration for AI4NE routing requests
// ABOUTME: Prompt building, the tool-calling state machine, response coercion and reference validation

pub mod coercer;
pub mod conversation;
pub mod orchestrator;
pub mod prompts;
pub mod service;
pub mod strategy;
pub mod validation;

pub use coercer::ResponseCoercer;
pub use conversation::ConversationState;
pub use orchestrator::{DecisionOrchestrator, OrchestratorConfig, SessionOutcome, SessionState};
pub use prompts::{PromptBuilder, PromptError, PromptTemplate, RenderedPrompt};
pub use service::{DecisionOutcome, DecisionReport, DecisionService};
pub use strategy::{AgenticStrategy, DecisionStrategy, DirectStrategy, StrategyOutcome};
pub use validation::ReferenceValidator;
