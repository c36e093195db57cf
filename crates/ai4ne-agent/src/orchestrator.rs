// ABOUTME: Decision orchestrator driving one LLM session to a terminal answer
// ABOUTME: Explicit state machine Init -> AwaitingModel -> ToolRound* -> Terminal

use ai4ne_ai::{GenerationConfig, LLMProvider, LLMResponse, Message, ToolCall, ToolDefinition};
use ai4ne_core::{Ai4neConfig, DecisionError, Result};
use ai4ne_tools::{RoutingToolSchemas, ToolSession};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::conversation::ConversationState;

/// Configuration for one orchestrator session
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum number of tool rounds before the session is abandoned
    pub max_tool_rounds: usize,
    /// Temperature for every model turn
    pub temperature: f32,
    /// Maximum tokens for each model response
    pub max_tokens: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 8,
            temperature: 0.1,
            max_tokens: 4096,
        }
    }
}

impl OrchestratorConfig {
    pub fn from_config(config: &Ai4neConfig) -> Self {
        Self {
            max_tool_rounds: config.decision.max_tool_rounds,
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        }
    }

    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

/// Where a session currently stands
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Init,
    AwaitingModel,
    /// Calls the model asked for, executed in this order
    ToolRound(Vec<ToolCall>),
    /// Final reply content
    Terminal(String),
}

/// What a finished session hands to the coercer
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub content: String,
    pub model_rounds: usize,
    pub tool_rounds: usize,
    pub total_tokens: usize,
    pub duration_ms: u64,
}

/// Drives the conversation with the model. Holds no per-request state, so one
/// orchestrator serves any number of sequential or concurrent sessions.
pub struct DecisionOrchestrator {
    llm: Arc<dyn LLMProvider>,
    config: OrchestratorConfig,
    tool_definitions: Vec<ToolDefinition>,
}

impl DecisionOrchestrator {
    pub fn new(llm: Arc<dyn LLMProvider>, config: OrchestratorConfig) -> Self {
        Self {
            llm,
            config,
            tool_definitions: RoutingToolSchemas::definitions(),
        }
    }

    pub fn llm(&self) -> &Arc<dyn LLMProvider> {
        &self.llm
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run a session to completion.
    ///
    /// With `tools` set the routing tools are advertised and every requested call is
    /// executed through the session, in order, with one result message per call.
    /// Without it a reply that asks for tools is malformed.
    pub async fn run(
        &self,
        mut conversation: ConversationState,
        mut tools: Option<&mut ToolSession>,
        generation: &GenerationConfig,
    ) -> Result<SessionOutcome> {
        let start_time = Instant::now();
        let agentic = tools.is_some();
        let mut model_rounds = 0;
        let mut tool_rounds = 0;
        let mut total_tokens = 0;
        let mut state = SessionState::Init;

        info!(
            agentic,
            max_tool_rounds = self.config.max_tool_rounds,
            provider = self.llm.provider_name(),
            model = self.llm.model_name(),
            "Starting decision session"
        );

        loop {
            state = match state {
                SessionState::Init => {
                    debug!(messages = conversation.len(), "Conversation initialised");
                    SessionState::AwaitingModel
                }

                SessionState::AwaitingModel => {
                    let advertised = agentic.then_some(self.tool_definitions.as_slice());
                    let response = self
                        .call_model(conversation.messages(), advertised, generation, model_rounds + 1)
                        .await?;
                    model_rounds += 1;
                    total_tokens += response.total_tokens.unwrap_or(0);

                    debug!(
                        round = model_rounds,
                        finish_reason = ?response.finish_reason,
                        "Model reply: {}",
                        response.content
                    );

                    self.next_state(&mut conversation, response, agentic, tool_rounds)?
                }

                SessionState::ToolRound(calls) => {
                    let session = tools.as_deref_mut().ok_or_else(|| {
                        DecisionError::MalformedModelOutput(
                            "tool round reached without a tool session".to_string(),
                        )
                    })?;
                    tool_rounds += 1;

                    for call in &calls {
                        let outcome = session.execute(call).await;
                        if outcome.is_success() {
                            conversation.push_tool_result(call.id.clone(), outcome.content);
                        } else {
                            conversation.push_tool_error(call.id.clone(), outcome.content);
                        }
                    }

                    info!(
                        round = tool_rounds,
                        tools = calls.len(),
                        "Tool round completed"
                    );
                    SessionState::AwaitingModel
                }

                SessionState::Terminal(content) => {
                    let duration_ms = start_time.elapsed().as_millis() as u64;
                    info!(
                        model_rounds,
                        tool_rounds,
                        total_tokens,
                        duration_ms,
                        "Decision session reached a terminal answer"
                    );
                    return Ok(SessionOutcome {
                        content,
                        model_rounds,
                        tool_rounds,
                        total_tokens,
                        duration_ms,
                    });
                }
            };
        }
    }

    async fn call_model(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        generation: &GenerationConfig,
        round: usize,
    ) -> Result<LLMResponse> {
        self.llm
            .generate_chat_with_tools(messages, tools, generation)
            .await
            .map_err(|e| {
                warn!(round, error = %e, "LLM generation failed");
                DecisionError::ModelUnavailable(format!(
                    "{} generation failed: {}",
                    self.llm.provider_name(),
                    e
                ))
            })
    }

    fn next_state(
        &self,
        conversation: &mut ConversationState,
        response: LLMResponse,
        agentic: bool,
        tool_rounds: usize,
    ) -> Result<SessionState> {
        if response.has_tool_calls() {
            let calls = response.tool_calls.unwrap_or_default();

            if !agentic {
                warn!(calls = calls.len(), "Model requested tools that were never advertised");
                return Err(DecisionError::MalformedModelOutput(
                    "model requested tool calls but no tools were advertised".to_string(),
                ));
            }

            if tool_rounds >= self.config.max_tool_rounds {
                warn!(
                    max_tool_rounds = self.config.max_tool_rounds,
                    "Tool round limit reached"
                );
                return Err(DecisionError::DecisionTimeout(format!(
                    "model still requested tools after {} tool rounds",
                    self.config.max_tool_rounds
                )));
            }

            info!(
                round = tool_rounds + 1,
                tools = ?calls.iter().map(|c| c.function.name.as_str()).collect::<Vec<_>>(),
                "Model requested tool calls"
            );
            conversation.push_tool_request(response.content, calls.clone());
            return Ok(SessionState::ToolRound(calls));
        }

        if response.content.trim().is_empty() {
            warn!("Model returned an empty terminal reply");
            return Err(DecisionError::MalformedModelOutput(
                "model returned an empty reply".to_string(),
            ));
        }

        conversation.push_assistant(response.content.clone());
        Ok(SessionState::Terminal(response.content))
    }
}
