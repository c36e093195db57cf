// ABOUTME: Direct and agentic decision strategies behind one trait
// ABOUTME: Each produces the model's terminal text plus the snapshots the model was shown

use ai4ne_ai::{route_plan_response_format, GenerationConfig};
use ai4ne_core::{
    ContextFetcher, DecisionContract, DecisionMode, DecisionRequest, DeviceSnapshot, Result,
    TopologyGraph,
};
use ai4ne_tools::{ToolBridge, ToolRecord};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::conversation::ConversationState;
use crate::orchestrator::{DecisionOrchestrator, SessionOutcome};
use crate::prompts::PromptBuilder;

/// Terminal text of one session together with the reference snapshots for validation
#[derive(Debug)]
pub struct StrategyOutcome {
    pub session: SessionOutcome,
    pub devices: Option<DeviceSnapshot>,
    pub topology: Option<TopologyGraph>,
    pub tool_records: Vec<ToolRecord>,
}

#[async_trait]
pub trait DecisionStrategy: Send + Sync {
    fn mode(&self) -> DecisionMode;

    /// Fetch what is needed, build the prompt and run the session to its terminal reply
    async fn run(
        &self,
        request: &DecisionRequest,
        contract: DecisionContract,
    ) -> Result<StrategyOutcome>;
}

/// Snapshots are fetched up front and embedded; the model answers in one call
pub struct DirectStrategy {
    fetcher: Arc<ContextFetcher>,
    orchestrator: Arc<DecisionOrchestrator>,
    structured_output: bool,
}

impl DirectStrategy {
    pub fn new(
        fetcher: Arc<ContextFetcher>,
        orchestrator: Arc<DecisionOrchestrator>,
        structured_output: bool,
    ) -> Self {
        Self {
            fetcher,
            orchestrator,
            structured_output,
        }
    }

    /// Adds the route plan JSON schema when the provider can enforce it
    fn generation_config(&self, contract: DecisionContract) -> GenerationConfig {
        let mut config = self.orchestrator.config().generation_config();
        if contract == DecisionContract::Path
            && self.structured_output
            && self
                .orchestrator
                .llm()
                .characteristics()
                .supports_structured_output
        {
            config.response_format = Some(route_plan_response_format());
        }
        config
    }
}

#[async_trait]
impl DecisionStrategy for DirectStrategy {
    fn mode(&self) -> DecisionMode {
        DecisionMode::Direct
    }

    async fn run(
        &self,
        request: &DecisionRequest,
        contract: DecisionContract,
    ) -> Result<StrategyOutcome> {
        let context = self.fetcher.fetch_all().await?;
        let prompt = PromptBuilder::new(contract).direct(request, &context)?;
        debug!(chars = prompt.system.len(), "Rendered direct prompt");

        let session = self
            .orchestrator
            .run(
                ConversationState::new(prompt),
                None,
                &self.generation_config(contract),
            )
            .await?;

        Ok(StrategyOutcome {
            session,
            devices: Some(context.devices),
            topology: Some(context.topology),
            tool_records: Vec::new(),
        })
    }
}

/// The model pulls devices, topology and candidate routes through tool calls
pub struct AgenticStrategy {
    bridge: ToolBridge,
    orchestrator: Arc<DecisionOrchestrator>,
}

impl AgenticStrategy {
    pub fn new(bridge: ToolBridge, orchestrator: Arc<DecisionOrchestrator>) -> Self {
        Self {
            bridge,
            orchestrator,
        }
    }
}

#[async_trait]
impl DecisionStrategy for AgenticStrategy {
    fn mode(&self) -> DecisionMode {
        DecisionMode::Agentic
    }

    async fn run(
        &self,
        request: &DecisionRequest,
        contract: DecisionContract,
    ) -> Result<StrategyOutcome> {
        let prompt = PromptBuilder::new(contract).tool_declared(request)?;
        debug!(chars = prompt.system.len(), "Rendered tool-declared prompt");

        let mut tools = self.bridge.session();
        let generation = self.orchestrator.config().generation_config();
        let session = self
            .orchestrator
            .run(ConversationState::new(prompt), Some(&mut tools), &generation)
            .await?;

        Ok(StrategyOutcome {
            session,
            devices: tools.observed_devices().cloned(),
            topology: tools.observed_topology().cloned(),
            tool_records: tools.into_records(),
        })
    }
}
