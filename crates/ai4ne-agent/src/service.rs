// ABOUTME: Decision service running fetch -> prompt -> orchestrate -> coerce -> validate
// ABOUTME: One request per call, under a uuid-tagged span and an overall time budget

use ai4ne_ai::{LLMProvider, LLMProviderFactory};
use ai4ne_core::{
    Ai4neConfig, ContextFetcher, DecisionConfig, DecisionContract, DecisionError, DecisionMode,
    DecisionRequest, DeviceSnapshot, HttpInventoryClient, InventoryService, Result,
    RouteDecision, TopologyGraph,
};
use ai4ne_tools::{ToolBridge, ToolRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::coercer::ResponseCoercer;
use crate::orchestrator::{DecisionOrchestrator, OrchestratorConfig};
use crate::strategy::{AgenticStrategy, DecisionStrategy, DirectStrategy, StrategyOutcome};
use crate::validation::ReferenceValidator;

/// Summary of how a decision was reached. The transcript itself is not kept.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionReport {
    pub request_id: Uuid,
    pub mode: DecisionMode,
    pub contract: DecisionContract,
    pub model_rounds: usize,
    pub tool_rounds: usize,
    pub tool_calls: Vec<ToolRecord>,
    pub total_tokens: usize,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionOutcome {
    pub decision: RouteDecision,
    pub report: DecisionReport,
}

pub struct DecisionService {
    fetcher: Arc<ContextFetcher>,
    direct: DirectStrategy,
    agentic: AgenticStrategy,
    settings: DecisionConfig,
}

impl DecisionService {
    /// Wire the service from explicit collaborators
    pub fn new(
        inventory: Arc<dyn InventoryService>,
        llm: Arc<dyn LLMProvider>,
        config: &Ai4neConfig,
    ) -> Self {
        let fetcher = Arc::new(ContextFetcher::new(inventory.clone()));
        let orchestrator = Arc::new(DecisionOrchestrator::new(
            llm,
            OrchestratorConfig::from_config(config),
        ));

        Self {
            direct: DirectStrategy::new(
                fetcher.clone(),
                orchestrator.clone(),
                config.llm.structured_output,
            ),
            agentic: AgenticStrategy::new(ToolBridge::new(inventory), orchestrator),
            fetcher,
            settings: config.decision.clone(),
        }
    }

    /// HTTP inventory client and the configured LLM provider
    pub fn from_config(config: &Ai4neConfig) -> anyhow::Result<Self> {
        let inventory = Arc::new(HttpInventoryClient::new(&config.inventory)?);
        let llm = LLMProviderFactory::create_from_config(&config.llm)?;
        Ok(Self::new(inventory, llm, config))
    }

    pub fn settings(&self) -> &DecisionConfig {
        &self.settings
    }

    pub fn strategy(&self, mode: DecisionMode) -> &dyn DecisionStrategy {
        match mode {
            DecisionMode::Direct => &self.direct,
            DecisionMode::Agentic => &self.agentic,
        }
    }

    /// Decide with the configured mode and contract
    pub async fn decide(&self, request: &DecisionRequest) -> Result<DecisionOutcome> {
        self.decide_with(request, self.settings.mode, self.settings.contract)
            .await
    }

    pub async fn decide_with(
        &self,
        request: &DecisionRequest,
        mode: DecisionMode,
        contract: DecisionContract,
    ) -> Result<DecisionOutcome> {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "decision",
            request_id = %request_id,
            mode = %mode,
            contract = %contract
        );

        self.execute(request_id, request, mode, contract)
            .instrument(span)
            .await
    }

    async fn execute(
        &self,
        request_id: Uuid,
        request: &DecisionRequest,
        mode: DecisionMode,
        contract: DecisionContract,
    ) -> Result<DecisionOutcome> {
        let started_at = Utc::now();
        let start_time = Instant::now();
        info!(request_chars = request.as_str().len(), "Decision request received");

        let budget = Duration::from_secs(self.settings.max_duration_secs);
        let result = tokio::time::timeout(budget, self.pipeline(request, mode, contract)).await;

        let (decision, outcome) = match result {
            Ok(Ok(done)) => done,
            Ok(Err(e)) => {
                warn!(kind = e.kind(), error = %e, "Decision failed");
                return Err(e);
            }
            Err(_) => {
                warn!(budget_secs = budget.as_secs(), "Decision exceeded its time budget");
                return Err(DecisionError::DecisionTimeout(format!(
                    "no decision within {}s",
                    budget.as_secs()
                )));
            }
        };

        let report = DecisionReport {
            request_id,
            mode,
            contract,
            model_rounds: outcome.session.model_rounds,
            tool_rounds: outcome.session.tool_rounds,
            tool_calls: outcome.tool_records,
            total_tokens: outcome.session.total_tokens,
            started_at,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            identifiers = decision.identifiers().len(),
            model_rounds = report.model_rounds,
            tool_calls = report.tool_calls.len(),
            duration_ms = report.duration_ms,
            "Decision completed"
        );

        Ok(DecisionOutcome { decision, report })
    }

    async fn pipeline(
        &self,
        request: &DecisionRequest,
        mode: DecisionMode,
        contract: DecisionContract,
    ) -> Result<(RouteDecision, StrategyOutcome)> {
        let outcome = self.strategy(mode).run(request, contract).await?;
        let decision = ResponseCoercer::coerce(&outcome.session.content, contract)?;

        if self.settings.validate_references {
            self.validate(&decision, outcome.devices.as_ref(), outcome.topology.as_ref())
                .await?;
        }

        Ok((decision, outcome))
    }

    /// Validate against the snapshots the model saw. A session that never fetched
    /// the relevant snapshot is checked against a fresh one.
    async fn validate(
        &self,
        decision: &RouteDecision,
        devices: Option<&DeviceSnapshot>,
        topology: Option<&TopologyGraph>,
    ) -> Result<()> {
        match decision {
            RouteDecision::Path(_) if topology.is_none() => {
                info!("Fetching topology to validate the selected path");
                let fresh = self.fetcher.fetch_topology().await?;
                ReferenceValidator::validate(decision, devices, Some(&fresh))
            }
            RouteDecision::Devices(_) if devices.is_none() => {
                info!("Fetching devices to validate the selection");
                let fresh = self.fetcher.fetch_devices().await?;
                ReferenceValidator::validate(decision, Some(&fresh), topology)
            }
            _ => ReferenceValidator::validate(decision, devices, topology),
        }
    }
}
