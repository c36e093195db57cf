// ABOUTME: Shared test doubles for decision service tests
// ABOUTME: A scripted LLM provider and an axum router standing in for the inventory service

#![allow(dead_code)]

use ai4ne_ai::{
    GenerationConfig, LLMProvider, LLMResponse, LLMResult, Message, ProviderCharacteristics,
    ToolCall, ToolDefinition,
};
use ai4ne_core::Ai4neConfig;
use async_trait::async_trait;
use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

pub const DEVICES: &str = r#"[
  {"id": "device_A", "latency_ms": 2, "energy_efficiency": 0.91, "compliant": true},
  {"id": "device_B", "latency_ms": 4, "energy_efficiency": 0.72, "compliant": true},
  {"id": "device_C", "latency_ms": 1, "energy_efficiency": 0.40, "compliant": false}
]"#;

pub const TOPOLOGY: &str = r#"{
  "nodes": [
    {"id": "N1", "start": true},
    {"id": "N2"},
    {"id": "N3"},
    {"id": "N4", "end": true}
  ],
  "edges": [
    {"source": "N1", "target": "N2"},
    {"source": "N1", "target": "N3"},
    {"source": "N2", "target": "N4"},
    {"source": "N3", "target": "N4"}
  ]
}"#;

pub const CANDIDATES: &str = r#"[["N1","N2","N4"],["N1","N3","N4"]]"#;

/// One model turn as the provider saw it
#[derive(Debug, Clone)]
pub struct SeenCall {
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
    pub structured: bool,
}

/// Replays canned replies in order
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<LLMResponse>>,
    seen: Mutex<Vec<SeenCall>>,
    delay: Option<Duration>,
    structured_output: bool,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<LLMResponse>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
            delay: None,
            structured_output: false,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_structured_output(mut self) -> Self {
        self.structured_output = true;
        self
    }

    pub fn seen(&self) -> Vec<SeenCall> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        self.generate_chat_with_tools(messages, None, config).await
    }

    async fn generate_chat_with_tools(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        self.seen.lock().push(SeenCall {
            messages: messages.to_vec(),
            tools: tools
                .unwrap_or_default()
                .iter()
                .map(|t| t.function.name.clone())
                .collect(),
            structured: config.response_format.is_some(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.replies
            .lock()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("scripted provider has no reply left"))
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }

    fn characteristics(&self) -> ProviderCharacteristics {
        ProviderCharacteristics {
            max_tokens: 128_000,
            avg_latency_ms: 0,
            supports_functions: true,
            supports_structured_output: self.structured_output,
        }
    }
}

pub fn reply(content: &str) -> LLMResponse {
    LLMResponse {
        content: content.to_string(),
        total_tokens: Some(100),
        prompt_tokens: Some(80),
        completion_tokens: Some(20),
        finish_reason: Some("stop".to_string()),
        model: "scripted-model".to_string(),
        tool_calls: None,
    }
}

pub fn tool_reply(calls: Vec<ToolCall>) -> LLMResponse {
    LLMResponse {
        finish_reason: Some("tool_calls".to_string()),
        tool_calls: Some(calls),
        ..reply("")
    }
}

/// Requests the inventory double received, in arrival order
#[derive(Clone, Default)]
pub struct Hits(Arc<Mutex<Vec<String>>>);

impl Hits {
    pub fn push(&self, hit: impl Into<String>) {
        self.0.lock().push(hit.into());
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// Serve the inventory double; `/devices` answers `devices_status`
pub async fn serve_inventory(devices_status: StatusCode) -> (String, Hits) {
    serve_inventory_with(devices_status, DEVICES).await
}

/// Same double with a custom `/devices` body
pub async fn serve_inventory_with(
    devices_status: StatusCode,
    devices_body: &'static str,
) -> (String, Hits) {
    let hits = Hits::default();
    let (devices_hits, topology_hits, route_hits) = (hits.clone(), hits.clone(), hits.clone());

    let app = Router::new()
        .route(
            "/devices",
            get(move || {
                let hits = devices_hits.clone();
                async move {
                    hits.push("devices");
                    if devices_status.is_success() {
                        (devices_status, devices_body.to_string())
                    } else {
                        (devices_status, "inventory offline".to_string())
                    }
                }
            }),
        )
        .route(
            "/network_topology",
            get(move || {
                let hits = topology_hits.clone();
                async move {
                    hits.push("topology");
                    TOPOLOGY
                }
            }),
        )
        .route(
            "/route",
            post(move |Json(body): Json<Value>| {
                let hits = route_hits.clone();
                async move {
                    hits.push(format!("route:{}", body));
                    CANDIDATES
                }
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), hits)
}

pub fn config(base_url: &str) -> Ai4neConfig {
    let mut config = Ai4neConfig::default();
    config.inventory.base_url = base_url.to_string();
    config.inventory.timeout_secs = 5;
    config
}
