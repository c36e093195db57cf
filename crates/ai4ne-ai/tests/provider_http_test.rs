// ABOUTME: Drives the HTTP providers against in-process axum stand-ins for the vendor APIs
// ABOUTME: Checks the tool-calling wire shapes in both directions

use ai4ne_ai::anthropic_provider::{AnthropicConfig, AnthropicProvider};
use ai4ne_ai::openai_compatible_provider::{OpenAICompatibleConfig, OpenAICompatibleProvider};
use ai4ne_ai::{
    route_plan_response_format, GenerationConfig, LLMProvider, Message, ToolCall, ToolDefinition,
};
use axum::{http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn recording_route(path: &str, reply: Value) -> (Router, Arc<Mutex<Vec<Value>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let app = Router::new().route(
        path,
        post(move |Json(body): Json<Value>| {
            let recorder = recorder.clone();
            let reply = reply.clone();
            async move {
                recorder.lock().unwrap().push(body);
                Json(reply)
            }
        }),
    );
    (app, seen)
}

fn devices_tool() -> ToolDefinition {
    ToolDefinition::function(
        "fetchDevices",
        "Get a list of hardware devices in a network and their technical specifications",
        json!({"type": "object", "properties": {}}),
    )
}

#[tokio::test]
async fn test_openai_compatible_tool_round_trip() {
    let (app, seen) = recording_route(
        "/v1/chat/completions",
        json!({
            "id": "chatcmpl-1",
            "model": "served-model",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "fetchDevices", "arguments": "{}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 20, "completion_tokens": 4, "total_tokens": 24}
        }),
    );
    let base = serve(app).await;

    let provider = OpenAICompatibleProvider::new(OpenAICompatibleConfig {
        max_retries: 0,
        ..OpenAICompatibleConfig::custom(format!("{}/v1/", base), "m".to_string(), "test".to_string())
    })
    .unwrap();

    let messages = vec![
        Message::system("instructions"),
        Message::user("route with low latency"),
    ];
    let response = provider
        .generate_chat_with_tools(&messages, Some(&[devices_tool()][..]), &GenerationConfig::default())
        .await
        .unwrap();

    assert!(response.has_tool_calls());
    assert_eq!(response.model, "served-model");
    assert_eq!(response.total_tokens, Some(24));

    let request = &seen.lock().unwrap()[0];
    assert_eq!(request["tools"][0]["function"]["name"], "fetchDevices");
    assert_eq!(request["tool_choice"], "auto");
    assert_eq!(request["messages"][0]["role"], "system");
    assert!(request.get("response_format").is_none());
}

#[tokio::test]
async fn test_openai_compatible_sends_tool_results_and_schema() {
    let (app, seen) = recording_route(
        "/chat/completions",
        json!({
            "choices": [{
                "message": {"role": "assistant", "content": "{\"selectedPath\":[\"N1\"],\"motivation\":\"ok\"}"},
                "finish_reason": "stop"
            }]
        }),
    );
    let base = serve(app).await;

    let provider = OpenAICompatibleProvider::new(OpenAICompatibleConfig {
        max_retries: 0,
        ..OpenAICompatibleConfig::custom(base, "m".to_string(), "test".to_string())
    })
    .unwrap();

    let messages = vec![
        Message::system("instructions"),
        Message::user("request"),
        Message::assistant_with_tool_calls("", vec![ToolCall::function("call_1", "fetchDevices", "{}")]),
        Message::tool_result("call_1", "[{\"id\":\"d1\"}]"),
    ];
    let config = GenerationConfig {
        response_format: Some(route_plan_response_format()),
        ..Default::default()
    };
    let response = provider.generate_chat(&messages, &config).await.unwrap();

    assert!(!response.has_tool_calls());
    assert!(response.content.contains("selectedPath"));

    let request = &seen.lock().unwrap()[0];
    assert_eq!(request["messages"][2]["content"], Value::Null);
    assert_eq!(request["messages"][3]["role"], "tool");
    assert_eq!(request["messages"][3]["tool_call_id"], "call_1");
    assert_eq!(request["messages"][3]["content"], "[{\"id\":\"d1\"}]");
    assert_eq!(request["response_format"]["type"], "json_schema");
}

#[tokio::test]
async fn test_openai_compatible_error_status_surfaces() {
    let app = Router::new().route(
        "/chat/completions",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "overloaded") }),
    );
    let base = serve(app).await;

    let provider = OpenAICompatibleProvider::new(OpenAICompatibleConfig {
        max_retries: 0,
        ..OpenAICompatibleConfig::custom(base, "m".to_string(), "local".to_string())
    })
    .unwrap();

    let err = provider.generate("hi").await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("local API error"));
    assert!(message.contains("overloaded"));
}

#[tokio::test]
async fn test_anthropic_tool_use_round_trip() {
    let (app, seen) = recording_route(
        "/messages",
        json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "model": "claude-test",
            "content": [
                {"type": "text", "text": "Let me look at the devices."},
                {"type": "tool_use", "id": "toolu_1", "name": "fetchDevices", "input": {}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 30, "output_tokens": 8}
        }),
    );
    let base = serve(app).await;

    let provider = AnthropicProvider::new(AnthropicConfig {
        api_key: "test-key".to_string(),
        base_url: base,
        max_retries: 0,
        ..Default::default()
    })
    .unwrap();

    let messages = vec![Message::system("instructions"), Message::user("request")];
    let response = provider
        .generate_chat_with_tools(&messages, Some(&[devices_tool()][..]), &GenerationConfig::default())
        .await
        .unwrap();

    assert_eq!(response.content, "Let me look at the devices.");
    assert_eq!(response.total_tokens, Some(38));
    let calls = response.tool_calls.unwrap();
    assert_eq!(calls[0].id, "toolu_1");
    assert_eq!(calls[0].function.name, "fetchDevices");
    assert_eq!(calls[0].function.arguments, "{}");

    let request = &seen.lock().unwrap()[0];
    assert_eq!(request["system"], "instructions");
    assert_eq!(request["tools"][0]["name"], "fetchDevices");
    assert_eq!(request["tools"][0]["input_schema"]["type"], "object");
    assert_eq!(request["messages"].as_array().unwrap().len(), 1);
}
