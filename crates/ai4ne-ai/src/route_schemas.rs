// ABOUTME: JSON schema and format instructions for the path-returning decision
// ABOUTME: Derived from the RoutePlan type so prompt, provider and parser agree on one shape

use ai4ne_core::RoutePlan;
use schemars::{schema_for, JsonSchema};
use serde_json::Value;

use crate::llm_provider::{JsonSchema as LLMJsonSchema, ResponseFormat};

/// Helper to convert schemars schema to JSON value
fn schema_to_json_value<T: JsonSchema>() -> Value {
    schema_for!(T).to_value()
}

/// JSON Schema of `{selectedPath: [string], motivation: string}`
pub fn route_plan_schema() -> Value {
    schema_to_json_value::<RoutePlan>()
}

/// Generate ResponseFormat for the path contract
pub fn route_plan_response_format() -> ResponseFormat {
    ResponseFormat::JsonSchema {
        json_schema: LLMJsonSchema {
            name: "route_plan".to_string(),
            schema: route_plan_schema(),
            strict: None,
        },
    }
}

/// Output format instructions appended to path-contract prompts
pub fn route_plan_format_instructions() -> String {
    let schema = serde_json::to_string_pretty(&route_plan_schema()).unwrap_or_default();
    format!(
        "Your response should be in JSON format.\n\
         Do not include any explanations, only provide a RFC8259 compliant JSON response following this format without deviation.\n\
         Do not include markdown code blocks in your response.\n\
         Remove the ```json markdown from the output.\n\
         Here is the JSON Schema instance your output must adhere to:\n\
         ```{}```\n",
        schema
    )
}
