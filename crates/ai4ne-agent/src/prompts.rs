// ABOUTME: Prompt templates for the direct and tool-declared decision protocols
// ABOUTME: Renders by single-pass placeholder substitution so embedded JSON is never rescanned

use ai4ne_ai::{route_plan_format_instructions, Message};
use ai4ne_core::{ContextSnapshots, DecisionContract, DecisionError, DecisionRequest};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PromptError {
    #[error("template '{template}' is missing a value for '{variable}'")]
    MissingVariable {
        template: &'static str,
        variable: String,
    },
}

impl From<PromptError> for DecisionError {
    fn from(err: PromptError) -> Self {
        DecisionError::InvalidPrompt(err.to_string())
    }
}

const AGENT_PROFILE: &str = r#"<AgentProfile>
    You are a highly specialized **AI for Network Engineering (AI4NE) agent**. Your core responsibility is to act as a **smart router**, dynamically finding the absolute best network path and resources for any user request. You achieve this by intelligently matching user needs with the capabilities of available network devices.
</AgentProfile>
"#;

const DIRECT_INSTRUCTIONS: &str = r#"<Instructions>
    When a user submits a request with specific needs, your job is to:
    - 1 **Understand the Goal:** Decode what the user wants to accomplish and their exact technical specifications.
    - 2 **Inventory Devices:** Review all available network devices, assessing their:
        * Performance: (e.g., processing power, bandwidth)
        * Green Footprint: (e.g., energy efficiency)
        * Speed: (e.g., latency, data path efficiency)
        * Quality: (e.g., model compatibility, output fidelity)
        * Compliance: (e.g., security patches, licenses, data sovereignty)
    - 3 **Filter & Select:** Discard any devices that *cannot* meet the core requirements (e.g., too slow, non-compliant, incompatible). From the remaining, pick the ones that offer the most optimal balance of performance, efficiency, and precise fit.
    - 4 **Analyse The Network Topology:** Use the selected devices as constraints to find the best network path that meets the user's needs using the `route` tool function.
    - 5 **Finalize routing:** By analyzing the network topology and the paths found in *step 4*, determine the most appropriate devices to route the request through considering the user's requirements.
    - 6 **Report Back:** Provide only the chosen path
</Instructions>

<DataSources>
    <AvailableDevices>
        {devices}
    </AvailableDevices>
    <NetworkTopology>
        {networkTopology}
    </NetworkTopology>
</DataSources>
"#;

const TOOL_DECLARED_INSTRUCTIONS: &str = r#"<Instructions>
    When a user submits a request with specific needs, your job is to:
    - 1 **Understand the Goal:** Decode what the user wants to accomplish and their exact technical specifications.
    - 2 **Inventory Devices:** Fetch and review all available network devices, assessing their:
        * Performance: (e.g., processing power, bandwidth)
        * Green Footprint: (e.g., energy efficiency)
        * Speed: (e.g., latency, data path efficiency)
        * Quality: (e.g., model compatibility, output fidelity)
        * Compliance: (e.g., security patches, licenses, data sovereignty)
    - 3 **Filter & Select:** Discard any devices that *cannot* meet the core requirements (e.g., too slow, non-compliant, incompatible). From the remaining, pick the ones that offer the most optimal balance of performance, efficiency, and precise fit.
    - 4 **Route the Request:** Use the selected devices as constraints to find the best network path that meets the user's needs using the `route` tool function.
    - 5 **Finalize routing:** By analyzing the network topology and the paths found in *step 4*, determine the most appropriate devices to route the request through considering the user's requirements.
    - 6 **Report Back:** Provide only the chosen path
</Instructions>
"#;

const PATH_OUTPUT_GUIDELINES: &str = r#"<OutputGuidelines>
    Your response must include:
     - the path in the network topology. The path must be a list of ids where the ids are the identifiers of the nodes in the network topology (not the device ids).
     - The motivation for the path selection, explaining why this path was chosen over others.
</OutputGuidelines>
"#;

const DEVICE_OUTPUT_GUIDELINES: &str = r#"<OutputGuidelines>
    Your response must include only the identifiers of the selected devices, in routing order. Use the device ids, not the identifiers of the nodes in the network topology.
</OutputGuidelines>
"#;

const GUIDING_PRINCIPLES: &str = r#"<GuidingPrinciples>
    * **Non-Negotiable Constraints:** Be extremely strict with all hard constraints, especially security and compliance.
    * **Optimal Resource Allocation:** When choices exist, always aim for the most efficient and effective device selection.
</GuidingPrinciples>
"#;

const DEVICE_FORMAT_INSTRUCTIONS: &str = "Respond with only a list of comma-separated values, without any leading or trailing text.\n\
Example format: foo, bar, baz\n";

/// An instruction template with `{name}` placeholders.
///
/// Only declared variables are placeholders; any other brace is literal text.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    name: &'static str,
    text: String,
    variables: &'static [&'static str],
}

impl PromptTemplate {
    /// Snapshots embedded, no tools
    pub fn direct_context_embedded(contract: DecisionContract) -> Self {
        Self {
            name: "direct-context-embedded",
            text: assemble(DIRECT_INSTRUCTIONS, contract),
            variables: &["devices", "networkTopology"],
        }
    }

    /// No embedded data, the model calls the tools
    pub fn tool_declared(contract: DecisionContract) -> Self {
        Self {
            name: "tool-declared",
            text: assemble(TOOL_DECLARED_INSTRUCTIONS, contract),
            variables: &[],
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn variables(&self) -> &'static [&'static str] {
        self.variables
    }

    /// Substitute every declared placeholder in one left-to-right pass.
    pub fn render(&self, values: &HashMap<&str, &str>) -> Result<String, PromptError> {
        for variable in self.variables {
            if !values.contains_key(variable) {
                return Err(PromptError::MissingVariable {
                    template: self.name,
                    variable: variable.to_string(),
                });
            }
        }

        let mut rendered = String::with_capacity(
            self.text.len() + values.values().map(|v| v.len()).sum::<usize>(),
        );
        let mut rest = self.text.as_str();

        while let Some(open) = rest.find('{') {
            rendered.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let substituted = after.find('}').and_then(|close| {
                let name = &after[..close];
                self.variables
                    .contains(&name)
                    .then(|| (values[name], close))
            });

            match substituted {
                Some((value, close)) => {
                    rendered.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    rendered.push('{');
                    rest = after;
                }
            }
        }
        rendered.push_str(rest);

        Ok(rendered)
    }
}

fn assemble(instructions: &str, contract: DecisionContract) -> String {
    let guidelines = match contract {
        DecisionContract::Path => PATH_OUTPUT_GUIDELINES,
        DecisionContract::Devices => DEVICE_OUTPUT_GUIDELINES,
    };
    [AGENT_PROFILE, instructions, guidelines, GUIDING_PRINCIPLES].join("\n")
}

fn format_instructions(contract: DecisionContract) -> String {
    match contract {
        DecisionContract::Path => route_plan_format_instructions(),
        DecisionContract::Devices => DEVICE_FORMAT_INSTRUCTIONS.to_string(),
    }
}

/// System instructions plus the user's request, ready to open a conversation
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

impl RenderedPrompt {
    pub fn into_messages(self) -> Vec<Message> {
        vec![Message::system(self.system), Message::user(self.user)]
    }
}

/// Builds the opening messages for one decision
#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder {
    contract: DecisionContract,
}

impl PromptBuilder {
    pub fn new(contract: DecisionContract) -> Self {
        Self { contract }
    }

    pub fn contract(&self) -> DecisionContract {
        self.contract
    }

    /// Direct-Context-Embedded prompt: raw snapshot bodies go in verbatim
    pub fn direct(
        &self,
        request: &DecisionRequest,
        context: &ContextSnapshots,
    ) -> Result<RenderedPrompt, PromptError> {
        let template = PromptTemplate::direct_context_embedded(self.contract);
        let values = HashMap::from([
            ("devices", context.devices.raw()),
            ("networkTopology", context.topology.raw()),
        ]);
        self.finish(&template, &values, request)
    }

    /// Tool-Declared prompt
    pub fn tool_declared(&self, request: &DecisionRequest) -> Result<RenderedPrompt, PromptError> {
        let template = PromptTemplate::tool_declared(self.contract);
        self.finish(&template, &HashMap::new(), request)
    }

    fn finish(
        &self,
        template: &PromptTemplate,
        values: &HashMap<&str, &str>,
        request: &DecisionRequest,
    ) -> Result<RenderedPrompt, PromptError> {
        let mut system = template.render(values)?;
        system.push('\n');
        system.push_str(&format_instructions(self.contract));

        Ok(RenderedPrompt {
            system,
            user: request.as_str().to_string(),
        })
    }
}
