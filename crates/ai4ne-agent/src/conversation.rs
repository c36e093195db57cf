use ai4ne_ai::{Message, MessageRole, ToolCall};

use crate::prompts::RenderedPrompt;

/// Ordered transcript of one orchestrator invocation.
///
/// Owned by a single decision and dropped when it terminates.
#[derive(Debug, Clone)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    pub fn new(prompt: RenderedPrompt) -> Self {
        Self {
            messages: prompt.into_messages(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Record the model turn that requested `calls`
    pub fn push_tool_request(&mut self, content: impl Into<String>, calls: Vec<ToolCall>) {
        self.messages
            .push(Message::assistant_with_tool_calls(content, calls));
    }

    pub fn push_tool_result(&mut self, call_id: impl Into<String>, content: impl Into<String>) {
        self.messages.push(Message::tool_result(call_id, content));
    }

    pub fn push_tool_error(&mut self, call_id: impl Into<String>, content: impl Into<String>) {
        self.messages.push(Message::tool_error(call_id, content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Number of tool results appended so far
    pub fn tool_results(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == MessageRole::Tool)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> RenderedPrompt {
        RenderedPrompt {
            system: "instructions".to_string(),
            user: "route me".to_string(),
        }
    }

    #[test]
    fn test_starts_with_system_then_user() {
        let conversation = ConversationState::new(prompt());
        let roles: Vec<MessageRole> = conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![MessageRole::System, MessageRole::User]);
        assert_eq!(conversation.messages()[1].content, "route me");
    }

    #[test]
    fn test_tool_exchange_ordering() {
        let mut conversation = ConversationState::new(prompt());
        let call = ToolCall::function("call_1", "fetchDevices", "{}");
        conversation.push_tool_request("", vec![call]);
        conversation.push_tool_result("call_1", "[]");
        conversation.push_assistant("done");

        assert_eq!(conversation.len(), 5);
        assert_eq!(conversation.tool_results(), 1);
        assert_eq!(
            conversation.messages()[3].tool_call_id.as_deref(),
            Some("call_1")
        );
        assert_eq!(conversation.messages()[4].role, MessageRole::Assistant);
        assert!(!conversation.messages()[3].is_error);
    }

    #[test]
    fn test_failed_call_is_flagged() {
        let mut conversation = ConversationState::new(prompt());
        let call = ToolCall::function("call_1", "route", "{}");
        conversation.push_tool_request("", vec![call]);
        conversation.push_tool_error("call_1", r#"{"error":"HTTP 500","tool":"route"}"#);

        assert_eq!(conversation.tool_results(), 1);
        assert!(conversation.messages()[3].is_error);
    }
}
