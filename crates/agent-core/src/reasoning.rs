//! Reasoning Loop
//!
//! Implements the ReAct (Reason + Act) pattern: the model observes, thinks,
//! acts through tools, and responds. Each run records every executed tool
//! call so callers can post-process structured tool output.

use std::sync::Arc;

use serde::Serialize;

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message, Role};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::tool::{ToolCall, ToolRegistry, ToolResult};

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System prompt template
    pub system_prompt: String,

    /// Maximum reasoning iterations before giving up
    pub max_iterations: usize,

    /// Generation options
    pub generation: GenerationOptions,

    /// Whether to append tool descriptions to system prompt
    pub inject_tool_descriptions: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: 10,
            generation: GenerationOptions::default(),
            inject_tool_descriptions: true,
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful AI assistant.

When you need to use a tool, respond with a JSON block in this exact format:
```tool
{"tool": "tool_name", "arguments": {"arg1": "value1"}}
```

After receiving tool results, synthesize them into a helpful response.
If you can answer directly without tools, do so.
Be concise and accurate."#;

/// Outcome of one agent run: the final reply plus the record of every tool
/// call executed along the way.
#[derive(Clone, Debug, Serialize)]
pub struct AgentOutcome {
    /// The model's final free-text answer
    pub final_text: String,

    /// Tool calls executed during the run, in order
    pub tool_results: Vec<ToolResult>,
}

impl AgentOutcome {
    /// Find the result of the first successful call to a named tool
    pub fn tool_output(&self, name: &str) -> Option<&ToolResult> {
        self.tool_results.iter().find(|r| r.name == name && r.success)
    }
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Build the full system prompt including tool descriptions
    pub fn build_system_prompt(&self) -> String {
        let mut prompt = self.config.system_prompt.clone();

        if self.config.inject_tool_descriptions && !self.tools.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&self.tools.generate_prompt_section());
        }

        prompt
    }

    /// Run the agent over an existing conversation
    pub async fn run(&self, conversation: &mut Conversation) -> Result<AgentOutcome> {
        // Ensure system prompt is set
        if conversation.messages().first().map(|m| &m.role) != Some(&Role::System) {
            conversation.set_system_prompt(self.build_system_prompt());
        }
        conversation.truncate_to_fit();

        let mut tool_results = Vec::new();
        let mut iterations = 0;

        loop {
            iterations += 1;

            if iterations > self.config.max_iterations {
                return Err(AgentError::MaxIterations(self.config.max_iterations));
            }

            let completion = self
                .provider
                .complete(conversation.messages(), &self.config.generation)
                .await?;

            let content = completion.content.clone();
            conversation.push(Message::assistant(&content));

            if let Some(tool_call) = self.parse_tool_call(&content) {
                tracing::debug!(tool = %tool_call.name, "Executing tool");

                let result = self.execute_tool(&tool_call).await;
                conversation.push(Message::tool(Self::format_tool_result(&result)));
                tool_results.push(result);

                continue;
            }

            // No tool call - this is the final response
            return Ok(AgentOutcome {
                final_text: content,
                tool_results,
            });
        }
    }

    /// Run with a simple string input (creates a throwaway conversation)
    pub async fn ask(&self, question: &str) -> Result<AgentOutcome> {
        let mut conversation = Conversation::with_system_prompt(self.build_system_prompt());
        conversation.push(Message::user(question));
        self.run(&mut conversation).await
    }

    /// Parse a tool call from LLM response
    fn parse_tool_call(&self, content: &str) -> Option<ToolCall> {
        // Look for ```tool ... ``` blocks
        let tool_start = "```tool";
        let tool_end = "```";

        if let Some(start_idx) = content.find(tool_start) {
            let after_marker = &content[start_idx + tool_start.len()..];
            if let Some(end_idx) = after_marker.find(tool_end) {
                let json_str = after_marker[..end_idx].trim();

                if let Ok(mut call) = serde_json::from_str::<ToolCall>(json_str) {
                    if call.id.is_none() {
                        call.id = Some(uuid::Uuid::new_v4().to_string());
                    }
                    return Some(call);
                }
            }
        }

        // Fallback: try to find raw JSON with "tool" key
        Self::parse_inline_tool_call(content)
    }

    /// Try to parse inline JSON tool call
    fn parse_inline_tool_call(content: &str) -> Option<ToolCall> {
        if !content.contains(r#""tool""#) {
            return None;
        }

        let start = content.find('{')?;
        let end = content.rfind('}')?;

        if end <= start {
            return None;
        }

        let json_str = &content[start..=end];
        serde_json::from_str::<ToolCall>(json_str).ok()
    }

    /// Execute a tool call
    async fn execute_tool(&self, call: &ToolCall) -> ToolResult {
        match self.tools.execute(call).await {
            Ok(mut result) => {
                result.id = call.id.clone();
                result
            }
            Err(e) => ToolResult {
                name: call.name.clone(),
                id: call.id.clone(),
                success: false,
                output: format!("Error: {e}"),
                data: None,
            },
        }
    }

    /// Format tool result for conversation
    fn format_tool_result(result: &ToolResult) -> String {
        if result.success {
            format!("[Tool '{}' returned]\n{}", result.name, result.output)
        } else {
            format!("[Tool '{}' failed]\n{}", result.name, result.output)
        }
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Completion, FinishReason};
    use crate::tool::{ParameterSchema, Tool, ToolSchema};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Provider that replays a scripted sequence of completions
    struct ScriptedProvider {
        replies: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<&str>) -> Self {
            let mut replies: Vec<String> = replies.into_iter().map(String::from).collect();
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            _messages: &[Message],
            options: &GenerationOptions,
        ) -> Result<Completion> {
            let content = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| AgentError::Provider("script exhausted".into()))?;
            Ok(Completion {
                content,
                model: options.model.clone(),
                usage: None,
                finish_reason: Some(FinishReason::Stop),
            })
        }
    }

    struct UppercaseTool;

    #[async_trait]
    impl Tool for UppercaseTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "uppercase".into(),
                description: "Uppercase a string".into(),
                parameters: vec![ParameterSchema {
                    name: "text".into(),
                    param_type: "string".into(),
                    description: "Input".into(),
                    required: true,
                }],
            }
        }

        async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
            let text = call.str_arg("text").unwrap_or_default();
            Ok(ToolResult::success("uppercase", text.to_uppercase()))
        }
    }

    fn agent_with(replies: Vec<&str>) -> Agent {
        let mut tools = ToolRegistry::new();
        tools.register(UppercaseTool);
        Agent::new(
            Arc::new(ScriptedProvider::new(replies)),
            Arc::new(tools),
            AgentConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_direct_answer_has_no_tool_results() {
        let agent = agent_with(vec!["Just an answer."]);
        let outcome = agent.ask("hi").await.unwrap();
        assert_eq!(outcome.final_text, "Just an answer.");
        assert!(outcome.tool_results.is_empty());
    }

    #[tokio::test]
    async fn test_tool_call_is_executed_and_recorded() {
        let agent = agent_with(vec![
            "```tool\n{\"tool\": \"uppercase\", \"arguments\": {\"text\": \"vnm\"}}\n```",
            "The symbol is VNM.",
        ]);
        let outcome = agent.ask("uppercase vnm").await.unwrap();
        assert_eq!(outcome.final_text, "The symbol is VNM.");
        assert_eq!(outcome.tool_results.len(), 1);
        assert_eq!(outcome.tool_results[0].output, "VNM");
        assert!(outcome.tool_output("uppercase").is_some());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_and_loop_continues() {
        let agent = agent_with(vec![
            r#"{"tool": "missing", "arguments": {}}"#,
            "Could not use that tool.",
        ]);
        let outcome = agent.ask("go").await.unwrap();
        assert_eq!(outcome.tool_results.len(), 1);
        assert!(!outcome.tool_results[0].success);
    }

    #[tokio::test]
    async fn test_max_iterations() {
        let mut tools = ToolRegistry::new();
        tools.register(UppercaseTool);
        let call = "```tool\n{\"tool\": \"uppercase\", \"arguments\": {\"text\": \"x\"}}\n```";
        let agent = Agent::new(
            Arc::new(ScriptedProvider::new(vec![call; 4])),
            Arc::new(tools),
            AgentConfig {
                max_iterations: 3,
                ..Default::default()
            },
        );
        assert!(matches!(
            agent.ask("loop").await,
            Err(AgentError::MaxIterations(3))
        ));
    }
}
