use anyhow::Result;
use chrono::{NaiveDate, Utc};
use futures::stream::{BoxStream, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};
use crate::prompt_template::load_prompt;
use crate::providers::base::Provider;
use crate::systems::System;

/// Upper bound on tool rounds in one reply
pub const DEFAULT_MAX_STEPS: usize = 10;

const SYSTEM_PROMPT: &str = include_str!("prompts/system.md");

#[derive(Clone, Debug, Serialize)]
struct SystemInfo {
    name: String,
    description: String,
    instructions: String,
}

impl SystemInfo {
    fn new(name: &str, description: &str, instructions: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            instructions: instructions.to_string(),
        }
    }
}

#[derive(Serialize)]
struct PromptContext {
    today: String,
    systems: Vec<SystemInfo>,
}

/// Agent integrates a foundational LLM with the systems it needs to pilot
pub struct Agent {
    systems: Vec<Box<dyn System>>,
    provider: Box<dyn Provider>,
    max_steps: usize,
    prompt_template: String,
}

impl Agent {
    /// Create a new Agent with the specified provider
    pub fn new(provider: Box<dyn Provider>) -> Self {
        Self {
            systems: Vec::new(),
            provider,
            max_steps: DEFAULT_MAX_STEPS,
            prompt_template: SYSTEM_PROMPT.to_string(),
        }
    }

    /// Limit how many rounds of tool calls a single reply may run
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Replace the built-in system prompt. The template sees `today` and `systems`.
    pub fn with_prompt_template<S: Into<String>>(mut self, template: S) -> Self {
        self.prompt_template = template.into();
        self
    }

    /// Add a system to the agent
    pub fn add_system(&mut self, system: Box<dyn System>) {
        self.systems.push(system);
    }

    /// Get all tools from all systems with proper system prefixing
    fn get_prefixed_tools(&self) -> Vec<Tool> {
        let mut tools = Vec::new();
        for system in &self.systems {
            for tool in system.tools() {
                tools.push(Tool::new(
                    format!("{}__{}", system.name(), tool.name),
                    &tool.description,
                    tool.input_schema.clone(),
                ));
            }
        }
        tools
    }

    /// Find the appropriate system for a tool call based on the prefixed name
    fn get_system_for_tool(&self, prefixed_name: &str) -> Option<&dyn System> {
        let parts: Vec<&str> = prefixed_name.split("__").collect();
        if parts.len() != 2 {
            return None;
        }
        let system_name = parts[0];
        self.systems
            .iter()
            .find(|sys| sys.name() == system_name)
            .map(|v| &**v)
    }

    /// Dispatch a single tool call to the appropriate system
    async fn dispatch_tool_call(
        &self,
        tool_call: AgentResult<ToolCall>,
    ) -> AgentResult<serde_json::Value> {
        let call = tool_call?;
        let system = self
            .get_system_for_tool(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        let tool_name = call
            .name
            .split("__")
            .nth(1)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;
        let system_tool_call = ToolCall::new(tool_name, call.arguments);

        system.call(system_tool_call).await
    }

    /// Render the system prompt for the given calendar day
    pub fn system_prompt(&self, today: NaiveDate) -> AgentResult<String> {
        let context = PromptContext {
            today: today.format("%Y-%m-%d").to_string(),
            systems: self
                .systems
                .iter()
                .map(|system| {
                    SystemInfo::new(system.name(), system.description(), system.instructions())
                })
                .collect(),
        };

        load_prompt(&self.prompt_template, &context)
            .map_err(|e| AgentError::Internal(e.to_string()))
    }

    /// Create a stream that yields each message as it's generated by the agent.
    /// This includes both the assistant's responses and any tool responses.
    ///
    /// Once `max_steps` tool rounds have run, the model is asked once more with no
    /// tools on offer so it answers from what has been gathered.
    pub async fn reply(&self, messages: &[Message]) -> Result<BoxStream<'_, Result<Message>>> {
        let mut messages = messages.to_vec();
        let tools = self.get_prefixed_tools();
        // The date is taken per reply; a long-running server crosses midnight
        let system_prompt = self.system_prompt(Utc::now().date_naive())?;
        let max_steps = self.max_steps;

        Ok(Box::pin(async_stream::try_stream! {
            let mut steps = 0;
            loop {
                let offered: &[Tool] = if steps < max_steps { &tools } else { &[] };

                let (response, usage) = self.provider.complete(
                    &system_prompt,
                    &messages,
                    offered,
                ).await?;
                info!(step = steps, total_tokens = ?usage.total_tokens, "model responded");

                yield response.clone();

                // Ensure the message above reaches the caller before tools start running
                tokio::task::yield_now().await;

                let tool_requests = response.tool_requests();
                if tool_requests.is_empty() {
                    break;
                }
                if steps >= max_steps {
                    warn!(max_steps, "tool step limit reached, ignoring further tool requests");
                    break;
                }
                steps += 1;

                // Tool calls within one step are independent reads, so run them together
                let futures: Vec<_> = tool_requests
                    .iter()
                    .map(|request| self.dispatch_tool_call(request.tool_call.clone()))
                    .collect();
                let outputs = futures::future::join_all(futures).await;

                let mut message_tool_response = Message::user();
                for (request, output) in tool_requests.iter().zip(outputs.into_iter()) {
                    if let Err(e) = &output {
                        warn!(id = %request.id, error = %e, "tool call failed");
                    }
                    message_tool_response = message_tool_response.with_tool_response(
                        request.id.clone(),
                        output,
                    );
                }

                yield message_tool_response.clone();

                messages.push(response);
                messages.push(message_tool_response);
            }
        }))
    }

    /// Run a reply to completion and return the assistant's text
    pub async fn answer(&self, messages: &[Message]) -> Result<String> {
        let mut stream = self.reply(messages).await?;
        let mut response_text = String::new();

        while let Some(message) = stream.next().await {
            let message = message?;
            if message.role == Role::Assistant {
                let text = message.as_concat_text();
                if !text.is_empty() {
                    response_text.push_str(&text);
                    response_text.push('\n');
                }
            }
        }

        Ok(response_text.trim().to_string())
    }
}
