use async_trait::async_trait;
use serde_json::Value;

use crate::errors::AgentResult;
use crate::models::tool::{Tool, ToolCall};

pub mod oura;
pub mod webhook;

pub use oura::OuraSystem;
pub use webhook::WebhookSystem;

/// Core trait that defines a system that can be operated by an AI agent
#[async_trait]
pub trait System: Send + Sync {
    /// Get the name of the system
    fn name(&self) -> &str;

    /// Get the system description
    fn description(&self) -> &str;

    /// Get system instructions
    fn instructions(&self) -> &str;

    /// Get available tools
    fn tools(&self) -> &[Tool];

    /// Call a tool with the given arguments. Arguments are validated against the
    /// tool's schema before anything leaves the process.
    async fn call(&self, tool_call: ToolCall) -> AgentResult<Value>;
}

/// Parse tool arguments into a typed struct, treating a missing argument object as empty
pub(crate) fn parse_arguments<T: serde::de::DeserializeOwned>(arguments: Value) -> AgentResult<T> {
    let arguments = if arguments.is_null() {
        Value::Object(Default::default())
    } else {
        arguments
    };
    serde_json::from_value(arguments)
        .map_err(|e| crate::errors::AgentError::InvalidParameters(e.to_string()))
}

/// Number of records in a collection response, if the response is one
pub fn result_count(result: &Value) -> Option<usize> {
    match result {
        Value::Object(map) => map.get("data").and_then(Value::as_array).map(Vec::len),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}
