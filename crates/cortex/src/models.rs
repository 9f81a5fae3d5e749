//! These models represent the objects passed around by the agent
//!
//! There are several related formats we need to interact with:
//! - chat messages and tool invocations, sent from the interface to the agent
//! - data stream protocol frames, sent from the agent to the interface
//! - openai-compatible messages/tools, sent from the agent to the LLM
//! - tool calls, sent from the agent to the systems backed by the Oura API
//!
//! We always immediately convert those formats into the internal structs using to/from helpers.
pub mod message;
pub mod role;
pub mod tool;
