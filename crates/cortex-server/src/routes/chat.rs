use crate::configuration::ChatMode;
use crate::error::ChatError;
use crate::state::AppState;
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use cortex::{
    agent::Agent,
    models::message::{Message, MessageContent},
    models::role::Role,
    models::tool::ToolCall,
    oura::{AccessToken, OuraClient, OuraClientConfig},
    providers::openai::OpenAiProvider,
    systems::OuraSystem,
};
use futures::{stream::StreamExt, Stream};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, warn};

// Types matching the incoming JSON structure
#[derive(Debug, Deserialize)]
struct ChatRequest {
    messages: Vec<IncomingMessage>,
    #[serde(default)]
    credential: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    parts: Vec<IncomingPart>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum IncomingPart {
    Text {
        text: String,
    },
    ToolInvocation {
        #[serde(rename = "toolInvocation")]
        tool_invocation: ToolInvocation,
    },
    // step markers, reasoning, sources and the like carry nothing we replay
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolInvocation {
    state: String,
    tool_call_id: String,
    tool_name: String,
    #[serde(default)]
    args: Value,
    #[serde(default)]
    result: Option<Value>,
}

// Streaming response body for the data stream protocol
pub struct DataStreamResponse {
    rx: ReceiverStream<String>,
}

impl DataStreamResponse {
    fn new(rx: ReceiverStream<String>) -> Self {
        Self { rx }
    }
}

impl Stream for DataStreamResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for DataStreamResponse {
    fn into_response(self) -> Response {
        let body = axum::body::Body::from_stream(self);

        (
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            [("x-vercel-ai-data-stream", "v1")],
            body,
        )
            .into_response()
    }
}

/// Text from `content`, falling back to the text parts
fn split_parts(content: Option<String>, parts: Vec<IncomingPart>) -> (String, Vec<ToolInvocation>) {
    let mut texts = Vec::new();
    let mut invocations = Vec::new();
    for part in parts {
        match part {
            IncomingPart::Text { text } => texts.push(text),
            IncomingPart::ToolInvocation { tool_invocation } => invocations.push(tool_invocation),
            IncomingPart::Other => {}
        }
    }

    let text = match content {
        Some(content) if !content.trim().is_empty() => content,
        _ => texts.join("\n"),
    };
    (text, invocations)
}

// Convert incoming messages to our internal Message type
fn convert_messages(incoming: Vec<IncomingMessage>) -> Vec<Message> {
    let mut messages = Vec::new();

    for IncomingMessage {
        role,
        content,
        parts,
    } in incoming
    {
        let (text, invocations) = split_parts(content, parts);
        match role.as_str() {
            "user" => {
                if !text.is_empty() {
                    messages.push(Message::user().with_text(text));
                }
            }
            "assistant" => {
                // Each finished invocation is a complete request/response pair
                for tool in invocations {
                    let result = match (tool.state.as_str(), tool.result) {
                        ("result", Some(result)) => result,
                        _ => {
                            warn!(id = %tool.tool_call_id, "skipping unfinished tool invocation");
                            continue;
                        }
                    };
                    let tool_call = ToolCall::new(tool.tool_name, tool.args);
                    messages.push(
                        Message::assistant()
                            .with_tool_request(tool.tool_call_id.clone(), Ok(tool_call)),
                    );
                    messages.push(
                        Message::user().with_tool_response(tool.tool_call_id, Ok(result)),
                    );
                }

                // Then add the assistant's text response after tool interactions
                if !text.is_empty() {
                    messages.push(Message::assistant().with_text(text));
                }
            }
            _ => {
                warn!("Unknown role: {}", role);
            }
        }
    }

    messages
}

// Protocol-specific message formatting
struct ProtocolFormatter;

impl ProtocolFormatter {
    fn format_text(text: &str) -> String {
        let encoded_text = serde_json::to_string(text).unwrap_or_else(|_| String::new());
        format!("0:{}\n", encoded_text)
    }

    fn format_tool_call(id: &str, name: &str, args: &Value) -> String {
        // Tool calls start with "9:"
        let tool_call = json!({
            "toolCallId": id,
            "toolName": name,
            "args": args
        });
        format!("9:{}\n", tool_call)
    }

    fn format_tool_response(id: &str, result: &Value) -> String {
        // Tool responses start with "a:"
        let response = json!({
            "toolCallId": id,
            "result": result,
        });
        format!("a:{}\n", response)
    }

    fn format_error(message: &str) -> String {
        let encoded = serde_json::to_string(message).unwrap_or_else(|_| String::new());
        format!("3:{}\n", encoded)
    }

    fn format_finish(reason: &str) -> String {
        // Finish messages start with "d:"
        let finish = json!({
            "finishReason": reason,
            "usage": {
                "promptTokens": 0,
                "completionTokens": 0
            }
        });
        format!("d:{}\n", finish)
    }
}

async fn stream_message(
    message: Message,
    tx: &mpsc::Sender<String>,
) -> Result<(), mpsc::error::SendError<String>> {
    match message.role {
        Role::User => {
            // User messages produced by the agent only ever carry tool responses
            for content in message.content {
                if let MessageContent::ToolResponse(response) = content {
                    let result = match response.tool_result {
                        Ok(result) => result,
                        Err(err) => json!({ "error": err.to_string() }),
                    };
                    tx.send(ProtocolFormatter::format_tool_response(
                        &response.id,
                        &result,
                    ))
                    .await?;
                }
            }
        }
        Role::Assistant => {
            for content in message.content {
                match content {
                    MessageContent::ToolRequest(request) => {
                        if let Ok(tool_call) = request.tool_call {
                            tx.send(ProtocolFormatter::format_tool_call(
                                &request.id,
                                &tool_call.name,
                                &tool_call.arguments,
                            ))
                            .await?;
                        } else {
                            // if the llm generates an invalid tool call, we still have
                            // to include it in the history. It always comes with a response indicating the error
                            tx.send(ProtocolFormatter::format_tool_call(
                                &request.id,
                                "invalid name",
                                &json!({}),
                            ))
                            .await?;
                        }
                    }
                    MessageContent::Text(text) => {
                        for line in text.text.lines() {
                            let modified_line = format!("{}\n", line);
                            tx.send(ProtocolFormatter::format_text(&modified_line))
                                .await?;
                        }
                    }
                    MessageContent::ToolResponse(_) => {
                        // Tool responses should only come from the user
                        continue;
                    }
                }
            }
        }
    }
    Ok(())
}

fn build_agent(state: &AppState, credential: AccessToken) -> anyhow::Result<Agent> {
    let client = OuraClient::new(
        OuraClientConfig::new(credential).with_base_url(state.oura.base_url.clone()),
    )?;
    let provider = OpenAiProvider::new(state.provider_config.clone())?;

    let mut agent = Agent::new(Box::new(provider)).with_max_steps(state.chat.max_steps);
    agent.add_system(Box::new(OuraSystem::new(client)));
    Ok(agent)
}

async fn forward_reply(
    agent: &Agent,
    messages: &[Message],
    tx: &mpsc::Sender<String>,
) -> anyhow::Result<()> {
    let mut stream = agent.reply(messages).await?;
    while let Some(message) = stream.next().await {
        stream_message(message?, tx).await?;
    }
    Ok(())
}

fn stream_reply(agent: Agent, messages: Vec<Message>, timeout_secs: u64) -> DataStreamResponse {
    // Create channel for streaming
    let (tx, rx) = mpsc::channel(100);

    // Spawn task to handle streaming
    tokio::spawn(async move {
        let outcome = timeout(
            Duration::from_secs(timeout_secs),
            forward_reply(&agent, &messages, &tx),
        )
        .await;

        let reason = match outcome {
            Ok(Ok(())) => "stop",
            Ok(Err(_)) if tx.is_closed() => {
                info!("client disconnected before the reply finished");
                return;
            }
            Ok(Err(e)) => {
                error!(error = %e, "chat stream failed");
                let e = ChatError::Internal(e);
                let _ = tx.send(ProtocolFormatter::format_error(&e.to_string())).await;
                "error"
            }
            Err(_) => {
                let e = ChatError::Timeout(timeout_secs);
                error!(error = %e, "chat stream abandoned");
                let _ = tx.send(ProtocolFormatter::format_error(&e.to_string())).await;
                "error"
            }
        };

        // Send finish message
        let _ = tx.send(ProtocolFormatter::format_finish(reason)).await;
    });

    DataStreamResponse::new(ReceiverStream::new(rx))
}

async fn handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ChatError> {
    let credential = AccessToken::non_blank(request.credential.as_deref())
        .or_else(|| AccessToken::non_blank(state.oura.access_token.as_deref()))
        .ok_or(ChatError::MissingCredential)?;

    let agent = build_agent(&state, credential)?;
    let messages = convert_messages(request.messages);
    info!(messages = messages.len(), mode = ?state.chat.mode, "chat request");

    match state.chat.mode {
        ChatMode::Json => {
            let answer = timeout(
                Duration::from_secs(state.chat.timeout_secs),
                agent.answer(&messages),
            )
            .await
            .map_err(|_| ChatError::Timeout(state.chat.timeout_secs))??;
            Ok(Json(json!({ "message": answer })).into_response())
        }
        ChatMode::Stream => {
            Ok(stream_reply(agent, messages, state.chat.timeout_secs).into_response())
        }
    }
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(handler))
        .with_state(state)
}
