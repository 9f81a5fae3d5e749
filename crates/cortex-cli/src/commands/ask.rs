use anyhow::Result;
use cliclack::spinner;
use console::style;
use cortex::agent::Agent;
use cortex::models::message::Message;
use cortex::models::role::Role;
use cortex::systems::oura::activity_label;
use futures::StreamExt;

use super::build_agent;
use crate::render::print_markdown;
use crate::{ModelArgs, OuraArgs};

/// Run one reply, showing each tool call's activity on a spinner. Returns every
/// message the agent produced so callers can extend their history.
pub async fn reply_with_progress(agent: &Agent, history: &[Message]) -> Result<Vec<Message>> {
    let spin = spinner();
    spin.start("Thinking");

    let mut produced = Vec::new();
    let mut stream = agent.reply(history).await?;
    while let Some(message) = stream.next().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                spin.stop(style("Failed").red());
                return Err(e);
            }
        };
        for label in progress_labels(&message) {
            spin.set_message(label);
        }
        produced.push(message);
    }

    spin.stop(style("Done").dim());
    Ok(produced)
}

/// Activity labels for the tool calls an assistant message asks for
fn progress_labels(message: &Message) -> Vec<String> {
    message
        .tool_requests()
        .iter()
        .filter_map(|request| request.tool_call.as_ref().ok())
        .map(|call| {
            let name = call.name.rsplit("__").next().unwrap_or(&call.name);
            activity_label(name, &call.arguments)
        })
        .collect()
}

pub fn assistant_text(messages: &[Message]) -> String {
    messages
        .iter()
        .filter(|message| message.role == Role::Assistant)
        .map(Message::as_concat_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

pub async fn execute(oura: &OuraArgs, model: &ModelArgs, question: String) -> Result<()> {
    let agent = build_agent(oura, model)?;
    let produced = reply_with_progress(&agent, &[Message::user().with_text(question)]).await?;
    print_markdown(&assistant_text(&produced))
}
