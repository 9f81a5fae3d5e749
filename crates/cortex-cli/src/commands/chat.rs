use anyhow::Result;
use cliclack::input;
use console::style;
use cortex::models::message::Message;

use super::ask::{assistant_text, reply_with_progress};
use super::build_agent;
use crate::render::print_markdown;
use crate::{ModelArgs, OuraArgs};

pub async fn execute(oura: &OuraArgs, model: &ModelArgs) -> Result<()> {
    let agent = build_agent(oura, model)?;

    println!(
        "{} {}",
        style("Cortex").bold().green(),
        style("- type \"exit\" to end the session").dim()
    );
    println!();

    let mut history: Vec<Message> = Vec::new();
    loop {
        let message_text: String = input("Message:").placeholder("").multiline().interact()?;

        if message_text.trim().eq_ignore_ascii_case("exit") {
            break;
        }

        history.push(Message::user().with_text(message_text));
        match reply_with_progress(&agent, &history).await {
            Ok(produced) => {
                print_markdown(&assistant_text(&produced))?;
                history.extend(produced);
            }
            Err(e) => {
                eprintln!("{} {}", style("Error:").red().bold(), e);
                // Drop the unanswered question so the next turn starts clean
                history.pop();
            }
        }
        println!();
    }
    Ok(())
}
