mod commands;
mod render;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use cortex::agent::DEFAULT_MAX_STEPS;
use cortex::oura::client::OURA_API_BASE;
use cortex::providers::configs::{DEFAULT_MODEL, OPENROUTER_HOST};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    oura: OuraArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct OuraArgs {
    /// Oura personal access token
    #[arg(long, global = true, env = "OURA_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// OAuth application client id, needed for webhook management
    #[arg(long, global = true, env = "OURA_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth application client secret, needed for webhook management
    #[arg(long, global = true, env = "OURA_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    #[arg(long, global = true, env = "OURA_BASE_URL", default_value = OURA_API_BASE, hide = true)]
    pub base_url: String,
}

#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// API key for the OpenAI-compatible endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// OpenAI-compatible host
    #[arg(long, env = "OPENAI_HOST", default_value = OPENROUTER_HOST)]
    pub host: String,

    /// Model to use
    #[arg(short, long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Maximum rounds of tool calls per answer
    #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
    pub max_steps: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a single question about your Oura data
    Ask {
        /// The question, e.g. "How did I sleep last night?"
        question: String,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Start an interactive conversation
    Chat {
        #[command(flatten)]
        model: ModelArgs,
    },

    /// Manage webhook subscriptions for your Oura application
    Webhook {
        #[command(subcommand)]
        action: commands::webhook::WebhookAction,
    },

    /// Print the version
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Ask { question, model } => {
            commands::ask::execute(&cli.oura, &model, question).await
        }
        Command::Chat { model } => commands::chat::execute(&cli.oura, &model).await,
        Command::Webhook { action } => commands::webhook::execute(&cli.oura, action).await,
        Command::Version => commands::version::execute().await,
    }
}
