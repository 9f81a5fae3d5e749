use anyhow::Result;
use clap::Subcommand;
use cortex::models::tool::ToolCall;
use cortex::oura::{AccessToken, OuraClient, OuraClientConfig};
use cortex::systems::{System, WebhookSystem};
use serde_json::{json, Value};

use crate::render::print_json;
use crate::OuraArgs;

#[derive(Subcommand, Debug, Clone)]
pub enum WebhookAction {
    /// List all webhook subscriptions
    List,

    /// Subscribe a callback URL to events for one data type
    Create {
        /// HTTPS URL where webhook events will be sent
        #[arg(long)]
        callback_url: String,

        /// Secret token for webhook verification
        #[arg(long)]
        verification_token: String,

        /// create, update or delete
        #[arg(long)]
        event_type: String,

        /// e.g. daily_sleep, workout, tag
        #[arg(long)]
        data_type: String,
    },

    /// Delete a webhook subscription
    Delete {
        /// Subscription id
        id: String,
    },
}

impl WebhookAction {
    fn title(&self) -> &'static str {
        match self {
            WebhookAction::List => "Webhook subscriptions",
            WebhookAction::Create { .. } => "Created subscription",
            WebhookAction::Delete { .. } => "Deleted subscription",
        }
    }

    fn into_tool_call(self) -> ToolCall {
        match self {
            WebhookAction::List => ToolCall::new("getWebhookSubscriptions", json!({})),
            WebhookAction::Create {
                callback_url,
                verification_token,
                event_type,
                data_type,
            } => ToolCall::new(
                "createWebhookSubscription",
                json!({
                    "callbackUrl": callback_url,
                    "verificationToken": verification_token,
                    "eventType": event_type,
                    "dataType": data_type,
                }),
            ),
            WebhookAction::Delete { id } => {
                ToolCall::new("deleteWebhookSubscription", json!({ "id": id }))
            }
        }
    }
}

pub fn webhook_system(oura: &OuraArgs) -> Result<WebhookSystem> {
    let token = AccessToken::non_blank(oura.access_token.as_deref())
        .unwrap_or_else(|| AccessToken::new(String::new()));
    let mut config = OuraClientConfig::new(token).with_base_url(&oura.base_url);
    if let (Some(id), Some(secret)) = (&oura.client_id, &oura.client_secret) {
        config = config.with_client_credentials(id, secret);
    }
    Ok(WebhookSystem::new(OuraClient::new(config)?))
}

pub async fn run(system: &WebhookSystem, action: WebhookAction) -> Result<Value> {
    Ok(system.call(action.into_tool_call()).await?)
}

pub async fn execute(oura: &OuraArgs, action: WebhookAction) -> Result<()> {
    let system = webhook_system(oura)?;
    let title = action.title();
    let result = run(&system, action).await?;
    print_json(title, &result)
}
