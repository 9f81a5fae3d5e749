use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{parse_arguments, System};
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolCall};
use crate::oura::OuraClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Tag,
    EnhancedTag,
    Workout,
    Session,
    Sleep,
    DailySleep,
    DailyReadiness,
    DailyActivity,
    DailyStress,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Create => "create",
            EventType::Update => "update",
            EventType::Delete => "delete",
        }
    }
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Tag => "tag",
            DataType::EnhancedTag => "enhanced_tag",
            DataType::Workout => "workout",
            DataType::Session => "session",
            DataType::Sleep => "sleep",
            DataType::DailySleep => "daily_sleep",
            DataType::DailyReadiness => "daily_readiness",
            DataType::DailyActivity => "daily_activity",
            DataType::DailyStress => "daily_stress",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CreateArgs {
    callback_url: String,
    verification_token: String,
    event_type: EventType,
    data_type: DataType,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeleteArgs {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

/// Administrative catalog for managing webhook subscriptions.
///
/// Unlike [`super::OuraSystem`] these tools mutate vendor state, so they are only
/// offered to operators and never to the chat agent.
pub struct WebhookSystem {
    client: OuraClient,
    tools: Vec<Tool>,
}

impl WebhookSystem {
    pub fn new(client: OuraClient) -> Self {
        let list_tool = Tool::new(
            "getWebhookSubscriptions",
            "List all webhook subscriptions registered for this application",
            json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        );

        let create_tool = Tool::new(
            "createWebhookSubscription",
            "Create a webhook subscription so Oura sends events for one data type to a callback URL",
            json!({
                "type": "object",
                "required": ["callbackUrl", "verificationToken", "eventType", "dataType"],
                "properties": {
                    "callbackUrl": {
                        "type": "string",
                        "description": "HTTPS URL where webhook events will be sent"
                    },
                    "verificationToken": {
                        "type": "string",
                        "description": "Secret token for webhook verification"
                    },
                    "eventType": {
                        "enum": ["create", "update", "delete"],
                        "description": "Type of events to subscribe to"
                    },
                    "dataType": {
                        "enum": [
                            "tag", "enhanced_tag", "workout", "session", "sleep",
                            "daily_sleep", "daily_readiness", "daily_activity", "daily_stress"
                        ],
                        "description": "Type of data to receive events for"
                    }
                },
                "additionalProperties": false
            }),
        );

        let delete_tool = Tool::new(
            "deleteWebhookSubscription",
            "Delete a webhook subscription by id",
            json!({
                "type": "object",
                "required": ["id"],
                "properties": {
                    "id": {
                        "type": "string",
                        "description": "ID of the webhook subscription to delete"
                    }
                },
                "additionalProperties": false
            }),
        );

        Self {
            client,
            tools: vec![list_tool, create_tool, delete_tool],
        }
    }

    async fn list(&self, arguments: Value) -> AgentResult<Value> {
        parse_arguments::<NoArgs>(arguments)?;
        Ok(self.client.list_webhook_subscriptions().await?)
    }

    async fn create(&self, arguments: Value) -> AgentResult<Value> {
        let args: CreateArgs = parse_arguments(arguments)?;
        let callback = url::Url::parse(&args.callback_url).map_err(|e| {
            AgentError::InvalidParameters(format!("callbackUrl '{}': {}", args.callback_url, e))
        })?;

        info!(
            event_type = args.event_type.as_str(),
            data_type = args.data_type.as_str(),
            "creating webhook subscription"
        );
        Ok(self
            .client
            .create_webhook_subscription(
                callback.as_str(),
                &args.verification_token,
                args.event_type.as_str(),
                args.data_type.as_str(),
            )
            .await?)
    }

    async fn delete(&self, arguments: Value) -> AgentResult<Value> {
        let args: DeleteArgs = parse_arguments(arguments)?;
        if args.id.trim().is_empty() {
            return Err(AgentError::InvalidParameters("id must not be empty".into()));
        }

        self.client.delete_webhook_subscription(&args.id).await?;
        Ok(json!({
            "success": true,
            "message": format!("Webhook subscription {} deleted", args.id)
        }))
    }
}

#[async_trait]
impl System for WebhookSystem {
    fn name(&self) -> &str {
        "webhook"
    }

    fn description(&self) -> &str {
        "Manage Oura webhook subscriptions for this application"
    }

    fn instructions(&self) -> &str {
        "Requires the application's client id and secret. Subscriptions expire and must be renewed."
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> AgentResult<Value> {
        match tool_call.name.as_str() {
            "getWebhookSubscriptions" => self.list(tool_call.arguments).await,
            "createWebhookSubscription" => self.create(tool_call.arguments).await,
            "deleteWebhookSubscription" => self.delete(tool_call.arguments).await,
            _ => Err(AgentError::ToolNotFound(tool_call.name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oura::{AccessToken, OuraClientConfig};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup(with_credentials: bool) -> (MockServer, WebhookSystem) {
        let server = MockServer::start().await;
        let mut config =
            OuraClientConfig::new(AccessToken::new("test-token")).with_base_url(server.uri());
        if with_credentials {
            config = config.with_client_credentials("cid", "csecret");
        }
        let system = WebhookSystem::new(OuraClient::new(config).unwrap());
        (server, system)
    }

    #[tokio::test]
    async fn test_create_maps_arguments_to_vendor_fields() -> anyhow::Result<()> {
        let (server, system) = setup(true).await;
        Mock::given(method("POST"))
            .and(path("/webhook/subscription"))
            .and(body_json(json!({
                "callback_url": "https://example.com/hook",
                "verification_token": "verify-me",
                "event_type": "update",
                "data_type": "daily_sleep"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "sub-9"})))
            .expect(1)
            .mount(&server)
            .await;

        let result = system
            .call(ToolCall::new(
                "createWebhookSubscription",
                json!({
                    "callbackUrl": "https://example.com/hook",
                    "verificationToken": "verify-me",
                    "eventType": "update",
                    "dataType": "daily_sleep"
                }),
            ))
            .await?;

        assert_eq!(result["id"], "sub-9");
        Ok(())
    }

    #[tokio::test]
    async fn test_create_rejects_bad_enums_and_urls() {
        let (server, system) = setup(true).await;

        for args in [
            json!({"callbackUrl": "not a url", "verificationToken": "t", "eventType": "create", "dataType": "sleep"}),
            json!({"callbackUrl": "https://x.io", "verificationToken": "t", "eventType": "upsert", "dataType": "sleep"}),
            json!({"callbackUrl": "https://x.io", "verificationToken": "t", "eventType": "create", "dataType": "heartrate"}),
            json!({"callbackUrl": "https://x.io", "eventType": "create", "dataType": "sleep"}),
        ] {
            let err = system
                .call(ToolCall::new("createWebhookSubscription", args))
                .await
                .unwrap_err();
            assert!(matches!(err, AgentError::InvalidParameters(_)), "{:?}", err);
        }
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_client_credentials_fail_before_network() {
        let (server, system) = setup(false).await;

        let err = system
            .call(ToolCall::new("getWebhookSubscriptions", json!({})))
            .await
            .unwrap_err();

        match err {
            AgentError::ExecutionError(msg) => assert!(msg.contains("client id")),
            other => panic!("Expected ExecutionError, got {:?}", other),
        }
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_reports_success() -> anyhow::Result<()> {
        let (server, system) = setup(true).await;
        Mock::given(method("DELETE"))
            .and(path("/webhook/subscription/sub-1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let result = system
            .call(ToolCall::new("deleteWebhookSubscription", json!({"id": "sub-1"})))
            .await?;

        assert_eq!(result["success"], true);
        assert_eq!(result["message"], "Webhook subscription sub-1 deleted");
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (_server, system) = setup(true).await;
        let err = system
            .call(ToolCall::new("renewWebhookSubscription", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ToolNotFound(_)));
    }
}
