use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::{error, info};

use super::date_range::DateRange;
use super::error::OuraError;
use super::resource::Resource;

pub const OURA_API_BASE: &str = "https://api.ouraring.com/v2";
pub const OURA_TOKEN_URL: &str = "https://api.ouraring.com/oauth/token";

/// Bearer credential for the Oura API. Owned by the caller for one request, never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self(token.into())
    }

    /// Wrap a token only if it carries something other than whitespace
    pub fn non_blank(token: Option<&str>) -> Option<Self> {
        token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(Self::new)
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[derive(Clone)]
pub struct OuraClientConfig {
    pub access_token: AccessToken,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub base_url: String,
    pub token_url: String,
}

impl OuraClientConfig {
    pub fn new(access_token: AccessToken) -> Self {
        Self {
            access_token,
            client_id: None,
            client_secret: None,
            base_url: OURA_API_BASE.to_string(),
            token_url: OURA_TOKEN_URL.to_string(),
        }
    }

    /// Application-level configuration for calls made before any user has a token
    pub fn application<I, S>(client_id: I, client_secret: S) -> Self
    where
        I: Into<String>,
        S: Into<String>,
    {
        Self::new(AccessToken::new(String::new())).with_client_credentials(client_id, client_secret)
    }

    pub fn with_client_credentials<I, S>(mut self, client_id: I, client_secret: S) -> Self
    where
        I: Into<String>,
        S: Into<String>,
    {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_token_url<S: Into<String>>(mut self, token_url: S) -> Self {
        self.token_url = token_url.into();
        self
    }
}

impl fmt::Debug for OuraClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OuraClientConfig")
            .field("access_token", &self.access_token)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("token_url", &self.token_url)
            .finish()
    }
}

/// Thin wrapper over the Oura v2 API. Every method issues exactly one request.
#[derive(Clone)]
pub struct OuraClient {
    client: Client,
    config: OuraClientConfig,
}

impl OuraClient {
    pub fn new(config: OuraClientConfig) -> Result<Self, OuraError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client, config })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    fn client_credentials(&self) -> Result<(&str, &str), OuraError> {
        match (&self.config.client_id, &self.config.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Ok((id.as_str(), secret.as_str()))
            }
            _ => Err(OuraError::MissingClientCredentials),
        }
    }

    async fn send(&self, request: RequestBuilder, endpoint: &str) -> Result<Value, OuraError> {
        let response = request.send().await?;
        let status = response.status();
        info!(endpoint, status = status.as_u16(), "Oura API responded");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(endpoint, status = status.as_u16(), body = %body, "Oura API error");
            return Err(OuraError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| OuraError::Api {
            status: status.as_u16(),
            body: format!("response was not valid JSON ({}): {}", e, text),
        })
    }

    /// Fetch one resource. Collection resources take the date range and pagination
    /// token as query parameters; singleton resources ignore them.
    pub async fn fetch(&self, resource: Resource, range: &DateRange) -> Result<Value, OuraError> {
        range.validate()?;

        let endpoint = format!("/usercollection/{}", resource.path());
        let mut request = self
            .client
            .get(self.url(&endpoint))
            .bearer_auth(self.config.access_token.secret());

        if resource.is_collection() {
            let query = range.query_pairs();
            if !query.is_empty() {
                request = request.query(&query);
            }
        }

        info!(endpoint = %endpoint, "fetching from Oura API");
        self.send(request, &endpoint).await
    }

    pub async fn personal_info(&self) -> Result<Value, OuraError> {
        self.fetch(Resource::PersonalInfo, &DateRange::default()).await
    }

    fn webhook_request(
        &self,
        method: reqwest::Method,
        url: url::Url,
    ) -> Result<RequestBuilder, OuraError> {
        let (client_id, client_secret) = self.client_credentials()?;
        Ok(self
            .client
            .request(method, url)
            .bearer_auth(self.config.access_token.secret())
            .header("x-client-id", client_id)
            .header("x-client-secret", client_secret))
    }

    fn webhook_url(&self, id: Option<&str>) -> Result<url::Url, OuraError> {
        let mut url = url::Url::parse(&self.url("/webhook/subscription"))?;
        if let Some(id) = id {
            // `.` and `..` would be dropped as segments and retarget the collection
            if id.is_empty() || id == "." || id == ".." {
                return Err(OuraError::InvalidSubscriptionId(id.to_string()));
            }
            url.path_segments_mut()
                .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
                .push(id);
        }
        Ok(url)
    }

    pub async fn list_webhook_subscriptions(&self) -> Result<Value, OuraError> {
        let endpoint = "/webhook/subscription";
        let request = self.webhook_request(reqwest::Method::GET, self.webhook_url(None)?)?;
        self.send(request, endpoint).await
    }

    pub async fn create_webhook_subscription(
        &self,
        callback_url: &str,
        verification_token: &str,
        event_type: &str,
        data_type: &str,
    ) -> Result<Value, OuraError> {
        let endpoint = "/webhook/subscription";
        let request = self
            .webhook_request(reqwest::Method::POST, self.webhook_url(None)?)?
            .json(&json!({
                "callback_url": callback_url,
                "verification_token": verification_token,
                "event_type": event_type,
                "data_type": data_type,
            }));
        self.send(request, endpoint).await
    }

    pub async fn delete_webhook_subscription(&self, id: &str) -> Result<(), OuraError> {
        let url = self.webhook_url(Some(id))?;
        let endpoint = url.path().to_string();
        let request = self.webhook_request(reqwest::Method::DELETE, url)?;
        self.send(request, &endpoint).await.map(|_| ())
    }

    /// Trade an OAuth authorization code for a token response. The token is handed
    /// back to the caller and never stored.
    pub async fn exchange_authorization_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Value, OuraError> {
        let (client_id, client_secret) = self.client_credentials()?;
        let url = url::Url::parse(&self.config.token_url)?;
        let endpoint = url.path().to_string();

        let request = self.client.post(url).form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ]);
        self.send(request, &endpoint).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup(server: &MockServer) -> OuraClient {
        let config = OuraClientConfig::new(AccessToken::new("test-token"))
            .with_base_url(server.uri())
            .with_token_url(format!("{}/oauth/token", server.uri()));
        OuraClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_attaches_dates_verbatim() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/usercollection/daily_sleep"))
            .and(query_param("start_date", "2024-01-15"))
            .and(query_param("end_date", "2024-01-16"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"data": [{"day": "2024-01-15", "score": 82}], "next_token": null}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup(&server).await;
        let range = DateRange::new()
            .with_start_date("2024-01-15")
            .with_end_date("2024-01-16");
        let result = client.fetch(Resource::DailySleep, &range).await?;

        assert_eq!(result["data"][0]["score"], 82);
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_without_end_date_sends_only_start() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/usercollection/workout"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let client = setup(&server).await;
        let range = DateRange::new().with_start_date("2024-01-15");
        client.fetch(Resource::Workout, &range).await?;

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url.query(), Some("start_date=2024-01-15"));
        Ok(())
    }

    #[tokio::test]
    async fn test_personal_info_has_no_query() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/usercollection/personal_info"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "u1", "age": 31})),
            )
            .mount(&server)
            .await;

        let client = setup(&server).await;
        let result = client.personal_info().await?;

        assert_eq!(result["age"], 31);
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].url.query(), None);
        Ok(())
    }

    #[tokio::test]
    async fn test_non_success_status_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized token"))
            .mount(&server)
            .await;

        let client = setup(&server).await;
        let err = client
            .fetch(Resource::DailyReadiness, &DateRange::new())
            .await
            .unwrap_err();

        match err {
            OuraError::Api { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "Unauthorized token");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_date_never_reaches_network() {
        let server = MockServer::start().await;
        let client = setup(&server).await;

        let range = DateRange::new().with_start_date("last week");
        let err = client.fetch(Resource::DailySleep, &range).await.unwrap_err();

        assert!(matches!(err, OuraError::InvalidDate(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_webhooks_require_client_credentials() {
        let server = MockServer::start().await;
        let client = setup(&server).await;

        let err = client.list_webhook_subscriptions().await.unwrap_err();
        assert!(matches!(err, OuraError::MissingClientCredentials));

        let err = client.delete_webhook_subscription("sub-1").await.unwrap_err();
        assert!(matches!(err, OuraError::MissingClientCredentials));

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_webhook_sends_client_headers() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/subscription"))
            .and(header("x-client-id", "cid"))
            .and(header("x-client-secret", "csecret"))
            .and(body_string_contains("\"event_type\":\"create\""))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "sub-1",
                "callback_url": "https://example.com/hook",
                "event_type": "create",
                "data_type": "sleep",
                "expiration_time": "2025-01-01T00:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = OuraClientConfig::new(AccessToken::new("test-token"))
            .with_base_url(server.uri())
            .with_client_credentials("cid", "csecret");
        let client = OuraClient::new(config)?;

        let created = client
            .create_webhook_subscription("https://example.com/hook", "verify", "create", "sleep")
            .await?;
        assert_eq!(created["id"], "sub-1");
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_webhook_accepts_empty_body() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/webhook/subscription/sub-1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let config = OuraClientConfig::new(AccessToken::new("test-token"))
            .with_base_url(server.uri())
            .with_client_credentials("cid", "csecret");
        OuraClient::new(config)?
            .delete_webhook_subscription("sub-1")
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_webhook_encodes_id_as_one_segment() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/webhook/subscription/a%2F..%2Fb"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let config = OuraClientConfig::new(AccessToken::new("test-token"))
            .with_base_url(server.uri())
            .with_client_credentials("cid", "csecret");
        let client = OuraClient::new(config)?;
        client.delete_webhook_subscription("a/../b").await?;

        for id in ["", ".", ".."] {
            let err = client.delete_webhook_subscription(id).await.unwrap_err();
            assert!(matches!(err, OuraError::InvalidSubscriptionId(_)));
        }
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_exchange_authorization_code() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "new-token",
                "token_type": "bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = OuraClientConfig::new(AccessToken::new(""))
            .with_base_url(server.uri())
            .with_token_url(format!("{}/oauth/token", server.uri()))
            .with_client_credentials("cid", "csecret");
        let token = OuraClient::new(config)?
            .exchange_authorization_code("abc", "http://localhost:3000/auth/callback")
            .await?;

        assert_eq!(token["access_token"], "new-token");
        Ok(())
    }

    #[test]
    fn test_access_token_is_redacted() {
        let token = AccessToken::new("super-secret");
        assert_eq!(format!("{:?}", token), "AccessToken(***)");
        assert!(!format!("{:?}", OuraClientConfig::new(token)).contains("super-secret"));

        assert!(AccessToken::non_blank(Some("   ")).is_none());
        assert!(AccessToken::non_blank(None).is_none());
        assert_eq!(AccessToken::non_blank(Some(" t ")).unwrap().secret(), "t");
    }
}
