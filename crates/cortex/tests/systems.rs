use anyhow::Result;
use cortex::agent::Agent;
use cortex::models::message::Message;
use cortex::oura::{AccessToken, OuraClient, OuraClientConfig};
use cortex::providers::configs::OpenAiProviderConfig;
use cortex::providers::openai::OpenAiProvider;
use cortex::systems::OuraSystem;
use futures::TryStreamExt;
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(message: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"index": 0, "message": message, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    }))
}

fn sleep_tool_call() -> Value {
    json!({
        "role": "assistant",
        "content": null,
        "tool_calls": [{
            "id": "call_1",
            "type": "function",
            "function": {
                "name": "oura__getDailySleep",
                "arguments": "{\"startDate\":\"2024-01-15\"}"
            }
        }]
    })
}

async fn build_agent(model: &MockServer, oura: &MockServer) -> Result<Agent> {
    let mut config = OpenAiProviderConfig::new("test_api_key");
    config.host = model.uri();
    let provider = OpenAiProvider::new(config)?;

    let client = OuraClient::new(
        OuraClientConfig::new(AccessToken::new("user-token")).with_base_url(oura.uri()),
    )?;

    let mut agent = Agent::new(Box::new(provider));
    agent.add_system(Box::new(OuraSystem::new(client)));
    Ok(agent)
}

#[tokio::test]
async fn test_sleep_question_round_trip() -> Result<()> {
    let model = MockServer::start().await;
    let oura = MockServer::start().await;

    // The second completion carries the tool result back to the model
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("\\\"score\\\":82"))
        .respond_with(completion(json!({
            "role": "assistant",
            "content": "Your sleep score on 2024-01-15 was 82."
        })))
        .with_priority(1)
        .mount(&model)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion(sleep_tool_call()))
        .with_priority(2)
        .mount(&model)
        .await;

    Mock::given(method("GET"))
        .and(path("/usercollection/daily_sleep"))
        .and(query_param("start_date", "2024-01-15"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"day": "2024-01-15", "score": 82}],
            "next_token": null
        })))
        .expect(1)
        .mount(&oura)
        .await;

    let agent = build_agent(&model, &oura).await?;
    let answer = agent
        .answer(&[Message::user().with_text("What was my sleep score on 2024-01-15?")])
        .await?;

    assert!(answer.contains("82"));
    let requests = oura.received_requests().await.unwrap();
    assert_eq!(
        requests[0].headers.get("authorization").unwrap(),
        "Bearer user-token"
    );
    Ok(())
}

#[tokio::test]
async fn test_vendor_rejection_reaches_the_model() -> Result<()> {
    let model = MockServer::start().await;
    let oura = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("Oura API error: 401"))
        .respond_with(completion(json!({
            "role": "assistant",
            "content": "I could not access your Oura data: the token was rejected."
        })))
        .with_priority(1)
        .mount(&model)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion(sleep_tool_call()))
        .with_priority(2)
        .mount(&model)
        .await;

    Mock::given(method("GET"))
        .and(path("/usercollection/daily_sleep"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&oura)
        .await;

    let agent = build_agent(&model, &oura).await?;
    let messages: Vec<Message> = agent
        .reply(&[Message::user().with_text("How did I sleep on 2024-01-15?")])
        .await?
        .try_collect()
        .await?;

    assert_eq!(messages.len(), 3);
    let response = messages[1].content[0].as_tool_response().unwrap();
    let err = response.tool_result.as_ref().unwrap_err();
    assert!(err.to_string().contains("401"));
    assert!(messages[2].as_concat_text().contains("rejected"));
    Ok(())
}
