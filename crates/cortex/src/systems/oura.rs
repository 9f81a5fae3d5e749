use async_trait::async_trait;
use indoc::indoc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{parse_arguments, result_count, System};
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolCall};
use crate::oura::{DateRange, OuraClient, Resource};

/// Which arguments a catalog entry accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Params {
    None,
    DateRange,
}

/// One row of the catalog: everything needed to describe and execute a tool
#[derive(Debug, Clone, Copy)]
pub struct ResourceSpec {
    pub name: &'static str,
    pub resource: Resource,
    pub description: &'static str,
    /// Short progress label shown while the call runs
    pub activity: &'static str,
    pub params: Params,
}

pub const RESOURCES: &[ResourceSpec] = &[
    ResourceSpec {
        name: "getPersonalInfo",
        resource: Resource::PersonalInfo,
        description: "Get personal information from Oura Ring (age, weight, height, biological sex, email)",
        activity: "Fetching personal information from Oura Ring",
        params: Params::None,
    },
    ResourceSpec {
        name: "getDailySleep",
        resource: Resource::DailySleep,
        description: "Get daily sleep scores and contributors from Oura Ring for a specific date range",
        activity: "Getting sleep data and scores",
        params: Params::DateRange,
    },
    ResourceSpec {
        name: "getSleep",
        resource: Resource::Sleep,
        description: "Get detailed sleep data from Oura Ring (including sleep stages, heart rate during sleep, etc.) for a specific date range",
        activity: "Retrieving detailed sleep analysis",
        params: Params::DateRange,
    },
    ResourceSpec {
        name: "getSleepTime",
        resource: Resource::SleepTime,
        description: "Get optimal bedtime recommendations and sleep timing data from Oura Ring for a specific date range",
        activity: "Getting bedtime recommendations",
        params: Params::DateRange,
    },
    ResourceSpec {
        name: "getDailyReadiness",
        resource: Resource::DailyReadiness,
        description: "Get daily readiness scores, temperature deviation and contributors from Oura Ring for a specific date range",
        activity: "Analyzing readiness scores",
        params: Params::DateRange,
    },
    ResourceSpec {
        name: "getDailyActivity",
        resource: Resource::DailyActivity,
        description: "Get daily activity data (steps, calories, activity score) from Oura Ring for a specific date range",
        activity: "Fetching activity and steps data",
        params: Params::DateRange,
    },
    ResourceSpec {
        name: "getDailyStress",
        resource: Resource::DailyStress,
        description: "Get daily stress and recovery data from Oura Ring for a specific date range",
        activity: "Analyzing stress levels",
        params: Params::DateRange,
    },
    ResourceSpec {
        name: "getWorkouts",
        resource: Resource::Workout,
        description: "Get workout data from Oura Ring for a specific date range",
        activity: "Retrieving workout sessions",
        params: Params::DateRange,
    },
    ResourceSpec {
        name: "getHeartRate",
        resource: Resource::HeartRate,
        description: "Get heart rate measurements from Oura Ring for a specific date range",
        activity: "Retrieving heart rate measurements",
        params: Params::DateRange,
    },
    ResourceSpec {
        name: "getSessions",
        resource: Resource::Session,
        description: "Get session data (meditation, breathing exercises, etc.) from Oura Ring for a specific date range",
        activity: "Getting meditation and breathing sessions",
        params: Params::DateRange,
    },
    ResourceSpec {
        name: "getTags",
        resource: Resource::Tag,
        description: "Get user-created tags from Oura Ring for a specific date range",
        activity: "Fetching user tags",
        params: Params::DateRange,
    },
    ResourceSpec {
        name: "getEnhancedTags",
        resource: Resource::EnhancedTag,
        description: "Get enhanced tags with additional metadata from Oura Ring for a specific date range",
        activity: "Getting enhanced tag data",
        params: Params::DateRange,
    },
    ResourceSpec {
        name: "getRestModePeriods",
        resource: Resource::RestModePeriod,
        description: "Get rest mode periods from Oura Ring when rest mode was enabled for a specific date range",
        activity: "Getting rest mode periods",
        params: Params::DateRange,
    },
    ResourceSpec {
        name: "getRingConfiguration",
        resource: Resource::RingConfiguration,
        description: "Get Oura Ring device configuration and settings (color, size, firmware version, etc.)",
        activity: "Fetching ring settings",
        params: Params::None,
    },
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct DateRangeArgs {
    start_date: String,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    next_token: Option<String>,
}

impl From<DateRangeArgs> for DateRange {
    fn from(args: DateRangeArgs) -> Self {
        DateRange {
            start_date: Some(args.start_date),
            end_date: args.end_date,
            next_token: args.next_token,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

fn input_schema(params: Params) -> Value {
    match params {
        Params::None => json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
        Params::DateRange => json!({
            "type": "object",
            "required": ["startDate"],
            "properties": {
                "startDate": {
                    "type": "string",
                    "pattern": "^\\d{4}-\\d{2}-\\d{2}$",
                    "description": "Start date in YYYY-MM-DD format"
                },
                "endDate": {
                    "type": "string",
                    "pattern": "^\\d{4}-\\d{2}-\\d{2}$",
                    "description": "End date in YYYY-MM-DD format. Omit to get a single day."
                },
                "nextToken": {
                    "type": "string",
                    "description": "Pagination token from the next_token field of a previous response"
                }
            },
            "additionalProperties": false
        }),
    }
}

/// Progress label for a tool call, e.g. "Getting sleep data and scores (from 2024-01-01 to 2024-01-07)"
pub fn activity_label(tool_name: &str, arguments: &Value) -> String {
    let mut label = RESOURCES
        .iter()
        .find(|spec| spec.name == tool_name)
        .map(|spec| spec.activity.to_string())
        .unwrap_or_else(|| format!("Executing {}", tool_name));

    let range: Vec<String> = [("from", "startDate"), ("to", "endDate")]
        .iter()
        .filter_map(|(word, key)| {
            arguments
                .get(key)
                .and_then(Value::as_str)
                .map(|date| format!("{} {}", word, date))
        })
        .collect();

    if !range.is_empty() {
        label.push_str(&format!(" ({})", range.join(" ")));
    }
    label
}

/// The chat catalog: read-only access to every Oura resource
pub struct OuraSystem {
    client: OuraClient,
    tools: Vec<Tool>,
}

impl OuraSystem {
    pub fn new(client: OuraClient) -> Self {
        let tools = RESOURCES
            .iter()
            .map(|spec| Tool::new(spec.name, spec.description, input_schema(spec.params)))
            .collect();

        Self { client, tools }
    }

    fn parse_range(spec: &ResourceSpec, arguments: Value) -> AgentResult<DateRange> {
        let range = match spec.params {
            Params::None => {
                parse_arguments::<NoArgs>(arguments)?;
                DateRange::default()
            }
            Params::DateRange => parse_arguments::<DateRangeArgs>(arguments)?.into(),
        };
        range.validate().map_err(AgentError::from)?;
        Ok(range)
    }
}

#[async_trait]
impl System for OuraSystem {
    fn name(&self) -> &str {
        "oura"
    }

    fn description(&self) -> &str {
        "Read-only access to the user's Oura Ring health data"
    }

    fn instructions(&self) -> &str {
        indoc! {"
            Each tool returns the raw JSON from the Oura API. Collection tools return
            `{\"data\": [...], \"next_token\": ...}`; when next_token is not null, call the
            same tool again with nextToken set to fetch the next page.
            Always use YYYY-MM-DD format for dates. When a single day is asked about,
            pass only startDate.
        "}
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> AgentResult<Value> {
        let spec = RESOURCES
            .iter()
            .find(|spec| spec.name == tool_call.name)
            .ok_or_else(|| AgentError::ToolNotFound(tool_call.name.clone()))?;

        let label = activity_label(spec.name, &tool_call.arguments);
        let range = Self::parse_range(spec, tool_call.arguments)?;

        info!(tool = spec.name, "{}", label);
        let result = self.client.fetch(spec.resource, &range).await?;

        if let Some(count) = result_count(&result) {
            info!(tool = spec.name, count, "tool returned records");
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oura::{AccessToken, OuraClientConfig};
    use std::collections::HashSet;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup() -> (MockServer, OuraSystem) {
        let server = MockServer::start().await;
        let config =
            OuraClientConfig::new(AccessToken::new("test-token")).with_base_url(server.uri());
        let system = OuraSystem::new(OuraClient::new(config).unwrap());
        (server, system)
    }

    #[test]
    fn test_catalog_names_are_unique_and_described() {
        let names: HashSet<_> = RESOURCES.iter().map(|spec| spec.name).collect();
        assert_eq!(names.len(), RESOURCES.len());
        assert_eq!(RESOURCES.len(), 14);

        for spec in RESOURCES {
            assert!(!spec.description.is_empty(), "{} has no description", spec.name);
            if spec.params == Params::DateRange {
                assert!(spec.description.contains("date range"), "{}", spec.name);
            }
        }
    }

    #[tokio::test]
    async fn test_tools_mirror_the_table() {
        let (_server, system) = setup().await;
        let tools = system.tools();

        assert_eq!(tools.len(), RESOURCES.len());
        let sleep = tools.iter().find(|t| t.name == "getDailySleep").unwrap();
        assert_eq!(sleep.input_schema["required"], json!(["startDate"]));
        let info = tools.iter().find(|t| t.name == "getPersonalInfo").unwrap();
        assert_eq!(info.input_schema["properties"], json!({}));
    }

    #[tokio::test]
    async fn test_daily_sleep_scenario() -> anyhow::Result<()> {
        let (server, system) = setup().await;
        Mock::given(method("GET"))
            .and(path("/usercollection/daily_sleep"))
            .and(query_param("start_date", "2024-01-15"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"data": [{"day": "2024-01-15", "score": 82}], "next_token": null}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let result = system
            .call(ToolCall::new("getDailySleep", json!({"startDate": "2024-01-15"})))
            .await?;

        assert_eq!(
            result,
            json!({"data": [{"day": "2024-01-15", "score": 82}], "next_token": null})
        );
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].url.query(), Some("start_date=2024-01-15"));
        Ok(())
    }

    #[tokio::test]
    async fn test_next_token_is_threaded_through() -> anyhow::Result<()> {
        let (server, system) = setup().await;
        Mock::given(method("GET"))
            .and(path("/usercollection/heartrate"))
            .and(query_param("next_token", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;

        system
            .call(ToolCall::new(
                "getHeartRate",
                json!({"startDate": "2024-01-01", "endDate": "2024-01-02", "nextToken": "page-2"}),
            ))
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_tool_rejected_before_network() {
        let (server, system) = setup().await;

        let err = system
            .call(ToolCall::new("getBloodPressure", json!({"startDate": "2024-01-01"})))
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::ToolNotFound(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_arguments_rejected_before_network() {
        let (server, system) = setup().await;

        let cases = vec![
            ("getDailySleep", json!({})),
            ("getDailySleep", json!({"startDate": 20240115})),
            ("getDailySleep", json!({"startDate": "Jan 15"})),
            ("getDailySleep", json!({"startDate": "2024-01-15", "limit": 3})),
            ("getWorkouts", json!({"startDate": "2024-01-01", "endDate": "2024-02-30"})),
            ("getPersonalInfo", json!({"startDate": "2024-01-01"})),
        ];

        for (name, args) in cases {
            let err = system
                .call(ToolCall::new(name, args.clone()))
                .await
                .unwrap_err();
            assert!(
                matches!(err, AgentError::InvalidParameters(_)),
                "{} {} gave {:?}",
                name,
                args,
                err
            );
        }
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_singleton_accepts_missing_arguments() -> anyhow::Result<()> {
        let (server, system) = setup().await;
        Mock::given(method("GET"))
            .and(path("/usercollection/ring_configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"data": [{"id": "r1", "color": "silver", "size": 9}]}),
            ))
            .mount(&server)
            .await;

        let result = system
            .call(ToolCall::new("getRingConfiguration", Value::Null))
            .await?;
        assert_eq!(result["data"][0]["color"], "silver");
        Ok(())
    }

    #[tokio::test]
    async fn test_vendor_failure_becomes_execution_error() {
        let (server, system) = setup().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
            .mount(&server)
            .await;

        let err = system
            .call(ToolCall::new("getDailyActivity", json!({"startDate": "2024-01-15"})))
            .await
            .unwrap_err();

        match err {
            AgentError::ExecutionError(msg) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("token expired"));
            }
            other => panic!("Expected ExecutionError, got {:?}", other),
        }
    }

    #[test]
    fn test_activity_label() {
        assert_eq!(
            activity_label(
                "getDailySleep",
                &json!({"startDate": "2024-01-01", "endDate": "2024-01-07"})
            ),
            "Getting sleep data and scores (from 2024-01-01 to 2024-01-07)"
        );
        assert_eq!(
            activity_label("getRingConfiguration", &json!({})),
            "Fetching ring settings"
        );
        assert_eq!(activity_label("mystery", &Value::Null), "Executing mystery");
    }
}
