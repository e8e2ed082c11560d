//! Dialogflow ES v2 sessions client.
//!
//! Calls `projects.agent.sessions.detectIntent` over REST with a bearer
//! token from a [`TokenSource`]. One client (and its connection pool) is
//! shared by every in-flight request.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{IntentDetector, NluError, NluResult, SessionId};
use crate::auth::TokenSource;
use crate::config::SessionConfig;
use crate::entity::flatten_parameters;

/// Public Dialogflow API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://dialogflow.googleapis.com";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentRequest<'a> {
    query_input: QueryInput<'a>,
    query_params: QueryParams<'a>,
}

#[derive(Serialize)]
struct QueryInput<'a> {
    text: TextInput<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TextInput<'a> {
    text: &'a str,
    language_code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryParams<'a> {
    time_zone: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DetectIntentResponse {
    response_id: String,
    query_result: QueryResult,
}

/// The `queryResult` portion of a detect-intent response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryResult {
    pub query_text: String,
    pub parameters: Option<Value>,
    pub intent: Option<MatchedIntent>,
    pub intent_detection_confidence: f32,
    pub fulfillment_messages: Vec<Value>,
}

/// Intent matched by the agent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchedIntent {
    pub name: String,
    pub display_name: String,
}

impl From<QueryResult> for NluResult {
    fn from(query_result: QueryResult) -> Self {
        let mut result = NluResult {
            entities: flatten_parameters(query_result.parameters),
            ..NluResult::default()
        };
        if let Some(intent) = query_result.intent {
            result.intent = intent.display_name;
            result.confidence = query_result.intent_detection_confidence;
            result.fulfillment_messages = query_result.fulfillment_messages;
        }
        result
    }
}

/// [`IntentDetector`] backed by a Dialogflow ES agent.
pub struct DialogflowClient {
    http: Client,
    config: SessionConfig,
    tokens: Arc<dyn TokenSource>,
    base_url: String,
}

impl DialogflowClient {
    pub fn new(http: Client, config: SessionConfig, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http,
            config,
            tokens,
            base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API endpoint (regional endpoints, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn detect_intent_url(&self, session_id: &SessionId) -> String {
        format!(
            "{}/v2/{}:detectIntent",
            self.base_url,
            self.config.session_path(session_id.as_str())
        )
    }
}

#[async_trait]
impl IntentDetector for DialogflowClient {
    async fn detect_intent(
        &self,
        text: &str,
        session_id: &SessionId,
    ) -> Result<NluResult, NluError> {
        let token = self.tokens.access_token().await?;
        let url = self.detect_intent_url(session_id);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&DetectIntentRequest {
                query_input: QueryInput {
                    text: TextInput {
                        text,
                        language_code: &self.config.language_code,
                    },
                },
                query_params: QueryParams {
                    time_zone: &self.config.time_zone,
                },
            })
            .send()
            .await
            .map_err(|e| NluError::Transport(format!("detectIntent request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(NluError::Provider { status, body });
        }

        let data: DetectIntentResponse = resp
            .json()
            .await
            .map_err(|e| NluError::Decode(format!("detectIntent response parse error: {e}")))?;

        let intent_name = data
            .query_result
            .intent
            .as_ref()
            .map(|i| i.name.as_str())
            .unwrap_or_default();
        debug!(
            response_id = %data.response_id,
            intent = %intent_name,
            query_text = %data.query_result.query_text,
            "detectIntent response"
        );
        Ok(data.query_result.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenSource;
    use serde_json::json;

    fn parse(v: Value) -> NluResult {
        let qr: QueryResult = serde_json::from_value(v).unwrap();
        qr.into()
    }

    #[test]
    fn matched_intent_populates_all_fields() {
        let result = parse(json!({
            "queryText": "book a table for 2",
            "parameters": { "guests": 2, "city": "Boston" },
            "intent": { "name": "projects/p/agent/intents/1", "displayName": "book.table" },
            "intentDetectionConfidence": 0.87,
            "fulfillmentMessages": [ { "text": { "text": ["Sure!"] } } ],
        }));
        assert_eq!(result.intent, "book.table");
        assert!((result.confidence - 0.87).abs() < 1e-6);
        assert_eq!(result.entities["guests"], "2.000000");
        assert_eq!(result.entities["city"], "Boston");
        assert_eq!(result.fulfillment_messages.len(), 1);
        assert_eq!(result.fulfillment_messages[0]["text"]["text"][0], "Sure!");
    }

    #[test]
    fn no_intent_still_reports_entities() {
        let result = parse(json!({
            "queryText": "asdf",
            "parameters": { "color": "red" },
            "intentDetectionConfidence": 0.3,
            "fulfillmentMessages": [ { "text": { "text": ["?"] } } ],
        }));
        assert!(result.intent.is_empty());
        assert_eq!(result.confidence, 0.0);
        assert!(result.fulfillment_messages.is_empty());
        assert_eq!(result.entities["color"], "red");
    }

    #[test]
    fn empty_query_result_maps_to_default() {
        assert_eq!(parse(json!({})), NluResult::default());
    }

    #[test]
    fn request_body_uses_camel_case() {
        let body = serde_json::to_value(DetectIntentRequest {
            query_input: QueryInput {
                text: TextInput {
                    text: "hi",
                    language_code: "en",
                },
            },
            query_params: QueryParams {
                time_zone: "America/New_York",
            },
        })
        .unwrap();
        assert_eq!(
            body,
            json!({
                "queryInput": { "text": { "text": "hi", "languageCode": "en" } },
                "queryParams": { "timeZone": "America/New_York" },
            })
        );
    }

    #[test]
    fn url_targets_session_resource() {
        let client = DialogflowClient::new(
            Client::new(),
            SessionConfig {
                project_id: "proj".into(),
                ..SessionConfig::default()
            },
            Arc::new(StaticTokenSource::new("t")),
        )
        .with_base_url("http://localhost:9999/");
        let sid = SessionId::from("abc".to_string());
        assert_eq!(
            client.detect_intent_url(&sid),
            "http://localhost:9999/v2/projects/proj/agent/sessions/abc:detectIntent"
        );
    }
}
