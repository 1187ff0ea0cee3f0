// quiz-api-rs/src/router.rs
//
// Dispatch from proxy events to response envelopes.
//
// Every outcome of a quiz request - success or failure - leaves this module
// as a ResponseEnvelope; errors never escape to the HTTP layer as raw types.
// Routing happens before the body is parsed so an unknown path is a 404 no
// matter what the body contains.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use thiserror::Error;

use crate::coerce::{self, CoercionError};
use crate::openai_client::{OpenAIClient, OpenAIError};
use crate::prompts;

/// Fixed 400 message for a generate-question request with missing fields.
pub const GENERATE_FIELDS_REQUIRED: &str = "testname and testdescription are required";

/// Fixed 400 message for a score-answer request with missing fields.
pub const SCORE_FIELDS_REQUIRED: &str =
    "All fields (testname, testdescription, testquestion, realanswer, useranswer) are required";

const GENERATE_REPLY_FIELDS: &[&str] = &["Question", "Answer", "Explanation"];
const SCORE_REPLY_FIELDS: &[&str] = &["Score", "Feedback"];

/// Inbound HTTP-style event: the resource path plus the raw request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyEvent {
    pub resource: String,
    #[serde(default)]
    pub body: Option<String>,
}

impl ProxyEvent {
    pub fn new(resource: String, body: Option<String>) -> Self {
        Self { resource, body }
    }
}

/// Outbound envelope. The `body` field is itself a JSON-encoded document, and
/// `statusCode` keeps its camelCase spelling on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl ResponseEnvelope {
    /// Wrap `body` as the envelope's JSON-encoded body with the JSON
    /// content-type header.
    pub fn json(status_code: u16, body: &Value) -> Self {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());

        Self {
            status_code,
            headers,
            // Serializing a Value cannot fail; the fallback is unreachable.
            body: serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string()),
        }
    }
}

/// The two quiz operations, selected by substring match on the resource path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GenerateQuestion,
    ScoreAnswer,
}

impl Operation {
    /// Substring matching keeps stage-prefixed paths like
    /// `/dev/generate-question` routable.
    pub fn from_path(path: &str) -> Option<Self> {
        if path.contains("/generate-question") {
            Some(Operation::GenerateQuestion)
        } else if path.contains("/score-answer") {
            Some(Operation::ScoreAnswer)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::GenerateQuestion => "generate-question",
            Operation::ScoreAnswer => "score-answer",
        }
    }

    /// Fields the model reply must contain for this operation.
    pub fn reply_fields(&self) -> &'static [&'static str] {
        match self {
            Operation::GenerateQuestion => GENERATE_REPLY_FIELDS,
            Operation::ScoreAnswer => SCORE_REPLY_FIELDS,
        }
    }
}

/// Everything that can go wrong while handling a routed request.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    MissingFields(&'static str),
    #[error("Invalid request format: {0}")]
    InvalidFormat(String),
    #[error("Invalid endpoint")]
    UnknownEndpoint,
    #[error(transparent)]
    Upstream(#[from] OpenAIError),
    #[error(transparent)]
    Coercion(#[from] CoercionError),
}

impl HandlerError {
    /// Map the error onto the envelope the client sees.
    pub fn into_envelope(self) -> ResponseEnvelope {
        match self {
            HandlerError::MissingFields(message) => {
                ResponseEnvelope::json(400, &json!({ "error": message }))
            }
            HandlerError::InvalidFormat(detail) => ResponseEnvelope::json(
                400,
                &json!({ "error": format!("Invalid request format: {}", detail) }),
            ),
            HandlerError::UnknownEndpoint => {
                ResponseEnvelope::json(404, &json!({ "error": "Invalid endpoint" }))
            }
            HandlerError::Upstream(err) => ResponseEnvelope::json(
                500,
                &json!({ "error": format!("An unexpected error occurred: {}", err) }),
            ),
            HandlerError::Coercion(CoercionError::InvalidFormat { raw }) => ResponseEnvelope::json(
                500,
                &json!({
                    "error": "Invalid response format from OpenAI",
                    "raw_response": raw,
                }),
            ),
            HandlerError::Coercion(CoercionError::IncompleteFields { raw }) => {
                ResponseEnvelope::json(
                    500,
                    &json!({
                        "error": "Incomplete response from OpenAI",
                        "raw_response": raw,
                    }),
                )
            }
        }
    }
}

/// Handle one proxy event end to end. Routing comes first; the body is only
/// parsed once a known operation matched.
pub async fn handle_event(event: &ProxyEvent, client: &OpenAIClient) -> ResponseEnvelope {
    log::info!("Handling request for resource: {}", event.resource);

    let operation = match Operation::from_path(&event.resource) {
        Some(operation) => operation,
        None => {
            log::warn!("No operation matches resource: {}", event.resource);
            return HandlerError::UnknownEndpoint.into_envelope();
        }
    };

    match run_operation(operation, event, client).await {
        Ok(envelope) => envelope,
        Err(err) => {
            log::error!("{} request failed: {}", operation.name(), err);
            err.into_envelope()
        }
    }
}

async fn run_operation(
    operation: Operation,
    event: &ProxyEvent,
    client: &OpenAIClient,
) -> Result<ResponseEnvelope, HandlerError> {
    let body: Value = serde_json::from_str(event.body.as_deref().unwrap_or_default())
        .map_err(|e| HandlerError::InvalidFormat(e.to_string()))?;

    let prompt = match operation {
        Operation::GenerateQuestion => {
            match (
                string_field(&body, "testname"),
                string_field(&body, "testdescription"),
            ) {
                (Some(testname), Some(testdescription)) => {
                    prompts::build_generate_question_prompt(testname, testdescription)
                }
                _ => return Err(HandlerError::MissingFields(GENERATE_FIELDS_REQUIRED)),
            }
        }
        Operation::ScoreAnswer => {
            match (
                string_field(&body, "testname"),
                string_field(&body, "testdescription"),
                string_field(&body, "testquestion"),
                string_field(&body, "realanswer"),
                string_field(&body, "useranswer"),
            ) {
                (
                    Some(testname),
                    Some(testdescription),
                    Some(testquestion),
                    Some(realanswer),
                    Some(useranswer),
                ) => prompts::build_score_answer_prompt(
                    testname,
                    testdescription,
                    testquestion,
                    realanswer,
                    useranswer,
                ),
                _ => return Err(HandlerError::MissingFields(SCORE_FIELDS_REQUIRED)),
            }
        }
    };

    let reply = client.complete(&prompt).await?;
    log::info!("Raw OpenAI response: {}", reply);

    let record = coerce::coerce_to_record(&reply, operation.reply_fields())?;

    Ok(ResponseEnvelope::json(200, &Value::Object(record)))
}

/// A required request field counts only when present and a non-empty string.
fn string_field<'a>(body: &'a Value, name: &str) -> Option<&'a str> {
    body.get(name)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_matches_substrings() {
        assert_eq!(
            Operation::from_path("/generate-question"),
            Some(Operation::GenerateQuestion)
        );
        assert_eq!(
            Operation::from_path("/dev/generate-question"),
            Some(Operation::GenerateQuestion)
        );
        assert_eq!(
            Operation::from_path("/prod/score-answer"),
            Some(Operation::ScoreAnswer)
        );
        assert_eq!(Operation::from_path("/quiz"), None);
        assert_eq!(Operation::from_path("/"), None);
        // Bare names without the leading slash do not route.
        assert_eq!(Operation::from_path("generate-question"), None);
    }

    #[test]
    fn test_envelope_shape() {
        let envelope = ResponseEnvelope::json(200, &json!({ "ok": true }));

        assert_eq!(envelope.status_code, 200);
        assert_eq!(
            envelope.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(envelope.body, "{\"ok\":true}");

        // statusCode keeps its camelCase spelling when serialized.
        let wire = serde_json::to_value(&envelope).unwrap();
        assert_eq!(wire["statusCode"], 200);
        assert!(wire.get("status_code").is_none());
    }

    #[test]
    fn test_unknown_endpoint_envelope() {
        let envelope = HandlerError::UnknownEndpoint.into_envelope();

        assert_eq!(envelope.status_code, 404);
        let body: Value = serde_json::from_str(&envelope.body).unwrap();
        assert_eq!(body["error"], "Invalid endpoint");
    }

    #[test]
    fn test_missing_fields_envelopes_use_fixed_messages() {
        let generate = HandlerError::MissingFields(GENERATE_FIELDS_REQUIRED).into_envelope();
        assert_eq!(generate.status_code, 400);
        let body: Value = serde_json::from_str(&generate.body).unwrap();
        assert_eq!(body["error"], "testname and testdescription are required");

        let score = HandlerError::MissingFields(SCORE_FIELDS_REQUIRED).into_envelope();
        assert_eq!(score.status_code, 400);
        let body: Value = serde_json::from_str(&score.body).unwrap();
        assert_eq!(
            body["error"],
            "All fields (testname, testdescription, testquestion, realanswer, useranswer) are required"
        );
    }

    #[test]
    fn test_coercion_envelopes_keep_raw_reply() {
        let invalid = HandlerError::Coercion(CoercionError::InvalidFormat {
            raw: "not json".to_string(),
        })
        .into_envelope();
        assert_eq!(invalid.status_code, 500);
        let body: Value = serde_json::from_str(&invalid.body).unwrap();
        assert_eq!(body["error"], "Invalid response format from OpenAI");
        assert_eq!(body["raw_response"], "not json");

        let incomplete = HandlerError::Coercion(CoercionError::IncompleteFields {
            raw: "{ 'Score': '1' }".to_string(),
        })
        .into_envelope();
        assert_eq!(incomplete.status_code, 500);
        let body: Value = serde_json::from_str(&incomplete.body).unwrap();
        assert_eq!(body["error"], "Incomplete response from OpenAI");
        assert_eq!(body["raw_response"], "{ 'Score': '1' }");
    }

    #[test]
    fn test_upstream_envelope_prefixes_details() {
        let err = HandlerError::Upstream(OpenAIError::Network("Connection failed: refused".into()));
        let envelope = err.into_envelope();

        assert_eq!(envelope.status_code, 500);
        let body: Value = serde_json::from_str(&envelope.body).unwrap();
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with("An unexpected error occurred: "));
        assert!(message.contains("Connection failed: refused"));
    }

    #[test]
    fn test_string_field_rejects_empty_and_non_string() {
        let body = json!({
            "testname": "Rust",
            "empty": "",
            "number": 7,
            "null": null,
        });

        assert_eq!(string_field(&body, "testname"), Some("Rust"));
        assert_eq!(string_field(&body, "empty"), None);
        assert_eq!(string_field(&body, "number"), None);
        assert_eq!(string_field(&body, "null"), None);
        assert_eq!(string_field(&body, "absent"), None);
    }
}
