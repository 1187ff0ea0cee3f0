// quiz-api-rs/src/lib.rs
// Quiz API - question generation and answer scoring backed by OpenAI
// HTTP surface: a banner route, a health route, and a fallback that feeds
// every other path through the proxy-event dispatcher so stage-prefixed
// paths (e.g. /dev/generate-question) keep routing by substring.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::header::{HeaderName, HeaderValue},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use once_cell::sync::Lazy;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

pub mod coerce;
pub mod openai_client;
pub mod prompts;
pub mod router;

use openai_client::OpenAIClient;
use router::{HandlerError, ProxyEvent, ResponseEnvelope};

/// Maximum allowed request payload size in bytes (1 MB).
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub service_name: String,
    pub uptime_seconds: i64,
    pub status: String,
}

/// Shared application state: the completion client, constructed once at
/// startup from explicit config.
pub struct QuizApi {
    openai: OpenAIClient,
}

impl QuizApi {
    pub fn new(openai: OpenAIClient) -> Self {
        Self { openai }
    }

    /// Create the Axum router with all routes and middleware.
    pub fn create_router(self: Arc<Self>) -> Router {
        let _ = *START_TIME;

        Router::new()
            .route("/", get(Self::root_handler))
            .route("/health", get(Self::health_handler))
            .fallback(Self::proxy_handler)
            .layer(RequestBodyLimitLayer::new(MAX_PAYLOAD_SIZE))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(self)
    }

    /// GET / - Root endpoint
    async fn root_handler() -> impl IntoResponse {
        Json(serde_json::json!({
            "service": "Quiz API",
            "version": "1.0.0",
            "endpoints": [
                "GET /health",
                "POST /generate-question",
                "POST /score-answer"
            ]
        }))
    }

    /// GET /health - Health check endpoint
    async fn health_handler(State(state): State<Arc<Self>>) -> impl IntoResponse {
        let uptime = START_TIME.elapsed().as_secs() as i64;

        let healthy = state.openai.is_configured();
        let status = if healthy { "SERVING" } else { "DEGRADED" };

        Json(HealthResponse {
            healthy,
            service_name: "quiz-api".to_string(),
            uptime_seconds: uptime,
            status: status.to_string(),
        })
    }

    /// Fallback for every unrouted path: adapt the HTTP request into a proxy
    /// event, dispatch it, and render the envelope back as a real response.
    async fn proxy_handler(
        State(state): State<Arc<Self>>,
        req: axum::http::Request<Body>,
    ) -> Response {
        let (parts, body) = req.into_parts();
        let resource = parts.uri.path().to_string();

        let body_bytes = match to_bytes(body, MAX_PAYLOAD_SIZE).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let err = HandlerError::InvalidFormat(format!("Failed to read request body: {}", e));
                return err.into_envelope().into_response();
            }
        };

        let body_str = match std::str::from_utf8(&body_bytes) {
            Ok(s) => s,
            Err(_) => {
                let err =
                    HandlerError::InvalidFormat("Request body is not valid UTF-8".to_string());
                return err.into_envelope().into_response();
            }
        };

        let body = if body_str.is_empty() {
            None
        } else {
            Some(body_str.to_string())
        };

        let event = ProxyEvent::new(resource, body);
        router::handle_event(&event, &state.openai).await.into_response()
    }
}

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = (status, self.body).into_response();
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                response.headers_mut().insert(name, value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai_client::OpenAIConfig;
    use axum::http::Request;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn offline_client() -> OpenAIClient {
        OpenAIClient::new(OpenAIConfig {
            api_key: "test-api-key".to_string(),
            api_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            model: "gpt-3.5-turbo".to_string(),
        })
    }

    async fn envelope_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), MAX_PAYLOAD_SIZE)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_envelope_renders_to_http_response() {
        let envelope = ResponseEnvelope::json(404, &json!({ "error": "Invalid endpoint" }));
        let response = envelope.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response
                .headers()
                .get("Content-Type")
                .and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
    }

    #[test]
    fn test_health_reports_serving() {
        let api = Arc::new(QuizApi::new(offline_client()));
        let response = tokio_test::block_on(QuizApi::health_handler(State(api))).into_response();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_proxy_handler_rejects_non_utf8_body() {
        // The client points at a closed port, so a dispatch would surface as
        // a 500; the UTF-8 check has to reject the body before that.
        let api = Arc::new(QuizApi::new(offline_client()));
        let request = Request::builder()
            .method("POST")
            .uri("/generate-question")
            .body(Body::from(vec![0xff, 0xfe, 0x80]))
            .unwrap();

        let response = QuizApi::proxy_handler(State(api), request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = envelope_body(response).await;
        assert_eq!(
            body["error"],
            "Invalid request format: Request body is not valid UTF-8"
        );
    }

    #[tokio::test]
    async fn test_proxy_handler_routes_stage_prefixed_path() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-test",
                "object": "chat.completion",
                "created": 1700000000,
                "model": "gpt-3.5-turbo",
                "choices": [{
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": "{'Question': 'What is the capital of France?', 'Answer': 'Paris', 'Explanation': 'Paris is the capital.'}"
                    },
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAIClient::new(OpenAIConfig {
            api_key: "test-api-key".to_string(),
            api_url: format!("{}/v1/chat/completions", server.uri()),
            model: "gpt-3.5-turbo".to_string(),
        });
        let api = Arc::new(QuizApi::new(client));

        // A deployment stage prefix on the path must still reach the
        // generate-question operation via the fallback.
        let request = Request::builder()
            .method("POST")
            .uri("/dev/generate-question")
            .header("Content-Type", "application/json")
            .body(Body::from(
                json!({ "testname": "Geography", "testdescription": "European capitals" })
                    .to_string(),
            ))
            .unwrap();

        let response = QuizApi::proxy_handler(State(api), request).await;

        assert_eq!(response.status(), StatusCode::OK);
        let record = envelope_body(response).await;
        assert_eq!(record["Question"], "What is the capital of France?");
        assert_eq!(record["Answer"], "Paris");
    }
}
