use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::{Json, extract::State};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::cache::cache_key;
use crate::error::InvokeError;
use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::{GatewayEvent, QueuedPrompt, ResponseEnvelope};
use crate::state::AppState;

// Decode (base64 per the event flag) and parse the body as JSON. Any
// failure here means one thing to the caller: the body was not valid JSON.
fn parse_body(event: &GatewayEvent) -> Result<Value> {
    let raw = event.body.clone().unwrap_or_else(|| "{}".to_string());
    let raw = if event.is_base64_encoded {
        String::from_utf8(BASE64.decode(raw.as_bytes())?)?
    } else {
        raw
    };
    Ok(serde_json::from_str(&raw)?)
}

// post handler wrapping the event contract with request metrics
pub async fn invoke_handler(
    State(state): State<Arc<AppState>>,
    Json(event): Json<GatewayEvent>,
) -> Json<ResponseEnvelope> {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();

    let envelope = handle_event(&state, event).await;

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    Json(envelope)
}

// Handle one gateway event. Every failure path terminates in a well-formed
// envelope with CORS headers; nothing escapes this function as an error.
pub async fn handle_event(state: &AppState, event: GatewayEvent) -> ResponseEnvelope {
    // CORS preflight: answer immediately, skip all other processing
    if event.method() == "OPTIONS" {
        return ResponseEnvelope::no_content(&state.cors);
    }

    // fail fast when no model is configured
    if state.model_id.is_empty() {
        error!("MODEL_ID not configured");
        return ResponseEnvelope::error(500, &state.cors, "Service misconfigured");
    }

    let body = match parse_body(&event) {
        Ok(body) => body,
        Err(_) => return ResponseEnvelope::error(400, &state.cors, "Body must be valid JSON"),
    };

    let prompt = body
        .get("prompt")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();
    if prompt.is_empty() {
        return ResponseEnvelope::error(400, &state.cors, "Missing 'prompt' in request body");
    }

    let prompt_chars = prompt.chars().count();
    if prompt_chars > state.max_prompt_length {
        return ResponseEnvelope::error(
            400,
            &state.cors,
            &format!("Prompt exceeds {} characters", state.max_prompt_length),
        );
    }

    info!(prompt_chars, "processing prompt");

    // hand the prompt to the worker that owns the cache
    let (response_tx, response_rx) = oneshot::channel();
    let queued = QueuedPrompt {
        cache_key: cache_key(&prompt),
        prompt,
        response_tx,
    };

    let result = match state.queue_tx.send(queued).await {
        Ok(()) => response_rx.await.unwrap_or_else(|_| {
            Err(InvokeError::Internal("worker dropped the request".to_string()))
        }),
        Err(_) => Err(InvokeError::Internal("worker queue closed".to_string())),
    };

    match result {
        Ok(answer) => ResponseEnvelope::answer(&state.cors, &answer),
        Err(err) => {
            // classification is logged here, never returned to the caller
            error!(error = %err, "prompt could not be answered");
            ResponseEnvelope::error(err.status(), &state.cors, err.public_message())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bedrock::GenerateText;
    use crate::bedrock::testing::{MockBehavior, MockGenerate};
    use crate::cache::PromptCache;
    use crate::models::CorsHeaders;
    use crate::worker::invoke_worker;
    use base64::Engine as _;
    use tokio::sync::mpsc;

    // state whose queue leads nowhere; fine for branches that never enqueue
    fn detached_state(model_id: &str) -> AppState {
        let (queue_tx, _rx) = mpsc::channel(1);
        AppState {
            model_id: model_id.to_string(),
            max_prompt_length: 2000,
            cors: CorsHeaders::new("*"),
            queue_tx,
        }
    }

    fn state_with_worker(mock: Arc<MockGenerate>, cache_capacity: usize) -> AppState {
        let (queue_tx, queue_rx) = mpsc::channel(8);
        let client: Arc<dyn GenerateText> = mock;
        tokio::spawn(invoke_worker(
            queue_rx,
            client,
            PromptCache::new(cache_capacity),
        ));
        AppState {
            model_id: "amazon.nova-micro-v1:0".to_string(),
            max_prompt_length: 2000,
            cors: CorsHeaders::new("*"),
            queue_tx,
        }
    }

    fn post_event(body: &str) -> GatewayEvent {
        GatewayEvent {
            http_method: Some("POST".to_string()),
            body: Some(body.to_string()),
            ..GatewayEvent::default()
        }
    }

    fn body_json(envelope: &ResponseEnvelope) -> Value {
        serde_json::from_str(&envelope.body).unwrap()
    }

    #[tokio::test]
    async fn preflight_short_circuits_regardless_of_body() {
        let state = detached_state("");
        let event = GatewayEvent {
            http_method: Some("OPTIONS".to_string()),
            body: Some("not even json".to_string()),
            ..GatewayEvent::default()
        };

        let envelope = handle_event(&state, event).await;
        assert_eq!(envelope.status_code, 204);
        assert!(envelope.body.is_empty());
        assert_eq!(envelope.headers.allow_methods, "OPTIONS,POST");
    }

    #[tokio::test]
    async fn missing_model_id_is_a_configuration_error() {
        let state = detached_state("");
        let envelope = handle_event(&state, post_event(r#"{"prompt": "hi"}"#)).await;
        assert_eq!(envelope.status_code, 500);
        assert_eq!(body_json(&envelope)["error"], "Service misconfigured");
    }

    #[tokio::test]
    async fn malformed_json_body_is_rejected() {
        let state = detached_state("model");
        let envelope = handle_event(&state, post_event("{not json")).await;
        assert_eq!(envelope.status_code, 400);
        assert_eq!(body_json(&envelope)["error"], "Body must be valid JSON");
    }

    #[tokio::test]
    async fn invalid_base64_body_is_rejected() {
        let state = detached_state("model");
        let mut event = post_event("!!!not-base64!!!");
        event.is_base64_encoded = true;

        let envelope = handle_event(&state, event).await;
        assert_eq!(envelope.status_code, 400);
        assert_eq!(body_json(&envelope)["error"], "Body must be valid JSON");
    }

    #[tokio::test]
    async fn missing_prompt_is_rejected() {
        let state = detached_state("model");
        for body in [r#"{}"#, r#"{"prompt": ""}"#, r#"{"prompt": "   "}"#, r#"{"prompt": 42}"#] {
            let envelope = handle_event(&state, post_event(body)).await;
            assert_eq!(envelope.status_code, 400);
            assert_eq!(
                body_json(&envelope)["error"],
                "Missing 'prompt' in request body"
            );
        }
    }

    #[tokio::test]
    async fn absent_body_counts_as_missing_prompt() {
        let state = detached_state("model");
        let event = GatewayEvent {
            http_method: Some("POST".to_string()),
            ..GatewayEvent::default()
        };
        let envelope = handle_event(&state, event).await;
        assert_eq!(envelope.status_code, 400);
        assert_eq!(body_json(&envelope)["error"], "Missing 'prompt' in request body");
    }

    #[tokio::test]
    async fn oversized_prompt_names_the_limit() {
        let mut state = detached_state("model");
        state.max_prompt_length = 10;

        let body = format!(r#"{{"prompt": "{}"}}"#, "x".repeat(11));
        let envelope = handle_event(&state, post_event(&body)).await;
        assert_eq!(envelope.status_code, 400);
        assert_eq!(body_json(&envelope)["error"], "Prompt exceeds 10 characters");
    }

    #[tokio::test]
    async fn prompt_at_the_limit_is_accepted() {
        let mock = Arc::new(MockGenerate::answering("ok"));
        let mut state = state_with_worker(mock, 100);
        state.max_prompt_length = 10;

        let body = format!(r#"{{"prompt": "{}"}}"#, "x".repeat(10));
        let envelope = handle_event(&state, post_event(&body)).await;
        assert_eq!(envelope.status_code, 200);
    }

    #[tokio::test]
    async fn answer_round_trip_and_normalized_cache_hit() {
        let mock = Arc::new(MockGenerate::answering("Hi there!"));
        let state = state_with_worker(mock.clone(), 100);

        let envelope = handle_event(&state, post_event(r#"{"prompt": "Hello"}"#)).await;
        assert_eq!(envelope.status_code, 200);
        assert_eq!(body_json(&envelope)["answer"], "Hi there!");

        // same prompt up to case and surrounding whitespace: cached
        let envelope = handle_event(&state, post_event(r#"{"prompt": "  hello  "}"#)).await;
        assert_eq!(envelope.status_code, 200);
        assert_eq!(body_json(&envelope)["answer"], "Hi there!");
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn base64_encoded_body_is_decoded() {
        let mock = Arc::new(MockGenerate::answering("decoded fine"));
        let state = state_with_worker(mock, 100);

        let encoded = base64::engine::general_purpose::STANDARD.encode(r#"{"prompt": "Hello"}"#);
        let mut event = post_event(&encoded);
        event.is_base64_encoded = true;

        let envelope = handle_event(&state, event).await;
        assert_eq!(envelope.status_code, 200);
        assert_eq!(body_json(&envelope)["answer"], "decoded fine");
    }

    #[tokio::test]
    async fn throttling_maps_to_429() {
        let mock = Arc::new(MockGenerate::new(MockBehavior::Throttle));
        let state = state_with_worker(mock, 100);

        let envelope = handle_event(&state, post_event(r#"{"prompt": "hi"}"#)).await;
        assert_eq!(envelope.status_code, 429);
        assert_eq!(body_json(&envelope)["error"], "Rate limit exceeded");
    }

    #[tokio::test]
    async fn other_provider_codes_map_to_500_without_leaking() {
        let mock = Arc::new(MockGenerate::new(MockBehavior::ApiError(
            "ValidationException".to_string(),
        )));
        let state = state_with_worker(mock, 100);

        let envelope = handle_event(&state, post_event(r#"{"prompt": "hi"}"#)).await;
        assert_eq!(envelope.status_code, 500);
        assert_eq!(body_json(&envelope)["error"], "Model invocation failed");
        assert!(!envelope.body.contains("ValidationException"));
    }

    #[tokio::test]
    async fn closed_worker_queue_is_an_internal_error() {
        let state = detached_state("model");
        // detached_state dropped the receiver, so the send fails
        let envelope = handle_event(&state, post_event(r#"{"prompt": "hi"}"#)).await;
        assert_eq!(envelope.status_code, 500);
        assert_eq!(body_json(&envelope)["error"], "Internal server error");
    }

    #[tokio::test]
    async fn rest_api_event_shape_is_accepted() {
        let mock = Arc::new(MockGenerate::answering("ok"));
        let state = state_with_worker(mock, 100);

        let event: GatewayEvent = serde_json::from_str(
            r#"{"httpMethod": "POST", "body": "{\"prompt\": \"hi\"}"}"#,
        )
        .unwrap();
        let envelope = handle_event(&state, event).await;
        assert_eq!(envelope.status_code, 200);
    }

    #[tokio::test]
    async fn http_api_event_shape_is_accepted() {
        let mock = Arc::new(MockGenerate::answering("ok"));
        let state = state_with_worker(mock, 100);

        let event: GatewayEvent = serde_json::from_str(
            r#"{"requestContext": {"http": {"method": "POST"}}, "body": "{\"prompt\": \"hi\"}"}"#,
        )
        .unwrap();
        let envelope = handle_event(&state, event).await;
        assert_eq!(envelope.status_code, 200);
    }
}
