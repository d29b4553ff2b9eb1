use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::oneshot;

use crate::error::InvokeError;

// Inbound API gateway event. Two shapes exist in the wild: the HTTP API
// nests the method under requestContext.http, the older REST API puts it
// at the top level. Both are accepted.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GatewayEvent {
    #[serde(default)]
    pub http_method: Option<String>,
    #[serde(default)]
    pub request_context: Option<RequestContext>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct RequestContext {
    #[serde(default)]
    pub http: Option<HttpContext>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct HttpContext {
    #[serde(default)]
    pub method: Option<String>,
}

impl GatewayEvent {
    // HTTP API shape first, REST API fallback, empty string otherwise
    pub fn method(&self) -> &str {
        self.request_context
            .as_ref()
            .and_then(|ctx| ctx.http.as_ref())
            .and_then(|http| http.method.as_deref())
            .or(self.http_method.as_deref())
            .unwrap_or("")
    }
}

// CORS headers attached to every response so browser callers can read both
// answers and errors
#[derive(Serialize, Debug, Clone)]
pub struct CorsHeaders {
    #[serde(rename = "Access-Control-Allow-Origin")]
    pub allow_origin: String,
    #[serde(rename = "Access-Control-Allow-Headers")]
    pub allow_headers: String,
    #[serde(rename = "Access-Control-Allow-Methods")]
    pub allow_methods: String,
}

impl CorsHeaders {
    pub fn new(allowed_origin: &str) -> Self {
        Self {
            allow_origin: allowed_origin.to_string(),
            allow_headers: "Content-Type".to_string(),
            allow_methods: "OPTIONS,POST".to_string(),
        }
    }
}

// API gateway response envelope; body is a JSON-encoded string
#[derive(Serialize, Debug, Clone)]
pub struct ResponseEnvelope {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: CorsHeaders,
    pub body: String,
}

impl ResponseEnvelope {
    // 204 preflight response, empty body
    pub fn no_content(cors: &CorsHeaders) -> Self {
        Self {
            status_code: 204,
            headers: cors.clone(),
            body: String::new(),
        }
    }

    pub fn answer(cors: &CorsHeaders, text: &str) -> Self {
        Self {
            status_code: 200,
            headers: cors.clone(),
            body: json!({ "answer": text }).to_string(),
        }
    }

    pub fn error(status_code: u16, cors: &CorsHeaders, message: &str) -> Self {
        Self {
            status_code,
            headers: cors.clone(),
            body: json!({ "error": message }).to_string(),
        }
    }
}

// Queued prompt - holds the work item + response channel back to the handler
pub struct QueuedPrompt {
    pub prompt: String,
    pub cache_key: String,
    pub response_tx: oneshot::Sender<Result<String, InvokeError>>,
}
