//! Bedrock Converse API client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::InvokeError;

// Instructing brevity keeps answers short and output tokens low
const SYSTEM_PROMPT: &str = "You are a helpful, concise assistant. Keep responses brief.";
const MAX_TOKENS: u32 = 150;
const TEMPERATURE: f32 = 0.3;
const TOP_P: f32 = 0.85;

// The one provider code that gets its own status code downstream
const THROTTLING_CODE: &str = "ThrottlingException";

/// Text generation backend. The gateway only needs prompt -> answer, so the
/// worker stays independent of the concrete provider.
#[async_trait]
pub trait GenerateText: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, InvokeError>;
}

// Converse API request format
#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ConverseRequest {
    pub messages: Vec<Message>,
    pub system: Vec<SystemBlock>,
    pub inference_config: InferenceConfig,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Message {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct ContentBlock {
    pub text: String,
}

#[derive(Serialize, Clone)]
pub struct SystemBlock {
    pub text: String,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

// Converse API response format (only the part we read)
#[derive(Deserialize)]
pub struct ConverseResponse {
    pub output: ConverseOutput,
}

#[derive(Deserialize)]
pub struct ConverseOutput {
    pub message: Message,
}

pub struct BedrockClient {
    client: reqwest::Client,
    endpoint: String,
    model_id: String,
    api_key: Option<String>,
}

impl BedrockClient {
    // One client per process so TCP connections are reused across requests
    pub fn new(
        region: &str,
        model_id: String,
        endpoint: Option<String>,
        api_key: Option<String>,
    ) -> Self {
        let endpoint = endpoint
            .unwrap_or_else(|| format!("https://bedrock-runtime.{}.amazonaws.com", region));
        Self {
            client: reqwest::Client::new(),
            endpoint,
            model_id,
            api_key,
        }
    }

    fn converse_url(&self) -> String {
        format!("{}/model/{}/converse", self.endpoint, self.model_id)
    }

    pub fn converse_body(prompt: &str) -> ConverseRequest {
        ConverseRequest {
            messages: vec![Message {
                role: "user".to_string(),
                content: vec![ContentBlock {
                    text: prompt.to_string(),
                }],
            }],
            system: vec![SystemBlock {
                text: SYSTEM_PROMPT.to_string(),
            }],
            inference_config: InferenceConfig {
                max_tokens: MAX_TOKENS,
                temperature: TEMPERATURE,
                top_p: TOP_P,
            },
        }
    }
}

#[async_trait]
impl GenerateText for BedrockClient {
    async fn generate(&self, prompt: &str) -> Result<String, InvokeError> {
        let mut call = self
            .client
            .post(self.converse_url())
            .json(&Self::converse_body(prompt));
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }

        let response = call.send().await?;

        let status = response.status();
        if !status.is_success() {
            // The service puts the exception name in x-amzn-errortype,
            // e.g. "ThrottlingException:http://..." - keep the first segment
            let code = response
                .headers()
                .get("x-amzn-errortype")
                .and_then(|value| value.to_str().ok())
                .map(|value| value.split(':').next().unwrap_or(value).to_string())
                .unwrap_or_else(|| status.as_u16().to_string());

            if code == THROTTLING_CODE || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(InvokeError::Throttled);
            }
            return Err(InvokeError::Api { code });
        }

        let body: ConverseResponse = response
            .json()
            .await
            .map_err(|e| InvokeError::InvalidResponse(e.to_string()))?;

        let answer = body
            .output
            .message
            .content
            .first()
            .map(|block| block.text.clone())
            .ok_or_else(|| {
                InvokeError::InvalidResponse("no content blocks in model output".to_string())
            })?;

        debug!(answer_chars = answer.chars().count(), "model returned answer");
        Ok(answer)
    }
}
