use crate::backoff::retry_transient;
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_GENERATION_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_GENERATION_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Text-generation capability: prompt in, generated text out.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Generator backed by an OpenAI-compatible `chat/completions` endpoint
/// (Groq by default).
pub struct GroqGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: String,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GroqGenerator {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey("generator"));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_GENERATION_ENDPOINT.to_string(),
            api_key,
            model: DEFAULT_GENERATION_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        })
    }

    /// Read the API key from the `GROQ_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key =
            std::env::var("GROQ_API_KEY").map_err(|_| ProviderError::MissingApiKey("generator"))?;
        Self::new(api_key)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    async fn request_completion(&self, prompt: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest {
                model: &self.model,
                messages: [ChatMessage {
                    role: "user",
                    content: prompt,
                }],
                temperature: self.temperature,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|parsed| parsed.error.message)
                .unwrap_or(body);
            return Err(ProviderError::Api {
                provider: "generator",
                status: status.as_u16(),
                detail,
            });
        }

        let body = response.text().await?;
        parse_completion(&body)
    }
}

/// Pull the generated text out of a `chat/completions` response body.
fn parse_completion(body: &str) -> Result<String, ProviderError> {
    let parsed: CompletionResponse =
        serde_json::from_str(body).map_err(|error| ProviderError::Response {
            provider: "generator",
            detail: format!("malformed completion payload: {error}"),
        })?;

    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| ProviderError::Response {
            provider: "generator",
            detail: "completion had no choices".to_string(),
        })
}

#[async_trait]
impl Generator for GroqGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        retry_transient("generator", || self.request_completion(prompt)).await
    }
}
