//! OpenAiGenerator - chat-completions implementation.
//!
//! Works with any OpenAI-compatible endpoint (OpenAI itself, local servers
//! exposing `/v1/chat/completions`).

use async_trait::async_trait;
use kaiwa_core::persona::PersonaTraits;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::generator::{
    GenerationError, ResponseGenerator, map_http_error, map_transport_error, parse_retry_after,
    system_instruction, user_message,
};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Generator that talks to an OpenAI-compatible chat-completions API.
#[derive(Clone)]
pub struct OpenAiGenerator {
    client: Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
    max_tokens: Option<u32>,
}

impl OpenAiGenerator {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: model.into(),
            endpoint: DEFAULT_OPENAI_ENDPOINT.to_string(),
            max_tokens: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    async fn send_request(&self, body: &ChatCompletionRequest) -> Result<String, GenerationError> {
        let mut request = self.client.post(&self.endpoint).json(body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| map_transport_error("OpenAI", err))?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read OpenAI error body".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&body_text)
                .map(|wrapper| wrapper.error.message)
                .unwrap_or(body_text);
            return Err(map_http_error("OpenAI", status, message, retry_after));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|err| {
            GenerationError::InvalidResponse(format!("Failed to parse OpenAI response: {err}"))
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl ResponseGenerator for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        traits: &PersonaTraits,
        prompt: &str,
        context: &str,
    ) -> Result<String, GenerationError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_instruction(traits),
                },
                ChatMessage {
                    role: "user",
                    content: user_message(prompt, context),
                },
            ],
            max_tokens: self.max_tokens,
        };

        tracing::debug!(model = %self.model, persona = %traits.name, "Sending chat completion request");
        self.send_request(&request).await
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: ChatCompletionResponse) -> Result<String, GenerationError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(GenerationError::EmptyResponse)
}
