//! GeminiGenerator - REST implementation for Google Gemini.
//!
//! Persona traits are sent as the system instruction, the transcript and
//! the turn instruction as a single user message.

use async_trait::async_trait;
use kaiwa_core::persona::PersonaTraits;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::generator::{
    GenerationError, ResponseGenerator, map_http_error, map_transport_error, parse_retry_after,
    system_instruction, user_message,
};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Generator that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_output_tokens: Option<u32>,
}

impl GeminiGenerator {
    /// Creates a new generator with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: BASE_URL.to_string(),
            max_output_tokens: None,
        }
    }

    /// Overrides the API base URL (everything before `/{model}:generateContent`).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_request(&self, body: &GenerateContentRequest) -> Result<String, GenerationError> {
        let url = format!(
            "{}/{model}:generateContent?key={api_key}",
            self.base_url,
            model = self.model,
            api_key = self.api_key
        );

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| map_transport_error("Gemini", err))?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(
                "Gemini",
                status,
                error_message(&body_text),
                retry_after,
            ));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| {
            GenerationError::InvalidResponse(format!("Failed to parse Gemini response: {err}"))
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl ResponseGenerator for GeminiGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        traits: &PersonaTraits,
        prompt: &str,
        context: &str,
    ) -> Result<String, GenerationError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: user_message(prompt, context),
                }],
            }],
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part {
                    text: system_instruction(traits),
                }],
            }),
            generation_config: self.max_output_tokens.map(|max_output_tokens| GenerationConfig {
                max_output_tokens,
            }),
        };

        tracing::debug!(model = %self.model, persona = %traits.name, "Sending Gemini request");
        self.send_request(&request).await
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn extract_text_response(response: GenerateContentResponse) -> Result<String, GenerationError> {
    let text: String = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        Err(GenerationError::EmptyResponse)
    } else {
        Ok(text)
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.to_string())
}
