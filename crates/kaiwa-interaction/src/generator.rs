//! Response generator interface.
//!
//! A generator turns persona traits, an instruction prompt and a short
//! transcript into one utterance. Implementations talk to a text-generation
//! backend; callers never see backend-specific errors.

use std::time::Duration;

use async_trait::async_trait;
use kaiwa_core::persona::PersonaTraits;
use reqwest::StatusCode;
use reqwest::header::HeaderValue;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum GenerationError {
    /// The request never produced an HTTP response.
    #[error("Request failed: {message}")]
    Request { message: String, is_retryable: bool },

    /// The backend answered with a non-success status.
    #[error("API error ({status_code}): {message}")]
    Api {
        status_code: u16,
        message: String,
        is_retryable: bool,
        retry_after: Option<Duration>,
    },

    /// The backend answered but carried no text.
    #[error("Response contained no text")]
    EmptyResponse,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Generator not configured: {0}")]
    NotConfigured(String),
}

impl GenerationError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request { is_retryable, .. } | Self::Api { is_retryable, .. } => *is_retryable,
            Self::Timeout(_) => true,
            _ => false,
        }
    }
}

/// Produces a single persona utterance.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Backend name used in logs.
    fn name(&self) -> &str;

    /// Generates the persona's next utterance.
    ///
    /// `context` is a newline separated `speaker: text` transcript, possibly empty.
    async fn generate(
        &self,
        traits: &PersonaTraits,
        prompt: &str,
        context: &str,
    ) -> Result<String, GenerationError>;
}

/// System instruction describing who the model speaks as.
pub fn system_instruction(traits: &PersonaTraits) -> String {
    format!(
        "あなたは{name}です。\n性格: {personality}\n話し方: {style}\n主な興味: {interests}\n\
         あなたの個性と話し方を保ったまま、日本語で簡潔に1〜2文で発言してください。\
         名前の接頭辞（「{name}:」など）は付けないでください。",
        name = traits.name,
        personality = traits.personality,
        style = traits.speaking_style,
        interests = traits.top_interests(traits.interests.len()),
    )
}

/// User-side message combining the transcript and the instruction.
pub fn user_message(prompt: &str, context: &str) -> String {
    if context.trim().is_empty() {
        prompt.to_string()
    } else {
        format!("# これまでの会話\n{context}\n\n# 指示\n{prompt}")
    }
}

pub(crate) fn map_http_error(
    backend: &str,
    status: StatusCode,
    message: String,
    retry_after: Option<Duration>,
) -> GenerationError {
    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );
    GenerationError::Api {
        status_code: status.as_u16(),
        message: format!("{backend}: {message}"),
        is_retryable,
        retry_after,
    }
}

pub(crate) fn map_transport_error(backend: &str, err: reqwest::Error) -> GenerationError {
    GenerationError::Request {
        message: format!("{backend} request failed: {err}"),
        is_retryable: err.is_connect() || err.is_timeout(),
    }
}

pub(crate) fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn traits() -> PersonaTraits {
        PersonaTraits {
            name: "佐藤健太".to_string(),
            personality: "論理的".to_string(),
            speaking_style: "簡潔".to_string(),
            interests: vec!["AI技術".to_string(), "ハッカソン".to_string()],
        }
    }

    #[test]
    fn system_instruction_carries_traits() {
        let instruction = system_instruction(&traits());
        assert!(instruction.contains("佐藤健太"));
        assert!(instruction.contains("論理的"));
        assert!(instruction.contains("AI技術、ハッカソン"));
    }

    #[test]
    fn user_message_omits_empty_context() {
        assert_eq!(user_message("話して", "  "), "話して");
        let combined = user_message("話して", "高橋誠: こんにちは");
        assert!(combined.starts_with("# これまでの会話\n高橋誠: こんにちは"));
        assert!(combined.ends_with("# 指示\n話して"));
    }

    #[test]
    fn retryable_statuses() {
        let err = map_http_error("gemini", StatusCode::TOO_MANY_REQUESTS, "slow down".into(), None);
        assert!(err.is_retryable());
        let err = map_http_error("gemini", StatusCode::BAD_REQUEST, "bad".into(), None);
        assert!(!err.is_retryable());
    }

    #[test]
    fn retry_after_parses_seconds_only() {
        let header = HeaderValue::from_static("12");
        assert_eq!(parse_retry_after(Some(&header)), Some(Duration::from_secs(12)));
        let date = HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(parse_retry_after(Some(&date)), None);
        assert_eq!(parse_retry_after(None), None);
    }
}
