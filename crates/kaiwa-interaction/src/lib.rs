//! Outward-facing adapters: text generation backends, prompt rendering and
//! message dispatch.

pub mod dispatch;
pub mod gemini;
pub mod generator;
pub mod openai;
pub mod prompt;
pub mod timeout;

use std::sync::Arc;
use std::time::Duration;

use kaiwa_infrastructure::{GeneratorBackend, GeneratorConfig};

pub use dispatch::{
    ConsoleDispatcher, DiscordWebhookDispatcher, DispatchError, DispatchOutcome, Dispatcher,
};
pub use gemini::GeminiGenerator;
pub use generator::{GenerationError, ResponseGenerator};
pub use openai::OpenAiGenerator;
pub use prompt::{PromptBuilder, PromptError};
pub use timeout::TimeoutGenerator;

/// Builds the configured generator, wrapped in its deadline.
pub fn build_generator(config: &GeneratorConfig) -> Result<Arc<dyn ResponseGenerator>, GenerationError> {
    let inner: Arc<dyn ResponseGenerator> = match config.backend {
        GeneratorBackend::Gemini => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                GenerationError::NotConfigured(
                    "Gemini API key not found in config.toml or GEMINI_API_KEY".to_string(),
                )
            })?;
            let model = config
                .model
                .clone()
                .unwrap_or_else(|| gemini::DEFAULT_GEMINI_MODEL.to_string());
            let mut generator = GeminiGenerator::new(api_key, model);
            if let Some(endpoint) = &config.endpoint {
                generator = generator.with_base_url(endpoint.as_str());
            }
            if let Some(max) = config.max_output_tokens {
                generator = generator.with_max_output_tokens(max);
            }
            Arc::new(generator)
        }
        GeneratorBackend::OpenAi => {
            if config.api_key.is_none() && config.endpoint.is_none() {
                return Err(GenerationError::NotConfigured(
                    "OpenAI backend needs an API key (OPENAI_API_KEY) or a custom endpoint"
                        .to_string(),
                ));
            }
            let model = config
                .model
                .clone()
                .unwrap_or_else(|| openai::DEFAULT_OPENAI_MODEL.to_string());
            let mut generator = OpenAiGenerator::new(config.api_key.clone(), model);
            if let Some(endpoint) = &config.endpoint {
                generator = generator.with_endpoint(endpoint.as_str());
            }
            if let Some(max) = config.max_output_tokens {
                generator = generator.with_max_tokens(max);
            }
            Arc::new(generator)
        }
    };

    tracing::info!(
        backend = config.backend.as_str(),
        timeout_secs = config.timeout_secs,
        "Response generator ready"
    );
    Ok(Arc::new(TimeoutGenerator::new(
        inner,
        Duration::from_secs(config.timeout_secs),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_without_key_is_not_configured() {
        let config = GeneratorConfig::default();
        assert!(matches!(
            build_generator(&config),
            Err(GenerationError::NotConfigured(_))
        ));
    }

    #[test]
    fn local_openai_endpoint_needs_no_key() {
        let config = GeneratorConfig {
            backend: GeneratorBackend::OpenAi,
            endpoint: Some("http://localhost:11434/v1/chat/completions".to_string()),
            ..GeneratorConfig::default()
        };
        let generator = build_generator(&config).unwrap();
        assert_eq!(generator.name(), "openai");
    }
}
