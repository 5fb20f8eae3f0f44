//! Deadline wrapper for generators.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kaiwa_core::persona::PersonaTraits;

use crate::generator::{GenerationError, ResponseGenerator};

pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Fails a generation that takes longer than `timeout`.
pub struct TimeoutGenerator {
    inner: Arc<dyn ResponseGenerator>,
    timeout: Duration,
}

impl TimeoutGenerator {
    pub fn new(inner: Arc<dyn ResponseGenerator>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl ResponseGenerator for TimeoutGenerator {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(
        &self,
        traits: &PersonaTraits,
        prompt: &str,
        context: &str,
    ) -> Result<String, GenerationError> {
        match tokio::time::timeout(self.timeout, self.inner.generate(traits, prompt, context)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    backend = self.inner.name(),
                    persona = %traits.name,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Generation timed out"
                );
                Err(GenerationError::Timeout(self.timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowGenerator(Duration);

    #[async_trait]
    impl ResponseGenerator for SlowGenerator {
        fn name(&self) -> &str {
            "slow"
        }

        async fn generate(
            &self,
            _traits: &PersonaTraits,
            _prompt: &str,
            _context: &str,
        ) -> Result<String, GenerationError> {
            tokio::time::sleep(self.0).await;
            Ok("done".to_string())
        }
    }

    fn traits() -> PersonaTraits {
        PersonaTraits {
            name: "n".into(),
            personality: String::new(),
            speaking_style: String::new(),
            interests: vec![],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_generation_times_out() {
        let generator = TimeoutGenerator::new(
            Arc::new(SlowGenerator(Duration::from_secs(60))),
            Duration::from_secs(30),
        );
        let err = generator.generate(&traits(), "p", "").await.unwrap_err();
        assert!(matches!(err, GenerationError::Timeout(d) if d == Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn fast_generation_passes_through() {
        let generator = TimeoutGenerator::new(
            Arc::new(SlowGenerator(Duration::from_millis(10))),
            Duration::from_secs(30),
        );
        assert_eq!(generator.generate(&traits(), "p", "").await.unwrap(), "done");
    }
}
