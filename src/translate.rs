use tracing::{debug, error};

use crate::engine::TranslationEngine;

/// Result of one translation attempt. `Failed` carries the engine's error
/// description; it never aborts the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationOutcome {
    Ok(String),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct Translator<E> {
    engine: E,
    target_lang: String,
}

impl<E: TranslationEngine> Translator<E> {
    pub fn new(engine: E, target_lang: impl Into<String>) -> Self {
        Self {
            engine,
            target_lang: target_lang.into(),
        }
    }

    pub fn target_lang(&self) -> &str {
        &self.target_lang
    }

    /// Single attempt, no retries. Engine failures degrade into
    /// `Failed(detail)` so formatting and delivery still proceed.
    pub async fn translate(&self, text: &str) -> TranslationOutcome {
        match self.engine.translate(text, &self.target_lang).await {
            Ok(translated) => {
                debug!("translated {} chars", text.chars().count());
                TranslationOutcome::Ok(translated)
            }
            Err(err) => {
                error!("translation failed: {}", err);
                TranslationOutcome::Failed(err.to_string())
            }
        }
    }
}
