//! Multi-pass recognition.
//!
//! Runs every configured pass over the same image with a bounded worker limit
//! and a per-pass timeout. Failed passes are dropped, never retried; when all
//! of them fail a single fallback pass runs. Never returns an error.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use super::{PageImage, PassConfig, RecognitionEngine, RecognitionPass};
use crate::error::EngineError;

/// Advisory progress notification, one or more per pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PassProgress {
    PassStarted { pass: String },
    PassCompleted { pass: String, chars: usize },
    PassFailed { pass: String, reason: String },
    FallbackStarted,
}

pub struct RecognitionOrchestrator {
    engine: Arc<dyn RecognitionEngine>,
    passes: Vec<PassConfig>,
    fallback: PassConfig,
    pass_timeout: Duration,
    max_concurrent: usize,
}

impl RecognitionOrchestrator {
    pub fn new(
        engine: Arc<dyn RecognitionEngine>,
        passes: Vec<PassConfig>,
        fallback: PassConfig,
        pass_timeout: Duration,
        max_concurrent: usize,
    ) -> Self {
        Self {
            engine,
            passes,
            fallback,
            pass_timeout,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn passes(&self) -> &[PassConfig] {
        &self.passes
    }

    /// Run all passes and return the successful ones in configuration order.
    pub async fn run(
        &self,
        image: &PageImage,
        progress: Option<&UnboundedSender<PassProgress>>,
    ) -> Vec<RecognitionPass> {
        info!(
            "Running {} recognition passes on {} with engine {}",
            self.passes.len(),
            image.filename,
            self.engine.name()
        );

        let pass_futures: Vec<_> = self
            .passes
            .iter()
            .map(|config| self.run_pass(image, config, progress))
            .collect();
        let results: Vec<Option<RecognitionPass>> = stream::iter(pass_futures)
            .buffered(self.max_concurrent)
            .collect()
            .await;
        let succeeded: Vec<RecognitionPass> = results.into_iter().flatten().collect();

        if !succeeded.is_empty() {
            info!(
                "{} of {} passes succeeded",
                succeeded.len(),
                self.passes.len()
            );
            return succeeded;
        }

        warn!("All recognition passes failed; running fallback pass");
        notify(progress, PassProgress::FallbackStarted);
        self.run_pass(image, &self.fallback, progress)
            .await
            .into_iter()
            .collect()
    }

    async fn run_pass(
        &self,
        image: &PageImage,
        config: &PassConfig,
        progress: Option<&UnboundedSender<PassProgress>>,
    ) -> Option<RecognitionPass> {
        notify(
            progress,
            PassProgress::PassStarted {
                pass: config.id.clone(),
            },
        );

        let recognition = self.engine.recognize(image, config);
        let outcome = match tokio::time::timeout(self.pass_timeout, recognition).await {
            Ok(Ok(text)) if text.trim().is_empty() => {
                Err(EngineError::EmptyText(config.id.clone()))
            }
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout {
                pass: config.id.clone(),
                timeout: self.pass_timeout,
            }),
        };

        match outcome {
            Ok(raw_text) => {
                notify(
                    progress,
                    PassProgress::PassCompleted {
                        pass: config.id.clone(),
                        chars: raw_text.chars().count(),
                    },
                );
                Some(RecognitionPass {
                    configuration_id: config.id.clone(),
                    raw_text,
                })
            }
            Err(e) => {
                warn!("Dropping recognition pass '{}': {}", config.id, e);
                notify(
                    progress,
                    PassProgress::PassFailed {
                        pass: config.id.clone(),
                        reason: e.to_string(),
                    },
                );
                None
            }
        }
    }
}

fn notify(progress: Option<&UnboundedSender<PassProgress>>, event: PassProgress) {
    if let Some(tx) = progress {
        // Nobody listening is fine.
        let _ = tx.send(event);
    }
}
