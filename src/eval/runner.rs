//! Dataset evaluation driver
//!
//! Runs one independent debate per question, several at once, and hands each
//! outcome to a [`ResultSink`].

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{error, info};

use crate::core::{Config, DebateOutcome, Question, Result};
use crate::debate::DebateController;
use crate::eval::report::ResultSink;
use crate::llm::{AnswerParser, BoolAnswerParser, BoolQPromptBuilder, PromptBuilder, ProviderRegistry};

/// Counts reported after a dataset run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvalSummary {
    pub total: usize,
    pub processed: usize,
    /// Already present in the sink
    pub skipped: usize,
    /// Debates that could not be set up
    pub failed: usize,
    pub inconclusive: usize,
    pub partial_failures: usize,
}

impl EvalSummary {
    /// Percentage of attempted questions that produced an outcome
    pub fn success_rate(&self) -> f64 {
        let attempted = self.processed + self.failed;
        if attempted == 0 {
            0.0
        } else {
            self.processed as f64 * 100.0 / attempted as f64
        }
    }
}

/// Runs debates over a dataset
pub struct EvalRunner {
    config: Arc<Config>,
    registry: ProviderRegistry,
    prompts: Arc<dyn PromptBuilder>,
    parser: Arc<dyn AnswerParser>,
}

impl EvalRunner {
    /// Runner using the configured providers and the BoolQ prompts
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let registry = ProviderRegistry::from_config(&config)?;
        Self::with_registry(config, registry)
    }

    /// Runner over an existing registry; the configuration is still validated
    pub fn with_registry(config: Config, registry: ProviderRegistry) -> Result<Self> {
        config.validate()?;
        let prompts = Arc::new(BoolQPromptBuilder::new(
            config.debate.use_cot,
            config.generation.json_mode,
        ));
        Ok(Self {
            config: Arc::new(config),
            registry,
            prompts,
            parser: Arc::new(BoolAnswerParser),
        })
    }

    pub fn prompts(mut self, prompts: Arc<dyn PromptBuilder>) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn parser(mut self, parser: Arc<dyn AnswerParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Run a single debate
    pub async fn run_one(&self, question: Question) -> Result<DebateOutcome> {
        let controller = DebateController::from_config(
            &self.config,
            &self.registry,
            question,
            self.prompts.clone(),
            self.parser.clone(),
        )?;
        Ok(controller.run().await)
    }

    /// Run every question not yet in `sink` (all of them when `eval.overwrite`)
    pub async fn run(&self, questions: Vec<Question>, sink: &mut dyn ResultSink) -> Result<EvalSummary> {
        let mut summary = EvalSummary {
            total: questions.len(),
            ..Default::default()
        };

        let existing = if self.config.eval.overwrite {
            Default::default()
        } else {
            sink.existing_ids()?
        };

        let pending: Vec<Question> = questions
            .into_iter()
            .filter(|q| {
                let done = existing.contains(&q.id);
                if done {
                    info!(question = %q.id, "skipping question with existing result");
                }
                !done
            })
            .collect();
        summary.skipped = summary.total - pending.len();

        info!(
            total = summary.total,
            pending = pending.len(),
            parallel = self.config.eval.parallel_debates,
            "evaluation started"
        );

        let mut debates = stream::iter(pending)
            .map(|question| async move {
                let id = question.id.clone();
                (id, self.run_one(question).await)
            })
            .buffer_unordered(self.config.eval.parallel_debates.max(1));

        while let Some((id, outcome)) = debates.next().await {
            match outcome {
                Ok(outcome) => {
                    if outcome.result.inconclusive {
                        summary.inconclusive += 1;
                    }
                    if outcome.result.partial_failure {
                        summary.partial_failures += 1;
                    }
                    sink.record(&outcome)?;
                    summary.processed += 1;
                }
                Err(e) => {
                    error!(question = %id, error = %e, "debate could not run");
                    summary.failed += 1;
                }
            }
        }

        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            "evaluation finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let summary = EvalSummary {
            total: 5,
            processed: 3,
            skipped: 1,
            failed: 1,
            ..Default::default()
        };
        assert_eq!(summary.success_rate(), 75.0);
        assert_eq!(EvalSummary::default().success_rate(), 0.0);
    }
}
