//! multi-llm-debate - Multi-Agent LLM Debate Harness
//!
//! Several language-model agents answer the same question over a number of
//! rounds, each round seeing what its peers said in the previous one, until
//! they agree or the round ceiling is hit. The final answers are then
//! aggregated into one decision.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Provider abstraction (Ollama, OpenAI-compatible), the retrying
//!   model client, prompt builders and answer parsers
//! - **Agent**: Debate participants and their conversation history
//! - **Debate**: Round coordination, convergence, aggregation and the controller
//! - **Eval**: Dataset loading, result sinks and the evaluation runner
//!
//! # Usage
//!
//! ```rust,no_run
//! use multi_llm_debate::{Config, EvalRunner, Question};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::load();
//!     let runner = EvalRunner::new(config).unwrap();
//!
//!     let question = Question::new("q1", "is the sky blue")
//!         .with_passage("On a clear day the sky appears blue.");
//!     let outcome = runner.run_one(question).await.unwrap();
//!     println!("{:?}", outcome.result.answer);
//! }
//! ```

pub mod agent;
pub mod core;
pub mod debate;
pub mod eval;
pub mod llm;

// Re-export commonly used items
pub use agent::DebateAgent;
pub use core::{Config, DebateError, DebateOutcome, DebateResult, Question, Result};
pub use debate::DebateController;
pub use eval::{EvalRunner, JsonlSink, ResultSink};
