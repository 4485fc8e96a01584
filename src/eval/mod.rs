//! Evaluation: datasets in, debate outcomes out

pub mod dataset;
pub mod report;
pub mod runner;

pub use dataset::{load_questions, parse_questions};
pub use report::{JsonlSink, ResultSink};
pub use runner::{EvalRunner, EvalSummary};
