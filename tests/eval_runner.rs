//! Evaluation runner integration tests

mod common;

use std::sync::Arc;

use common::{config, registry, Reply, ScriptedProvider};
use multi_llm_debate::core::config::ModelPool;
use multi_llm_debate::core::{ProviderType, Question};
use multi_llm_debate::eval::{EvalRunner, JsonlSink, ResultSink};

fn questions() -> Vec<Question> {
    (1..=3)
        .map(|i| Question::new(format!("q{}", i), "is water wet").with_passage("Water is wet."))
        .collect()
}

fn provider() -> Arc<ScriptedProvider> {
    Arc::new(
        ScriptedProvider::new()
            .always("a", Reply::answer("true"))
            .always("b", Reply::answer("true")),
    )
}

#[tokio::test]
async fn test_runs_every_question_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.jsonl");
    let provider = provider();

    let mut config = config(&["a", "b"]);
    config.eval.parallel_debates = 2;
    let runner = EvalRunner::with_registry(config, registry(provider.clone())).unwrap();

    let mut sink = JsonlSink::open(&path, false).unwrap();
    let summary = runner.run(questions(), &mut sink).await.unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(provider.total_calls(), 6);

    let ids = sink.existing_ids().unwrap();
    assert!(["q1", "q2", "q3"].iter().all(|id| ids.contains(*id)));

    // second pass finds every result already recorded
    let mut sink = JsonlSink::open(&path, false).unwrap();
    let summary = runner.run(questions(), &mut sink).await.unwrap();
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.processed, 0);
    assert_eq!(provider.total_calls(), 6);
}

#[tokio::test]
async fn test_overwrite_reruns_existing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.jsonl");
    let provider = provider();

    let runner = EvalRunner::with_registry(config(&["a", "b"]), registry(provider.clone())).unwrap();
    let mut sink = JsonlSink::open(&path, false).unwrap();
    runner.run(questions(), &mut sink).await.unwrap();

    let mut config = config(&["a", "b"]);
    config.eval.overwrite = true;
    let runner = EvalRunner::with_registry(config, registry(provider.clone())).unwrap();
    let mut sink = JsonlSink::open(&path, true).unwrap();
    let summary = runner.run(questions(), &mut sink).await.unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.skipped, 0);
    assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 3);
}

#[tokio::test]
async fn test_unresolvable_provider_counts_as_failed() {
    let dir = tempfile::tempdir().unwrap();
    let provider = provider();

    let mut config = config(&["a"]);
    config.models.push(ModelPool::new(ProviderType::Api, "hosted", 1));
    config.providers.api.base_url = Some("http://localhost:9".to_string());
    let runner = EvalRunner::with_registry(config, registry(provider.clone())).unwrap();

    let mut sink = JsonlSink::open(dir.path().join("results.jsonl"), false).unwrap();
    let summary = runner.run(questions(), &mut sink).await.unwrap();

    assert_eq!(summary.failed, 3);
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.success_rate(), 0.0);
    assert_eq!(provider.total_calls(), 0);
}

#[test]
fn test_runner_rejects_invalid_config() {
    let provider = provider();

    let mut bad = config(&["a", "b"]);
    bad.debate.failure_tolerance = -0.1;
    assert!(EvalRunner::with_registry(bad, registry(provider.clone())).is_err());

    let mut bad = config(&["a", "b"]);
    bad.models[0].weight = f64::NAN;
    assert!(EvalRunner::with_registry(bad, registry(provider.clone())).is_err());

    let mut bad = config(&["a", "b"]);
    bad.debate.failure_tolerance = f64::NAN;
    assert!(EvalRunner::new(bad).is_err());
}
