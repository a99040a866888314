//! Deterministic pipeline orchestration tests.
//!
//! These use FakeLanguageModel and FakeClusterClient to verify stage
//! sequencing and failure short-circuiting without any network calls.

use askube_shared::{AskubeError, ExecutionErrorKind, ResourceKind};
use askubed::cluster::FakeClusterClient;
use askubed::config::LlmConfig;
use askubed::llm::FakeLanguageModel;
use askubed::pipeline::{PipelineState, QueryPipeline, Stage};
use serde_json::json;

const COUNT_PODS_DESCRIPTOR: &str =
    r#"{"action":"count","kind":"pods","namespace":"default","output":"result"}"#;

fn pods(n: usize) -> Vec<serde_json::Value> {
    (0..n)
        .map(|i| json!({ "name": format!("web-{}", i), "namespace": "default", "status": "Running" }))
        .collect()
}

// ============================================================================
// Happy Path
// ============================================================================

#[tokio::test]
async fn test_full_pipeline_produces_answer() {
    let llm = FakeLanguageModel::scripted(&[COUNT_PODS_DESCRIPTOR, "3"]);
    let cluster = FakeClusterClient::new().list_response(ResourceKind::Pods, pods(3));

    let mut pipeline = QueryPipeline::new(&LlmConfig::default());
    let answer = pipeline
        .run(&llm, &cluster, "how many pods are running?")
        .await
        .unwrap();

    assert_eq!(answer, "3");
    assert_eq!(pipeline.state(), PipelineState::Completed);
    // one synthesis call, one formatting call, one cluster call
    assert_eq!(llm.call_count(), 2);
    assert_eq!(cluster.call_count(), 1);
}

#[tokio::test]
async fn test_formatter_sees_executed_value_not_raw_query() {
    let llm = FakeLanguageModel::scripted(&[COUNT_PODS_DESCRIPTOR, "3"]);
    let cluster = FakeClusterClient::new().list_response(ResourceKind::Pods, pods(3));

    let mut pipeline = QueryPipeline::new(&LlmConfig::default());
    pipeline
        .run(&llm, &cluster, "how many pods are running?")
        .await
        .unwrap();

    let calls = llm.recorded_calls();
    assert_eq!(calls.len(), 2);
    // the second call carries the executor's value for the formatter
    assert!(calls[1].user.contains("Result: 3"));
    assert!(calls[1].user.contains("how many pods are running?"));
}

#[tokio::test]
async fn test_fenced_descriptor_still_parses() {
    let fenced = format!("```json\n{}\n```", COUNT_PODS_DESCRIPTOR);
    let llm = FakeLanguageModel::scripted(&[&fenced, "3"]);
    let cluster = FakeClusterClient::new().list_response(ResourceKind::Pods, pods(3));

    let mut pipeline = QueryPipeline::new(&LlmConfig::default());
    let answer = pipeline
        .run(&llm, &cluster, "how many pods are running?")
        .await
        .unwrap();

    assert_eq!(answer, "3");
}

#[tokio::test]
async fn test_identical_stubs_yield_identical_outputs() {
    let mut answers = Vec::new();
    for _ in 0..2 {
        let llm = FakeLanguageModel::scripted(&[COUNT_PODS_DESCRIPTOR, "3 pods"]);
        let cluster = FakeClusterClient::new().list_response(ResourceKind::Pods, pods(3));
        let mut pipeline = QueryPipeline::new(&LlmConfig::default());
        answers.push(
            pipeline
                .run(&llm, &cluster, "how many pods are running?")
                .await
                .unwrap(),
        );
    }
    assert_eq!(answers[0], answers[1]);
}

// ============================================================================
// Synthesis Failures
// ============================================================================

#[tokio::test]
async fn test_synthesis_failure_short_circuits() {
    let llm = FakeLanguageModel::failing("model backend unreachable");
    let cluster = FakeClusterClient::new().list_response(ResourceKind::Pods, pods(3));

    let mut pipeline = QueryPipeline::new(&LlmConfig::default());
    let err = pipeline
        .run(&llm, &cluster, "how many pods are running?")
        .await
        .unwrap_err();

    assert!(matches!(err, AskubeError::Synthesis(_)));
    assert_eq!(pipeline.state(), PipelineState::Failed(Stage::Synthesize));
    // executor and formatter never ran
    assert_eq!(cluster.call_count(), 0);
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_empty_descriptor_short_circuits() {
    let llm = FakeLanguageModel::scripted(&[""]);
    let cluster = FakeClusterClient::new();

    let mut pipeline = QueryPipeline::new(&LlmConfig::default());
    let err = pipeline.run(&llm, &cluster, "anything").await.unwrap_err();

    assert!(matches!(err, AskubeError::Synthesis(_)));
    assert_eq!(cluster.call_count(), 0);
}

#[tokio::test]
async fn test_unparseable_descriptor_short_circuits() {
    let llm = FakeLanguageModel::scripted(&["v1.list_pod_for_all_namespaces()"]);
    let cluster = FakeClusterClient::new();

    let mut pipeline = QueryPipeline::new(&LlmConfig::default());
    let err = pipeline.run(&llm, &cluster, "anything").await.unwrap_err();

    assert!(matches!(err, AskubeError::Synthesis(_)));
    assert_eq!(pipeline.state(), PipelineState::Failed(Stage::Synthesize));
    assert_eq!(cluster.call_count(), 0);
}

#[tokio::test]
async fn test_out_of_vocabulary_action_short_circuits() {
    let llm = FakeLanguageModel::scripted(&[r#"{"action":"delete","kind":"pods"}"#]);
    let cluster = FakeClusterClient::new();

    let mut pipeline = QueryPipeline::new(&LlmConfig::default());
    let err = pipeline.run(&llm, &cluster, "delete all pods").await.unwrap_err();

    assert!(matches!(err, AskubeError::Synthesis(_)));
    assert_eq!(cluster.call_count(), 0);
}

// ============================================================================
// Execution Failures
// ============================================================================

#[tokio::test]
async fn test_api_surface_mismatch_skips_formatter() {
    let llm = FakeLanguageModel::scripted(&[COUNT_PODS_DESCRIPTOR]);
    let cluster = FakeClusterClient::unsupported("pods not served by this apiserver");

    let mut pipeline = QueryPipeline::new(&LlmConfig::default());
    let err = pipeline
        .run(&llm, &cluster, "how many pods are running?")
        .await
        .unwrap_err();

    match err {
        AskubeError::Execution { kind, .. } => {
            assert_eq!(kind, ExecutionErrorKind::ApiSurfaceMismatch)
        }
        other => panic!("expected execution failure, got {:?}", other),
    }
    assert_eq!(pipeline.state(), PipelineState::Failed(Stage::Execute));
    // formatter never called
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_runtime_error_skips_formatter() {
    let llm = FakeLanguageModel::scripted(&[COUNT_PODS_DESCRIPTOR]);
    let cluster = FakeClusterClient::transport_failing("connection refused");

    let mut pipeline = QueryPipeline::new(&LlmConfig::default());
    let err = pipeline
        .run(&llm, &cluster, "how many pods are running?")
        .await
        .unwrap_err();

    match err {
        AskubeError::Execution { kind, message } => {
            assert_eq!(kind, ExecutionErrorKind::RuntimeError);
            assert!(message.contains("connection refused"));
        }
        other => panic!("expected execution failure, got {:?}", other),
    }
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_missing_resource_fails_with_no_result() {
    let llm = FakeLanguageModel::scripted(&[
        r#"{"action":"get","kind":"pods","namespace":"default","name":"ghost","output":"result"}"#,
    ]);
    let cluster = FakeClusterClient::new();

    let mut pipeline = QueryPipeline::new(&LlmConfig::default());
    let err = pipeline
        .run(&llm, &cluster, "what is the status of pod ghost?")
        .await
        .unwrap_err();

    match err {
        AskubeError::Execution { kind, .. } => assert_eq!(kind, ExecutionErrorKind::NoResult),
        other => panic!("expected execution failure, got {:?}", other),
    }
    assert_eq!(pipeline.state(), PipelineState::Failed(Stage::Execute));
}

// ============================================================================
// Formatting Failures
// ============================================================================

#[tokio::test]
async fn test_formatter_failure_is_terminal() {
    // first reply is the descriptor; no reply left for the formatter
    let llm = FakeLanguageModel::scripted(&[COUNT_PODS_DESCRIPTOR]);
    let cluster = FakeClusterClient::new().list_response(ResourceKind::Pods, pods(3));

    let mut pipeline = QueryPipeline::new(&LlmConfig::default());
    let err = pipeline
        .run(&llm, &cluster, "how many pods are running?")
        .await
        .unwrap_err();

    assert!(matches!(err, AskubeError::Formatting(_)));
    assert_eq!(pipeline.state(), PipelineState::Failed(Stage::Format));
    // both stages before it did run
    assert_eq!(cluster.call_count(), 1);
    assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn test_empty_answer_is_formatting_failure() {
    let llm = FakeLanguageModel::scripted(&[COUNT_PODS_DESCRIPTOR, "   "]);
    let cluster = FakeClusterClient::new().list_response(ResourceKind::Pods, pods(3));

    let mut pipeline = QueryPipeline::new(&LlmConfig::default());
    let err = pipeline
        .run(&llm, &cluster, "how many pods are running?")
        .await
        .unwrap_err();

    assert!(matches!(err, AskubeError::Formatting(_)));
}
