//! End-to-end pipeline scenarios with a deterministic LLM stub.

use std::sync::Arc;

use async_trait::async_trait;

use shellscout::complexity::Complexity;
use shellscout::intent::Domain;
use shellscout::knowledge::{KnowledgeDoc, LocalKnowledgeBase};
use shellscout::llm::{ChatModel, LlmError};
use shellscout::pipeline::{Pipeline, State};

/// Replies with a fixed intent JSON for the intent prompt and a fixed
/// command for the generation prompt.
struct StubModel {
    intent_json: String,
    command: String,
}

#[async_trait]
impl ChatModel for StubModel {
    async fn invoke(&self, system: &str, _user: &str) -> Result<String, LlmError> {
        if system.contains("intent parser") {
            Ok(self.intent_json.clone())
        } else {
            Ok(self.command.clone())
        }
    }
}

struct FailingModel;

#[async_trait]
impl ChatModel for FailingModel {
    async fn invoke(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
        Err(LlmError::Api {
            status: 500,
            body: "downstream model unavailable".to_string(),
        })
    }
}

fn pipeline_with(model: impl ChatModel + 'static) -> Pipeline {
    Pipeline::new(
        Arc::new(model),
        Arc::new(LocalKnowledgeBase::from_docs(vec![KnowledgeDoc {
            desc: "show disk usage of all filesystems".into(),
            cmd: "df -h".into(),
        }])),
    )
}

async fn run(model: impl ChatModel + 'static, query: &str) -> State {
    pipeline_with(model).run(query).await
}

fn stub(intent_json: &str, command: &str) -> StubModel {
    StubModel {
        intent_json: intent_json.to_string(),
        command: command.to_string(),
    }
}

#[tokio::test]
async fn test_trivial_pwd_short_circuits() {
    let state = run(
        stub(r#"{"domains":["file"],"entities":{},"complexity":2}"#, "pwd"),
        "pwd",
    )
    .await;

    assert_eq!(state.complexity, Complexity::Trivial);
    assert_eq!(state.command, "pwd");
    assert!(state.scout_info.is_empty(), "no probes for trivial queries");
    assert!(state.logs.iter().all(|l| l.node != "scout"));
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_trivial_chinese_disk_usage() {
    let state = run(
        stub(r#"{"domains":["storage"],"entities":{},"complexity":2}"#, "df -h"),
        "磁盘使用情况",
    )
    .await;

    assert_eq!(state.complexity, Complexity::Trivial);
    assert_eq!(state.command, "df -h");
    assert!(state.scout_info.is_empty());
    // Retrieve still runs on the trivial path.
    assert!(!state.examples.is_empty());
    assert!(state.logs.iter().any(|l| l.node == "retrieve"));
}

#[tokio::test]
async fn test_port_query_scouts_the_port() {
    let state = run(
        stub(
            r#"{"domains":["network","process"],"entities":{"port":"8080"},"complexity":2}"#,
            "ss -tlnp 'sport = :8080'",
        ),
        "端口 8080 被谁占用",
    )
    .await;

    assert!(state.intent.domains.contains(&Domain::Network));
    assert_eq!(state.intent.entities.port.as_deref(), Some("8080"));
    assert!(state.scout_info.contains("$ ss -tlnp 'sport = :8080'"));
    assert!(state.scout_info.contains("PORT_8080_LISTENING:"));
}

#[tokio::test]
async fn test_diagnostic_query_is_complex_and_probes_the_unit() {
    let state = run(
        stub(
            r#"{"domains":["service","log"],"entities":{"service":"nginx"},"complexity":3}"#,
            "journalctl -u nginx -n 50 --no-pager",
        ),
        "为什么 nginx 起不来",
    )
    .await;

    assert_eq!(state.complexity, Complexity::Complex);
    assert!(state.intent.domains.contains(&Domain::Service));
    assert!(state.scout_info.contains("$ systemctl status nginx --no-pager -l"));
    assert!(state.scout_info.contains("journalctl -u nginx"));
}

#[tokio::test]
async fn test_unknown_domain_tag_dropped() {
    let state = run(
        stub(r#"{"domains":["file","rm"],"entities":{},"complexity":2}"#, "ls"),
        "show files somewhere",
    )
    .await;

    assert_eq!(state.intent.domains, vec![Domain::File]);
}

#[tokio::test]
async fn test_final_complexity_never_below_heuristic() {
    // Model claims trivial, but the query carries a diagnostic keyword.
    let state = run(
        stub(
            r#"{"domains":["service"],"entities":{"service":"nginx"},"complexity":1}"#,
            "systemctl status nginx",
        ),
        "diagnose why nginx is failing",
    )
    .await;

    assert_eq!(state.complexity, Complexity::Complex);
}

#[tokio::test]
async fn test_malformed_intent_degrades_to_defaults() {
    let state = run(
        stub("I'd rather not answer with JSON today", "ls -la"),
        "list the files here",
    )
    .await;

    assert_eq!(state.intent.domains, vec![Domain::File]);
    assert!(state.intent.parse_error.is_some());
    assert_eq!(state.command, "ls -la");
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_llm_failure_produces_echo_command_and_error() {
    let state = run(FailingModel, "list the files here").await;

    assert!(state.command.starts_with("echo "));
    assert!(state.command.contains("LLM generation failed"));
    assert!(state.error.is_some());
    assert!(state.intent.llm_error.is_some());
}

#[tokio::test]
async fn test_trivial_fast_path_survives_llm_failure() {
    let state = run(FailingModel, "pwd").await;

    assert_eq!(state.command, "pwd");
    assert_eq!(state.complexity, Complexity::Trivial);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_pipeline_is_deterministic_for_trivial_queries() {
    let first = run(
        stub(r#"{"domains":["file"],"entities":{},"complexity":2}"#, "pwd"),
        "pwd",
    )
    .await;
    let second = run(
        stub(r#"{"domains":["file"],"entities":{},"complexity":2}"#, "pwd"),
        "pwd",
    )
    .await;

    assert_eq!(first.command, second.command);
    assert_eq!(first.scout_info, second.scout_info);
}

#[tokio::test]
async fn test_logs_record_every_visited_node_in_order() {
    let state = run(
        stub(
            r#"{"domains":["network"],"entities":{"port":"8080"},"complexity":2}"#,
            "ss -tlnp",
        ),
        "check port 8080",
    )
    .await;

    let nodes: Vec<&str> = state.logs.iter().map(|l| l.node).collect();
    assert_eq!(nodes, vec!["refine", "retrieve", "scout", "generate"]);
}

#[tokio::test]
async fn test_regex_fallback_augments_missing_entities() {
    // Model returns no entities; the port comes from the regex extractor.
    let state = run(
        stub(r#"{"domains":["network"],"entities":{},"complexity":2}"#, "ss -tlnp"),
        "who is using port 8080",
    )
    .await;

    assert_eq!(state.intent.entities.port.as_deref(), Some("8080"));
}
