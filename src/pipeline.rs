//! The per-query state machine: refine → retrieve → (scout?) → generate.
//! Each node returns a partial state delta; the orchestrator merges deltas
//! and appends one log entry per node.

use std::sync::Arc;

use chrono::Utc;

use crate::complexity::{self, Complexity};
use crate::context;
use crate::entities;
use crate::executor;
use crate::facts;
use crate::intent::{Domain, Intent};
use crate::knowledge::KnowledgeBase;
use crate::llm::{extract_command, repair_json, ChatModel, GENERATE_PROMPT, INTENT_PROMPT};
use crate::planner;

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub ts: String,
    pub node: &'static str,
    pub message: String,
}

/// Pipeline state. Created per query, mutated only by the orchestrator
/// merging node deltas, discarded after the command is surfaced.
#[derive(Debug, Clone)]
pub struct State {
    pub query: String,
    pub intent: Intent,
    pub complexity: Complexity,
    pub context: String,
    pub scout_info: String,
    pub examples: String,
    pub command: String,
    pub error: Option<String>,
    pub logs: Vec<LogEntry>,
}

impl State {
    fn new(query: &str) -> State {
        State {
            query: query.to_string(),
            intent: Intent::default(),
            complexity: Complexity::Moderate,
            context: String::new(),
            scout_info: String::new(),
            examples: String::new(),
            command: String::new(),
            error: None,
            logs: Vec::new(),
        }
    }

    fn merge(&mut self, node: &'static str, delta: StateDelta) {
        if let Some(intent) = delta.intent {
            self.intent = intent;
        }
        if let Some(complexity) = delta.complexity {
            self.complexity = complexity;
        }
        if let Some(context) = delta.context {
            self.context = context;
        }
        if let Some(scout_info) = delta.scout_info {
            self.scout_info = scout_info;
        }
        if let Some(examples) = delta.examples {
            self.examples = examples;
        }
        if let Some(command) = delta.command {
            self.command = command;
        }
        if let Some(error) = delta.error {
            self.error = Some(error);
        }
        self.logs.push(LogEntry {
            ts: Utc::now().to_rfc3339(),
            node,
            message: delta.log.unwrap_or_else(|| "ok".to_string()),
        });
    }
}

#[derive(Default)]
struct StateDelta {
    intent: Option<Intent>,
    complexity: Option<Complexity>,
    context: Option<String>,
    scout_info: Option<String>,
    examples: Option<String>,
    command: Option<String>,
    error: Option<String>,
    log: Option<String>,
}

/// The closed node set. Transitions are a fixed table; the only branch is
/// skipping reconnaissance for trivial queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Refine,
    Retrieve,
    Scout,
    Generate,
}

impl Node {
    fn name(&self) -> &'static str {
        match self {
            Node::Refine => "refine",
            Node::Retrieve => "retrieve",
            Node::Scout => "scout",
            Node::Generate => "generate",
        }
    }
}

fn next_node(node: Node, state: &State) -> Option<Node> {
    match node {
        Node::Refine => Some(Node::Retrieve),
        Node::Retrieve => {
            if state.complexity == Complexity::Trivial {
                Some(Node::Generate)
            } else {
                Some(Node::Scout)
            }
        }
        Node::Scout => Some(Node::Generate),
        Node::Generate => None,
    }
}

pub struct Pipeline {
    model: Arc<dyn ChatModel>,
    knowledge: Arc<dyn KnowledgeBase>,
}

impl Pipeline {
    pub fn new(model: Arc<dyn ChatModel>, knowledge: Arc<dyn KnowledgeBase>) -> Self {
        Self { model, knowledge }
    }

    pub async fn run(&self, query: &str) -> State {
        let mut state = State::new(query);
        let mut node = Node::Refine;
        loop {
            let delta = match node {
                Node::Refine => self.refine(&state).await,
                Node::Retrieve => self.retrieve(&state).await,
                Node::Scout => self.scout(&state).await,
                Node::Generate => self.generate(&state).await,
            };
            state.merge(node.name(), delta);
            match next_node(node, &state) {
                Some(next) => node = next,
                None => break,
            }
        }
        state
    }

    async fn refine(&self, state: &State) -> StateDelta {
        let (system, user) = INTENT_PROMPT.render(&[("query", state.query.as_str())]);
        let mut intent = match self.model.invoke(&system, &user).await {
            Ok(text) => match serde_json::from_str(&repair_json(&text)) {
                Ok(value) => Intent::from_json(&value),
                Err(e) => Intent::parse_failure(e.to_string()),
            },
            Err(e) => Intent {
                llm_error: Some(e.to_string()),
                ..Intent::default()
            },
        };

        let fallback = entities::extract(&state.query);
        intent.entities.merge_fallback(&fallback);
        intent.entities.cross_promote();

        let mut delta = StateDelta::default();
        if let Some(command) = complexity::trivial_command(&state.query) {
            delta.complexity = Some(Complexity::Trivial);
            delta.command = Some(command.to_string());
            delta.log = Some(format!("trivial fast-path: {command}"));
        } else {
            let declared = Complexity::from_level(intent.complexity);
            let heuristic = complexity::classify(&state.query, &intent);
            let complexity = declared.max(heuristic);
            delta.complexity = Some(complexity);
            delta.log = Some(format!(
                "domains=[{}] complexity={}",
                intent
                    .domains
                    .iter()
                    .map(Domain::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
                complexity.as_str()
            ));
        }
        delta.intent = Some(intent);
        delta
    }

    async fn retrieve(&self, state: &State) -> StateDelta {
        let examples = self.knowledge.search(&state.query, 3);
        let examples = if examples.is_empty() {
            "No examples found.".to_string()
        } else {
            examples
        };
        StateDelta {
            context: Some(context::system_context()),
            log: Some(format!("{} bytes of examples", examples.len())),
            examples: Some(examples),
            ..StateDelta::default()
        }
    }

    async fn scout(&self, state: &State) -> StateDelta {
        if state.complexity == Complexity::Trivial {
            return StateDelta {
                log: Some("skipped (trivial)".to_string()),
                ..StateDelta::default()
            };
        }

        let probes = planner::plan(
            &state.intent.domains,
            &state.intent.entities,
            &state.query,
            state.complexity,
        );
        let results = executor::execute(&probes).await;
        let scout_info = facts::extract_facts(&results, &state.intent.entities, &state.query);
        StateDelta {
            log: Some(format!("{} probes executed", results.len())),
            scout_info: Some(scout_info),
            ..StateDelta::default()
        }
    }

    async fn generate(&self, state: &State) -> StateDelta {
        if !state.command.is_empty() {
            return StateDelta {
                log: Some("command already set".to_string()),
                ..StateDelta::default()
            };
        }

        let tool_hint = state
            .intent
            .entities
            .tool
            .as_deref()
            .map(|tool| format!("Mentioned tool: {tool}\n"))
            .unwrap_or_default();
        let (system, user) = GENERATE_PROMPT.render(&[
            ("context", state.context.as_str()),
            ("tool_hint", tool_hint.as_str()),
            ("examples", state.examples.as_str()),
            ("facts", state.scout_info.as_str()),
            ("query", state.query.as_str()),
        ]);

        match self.model.invoke(&system, &user).await {
            Ok(text) => {
                let command = extract_command(&text);
                if command.is_empty() {
                    StateDelta {
                        command: Some(echo_failure("LLM returned no command")),
                        error: Some("LLM returned no command".to_string()),
                        log: Some("empty generation".to_string()),
                        ..StateDelta::default()
                    }
                } else {
                    StateDelta {
                        log: Some(format!("generated: {command}")),
                        command: Some(command),
                        ..StateDelta::default()
                    }
                }
            }
            Err(e) => StateDelta {
                command: Some(echo_failure(&e.to_string())),
                error: Some(e.to_string()),
                log: Some("generation failed".to_string()),
                ..StateDelta::default()
            },
        }
    }
}

/// The degraded final command: an echo carrying the error text, quoted and
/// flattened so it stays a single harmless line.
fn echo_failure(message: &str) -> String {
    let flat = message.replace(['\n', '\r'], " ");
    let quoted = shlex::try_quote(&format!("LLM generation failed: {flat}"))
        .map(|q| q.to_string())
        .unwrap_or_else(|_| "'LLM generation failed'".to_string());
    format!("echo {quoted}")
}
