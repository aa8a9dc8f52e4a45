//! Best-effort retrieval of reference command examples. A thin stand-in for
//! an external vector store: documents live in a local JSONL file, ranked by
//! string similarity. A missing or unreadable store degrades to no examples
//! and never fails the pipeline.

use std::path::Path;

use serde::Deserialize;

/// One knowledge document: a natural-language goal plus the command that
/// fulfills it.
#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeDoc {
    pub desc: String,
    pub cmd: String,
}

pub trait KnowledgeBase: Send + Sync {
    /// Return up to `k` formatted examples for the query, or an empty string.
    fn search(&self, query: &str, k: usize) -> String;
}

pub struct LocalKnowledgeBase {
    docs: Vec<KnowledgeDoc>,
}

impl LocalKnowledgeBase {
    /// Load the store, skipping unparseable lines. Any failure yields an
    /// empty store.
    pub fn open(path: &Path) -> Self {
        let docs = match std::fs::read_to_string(path) {
            Ok(contents) => contents
                .lines()
                .filter(|line| !line.trim().is_empty())
                .filter_map(|line| serde_json::from_str::<KnowledgeDoc>(line).ok())
                .collect(),
            Err(e) => {
                tracing::debug!("knowledge store unavailable at {}: {e}", path.display());
                Vec::new()
            }
        };
        tracing::debug!(docs = docs.len(), "knowledge store loaded");
        Self { docs }
    }

    pub fn from_docs(docs: Vec<KnowledgeDoc>) -> Self {
        Self { docs }
    }

    fn score(query: &str, desc: &str) -> f64 {
        let query_lower = query.to_lowercase();
        let desc_lower = desc.to_lowercase();

        let query_tokens: Vec<&str> = query_lower.split_whitespace().collect();
        let overlap = if query_tokens.is_empty() {
            0.0
        } else {
            let hits = query_tokens
                .iter()
                .filter(|t| desc_lower.contains(*t))
                .count();
            hits as f64 / query_tokens.len() as f64
        };

        0.5 * strsim::jaro_winkler(&query_lower, &desc_lower) + 0.5 * overlap
    }
}

impl KnowledgeBase for LocalKnowledgeBase {
    fn search(&self, query: &str, k: usize) -> String {
        if self.docs.is_empty() || k == 0 {
            return String::new();
        }

        let mut scored: Vec<(f64, &KnowledgeDoc)> = self
            .docs
            .iter()
            .map(|doc| (Self::score(query, &doc.desc), doc))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .iter()
            .take(k)
            .map(|(_, doc)| {
                format!(
                    "User Goal: {}\nReference Command: {}",
                    doc.desc.trim(),
                    doc.cmd.trim()
                )
            })
            .collect::<Vec<_>>()
            .join("\n---\n")
    }
}
