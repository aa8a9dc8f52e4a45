//! Distills heterogeneous probe output into normalized fact lines plus a
//! bounded raw excerpt section for the final prompt.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

use crate::executor::ProbeResult;
use crate::intent::Entities;

const MAX_RAW_EXCERPTS: usize = 15;
const MAX_STDOUT_EXCERPT: usize = 1000;
const MAX_STDERR_EXCERPT: usize = 500;
const FAILURE_WARNING_THRESHOLD: f64 = 0.7;

static SS_PORT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"sport = :(\d+)").unwrap());
static SS_PROCESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"users:\(\("([^"]+)",pid=(\d+)"#).unwrap());

/// Walk probe results in planner order and build the two-section facts
/// string: `[EXTRACTED FACTS]` with normalized key-value lines, then
/// `[RAW SCOUT OUTPUT]` with bounded per-command excerpts.
pub fn extract_facts(results: &[ProbeResult], entities: &Entities, query: &str) -> String {
    tracing::debug!(query, probes = results.len(), "extracting facts");

    let mut out = String::new();

    if !results.is_empty() {
        let failed = results.iter().filter(|r| r.rc != 0).count();
        if failed as f64 / results.len() as f64 > FAILURE_WARNING_THRESHOLD {
            out.push_str("[WARNING] Most scout commands failed.\n");
        }
    }

    out.push_str("[EXTRACTED FACTS]\n");
    for result in results {
        for fact in facts_for(result, entities) {
            out.push_str(&fact);
            out.push('\n');
        }
    }

    out.push_str("\n[RAW SCOUT OUTPUT]\n");
    for result in results.iter().take(MAX_RAW_EXCERPTS) {
        let _ = writeln!(out, "$ {}", result.cmd);
        if !result.stdout.is_empty() {
            out.push_str(excerpt(&result.stdout, MAX_STDOUT_EXCERPT));
            if !out.ends_with('\n') {
                out.push('\n');
            }
        } else if result.rc != 0 {
            let _ = writeln!(out, "[ERROR] {}", excerpt(&result.stderr, MAX_STDERR_EXCERPT));
        } else {
            out.push_str("(no output)\n");
        }
    }

    out
}

/// Dispatch table keyed on command shape.
fn facts_for(result: &ProbeResult, entities: &Entities) -> Vec<String> {
    let cmd = result.cmd.as_str();
    if cmd.contains("sport = :") {
        return port_facts(result);
    }
    if cmd.starts_with("ls -") {
        return ls_facts(result, entities);
    }
    if cmd.starts_with("find ") {
        return find_facts(result);
    }
    if cmd.starts_with("ps") || cmd.starts_with("pgrep") {
        return process_facts(result);
    }
    if cmd.starts_with("systemctl status") {
        return service_facts(result);
    }
    if cmd.starts_with("journalctl") {
        return journal_facts(result);
    }
    if cmd.starts_with("docker ps") {
        return container_facts(result);
    }
    if cmd.starts_with("dpkg -l") {
        return package_facts(result, entities);
    }
    if cmd.starts_with("which ") || cmd.starts_with("command -v") {
        return tool_facts(result);
    }
    if cmd.starts_with("uname") {
        return single_line_fact(result, "SYSTEM_INFO");
    }
    if cmd.starts_with("df") {
        return table_facts(result, "DISK_USAGE", "Filesystem", 5);
    }
    if cmd.starts_with("lsblk") {
        return table_facts(result, "BLOCK_DEVICES", "NAME", 8);
    }
    Vec::new()
}

fn ls_facts(result: &ProbeResult, entities: &Entities) -> Vec<String> {
    if result.rc != 0 {
        let target = entities
            .path
            .as_deref()
            .or(entities.filename.as_deref())
            .unwrap_or_else(|| last_token(&result.cmd));
        return vec![format!("FILE_NOT_FOUND: {target}")];
    }

    let mut facts = vec!["FILE_EXISTS: yes".to_string()];
    for line in result.stdout.lines() {
        if line.starts_with("total") {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 9 {
            continue;
        }
        let name = fields[8..].join(" ");
        if name == "." || name == ".." {
            continue;
        }
        facts.push(format!(
            "FILE_INFO: {name} (perm={}, size={}, owner={})",
            fields[0], fields[4], fields[2]
        ));
    }
    facts
}

fn find_facts(result: &ProbeResult) -> Vec<String> {
    let paths: Vec<&str> = result
        .stdout
        .lines()
        .filter(|l| !l.is_empty() && !l.contains("__pycache__"))
        .take(10)
        .collect();
    if paths.is_empty() {
        return vec!["FILES_FOUND: 0".to_string()];
    }
    let mut facts = vec![format!("FILES_FOUND: {}", paths.len())];
    facts.extend(paths.iter().map(|p| format!("FOUND: {p}")));
    facts
}

fn process_facts(result: &ProbeResult) -> Vec<String> {
    let lines: Vec<&str> = result
        .stdout
        .lines()
        .filter(|l| !l.is_empty() && !l.starts_with("USER") && !l.trim_start().starts_with("PID"))
        .collect();
    let mut facts = vec![format!("PROCESS_COUNT: {}", lines.len())];
    facts.extend(lines.iter().take(5).map(|l| format!("PROCESS: {l}")));
    facts
}

fn port_facts(result: &ProbeResult) -> Vec<String> {
    let Some(port) = SS_PORT_RE
        .captures(&result.cmd)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
    else {
        return Vec::new();
    };

    let listening = result.stdout.lines().any(|l| l.contains("LISTEN"));
    let mut facts = vec![format!(
        "PORT_{port}_LISTENING: {}",
        if listening { "yes" } else { "no" }
    )];
    if listening {
        if let Some(caps) = SS_PROCESS_RE.captures(&result.stdout) {
            facts.push(format!("PORT_{port}_PROCESS: {} (PID={})", &caps[1], &caps[2]));
        }
    }
    facts
}

fn service_facts(result: &ProbeResult) -> Vec<String> {
    for line in result.stdout.lines() {
        if let Some(state) = line.trim_start().strip_prefix("Active:") {
            return vec![format!("SERVICE_STATUS: {}", state.trim())];
        }
    }
    if result.rc != 0 {
        return vec!["SERVICE_STATUS: unknown (unit not found)".to_string()];
    }
    Vec::new()
}

fn journal_facts(result: &ProbeResult) -> Vec<String> {
    let matching: Vec<&str> = result
        .stdout
        .lines()
        .filter(|l| {
            let lower = l.to_lowercase();
            lower.contains("error") || lower.contains("fail")
        })
        .collect();
    let mut facts = vec![format!("LOG_ERRORS: {}", matching.len())];
    if let Some(last) = matching.last() {
        facts.push(format!("LAST_ERROR: {last}"));
    }
    facts
}

fn container_facts(result: &ProbeResult) -> Vec<String> {
    let rows: Vec<&str> = result
        .stdout
        .lines()
        .filter(|l| !l.is_empty() && !l.starts_with("CONTAINER"))
        .collect();
    let mut facts = vec![format!("CONTAINERS_RUNNING: {}", rows.len())];
    facts.extend(rows.iter().take(5).map(|r| format!("CONTAINER: {r}")));
    facts
}

fn package_facts(result: &ProbeResult, entities: &Entities) -> Vec<String> {
    let name = entities
        .package
        .as_deref()
        .or(entities.target.as_deref())
        .unwrap_or("package");
    if result.rc == 0 && result.stdout.lines().any(|l| l.starts_with("ii")) {
        vec![format!("PACKAGE_INSTALLED: {name}")]
    } else if result.rc == 0 {
        vec![format!("PACKAGE_NOT_INSTALLED: {name}")]
    } else {
        Vec::new()
    }
}

fn tool_facts(result: &ProbeResult) -> Vec<String> {
    if result.rc == 0 {
        if let Some(path) = result.stdout.lines().next().filter(|l| !l.is_empty()) {
            return vec![format!("TOOL_FOUND: {path}")];
        }
    }
    vec![format!("TOOL_NOT_FOUND: {}", last_token(&result.cmd))]
}

fn single_line_fact(result: &ProbeResult, key: &str) -> Vec<String> {
    match result.stdout.lines().next() {
        Some(line) if !line.is_empty() => vec![format!("{key}: {line}")],
        _ => Vec::new(),
    }
}

fn table_facts(result: &ProbeResult, key: &str, header_prefix: &str, max: usize) -> Vec<String> {
    result
        .stdout
        .lines()
        .filter(|l| !l.is_empty() && !l.starts_with(header_prefix))
        .take(max)
        .map(|l| format!("{key}: {l}"))
        .collect()
}

fn last_token(cmd: &str) -> &str {
    cmd.split_whitespace().last().unwrap_or(cmd)
}

/// Truncate to at most `limit` bytes without splitting a UTF-8 sequence.
fn excerpt(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
