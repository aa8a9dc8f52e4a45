use std::sync::LazyLock;

use regex::Regex;

use crate::intent::Entities;

/// CLI tools the extractor is allowed to recognize as a `tool` entity.
/// Anything outside this set is ignored, however tool-like it looks.
const KNOWN_TOOLS: &[&str] = &[
    "git", "docker", "podman", "kubectl", "helm", "nginx", "apache2", "caddy", "mysql", "psql",
    "postgres", "redis", "mongo", "sqlite3", "python", "python3", "pip", "pip3", "node", "npm",
    "yarn", "pnpm", "java", "mvn", "gradle", "go", "cargo", "rustc", "gcc", "clang", "make",
    "cmake", "curl", "wget", "ssh", "rsync", "tar", "zip", "unzip", "ffmpeg", "jq", "awk", "sed",
    "grep", "find", "systemctl", "journalctl", "vim", "nano", "htop", "tmux", "screen",
    "iptables", "ufw", "netstat", "ss", "ping", "dig",
];

static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    // No lookbehind in the regex crate; capture the preceding char class
    // instead to reject path components like /etc/nginx.conf.
    Regex::new(r"(?:^|[^/A-Za-z0-9._-])([A-Za-z0-9_-][A-Za-z0-9._-]*\.[A-Za-z0-9]{1,10})\b")
        .unwrap()
});
static PORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:端口|port)\s*[:：]?\s*(\d{2,5})").unwrap());
static PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:^|[\s'"，,（(])(/[A-Za-z0-9._/-]+)"#).unwrap());
static IP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})\b").unwrap());
static DOMAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Za-z0-9][A-Za-z0-9-]*\.[A-Za-z]{2,})\b").unwrap());
static CONTAINER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:容器|container|docker|podman)\s+([A-Za-z0-9][A-Za-z0-9_-]*)").unwrap()
});
static PID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:进程|pid|process)\s*[:：]?\s*(\d+)").unwrap());
static TOOL_VERB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:use|run|start|check|启动|使用|运行|检查)\s+([A-Za-z0-9._+-]+)").unwrap()
});

/// Pure regex pass over the raw query. The result only ever *augments* the
/// model's own entity fields, it never overwrites them.
pub fn extract(query: &str) -> Entities {
    let mut entities = Entities::default();

    if let Some(name) = first_capture(&FILENAME_RE, query) {
        entities.filename = Some(name);
    }
    if let Some(port) = first_capture(&PORT_RE, query) {
        if valid_port(&port) {
            entities.port = Some(port);
        }
    }
    if let Some(path) = first_capture(&PATH_RE, query) {
        entities.path = Some(path);
    }
    if let Some(ip) = first_capture(&IP_RE, query) {
        entities.ip = Some(ip);
    }
    if let Some(domain) = first_capture(&DOMAIN_RE, query) {
        entities.domain = Some(domain);
    }
    if let Some(container) = first_capture(&CONTAINER_RE, query) {
        // "docker ps" style phrasings name a subcommand, not a container.
        if !matches!(container.as_str(), "ps" | "images" | "list" | "container") {
            entities.container = Some(container);
        }
    }
    if let Some(pid) = first_capture(&PID_RE, query) {
        entities.pid = Some(pid);
    }
    entities.tool = extract_tool(query);

    entities
}

fn first_capture(re: &Regex, query: &str) -> Option<String> {
    re.captures(query)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn valid_port(text: &str) -> bool {
    text.parse::<u32>()
        .map(|p| p > 0 && p < 65536)
        .unwrap_or(false)
}

fn extract_tool(query: &str) -> Option<String> {
    if let Some(candidate) = first_capture(&TOOL_VERB_RE, query) {
        let lower = candidate.to_ascii_lowercase();
        if KNOWN_TOOLS.contains(&lower.as_str()) {
            return Some(lower);
        }
    }
    let lower = query.to_ascii_lowercase();
    lower
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '.' && c != '_' && c != '-')
        .find(|token| KNOWN_TOOLS.contains(token))
        .map(str::to_string)
}
