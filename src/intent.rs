use serde_json::Value;

/// Closed set of topical tags a query can be routed to. Unknown tags coming
/// back from the model are dropped during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    File,
    Process,
    Network,
    Service,
    System,
    Software,
    Storage,
    Container,
    User,
    Log,
}

impl Domain {
    pub const ALL: [Domain; 10] = [
        Domain::File,
        Domain::Process,
        Domain::Network,
        Domain::Service,
        Domain::System,
        Domain::Software,
        Domain::Storage,
        Domain::Container,
        Domain::User,
        Domain::Log,
    ];

    pub fn parse(tag: &str) -> Option<Domain> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "file" => Some(Domain::File),
            "process" => Some(Domain::Process),
            "network" => Some(Domain::Network),
            "service" => Some(Domain::Service),
            "system" => Some(Domain::System),
            "software" => Some(Domain::Software),
            "storage" => Some(Domain::Storage),
            "container" => Some(Domain::Container),
            "user" => Some(Domain::User),
            "log" => Some(Domain::Log),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::File => "file",
            Domain::Process => "process",
            Domain::Network => "network",
            Domain::Service => "service",
            Domain::System => "system",
            Domain::Software => "software",
            Domain::Storage => "storage",
            Domain::Container => "container",
            Domain::User => "user",
            Domain::Log => "log",
        }
    }
}

/// Named things pulled out of the query, either by the model or by the
/// regex fallback. Every value is advisory until the planner re-validates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entities {
    pub target: Option<String>,
    pub path: Option<String>,
    pub port: Option<String>,
    pub service: Option<String>,
    pub package: Option<String>,
    pub container: Option<String>,
    pub user: Option<String>,
    pub ip: Option<String>,
    pub pid: Option<String>,
    pub filename: Option<String>,
    pub domain: Option<String>,
    pub tool: Option<String>,
}

impl Entities {
    /// Fill any field that is still absent from `fallback`. Model-provided
    /// values always win over regex guesses.
    pub fn merge_fallback(&mut self, fallback: &Entities) {
        fn fill(slot: &mut Option<String>, value: &Option<String>) {
            if slot.is_none() {
                slot.clone_from(value);
            }
        }
        fill(&mut self.target, &fallback.target);
        fill(&mut self.path, &fallback.path);
        fill(&mut self.port, &fallback.port);
        fill(&mut self.service, &fallback.service);
        fill(&mut self.package, &fallback.package);
        fill(&mut self.container, &fallback.container);
        fill(&mut self.user, &fallback.user);
        fill(&mut self.ip, &fallback.ip);
        fill(&mut self.pid, &fallback.pid);
        fill(&mut self.filename, &fallback.filename);
        fill(&mut self.domain, &fallback.domain);
        fill(&mut self.tool, &fallback.tool);
    }

    /// Copy `target` into more specific slots when its shape gives it away:
    /// a leading `/` means path, an all-digit value means port.
    pub fn cross_promote(&mut self) {
        if let Some(target) = self.target.as_deref() {
            if target.starts_with('/') && self.path.is_none() {
                self.path = Some(target.to_string());
            } else if !target.is_empty()
                && target.chars().all(|c| c.is_ascii_digit())
                && self.port.is_none()
            {
                self.port = Some(target.to_string());
            }
        }
    }

    /// True when any entity narrows the query to a concrete target.
    pub fn has_targeting(&self) -> bool {
        self.target.is_some()
            || self.path.is_some()
            || self.filename.is_some()
            || self.port.is_some()
            || self.service.is_some()
            || self.container.is_some()
    }

    fn from_json(value: &Value) -> Entities {
        let mut entities = Entities::default();
        let Some(map) = value.as_object() else {
            return entities;
        };
        for (key, raw) in map {
            let text = match raw {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                _ => continue,
            };
            if text.is_empty() {
                continue;
            }
            let slot = match key.as_str() {
                "target" => &mut entities.target,
                "path" => &mut entities.path,
                "port" => &mut entities.port,
                "service" => &mut entities.service,
                "package" => &mut entities.package,
                "container" => &mut entities.container,
                "user" => &mut entities.user,
                "ip" => &mut entities.ip,
                "pid" => &mut entities.pid,
                "filename" => &mut entities.filename,
                "domain" => &mut entities.domain,
                "tool" => &mut entities.tool,
                _ => continue,
            };
            *slot = Some(text);
        }
        entities
    }
}

/// What the model believes the user wants, normalized to the closed domain
/// set. `parse_error` / `llm_error` are diagnostic annotations carried for
/// the debug view, never consumed by the pipeline.
#[derive(Debug, Clone)]
pub struct Intent {
    pub domains: Vec<Domain>,
    pub action: String,
    pub entities: Entities,
    pub complexity: u8,
    pub parse_error: Option<String>,
    pub llm_error: Option<String>,
}

impl Default for Intent {
    fn default() -> Self {
        Self {
            domains: vec![Domain::File],
            action: "unknown".to_string(),
            entities: Entities::default(),
            complexity: 2,
            parse_error: None,
            llm_error: None,
        }
    }
}

impl Intent {
    /// Build an Intent from a (repaired) JSON value. Unknown domain tags are
    /// dropped, the list is capped at three entries, and an empty list falls
    /// back to `file`.
    pub fn from_json(value: &Value) -> Intent {
        let mut domains: Vec<Domain> = Vec::new();
        if let Some(tags) = value.get("domains").and_then(Value::as_array) {
            for domain in tags.iter().filter_map(Value::as_str).filter_map(Domain::parse) {
                if !domains.contains(&domain) {
                    domains.push(domain);
                }
            }
        }
        domains.truncate(3);
        if domains.is_empty() {
            domains.push(Domain::File);
        }

        let action = value
            .get("action")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("unknown")
            .to_string();

        let entities = value
            .get("entities")
            .map(Entities::from_json)
            .unwrap_or_default();

        let complexity = value
            .get("complexity")
            .and_then(Value::as_u64)
            .map(|n| n.clamp(1, 4) as u8)
            .unwrap_or(2);

        Intent {
            domains,
            action,
            entities,
            complexity,
            parse_error: None,
            llm_error: None,
        }
    }

    /// Fallback intent used when the model output cannot be parsed at all.
    pub fn parse_failure(message: impl Into<String>) -> Intent {
        Intent {
            parse_error: Some(message.into()),
            ..Intent::default()
        }
    }

    /// Debug rendering for the `--debug` panel.
    pub fn describe(&self) -> String {
        let domains: Vec<&str> = self.domains.iter().map(Domain::as_str).collect();
        let mut parts = vec![
            format!("domains=[{}]", domains.join(",")),
            format!("action={:?}", self.action),
            format!("complexity={}", self.complexity),
        ];
        let pairs: [(&str, &Option<String>); 12] = [
            ("target", &self.entities.target),
            ("path", &self.entities.path),
            ("port", &self.entities.port),
            ("service", &self.entities.service),
            ("package", &self.entities.package),
            ("container", &self.entities.container),
            ("user", &self.entities.user),
            ("ip", &self.entities.ip),
            ("pid", &self.entities.pid),
            ("filename", &self.entities.filename),
            ("domain", &self.entities.domain),
            ("tool", &self.entities.tool),
        ];
        for (name, value) in pairs {
            if let Some(v) = value {
                parts.push(format!("{name}={v}"));
            }
        }
        if let Some(err) = &self.parse_error {
            parts.push(format!("_parse_error={err}"));
        }
        if let Some(err) = &self.llm_error {
            parts.push(format!("_llm_error={err}"));
        }
        parts.join(" ")
    }
}
