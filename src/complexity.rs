use crate::intent::Intent;

/// Probe budget tier for a query. Ordered: a higher tier always gets at
/// least the reconnaissance budget of a lower one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Complexity {
    Trivial = 1,
    Simple = 2,
    Moderate = 3,
    Complex = 4,
}

impl Complexity {
    pub fn from_level(level: u8) -> Complexity {
        match level {
            0 | 1 => Complexity::Trivial,
            2 => Complexity::Simple,
            3 => Complexity::Moderate,
            _ => Complexity::Complex,
        }
    }

    pub fn level(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Trivial => "TRIVIAL",
            Complexity::Simple => "SIMPLE",
            Complexity::Moderate => "MODERATE",
            Complexity::Complex => "COMPLEX",
        }
    }
}

/// Canonical one-word queries that short-circuit the whole pipeline to a
/// canned command. Matched on the stripped, lowercased query.
const TRIVIA_TABLE: &[(&[&str], &str)] = &[
    (&["pwd", "当前目录", "current directory"], "pwd"),
    (&["whoami", "当前用户", "who am i"], "whoami"),
    (&["date", "时间", "日期", "current time"], "date"),
    (&["uptime", "运行时间"], "uptime"),
    (&["hostname", "主机名"], "hostname"),
    (&["uname", "内核版本", "kernel version"], "uname -a"),
    (&["id"], "id"),
    (&["df", "磁盘使用情况", "磁盘空间", "disk usage"], "df -h"),
    (&["free", "内存使用情况", "内存使用", "memory usage"], "free -h"),
];

/// Words that mark a diagnostic ("why is X broken") query. Those always get
/// the full reconnaissance budget.
const DIAGNOSTIC_KEYWORDS: &[&str] = &[
    "为什么",
    "排查",
    "诊断",
    "失败",
    "无法",
    "不工作",
    "起不来",
    "报错",
    "why",
    "diagnose",
    "troubleshoot",
    "debug",
    "fail",
    "cannot",
    "can't",
    "unable",
    "not working",
    "connecting",
];

/// Canned command for a trivial query, if the query is in the lookup table.
pub fn trivial_command(query: &str) -> Option<&'static str> {
    let normalized = query.trim().to_lowercase();
    TRIVIA_TABLE
        .iter()
        .find(|(patterns, _)| patterns.contains(&normalized.as_str()))
        .map(|(_, cmd)| *cmd)
}

/// Heuristic complexity from the query text and the parsed intent. The
/// caller takes the max of this and the model's own estimate, so the
/// pipeline is never less cautious than the heuristics demand.
pub fn classify(query: &str, intent: &Intent) -> Complexity {
    if trivial_command(query).is_some() {
        return Complexity::Trivial;
    }

    let lower = query.to_lowercase();
    if DIAGNOSTIC_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return Complexity::Complex;
    }

    match intent.domains.len() {
        n if n >= 3 => Complexity::Complex,
        2 => Complexity::Moderate,
        _ => {
            if intent.entities.has_targeting() {
                Complexity::Simple
            } else {
                Complexity::Moderate
            }
        }
    }
}
