//! Three-tier safety gate for reconnaissance shell fragments.
//!
//! Tier 1 rejects dangerous shell structure (substitution, redirection,
//! chaining). Tier 2 rejects known mutating commands by base token or
//! multi-word prefix. Tier 3 only admits sub-commands whose base is on a
//! closed read-only allow list, is a pure variable assignment, or passes a
//! per-command restricted rule.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Commands that mutate state and are rejected outright by base token.
static DENY_BASES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        // destructive file ops
        "rm", "rmdir", "mv", "cp", "shred", "truncate", "chmod", "chown", "chattr", "ln",
        // disk / filesystem
        "dd", "mount", "umount", "fdisk", "gdisk", "sfdisk", "parted", "wipefs", "mkswap",
        "swapon", "swapoff", "tune2fs", "resize2fs",
        // lifecycle
        "reboot", "shutdown", "poweroff", "halt", "telinit",
        // user management
        "useradd", "userdel", "usermod", "adduser", "deluser", "groupadd", "groupdel",
        "groupmod", "passwd", "chpasswd", "gpasswd", "visudo",
        // firewall
        "iptables", "ip6tables", "nft", "ufw", "firewall-cmd",
        // signals
        "kill", "killall", "pkill",
        // scheduling
        "crontab", "at", "batch",
        // shell escape hatches
        "eval", "exec", "source", ".",
        // remote shells and transfer tools
        "nc", "ncat", "netcat", "socat", "ssh", "scp", "sftp", "rsync", "ftp", "telnet",
    ]
    .into_iter()
    .collect()
});

/// Multi-word mutating prefixes, matched on whole tokens after sudo strip.
const DENY_PREFIXES: &[&str] = &[
    "systemctl start",
    "systemctl stop",
    "systemctl restart",
    "systemctl reload",
    "systemctl enable",
    "systemctl disable",
    "systemctl mask",
    "systemctl unmask",
    "systemctl kill",
    "systemctl isolate",
    "systemctl set-default",
    "systemctl daemon-reload",
    "systemctl daemon-reexec",
    "apt install",
    "apt remove",
    "apt purge",
    "apt upgrade",
    "apt dist-upgrade",
    "apt autoremove",
    "apt-get install",
    "apt-get remove",
    "apt-get purge",
    "apt-get upgrade",
    "apt-get dist-upgrade",
    "apt-get autoremove",
    "dpkg -i",
    "dpkg --install",
    "dpkg -r",
    "dpkg --remove",
    "dpkg -P",
    "dpkg --purge",
    "dpkg --configure",
    "yum install",
    "yum remove",
    "yum update",
    "yum erase",
    "dnf install",
    "dnf remove",
    "dnf update",
    "dnf erase",
    "pacman -S",
    "pacman -R",
    "pacman -U",
    "pacman -Sy",
    "pacman -Syu",
    "zypper install",
    "zypper remove",
    "pip install",
    "pip uninstall",
    "pip3 install",
    "pip3 uninstall",
    "npm install",
    "npm uninstall",
    "npm update",
    "yarn add",
    "yarn remove",
    "snap install",
    "snap remove",
    "snap refresh",
    "brew install",
    "brew uninstall",
    "brew upgrade",
    "gem install",
    "gem uninstall",
    "cargo install",
    "cargo uninstall",
    "rpm -i",
    "rpm -U",
    "rpm -e",
    "docker run",
    "docker rm",
    "docker rmi",
    "docker stop",
    "docker start",
    "docker restart",
    "docker kill",
    "docker exec",
    "docker build",
    "docker pull",
    "docker push",
    "docker create",
    "docker commit",
    "docker cp",
    "docker compose up",
    "docker compose down",
    "docker compose restart",
    "docker system prune",
    "docker volume rm",
    "docker volume create",
    "docker network rm",
    "docker network create",
    "docker-compose up",
    "docker-compose down",
    "docker-compose restart",
    "podman run",
    "podman rm",
    "podman rmi",
    "podman stop",
    "podman start",
    "podman restart",
    "podman kill",
    "podman exec",
    "podman build",
    "podman pull",
    "podman push",
    "ip link set",
    "ip addr add",
    "ip addr del",
    "ip route add",
    "ip route del",
    "ip rule add",
    "ip rule del",
    "ip neigh add",
    "ip neigh del",
    "route add",
    "route del",
    "hostnamectl set-hostname",
    "timedatectl set-time",
    "timedatectl set-timezone",
    "timedatectl set-ntp",
];

/// Read-only commands admitted unconditionally by base token.
static ALLOW_BASES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        // files and text
        "ls", "cat", "tac", "head", "tail", "grep", "egrep", "fgrep", "zgrep", "rg", "find",
        "locate", "which", "whereis", "type", "command", "file", "stat", "readlink", "realpath",
        "basename", "dirname", "tree", "du", "df", "pwd", "wc", "sort", "uniq", "cut", "tr",
        "column", "paste", "join", "comm", "diff", "cmp", "strings", "numfmt", "seq",
        // checksums and encodings
        "md5sum", "sha1sum", "sha256sum", "sha512sum", "cksum", "base64", "xxd", "hexdump", "od",
        // identity and sessions
        "whoami", "who", "w", "id", "groups", "last", "lastlog", "users", "getent", "getfacl",
        // system identity
        "hostname", "hostnamectl", "uname", "arch", "nproc", "date", "cal", "uptime", "locale",
        "timedatectl",
        // hardware and kernel
        "lscpu", "lsmem", "lsblk", "lsusb", "lspci", "lsof", "lsmod", "lshw", "dmesg",
        // memory, load, processes
        "free", "vmstat", "iostat", "mpstat", "pidstat", "ps", "pgrep", "pstree", "top",
        // network (read-only; mutating `ip`/`route` forms are denied above)
        "ss", "netstat", "ip", "route", "ping", "ping6", "traceroute", "tracepath", "dig",
        "nslookup", "host", "arp",
        // environment
        "env", "printenv", "echo", "printf", "true", "false", "test",
        // logs, storage, packages
        "journalctl", "findmnt", "blkid", "apt-cache", "dpkg", "dpkg-query", "rpm", "jq",
    ]
    .into_iter()
    .collect()
});

/// Multi-word read-only prefixes for tools whose base alone is too broad.
const ALLOW_PREFIXES: &[&str] = &[
    "git status",
    "git log",
    "git diff",
    "git branch",
    "git remote",
    "git show",
    "systemctl status",
    "systemctl is-active",
    "systemctl is-enabled",
    "systemctl is-failed",
    "systemctl list-units",
    "systemctl list-unit-files",
    "systemctl show",
    "systemctl cat",
    "docker ps",
    "docker images",
    "docker inspect",
    "docker logs",
    "docker version",
    "docker info",
    "docker stats",
    "docker compose ps",
    "docker compose version",
    "docker-compose ps",
    "podman ps",
    "podman images",
    "podman inspect",
    "podman logs",
    "apt list",
    "apt show",
    "apt search",
    "snap list",
    "snap info",
    "pip list",
    "pip show",
    "pip freeze",
    "pip3 list",
    "pip3 show",
    "pip3 freeze",
    "pacman -Q",
];

/// Commands that only make sense wrapping another command. Forbidden as the
/// first sub-fragment of a pipeline; later on, the wrapped command is vetted.
const COMBO_ONLY: &[&str] = &["xargs", "parallel"];

static HEX_ESCAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\x[0-9a-fA-F]{2}|\\u[0-9a-fA-F]{4}").unwrap());
static ASSIGNMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*=[A-Za-z0-9._/:@+,=-]*$").unwrap());

/// Vet a candidate shell fragment. `Ok(())` means read-only per the gate's
/// policy; `Err` carries the reason tag for logging.
pub fn vet(fragment: &str) -> Result<(), String> {
    let fragment = fragment.trim();
    if fragment.is_empty() {
        return Err("empty command".to_string());
    }

    check_dangerous_patterns(fragment)?;

    for (index, sub) in split_joiners(fragment).iter().enumerate() {
        let tokens = tokenize(sub);
        vet_sub_command(&tokens, sub, index == 0)?;
    }

    Ok(())
}

/// Convenience wrapper for callers that only need the verdict.
pub fn is_safe(fragment: &str) -> bool {
    vet(fragment).is_ok()
}

// --- Tier 1: dangerous shell structure ---

fn check_dangerous_patterns(fragment: &str) -> Result<(), String> {
    if fragment.contains('\n') || fragment.contains('\r') {
        return Err("dangerous pattern: embedded newline".to_string());
    }
    if fragment.contains('`') {
        return Err("dangerous pattern: command substitution (backtick)".to_string());
    }
    if fragment.contains("$(") {
        return Err("dangerous pattern: command substitution ($()".to_string());
    }
    if fragment.contains("<(") || fragment.contains(">(") {
        return Err("dangerous pattern: process substitution".to_string());
    }
    if fragment.contains("||") {
        return Err("dangerous pattern: logical OR (||)".to_string());
    }
    if fragment.contains(';') {
        return Err("dangerous pattern: statement separator (;)".to_string());
    }
    if HEX_ESCAPE_RE.is_match(fragment) {
        return Err("dangerous pattern: hex/unicode escape".to_string());
    }

    let bytes = fragment.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        let next = bytes.get(i + 1).copied();
        let prev = i.checked_sub(1).map(|p| bytes[p]);
        match b {
            // `>` writes a file unless it is `>|` (clobber form the original
            // tolerated) or an fd dup like `2>&1`.
            b'>' => {
                if next != Some(b'|') && next != Some(b'&') {
                    return Err("dangerous pattern: file redirection (>)".to_string());
                }
            }
            b'<' => {
                if next != Some(b'<') && prev != Some(b'<') {
                    return Err("dangerous pattern: input redirection (<)".to_string());
                }
            }
            b'&' => {
                let part_of_and = next == Some(b'&') || prev == Some(b'&');
                let fd_dup = prev == Some(b'>');
                if !part_of_and && !fd_dup {
                    return Err("dangerous pattern: background execution (&)".to_string());
                }
            }
            _ => {}
        }
    }

    Ok(())
}

// --- Tiers 2 and 3: per-sub-command policy ---

fn vet_sub_command(tokens: &[String], raw: &str, first: bool) -> Result<(), String> {
    let tokens = strip_prefix_tokens(tokens);
    if tokens.is_empty() {
        // Either an empty pipeline segment or a bare assignment prefix.
        if ASSIGNMENT_RE.is_match(raw.trim()) {
            return Ok(());
        }
        return Err("empty sub-command in pipeline".to_string());
    }

    let base = base_token(&tokens[0]);

    if COMBO_ONLY.contains(&base) {
        if first {
            return Err(format!("combo command not allowed first in pipeline: {base}"));
        }
        return vet_wrapped_command(&tokens[1..], raw);
    }

    // Tier 2: deny list.
    if DENY_BASES.contains(base) || base.starts_with("mkfs") {
        return Err(format!("dangerous command: {base}"));
    }
    let normalized = normalize_tokens(&tokens);
    for prefix in DENY_PREFIXES {
        if prefix_matches(&normalized, prefix) {
            return Err(format!("dangerous command: {prefix}"));
        }
    }

    // Tier 3: allow list, assignments, restricted rules.
    if ALLOW_BASES.contains(base) {
        return Ok(());
    }
    for prefix in ALLOW_PREFIXES {
        if prefix_matches(&normalized, prefix) {
            return Ok(());
        }
    }
    if tokens.len() == 1 && ASSIGNMENT_RE.is_match(&tokens[0]) {
        return Ok(());
    }
    if let Some(result) = check_restricted(base, &tokens, raw) {
        return result;
    }

    Err(format!("not in allow list: {base}"))
}

/// Vet the command a combo tool (`xargs`, `parallel`) hands its input to.
fn vet_wrapped_command(rest: &[String], raw: &str) -> Result<(), String> {
    let wrapped: Vec<String> = rest
        .iter()
        .skip_while(|t| t.starts_with('-'))
        .cloned()
        .collect();
    if wrapped.is_empty() {
        // Bare `| xargs` defaults to echo.
        return Ok(());
    }
    vet_sub_command(&wrapped, raw, false)
}

fn check_restricted(base: &str, tokens: &[String], raw: &str) -> Option<Result<(), String>> {
    let result = match base {
        "sed" => {
            if tokens.iter().any(|t| t == "--in-place" || t.starts_with("-i")) {
                Err("restricted: sed -i edits files in place".to_string())
            } else {
                Ok(())
            }
        }
        "awk" | "gawk" | "mawk" => {
            if raw.contains("system(") || raw.contains("print >") || raw.contains("getline <") {
                Err("restricted: awk with system()/redirection".to_string())
            } else {
                Ok(())
            }
        }
        "perl" => {
            let has_inline = tokens.iter().any(|t| t == "-e" || t == "-E");
            let has_in_place = tokens.iter().any(|t| t.starts_with("-i"));
            if has_in_place || (has_inline && (raw.contains("unlink") || raw.contains("system"))) {
                Err("restricted: perl with -i or unsafe -e".to_string())
            } else {
                Ok(())
            }
        }
        "curl" => {
            let banned = tokens.iter().any(|t| {
                matches!(t.as_str(), "-o" | "--output" | "-T" | "--upload-file")
                    || t.starts_with("-o/")
            });
            let mutating_method = tokens.iter().zip(tokens.iter().skip(1)).any(|(a, b)| {
                a == "-X" && matches!(b.to_ascii_uppercase().as_str(), "POST" | "PUT" | "DELETE")
            }) || tokens.iter().any(|t| {
                matches!(
                    t.to_ascii_uppercase().as_str(),
                    "-XPOST" | "-XPUT" | "-XDELETE"
                )
            });
            if banned || mutating_method {
                Err("restricted: curl with output/upload/mutating method".to_string())
            } else {
                Ok(())
            }
        }
        "wget" => {
            if tokens.iter().any(|t| {
                t.starts_with("--post-data")
                    || t.starts_with("--post-file")
                    || t.starts_with("--method")
            }) {
                Err("restricted: wget with post/method options".to_string())
            } else {
                Ok(())
            }
        }
        "tee" => {
            let sink = tokens.iter().skip(1).find(|t| !t.starts_with('-'));
            match sink.map(String::as_str) {
                None | Some("/dev/null") | Some("/dev/stdout") | Some("/dev/stderr") => Ok(()),
                Some(other) => Err(format!("restricted: tee writes to {other}")),
            }
        }
        "sleep" => match tokens.get(1).map(|t| parse_sleep_seconds(t)) {
            Some(Some(secs)) if secs <= 10.0 => Ok(()),
            Some(_) => Err("restricted: sleep longer than 10s".to_string()),
            None => Ok(()),
        },
        _ => return None,
    };
    Some(result)
}

fn parse_sleep_seconds(arg: &str) -> Option<f64> {
    if let Ok(secs) = arg.parse::<f64>() {
        return Some(secs);
    }
    let (number, suffix) = arg.split_at(arg.len().saturating_sub(1));
    let value: f64 = number.parse().ok()?;
    match suffix {
        "s" => Some(value),
        "m" => Some(value * 60.0),
        "h" => Some(value * 3600.0),
        "d" => Some(value * 86400.0),
        _ => None,
    }
}

// --- Fragment decomposition helpers ---

/// Split on `|` and `&&`, the only joiners that survive Tier 1.
fn split_joiners(fragment: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = fragment.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '|' => {
                parts.push(current.trim().to_string());
                current = String::new();
            }
            '&' if chars.peek() == Some(&'&') => {
                chars.next();
                parts.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(c),
        }
    }
    parts.push(current.trim().to_string());
    parts
}

fn tokenize(sub: &str) -> Vec<String> {
    shlex::split(sub)
        .unwrap_or_else(|| sub.split_whitespace().map(str::to_string).collect())
}

/// Drop leading `sudo` and environment assignments so the policy sees the
/// real base command.
fn strip_prefix_tokens(tokens: &[String]) -> Vec<String> {
    tokens
        .iter()
        .skip_while(|t| t.as_str() == "sudo" || ASSIGNMENT_RE.is_match(t))
        .cloned()
        .collect()
}

fn base_token(token: &str) -> &str {
    token.rsplit('/').next().unwrap_or(token)
}

fn normalize_tokens(tokens: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = tokens.to_vec();
    if let Some(first) = normalized.first_mut() {
        *first = base_token(first).to_string();
    }
    normalized
}

fn prefix_matches(tokens: &[String], prefix: &str) -> bool {
    let words: Vec<&str> = prefix.split_whitespace().collect();
    tokens.len() >= words.len() && tokens.iter().zip(&words).all(|(t, w)| t == w)
}
