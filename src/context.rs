/// One-line host description fed into the generation prompt:
/// `OS: <name> <kernel>, Shell: <shell>, CWD: <cwd>`.
pub fn system_context() -> String {
    let os = os_name();
    let release = kernel_release();
    let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/bash".to_string());
    let cwd = std::env::current_dir()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "?".to_string());

    if release.is_empty() {
        format!("OS: {os}, Shell: {shell}, CWD: {cwd}")
    } else {
        format!("OS: {os} {release}, Shell: {shell}, CWD: {cwd}")
    }
}

fn os_name() -> String {
    if let Ok(content) = std::fs::read_to_string("/etc/os-release") {
        for line in content.lines() {
            if let Some(pretty) = line.strip_prefix("PRETTY_NAME=") {
                return pretty.trim_matches('"').to_string();
            }
        }
    }
    let os = std::env::consts::OS;
    let mut chars = os.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => os.to_string(),
    }
}

fn kernel_release() -> String {
    std::fs::read_to_string("/proc/sys/kernel/osrelease")
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}
