/// Extract a single shell command from an LLM response: prefer the content
/// of a fenced block if present, then take the first non-empty line that is
/// not a comment.
pub fn extract_command(response: &str) -> String {
    let trimmed = response.trim();

    let content = extract_fenced_block(trimmed).unwrap_or(trimmed);

    for line in content.lines() {
        let line = line.trim().trim_matches('`').trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }
        return line.to_string();
    }

    String::new()
}

fn extract_fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_backticks = start + 3;
    let content_start = match text[after_backticks..].find('\n') {
        Some(newline_index) => after_backticks + newline_index + 1,
        None => after_backticks,
    };
    let end = text[content_start..].find("```")?;
    Some(text[content_start..content_start + end].trim())
}
