//! The two prompt templates the pipeline uses, kept as data so tests can
//! render them deterministically.

/// A system/user template pair with `{name}` placeholders.
pub struct PromptTemplate {
    pub system: &'static str,
    pub user: &'static str,
}

impl PromptTemplate {
    /// Substitute every `{name}` placeholder. Unknown placeholders are left
    /// untouched so a missing parameter is visible in the rendered prompt.
    pub fn render(&self, params: &[(&str, &str)]) -> (String, String) {
        let mut system = self.system.to_string();
        let mut user = self.user.to_string();
        for (name, value) in params {
            let placeholder = format!("{{{name}}}");
            system = system.replace(&placeholder, value);
            user = user.replace(&placeholder, value);
        }
        (system, user)
    }
}

/// Intent extraction: demands strict JSON matching the Intent schema.
pub const INTENT_PROMPT: PromptTemplate = PromptTemplate {
    system: "You are an intent parser for a Linux shell assistant. \
             You always reply with a single strict JSON object and nothing else.",
    user: "Analyze this Linux assistance request.\n\
           \n\
           Request: {query}\n\
           \n\
           Reply with a JSON object with exactly these keys:\n\
           - \"domains\": array of 1-3 tags from [file, process, network, service, system, software, storage, container, user, log]\n\
           - \"action\": short description of what the user wants\n\
           - \"entities\": object with any of the keys [target, path, port, service, package, container, user, ip, pid, filename, domain, tool]; omit keys you cannot fill\n\
           - \"complexity\": integer 1 (trivial lookup) to 4 (multi-step diagnosis)\n\
           \n\
           Strict JSON only. No markdown fences, no comments, no explanations.",
};

/// Final command generation: demands one bare bash command.
pub const GENERATE_PROMPT: PromptTemplate = PromptTemplate {
    system: "You are a Linux shell expert. Reply with exactly one bash command \
             that fulfills the user's request. No explanations, no code fences, \
             no comments, no alternatives.",
    user: "Environment: {context}\n\
           {tool_hint}\
           \n\
           Reference examples:\n\
           {examples}\n\
           \n\
           System reconnaissance:\n\
           {facts}\n\
           \n\
           User request: {query}\n\
           \n\
           Reply with a single bash command.",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_placeholders() {
        let (_, user) = INTENT_PROMPT.render(&[("query", "端口 8080 被谁占用")]);
        assert!(user.contains("Request: 端口 8080 被谁占用"));
        assert!(!user.contains("{query}"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let params = [
            ("context", "OS: Linux"),
            ("tool_hint", ""),
            ("examples", "No examples found."),
            ("facts", "[EXTRACTED FACTS]"),
            ("query", "list files"),
        ];
        let first = GENERATE_PROMPT.render(&params);
        let second = GENERATE_PROMPT.render(&params);
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_placeholder_left_visible() {
        let (_, user) = GENERATE_PROMPT.render(&[("query", "x")]);
        assert!(user.contains("{facts}"));
    }
}
