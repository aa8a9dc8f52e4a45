use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// User-scoped endpoint configuration. Anything missing or malformed in the
/// file falls back to these defaults; the literal api key "EMPTY" is valid
/// for local OpenAI-compatible servers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1".into(),
            model: "Qwen-7B".into(),
            api_key: "EMPTY".into(),
        }
    }
}

impl Config {
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("shellscout").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("~/.config/shellscout/config.toml"))
    }

    pub fn knowledge_path() -> PathBuf {
        dirs::data_dir()
            .map(|d| d.join("shellscout").join("knowledge.jsonl"))
            .unwrap_or_else(|| PathBuf::from("~/.local/share/shellscout/knowledge.jsonl"))
    }

    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config: {e}, using defaults");
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config: {e}, using defaults");
                }
            }
        }
        Config::default()
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://localhost:8000/v1");
        assert_eq!(config.model, "Qwen-7B");
        assert_eq!(config.api_key, "EMPTY");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml"));
        assert_eq!(config.model, "Qwen-7B");
    }

    #[test]
    fn test_corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not [valid toml =").unwrap();
        let config = Config::load_from(&path);
        assert_eq!(config.base_url, "http://localhost:8000/v1");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = \"llama3\"\n").unwrap();
        let config = Config::load_from(&path);
        assert_eq!(config.model, "llama3");
        assert_eq!(config.api_key, "EMPTY");
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");
        let config = Config {
            base_url: "http://10.0.0.2:8000/v1".into(),
            model: "Qwen-14B".into(),
            api_key: "EMPTY".into(),
        };
        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path);
        assert_eq!(loaded.base_url, "http://10.0.0.2:8000/v1");
        assert_eq!(loaded.model, "Qwen-14B");
    }
}
