use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_USER_AGENT: &str = "torah-dl/1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_output_dir() -> String {
    dirs::download_dir()
        .map(|p| p.join("torah-dl").to_string_lossy().to_string())
        .unwrap_or_else(|| "~/Downloads/torah-dl".to_string())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            log_format: default_log_format(),
            output_dir: default_output_dir(),
        }
    }
}

fn config_dir() -> PathBuf {
    // ~/.config/torah-dl/ on every platform, not dirs::config_dir()
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("torah-dl")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.yml")
}

pub fn get_config() -> Result<Config, Box<dyn std::error::Error>> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    } else {
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("nope.yml")).unwrap();
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.log_format, "text");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "timeout_secs: 5\nlog_format: json\n").unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.log_format, "json");
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }
}
