use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotkey: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_issue_id: Option<String>,
    pub header: HeaderConfig,
    pub markdown: MarkdownConfig,
}

/// Preferences for the (separate) header widget. Kept in the shared config
/// schema so both tools read the same file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    pub width_percent: u8,
    pub transparency_percent: u8,
    pub font_size: u8,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            width_percent: 10,
            transparency_percent: 10,
            font_size: 40,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    pub auto_generate: bool,
    pub sync_on_edit: bool,
    pub output_dir: String,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            auto_generate: true,
            sync_on_edit: true,
            output_dir: ".".to_string(),
        }
    }
}

impl AppConfig {
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.markdown.output_dir)
    }
}

fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".linsync")
        .join("config.toml")
}

pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig =
        toml::from_str(&contents).with_context(|| "Failed to parse config.toml")?;
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> Result<()> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_missing() {
        let config = load_config_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert!(config.api_key.is_none());
        assert!(config.markdown.sync_on_edit);
        assert_eq!(config.markdown.output_dir, ".");
        assert_eq!(config.header.font_size, 40);
    }

    #[test]
    fn round_trips_through_toml() {
        let mut config = AppConfig::default();
        config.api_key = Some("lin_api_abc".into());
        config.markdown.sync_on_edit = false;
        config.markdown.output_dir = "/tmp/notes".into();

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.api_key.as_deref(), Some("lin_api_abc"));
        assert!(!parsed.markdown.sync_on_edit);
        assert_eq!(parsed.markdown.output_dir, "/tmp/notes");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let parsed: AppConfig = toml::from_str("api_key = \"lin_api_x\"\n").unwrap();
        assert_eq!(parsed.api_key.as_deref(), Some("lin_api_x"));
        assert!(parsed.markdown.auto_generate);
        assert_eq!(parsed.header.width_percent, 10);
    }
}
