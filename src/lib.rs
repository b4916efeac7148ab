//! MindMend client
//!
//! Client core for the MindMend mental-health support chat:
//! - Conversation view-model that reconciles the backend's conversation list and
//!   history with local UI state
//! - Controllers for the chat pane, the conversation sidebar, the auth forms and
//!   the admin dashboard
//! - Pure render functions producing escaped markup or terminal text
//! - Typed HTTP client for the backend's `/api/*` REST surface

pub mod admin;
pub mod api;
pub mod auth;
pub mod events;
pub mod filter;
pub mod format;
pub mod render;
pub mod session;
pub mod sidebar;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: ServerYamlConfig,
    pub chat: ChatYamlConfig,
    pub ui: UiYamlConfig,
}

/// Backend connection section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerYamlConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for ServerYamlConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5000".into(),
            timeout_secs: 30,
        }
    }
}

/// Chat pane section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatYamlConfig {
    /// Synthetic first bot message of a new conversation
    pub greeting: String,
    /// Show the conversation sidebar
    pub sidebar: bool,
}

impl Default for ChatYamlConfig {
    fn default() -> Self {
        Self {
            greeting: store::DEFAULT_GREETING.into(),
            sidebar: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiYamlConfig {
    /// Viewports narrower than this many pixels use the overlay sidebar
    pub narrow_viewport_width: u32,
}

impl Default for UiYamlConfig {
    fn default() -> Self {
        Self {
            narrow_viewport_width: sidebar::DEFAULT_NARROW_WIDTH,
        }
    }
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server_url: String,
    pub request_timeout: Duration,
    pub greeting: String,
    pub sidebar: bool,
    pub narrow_viewport_width: u32,
}

impl Config {
    /// Load configuration from environment variables only.
    /// Equivalent to from_yaml_and_env(None).
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. If the file doesn't
    /// exist, falls back to pure env var / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);

        let timeout_secs = std::env::var("MINDMEND_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(yaml.server.timeout_secs);
        if timeout_secs == 0 {
            anyhow::bail!("request timeout must be at least one second");
        }

        Ok(Self {
            server_url: std::env::var("MINDMEND_URL").unwrap_or(yaml.server.url),
            request_timeout: Duration::from_secs(timeout_secs),
            greeting: std::env::var("MINDMEND_GREETING").unwrap_or(yaml.chat.greeting),
            sidebar: yaml.chat.sidebar,
            narrow_viewport_width: std::env::var("MINDMEND_NARROW_WIDTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(yaml.ui.narrow_viewport_width),
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod config_tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_yaml_config_loading() {
        let yaml = r#"
server:
  url: https://mindmend.example.org
  timeout_secs: 10

chat:
  greeting: "Hi there."
  sidebar: false

ui:
  narrow_viewport_width: 900
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.url, "https://mindmend.example.org");
        assert_eq!(config.server.timeout_secs, 10);
        assert_eq!(config.chat.greeting, "Hi there.");
        assert!(!config.chat.sidebar);
        assert_eq!(config.ui.narrow_viewport_width, 900);
    }

    #[test]
    fn test_yaml_partial_sections() {
        let yaml = r#"
server:
  url: http://10.0.0.2:5000
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.url, "http://10.0.0.2:5000");
        assert_eq!(config.server.timeout_secs, 30);
        assert!(config.chat.sidebar);
    }

    #[test]
    fn test_yaml_defaults() {
        let config = YamlConfig::default();
        assert_eq!(config.server.url, "http://localhost:5000");
        assert_eq!(config.chat.greeting, store::DEFAULT_GREETING);
        assert_eq!(config.ui.narrow_viewport_width, 768);
    }

    /// Combined test for YAML file loading and env var overrides.
    /// Runs as a single test to avoid parallel env var race conditions.
    #[test]
    fn test_yaml_and_env_lifecycle() {
        fn clear_env() {
            for var in &[
                "MINDMEND_URL",
                "MINDMEND_TIMEOUT_SECS",
                "MINDMEND_GREETING",
                "MINDMEND_NARROW_WIDTH",
            ] {
                std::env::remove_var(var);
            }
        }

        // --- Phase 1: YAML values loaded correctly ---
        let yaml = r#"
server:
  url: http://yaml-host:5000
  timeout_secs: 5
chat:
  greeting: yaml greeting
ui:
  narrow_viewport_width: 600
"#;
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("config.yaml");
        let mut file = std::fs::File::create(&file_path).unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        clear_env();

        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.server_url, "http://yaml-host:5000");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.greeting, "yaml greeting");
        assert_eq!(config.narrow_viewport_width, 600);

        // --- Phase 2: Env vars override YAML ---
        std::env::set_var("MINDMEND_URL", "http://env-host:8000");
        std::env::set_var("MINDMEND_NARROW_WIDTH", "1000");
        std::env::set_var("MINDMEND_TIMEOUT_SECS", "not-a-number");

        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.server_url, "http://env-host:8000");
        assert_eq!(config.narrow_viewport_width, 1000);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.greeting, "yaml greeting");

        // --- Phase 3: zero timeout is rejected ---
        std::env::set_var("MINDMEND_TIMEOUT_SECS", "0");
        assert!(Config::from_yaml_and_env(Some(&file_path)).is_err());

        // --- Phase 4: missing file falls back to defaults ---
        clear_env();
        let missing = dir.path().join("missing.yaml");
        let config = Config::from_yaml_and_env(Some(&missing)).unwrap();
        assert_eq!(config.server_url, "http://localhost:5000");
        assert!(config.sidebar);

        // --- Phase 5: invalid YAML falls back to defaults ---
        let bad_path = dir.path().join("bad.yaml");
        std::fs::write(&bad_path, "server: [unclosed").unwrap();
        let config = Config::from_yaml_and_env(Some(&bad_path)).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(30));

        clear_env();
    }
}
