use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform;

pub const URL_ENV: &str = "STREAMDOCK_URL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Retries after the first attempt, network failures only.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Saved positions at or below this never prompt.
    #[serde(default = "default_resume_threshold_secs")]
    pub resume_threshold_secs: u64,
    /// Unanswered prompts resume after this long.
    #[serde(default = "default_resume_prompt_secs")]
    pub resume_prompt_secs: u64,
    #[serde(default = "default_save_interval_secs")]
    pub save_interval_secs: u64,
    #[serde(default)]
    pub mpv_extra_args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_duration_ms")]
    pub default_duration_ms: u64,
    #[serde(default = "default_max_visible")]
    pub max_visible: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_prefix: default_api_prefix(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
            enabled: true,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            resume_threshold_secs: default_resume_threshold_secs(),
            resume_prompt_secs: default_resume_prompt_secs(),
            save_interval_secs: default_save_interval_secs(),
            mpv_extra_args: Vec::new(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            default_duration_ms: default_duration_ms(),
            max_visible: default_max_visible(),
        }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_interval_secs: default_probe_interval_secs(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_base_delay_ms() -> u64 {
    1_000
}

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_true() -> bool {
    true
}

fn default_resume_threshold_secs() -> u64 {
    10
}

fn default_resume_prompt_secs() -> u64 {
    5
}

fn default_save_interval_secs() -> u64 {
    10
}

fn default_duration_ms() -> u64 {
    3_000
}

fn default_max_visible() -> usize {
    4
}

fn default_probe_interval_secs() -> u64 {
    5
}

fn default_probe_timeout_ms() -> u64 {
    1_500
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// `base_url` + `api_prefix`, without a trailing slash.
    pub fn api_root(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let prefix = self.api_prefix.trim_matches('/');
        if prefix.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, prefix)
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        if let Ok(url) = std::env::var(URL_ENV) {
            config.apply_url_override(&url);
        }
        Ok(config)
    }

    /// Reads `path`, writing a default file first when it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn apply_url_override(&mut self, url: &str) {
        let url = url.trim();
        if !url.is_empty() {
            self.server.base_url = url.to_string();
        }
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.server.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.server.max_retries, 2);
        assert_eq!(config.polling.interval_secs, 2);
        assert_eq!(config.player.resume_threshold_secs, 10);
        assert_eq!(config.player.resume_prompt_secs, 5);
        assert_eq!(config.player.save_interval_secs, 10);
        assert_eq!(config.notifications.default_duration_ms, 3_000);
        assert!(Config::config_path().ends_with("streamdock/config.toml"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            base_url = "http://nas.local:8000"

            [polling]
            interval_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.server.base_url, "http://nas.local:8000");
        assert_eq!(config.server.api_prefix, "/api");
        assert_eq!(config.polling.interval_secs, 5);
        assert!(config.polling.enabled);
        assert_eq!(config.player, PlayerConfig::default());
    }

    #[test]
    fn api_root_joins_prefix() {
        let mut server = ServerConfig::default();
        server.base_url = "http://host:8000/".into();
        assert_eq!(server.api_root(), "http://host:8000/api");
        server.api_prefix = "".into();
        assert_eq!(server.api_root(), "http://host:8000");
    }

    #[test]
    fn load_creates_missing_file() {
        let dir = std::env::temp_dir().join(format!("streamdock-cfg-{}", std::process::id()));
        let path = dir.join("config.toml");
        let _ = std::fs::remove_dir_all(&dir);

        let created = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created, Config::default());

        let mut edited = created.clone();
        edited.polling.interval_secs = 9;
        edited.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().polling.interval_secs, 9);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn blank_url_override_is_ignored() {
        let mut config = Config::default();
        config.apply_url_override("   ");
        assert_eq!(config.server.base_url, default_base_url());
        config.apply_url_override("http://10.0.0.2:8000");
        assert_eq!(config.server.base_url, "http://10.0.0.2:8000");
    }
}
