use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable consulted when the config file has no Yandex key
pub const YANDEX_API_KEY_ENV: &str = "YANDEX_MAPS_API_KEY";

fn default_user_agent() -> String {
    "footprint/0.1.0 (building footprint resolver)".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub overpass: OverpassConfig,
    #[serde(default)]
    pub yandex: YandexConfig,
    #[serde(default)]
    pub nominatim: NominatimConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            overpass: OverpassConfig::default(),
            yandex: YandexConfig::default(),
            nominatim: NominatimConfig::default(),
        }
    }
}

fn default_overpass_urls() -> Vec<String> {
    vec!["https://overpass-api.de/api/interpreter".to_string()]
}

fn default_overpass_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    0
}

fn default_retry_backoff_secs() -> u64 {
    2
}

fn default_radius_m() -> u32 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct OverpassConfig {
    /// Mirrors, tried in order
    #[serde(default = "default_overpass_urls")]
    pub urls: Vec<String>,
    #[serde(default = "default_overpass_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts per mirror on 429/504
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
    /// Search radius around the query point, in metres
    #[serde(default = "default_radius_m")]
    pub radius_m: u32,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            urls: default_overpass_urls(),
            timeout_secs: default_overpass_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_secs: default_retry_backoff_secs(),
            radius_m: default_radius_m(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_yandex_url() -> String {
    "https://geocode-maps.yandex.ru/1.x".to_string()
}

fn default_yandex_timeout_secs() -> u64 {
    10
}

fn default_yandex_lang() -> String {
    "ru_RU".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct YandexConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_yandex_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_yandex_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_yandex_lang")]
    pub lang: String,
}

impl Default for YandexConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            url: default_yandex_url(),
            api_key: None,
            timeout_secs: default_yandex_timeout_secs(),
            lang: default_yandex_lang(),
        }
    }
}

fn default_nominatim_url() -> String {
    "https://nominatim.openstreetmap.org/reverse".to_string()
}

fn default_nominatim_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Deserialize, Clone)]
pub struct NominatimConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_nominatim_url")]
    pub url: String,
    #[serde(default = "default_nominatim_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            url: default_nominatim_url(),
            timeout_secs: default_nominatim_timeout_secs(),
        }
    }
}

impl Config {
    /// Search the standard locations; the first file that parses wins.
    pub fn load() -> Option<Self> {
        for path in get_config_paths() {
            if path.exists()
                && let Ok(contents) = std::fs::read_to_string(&path)
            {
                match toml::from_str(&contents) {
                    Ok(config) => return Some(config),
                    Err(e) => {
                        warn!("Failed to parse config file {:?}: {}", path, e);
                    }
                }
            }
        }
        None
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Fill the Yandex key from the environment when the file leaves it unset
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_api_key(std::env::var(YANDEX_API_KEY_ENV).ok());
        self
    }

    fn apply_api_key(&mut self, key: Option<String>) {
        if self.yandex.api_key.is_none() {
            self.yandex.api_key = key.filter(|k| !k.trim().is_empty());
        }
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("footprint.toml"),
        PathBuf::from(".footprint.toml"),
    ];

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("footprint").join("config.toml"));
        paths.push(config_dir.join("footprint.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".footprint.toml"));
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.overpass.radius_m, 30);
        assert_eq!(config.overpass.timeout_secs, 30);
        assert_eq!(config.yandex.timeout_secs, 10);
        assert_eq!(config.nominatim.timeout_secs, 15);
        assert!(config.yandex.enabled);
        assert!(config.yandex.api_key.is_none());
        assert_eq!(config.user_agent, default_user_agent());
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            user_agent = "test-agent"

            [overpass]
            urls = ["http://a", "http://b"]
            radius_m = 50

            [nominatim]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.overpass.urls.len(), 2);
        assert_eq!(config.overpass.radius_m, 50);
        assert_eq!(config.overpass.max_retries, 0);
        assert!(!config.nominatim.enabled);
        assert_eq!(config.yandex.lang, "ru_RU");
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[yandex]\napi_key = \"secret\"\ntimeout_secs = 3").unwrap();

        let config = Config::from_path(file.path()).unwrap();
        assert_eq!(config.yandex.api_key.as_deref(), Some("secret"));
        assert_eq!(config.yandex.timeout_secs, 3);
    }

    #[test]
    fn test_from_path_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[overpass\nradius_m = ").unwrap();
        assert!(Config::from_path(file.path()).is_err());
        assert!(Config::from_path(Path::new("/nonexistent/footprint.toml")).is_err());
    }

    #[test]
    fn test_api_key_from_environment_only_fills_gaps() {
        let mut config = Config::default();
        config.apply_api_key(Some("from-env".to_string()));
        assert_eq!(config.yandex.api_key.as_deref(), Some("from-env"));

        config.apply_api_key(Some("other".to_string()));
        assert_eq!(config.yandex.api_key.as_deref(), Some("from-env"));

        let mut blank = Config::default();
        blank.apply_api_key(Some("  ".to_string()));
        assert!(blank.yandex.api_key.is_none());
    }
}
