use serde::Deserialize;
use std::path::Path;

use crate::fetcher::{DEFAULT_ENDPOINT, DEFAULT_LOCALE};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Locale of the feed to show, unsupported values fall back to en_US
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Proxy to fetch through, empty for a direct connection
    #[serde(default)]
    pub proxy_addr: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Refresh interval in minutes
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_refresh_interval() -> u64 {
    15
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            proxy_addr: String::new(),
            endpoint: default_endpoint(),
            refresh_interval: default_refresh_interval(),
            listen_addr: default_listen_addr(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_refresh_interval() {
        assert_eq!(default_refresh_interval(), 15);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
            locale = "fa_IR"
            proxy_addr = "127.0.0.1:8787"
            refresh_interval = 30
            listen_addr = "127.0.0.1:8080"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.locale, "fa_IR");
        assert_eq!(config.proxy_addr, "127.0.0.1:8787");
        assert_eq!(config.refresh_interval, 30);
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();

        assert_eq!(config.locale, "en_US");
        assert!(config.proxy_addr.is_empty());
        assert_eq!(config.endpoint, "https://feeds.getiantem.org/{locale}/feed.json");
        assert_eq!(config.refresh_interval, 15);
        assert_eq!(config.listen_addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_custom_endpoint() {
        let content = r#"endpoint = "http://localhost:9000/{locale}.json""#;

        let config = Config::from_str(content).unwrap();
        assert_eq!(config.endpoint, "http://localhost:9000/{locale}.json");
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let content = "this is not valid toml {{{";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let result = Config::load(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let result = Config::from_str(r#"refresh_interval = "soon""#);
        assert!(result.is_err());
    }
}
