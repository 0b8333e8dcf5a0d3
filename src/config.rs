use serde::Deserialize;
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use crate::router::SearchConfig;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    /// Display name for the router
    #[serde(default = "default_router_name")]
    pub name: String,

    /// Search for the gateway on startup
    #[serde(default = "default_true", deserialize_with = "deserialize_bool")]
    pub discover: bool,

    /// Discovery timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Local IP address to search from (optional, auto-detected if not set)
    #[serde(default)]
    pub bind_ip: Option<Ipv4Addr>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            name: default_router_name(),
            discover: true,
            timeout: default_timeout(),
            bind_ip: None,
        }
    }
}

impl RouterConfig {
    pub fn search(&self) -> SearchConfig {
        SearchConfig {
            timeout: Duration::from_secs(self.timeout),
            bind_ip: self.bind_ip,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Directory to write log files to (optional, stderr if not set)
    #[serde(default)]
    pub directory: Option<String>,

    /// Default filter, e.g. "info" or "portmapper=debug"
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: None,
            level: default_log_level(),
        }
    }
}

/// Deserialize a boolean from string (for INI file compatibility)
fn deserialize_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let s = String::deserialize(deserializer)?;
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(D::Error::custom(format!(
            "invalid boolean value '{}', expected true/false/yes/no/on/off/1/0",
            s
        ))),
    }
}

fn default_router_name() -> String {
    "UPnP Gateway".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from an INI file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;

        let mut config: Self = serde_ini::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;

        // Router names must never be blank
        if config.router.name.trim().is_empty() {
            config.router.name = default_router_name();
        }

        Ok(config)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: std::path::PathBuf,
        source: serde_ini::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            "[router]\n\
             name=FRITZ!Box\n\
             discover=no\n\
             timeout=3\n\
             bind_ip=192.168.1.42\n\
             \n\
             [logging]\n\
             directory=logs\n\
             level=debug\n",
        );

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.router.name, "FRITZ!Box");
        assert!(!config.router.discover);
        assert_eq!(config.router.timeout, 3);
        assert_eq!(config.router.bind_ip, Some(Ipv4Addr::new(192, 168, 1, 42)));
        assert_eq!(config.logging.directory.as_deref(), Some("logs"));
        assert_eq!(config.logging.level, "debug");

        let search = config.router.search();
        assert_eq!(search.timeout, Duration::from_secs(3));
        assert_eq!(search.bind_ip, Some(Ipv4Addr::new(192, 168, 1, 42)));
    }

    #[test]
    fn test_defaults_for_missing_sections() {
        let file = write_config("[router]\nname=Home\n");

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.router.name, "Home");
        assert!(config.router.discover);
        assert_eq!(config.router.timeout, 10);
        assert_eq!(config.router.bind_ip, None);
        assert_eq!(config.logging.directory, None);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_blank_name_falls_back_to_default() {
        let file = write_config("[router]\nname=\n");
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.router.name, "UPnP Gateway");
    }

    #[test]
    fn test_invalid_bool_is_rejected() {
        let file = write_config("[router]\ndiscover=maybe\n");
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("missing.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().starts_with("failed to read config file"));
    }
}
