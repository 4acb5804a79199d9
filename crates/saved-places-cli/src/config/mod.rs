//! Configuration loading and resolution.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use saved_places::{ClassifierSettings, ImportError, ImportResult, TargetList, DEFAULT_BOOKMARKS_URL};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SAVED_PLACES_CONFIG";

/// Remote debugging endpoint of the already running browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9222,
        }
    }
}

impl Endpoint {
    pub fn http_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Everything a run can be tuned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoint: Endpoint,
    pub bookmarks_url: String,
    /// Reachability pre-check timeout, in milliseconds.
    pub probe_timeout_ms: u64,
    /// Page load timeout, in milliseconds.
    pub navigation_timeout_ms: u64,
    pub classifier: ClassifierSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            bookmarks_url: DEFAULT_BOOKMARKS_URL.to_string(),
            probe_timeout_ms: 1000,
            navigation_timeout_ms: 30_000,
            classifier: ClassifierSettings::default(),
        }
    }
}

impl Config {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Apply command-line overrides on top of the file values.
    pub fn with_overrides(
        mut self,
        host: Option<String>,
        port: Option<u16>,
        target_list: Option<TargetList>,
    ) -> Self {
        if let Some(host) = host {
            self.endpoint.host = host;
        }
        if let Some(port) = port {
            self.endpoint.port = port;
        }
        if target_list.is_some() {
            self.classifier.target_list = target_list;
        }
        self
    }
}

/// Resolve the config file path.
///
/// An explicit path (flag, then env var) is returned as-is; the discovered
/// locations are only returned when the file exists.
pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(env_path));
    }

    let cwd_config = PathBuf::from(".saved-places.json");
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    default_config_path().filter(|p| p.exists())
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".saved-places").join("config.json"))
}

/// Load the config at `path`, or defaults when there is none.
pub fn load_config(path: Option<&Path>) -> ImportResult<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| ImportError::Config(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| ImportError::Config(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let path = resolve_config_path(Some("/tmp/custom.json"));
        assert_eq!(path, Some(PathBuf::from("/tmp/custom.json")));
    }

    #[test]
    fn test_no_path_means_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.endpoint.http_url(), "http://localhost:9222");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "endpoint": { "port": 9333 },
                "classifier": {
                    "control_selector": "button[data-value='Save']",
                    "confirm_timeout": 4000
                }
            }"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.endpoint.host, "localhost");
        assert_eq!(config.endpoint.port, 9333);
        assert_eq!(
            config.classifier.control_selector,
            "button[data-value='Save']"
        );
        assert_eq!(config.classifier.confirm_timeout, Duration::from_secs(4));
        assert_eq!(config.classifier.state_timeout, Duration::from_secs(6));
        assert_eq!(config.bookmarks_url, DEFAULT_BOOKMARKS_URL);
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, ImportError::Config(_)));
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ImportError::Config(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let config = Config::default().with_overrides(
            Some("127.0.0.1".into()),
            Some(9229),
            Some(TargetList::Starred),
        );
        assert_eq!(config.endpoint.http_url(), "http://127.0.0.1:9229");
        assert_eq!(config.classifier.target_list, Some(TargetList::Starred));
    }
}
