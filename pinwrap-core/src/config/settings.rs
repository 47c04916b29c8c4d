//! Per-user settings for pinwrap.
//!
//! Settings live in `{config_dir}/pinwrap/settings.json` and every field is
//! optional. A missing file means defaults; a file that cannot be read or
//! parsed is reported and ignored so a broken settings file never blocks a
//! build.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name of the settings file inside the pinwrap config directory.
pub const SETTINGS_FILE: &str = "settings.json";

/// Directory name under the OS config directory.
const CONFIG_DIR_NAME: &str = "pinwrap";

// =============================================================================
// Proxy
// =============================================================================

/// HTTP proxy used for downloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
}

impl ProxyConfig {
    /// Returns the proxy as an `http://host:port` URL.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Settings
// =============================================================================

/// User settings - loaded from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Overrides the archive cache root (`~/.{tool}/wrapper/dist`).
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Overrides the distribution base URL from the bundled manifest.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Java runtime used to launch the tool.
    #[serde(default)]
    pub java: Option<PathBuf>,

    /// HTTP proxy for downloads.
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
}

impl Settings {
    /// Loads settings from the default location, or defaults if there is none.
    pub fn load() -> Self {
        match settings_path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No config directory on this platform, using default settings");
                Self::default()
            }
        }
    }

    /// Loads settings from a specific path.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            debug!("Settings not found at {}, using defaults", path.display());
            return Self::default();
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "Failed to read settings at {}, using defaults", path.display());
                return Self::default();
            }
        };

        match serde_json::from_str::<Settings>(&content) {
            Ok(settings) => {
                if let Some(proxy) = &settings.proxy {
                    debug!("Using HTTP proxy: {}:{}", proxy.host, proxy.port);
                }
                settings
            }
            Err(e) => {
                warn!(error = %e, "Failed to parse settings at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Returns the Java executable: the configured one, else `$JAVA_HOME/bin/java`,
    /// else `java` from `PATH`.
    pub fn java_executable(&self) -> PathBuf {
        if let Some(java) = &self.java {
            return java.clone();
        }
        java_from_home(std::env::var_os("JAVA_HOME"))
    }
}

/// Returns the default settings path: `{config_dir}/pinwrap/settings.json`.
pub fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(SETTINGS_FILE))
}

fn java_from_home(java_home: Option<OsString>) -> PathBuf {
    #[cfg(windows)]
    let java_name = "java.exe";

    #[cfg(not(windows))]
    let java_name = "java";

    match java_home {
        Some(home) if !home.is_empty() => PathBuf::from(home).join("bin").join(java_name),
        _ => PathBuf::from("java"),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&temp_dir.path().join("nope.json"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_all_fields() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(SETTINGS_FILE);
        fs::write(
            &path,
            r#"{
                "cache_dir": "/opt/cache",
                "base_url": "https://mirror.example.com/dist",
                "java": "/opt/jdk/bin/java",
                "proxy": { "host": "proxy.local", "port": 3128 }
            }"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.cache_dir, Some(PathBuf::from("/opt/cache")));
        assert_eq!(
            settings.base_url.as_deref(),
            Some("https://mirror.example.com/dist")
        );
        assert_eq!(settings.java_executable(), PathBuf::from("/opt/jdk/bin/java"));
        assert_eq!(
            settings.proxy.as_ref().map(ProxyConfig::url).as_deref(),
            Some("http://proxy.local:3128")
        );
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{ "base_url": "http://localhost/dist" }"#).unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.base_url.as_deref(), Some("http://localhost/dist"));
        assert!(settings.cache_dir.is_none());
        assert!(settings.proxy.is_none());
    }

    #[test]
    fn test_corrupted_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(SETTINGS_FILE);
        fs::write(&path, "not valid json {{{{").unwrap();

        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_java_from_home() {
        assert_eq!(java_from_home(None), PathBuf::from("java"));
        assert_eq!(java_from_home(Some(OsString::new())), PathBuf::from("java"));

        let java = java_from_home(Some(OsString::from("/opt/jdk")));
        assert!(java.starts_with("/opt/jdk/bin"));
    }

    #[test]
    fn test_settings_path_ends_with_file_name() {
        if let Some(path) = settings_path() {
            assert!(path.ends_with("pinwrap/settings.json"));
        }
    }
}
