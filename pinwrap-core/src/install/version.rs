//! Version resolution.
//!
//! Two version records exist and they answer different questions:
//!
//! - The bundled manifest (shipped inside the launcher) decides *which*
//!   version is fetched. It always wins.
//! - The project's wrapper marker (`{tool}-wrapper.properties`) records which
//!   version the checkout expects. It is created from the manifest on first
//!   run and only used to decide whether placed launcher files are stale.
//!
//! A third record, the installed-version marker, remembers which version's
//! launcher files are currently materialized in the project.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::paths::ProjectLayout;
use super::properties::Properties;
use super::types::TargetVersion;
use crate::console::Console;

/// Property naming the delegate tool.
pub const KEY_TOOL_NAME: &str = "tool.name";
/// Property holding the pinned version.
pub const KEY_VERSION: &str = "tool.version";
/// Property holding the distribution base URL.
pub const KEY_BASE_URL: &str = "tool.baseUrl";
/// Optional wrapper-marker property replacing the whole download URL.
pub const KEY_DOWNLOAD_URL: &str = "tool.downloadUrl";

// =============================================================================
// Error Types
// =============================================================================

/// Configuration problems. All of them abort the run before any network access.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Couldn't find the bundled manifest at {0}")]
    ManifestMissing(PathBuf),

    #[error("Couldn't read the bundled manifest at {path}: {source}")]
    ManifestUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{origin} is missing the '{key}' property")]
    MissingKey { origin: String, key: &'static str },

    #[error("Invalid value in {origin}: {reason}")]
    InvalidValue { origin: String, reason: String },

    #[error("Couldn't read wrapper marker {path}: {source}")]
    MarkerUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed wrapper marker {path}: {reason}. Delete the file to recreate it")]
    MalformedMarker { path: PathBuf, reason: String },

    #[error("Couldn't write {path}: {source}")]
    MarkerWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// =============================================================================
// Bundled Manifest
// =============================================================================

/// Where the bundled manifest comes from.
#[derive(Debug, Clone)]
pub enum ManifestSource {
    /// Compiled into the launcher binary.
    Embedded(&'static str),
    /// A properties file on disk.
    File(PathBuf),
}

impl ManifestSource {
    fn origin(&self) -> String {
        match self {
            Self::Embedded(_) => "bundled manifest".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }

    fn read(&self) -> Result<String, ConfigError> {
        match self {
            Self::Embedded(text) => Ok((*text).to_string()),
            Self::File(path) => {
                if !path.is_file() {
                    return Err(ConfigError::ManifestMissing(path.clone()));
                }
                fs::read_to_string(path).map_err(|source| ConfigError::ManifestUnreadable {
                    path: path.clone(),
                    source,
                })
            }
        }
    }
}

/// Contents of the bundled manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolManifest {
    /// Name of the delegate tool, used in every file name.
    pub tool_name: String,
    /// The pinned version to install.
    pub version: TargetVersion,
    /// Base URL serving `{tool}-{version}.zip`.
    pub base_url: String,
}

impl ToolManifest {
    /// Replaces the distribution base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Returns `{base_url}/{tool}-{version}.zip`.
    pub fn archive_url(&self) -> String {
        format!(
            "{}/{}-{}.zip",
            self.base_url.trim_end_matches('/'),
            self.tool_name,
            self.version
        )
    }
}

// =============================================================================
// Wrapper Marker
// =============================================================================

/// The project's record of which version its wrapper expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperMarker {
    pub version: TargetVersion,
    /// Replaces the computed download URL when set.
    pub download_url: Option<String>,
}

impl WrapperMarker {
    /// Creates a marker for `version` with no URL override.
    pub fn new(version: TargetVersion) -> Self {
        Self {
            version,
            download_url: None,
        }
    }

    /// Loads a marker file. A missing or invalid version is fatal.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::InvalidData {
                ConfigError::MalformedMarker {
                    path: path.to_path_buf(),
                    reason: "not valid UTF-8".to_string(),
                }
            } else {
                ConfigError::MarkerUnreadable {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let properties = Properties::parse(&text);
        let raw_version = properties
            .get(KEY_VERSION)
            .ok_or_else(|| ConfigError::MalformedMarker {
                path: path.to_path_buf(),
                reason: format!("no '{KEY_VERSION}' property"),
            })?;
        let version =
            TargetVersion::parse(raw_version).map_err(|reason| ConfigError::MalformedMarker {
                path: path.to_path_buf(),
                reason,
            })?;

        let download_url = properties
            .get(KEY_DOWNLOAD_URL)
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        Ok(Self {
            version,
            download_url,
        })
    }

    /// Writes the marker, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::MarkerWrite {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        fs::write(path, self.render()).map_err(write_error)
    }

    fn render(&self) -> String {
        let mut properties = Properties::new();
        properties.set(KEY_VERSION, self.version.as_str());
        if let Some(url) = &self.download_url {
            properties.set(KEY_DOWNLOAD_URL, url);
        }
        properties.render()
    }
}

// =============================================================================
// Installed-Version Marker
// =============================================================================

/// The version whose launcher files were last placed into the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledVersionMarker {
    pub version: String,
}

impl InstalledVersionMarker {
    /// Reads the first line of the marker file. Absent or empty means no
    /// placement has been recorded yet; any other read failure is returned.
    pub fn read(path: &Path) -> io::Result<Option<Self>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No installed-version marker at {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let version = text.lines().next().unwrap_or("").trim();
        if version.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Self {
                version: version.to_string(),
            }))
        }
    }

    /// Writes the marker file. The parent directory must already exist.
    pub fn write(&self, path: &Path) -> io::Result<()> {
        fs::write(path, &self.version)
    }

    /// Returns true if this marker records `version`.
    pub fn matches(&self, version: &TargetVersion) -> bool {
        self.version == version.as_str()
    }
}

// =============================================================================
// Version Resolver
// =============================================================================

/// Reads the pinned version and maintains the project's wrapper marker.
#[derive(Debug, Clone)]
pub struct VersionResolver {
    source: ManifestSource,
    console: Console,
}

impl VersionResolver {
    pub fn new(source: ManifestSource, console: Console) -> Self {
        Self { source, console }
    }

    /// Reads the bundled manifest.
    pub fn resolve(&self) -> Result<ToolManifest, ConfigError> {
        let origin = self.source.origin();
        let properties = Properties::parse(&self.source.read()?);

        let required = |key: &'static str| {
            properties
                .get(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ConfigError::MissingKey {
                    origin: origin.clone(),
                    key,
                })
        };

        let tool_name = required(KEY_TOOL_NAME)?;
        if !tool_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            || tool_name.starts_with('.')
        {
            return Err(ConfigError::InvalidValue {
                origin: origin.clone(),
                reason: format!("tool name {tool_name:?} is not a plain file name"),
            });
        }

        let version =
            TargetVersion::parse(required(KEY_VERSION)?).map_err(|reason| {
                ConfigError::InvalidValue {
                    origin: origin.clone(),
                    reason,
                }
            })?;
        let base_url = required(KEY_BASE_URL)?.to_string();

        debug!("Bundled manifest pins {} {}", tool_name, version);

        Ok(ToolManifest {
            tool_name: tool_name.to_string(),
            version,
            base_url,
        })
    }

    /// Returns the project's wrapper marker, creating it with `target` on
    /// first run.
    pub fn ensure_marker(
        &self,
        project: &ProjectLayout,
        target: &TargetVersion,
    ) -> Result<WrapperMarker, ConfigError> {
        let path = project.wrapper_properties();
        if path.exists() {
            return WrapperMarker::load(&path);
        }

        let marker = WrapperMarker::new(target.clone());
        marker.save(&path)?;
        self.console.log(2, format!("Wrote {}", path.display()));
        Ok(marker)
    }
}
