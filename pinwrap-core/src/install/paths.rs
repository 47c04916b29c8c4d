//! Path resolution for the archive cache and the project checkout.
//!
//! Cache layout, rooted at `~/.{tool}/wrapper/dist` by default:
//!
//! - `{root}/{tool}-{version}.zip` - downloaded distribution
//! - `{root}/{tool}-{version}/` - extracted distribution
//! - `{root}/{tool}-{version}/{tool}/wrapper/{tool}-{version}.jar` - the tool
//!
//! Project layout:
//!
//! - `{project}/{tool}w` - generated launcher script
//! - `{project}/{tool}/wrapper/{tool}-wrapper.jar` - launcher jar
//! - `{project}/{tool}/wrapper/{tool}-wrapper.properties` - wrapper marker
//! - `{project}/.{tool}/wrapperVersion.txt` - installed-version marker
//!
//! Every path is a pure function of its inputs, so two versions never share
//! a cache entry and re-running with the same version finds the same files.

use std::io;
use std::path::{Path, PathBuf};

use super::types::TargetVersion;

// ============================================================================
// Archive Cache
// ============================================================================

/// Local paths belonging to one cached distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The downloaded zip file.
    pub archive_path: PathBuf,
    /// Directory the archive unpacks into.
    pub dist_dir: PathBuf,
    /// The tool jar that proves extraction completed.
    pub jar_path: PathBuf,
    /// Launcher jar shipped inside the distribution.
    pub launcher_jar_path: PathBuf,
}

impl CacheEntry {
    /// True iff both the archive and the extracted jar exist.
    ///
    /// This is the only check deciding whether the network is needed.
    pub fn is_complete(&self) -> bool {
        self.archive_path.is_file() && self.jar_path.is_file()
    }
}

/// Maps `(tool, version)` to paths under a per-user cache directory.
#[derive(Debug, Clone)]
pub struct ArchiveCache {
    root: PathBuf,
}

impl ArchiveCache {
    /// Creates a cache rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the default cache root: `~/.{tool}/wrapper/dist`.
    pub fn default_root(tool_name: &str) -> Option<PathBuf> {
        dirs::home_dir().map(|home| {
            home.join(format!(".{tool_name}"))
                .join("wrapper")
                .join("dist")
        })
    }

    /// Returns the cache root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the cache root if needed.
    pub fn ensure_root(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }

    /// Computes the cache entry for a tool version. No filesystem access.
    pub fn locate(&self, tool_name: &str, version: &TargetVersion) -> CacheEntry {
        let base_name = format!("{tool_name}-{version}");
        let dist_dir = self.root.join(&base_name);
        let wrapper_dir = dist_dir.join(tool_name).join("wrapper");

        CacheEntry {
            archive_path: self.root.join(format!("{base_name}.zip")),
            jar_path: wrapper_dir.join(format!("{base_name}.jar")),
            launcher_jar_path: wrapper_dir.join(launcher_jar_name(tool_name)),
            dist_dir,
        }
    }
}

// ============================================================================
// Project Layout
// ============================================================================

/// Locations of the wrapper files inside a project checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
    tool_name: String,
}

impl ProjectLayout {
    /// Creates the layout for a project rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, tool_name: &str) -> Self {
        Self {
            root: root.into(),
            tool_name: tool_name.to_string(),
        }
    }

    /// Returns the project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the tool name.
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// `{project}/{tool}/wrapper`
    pub fn wrapper_dir(&self) -> PathBuf {
        self.root.join(&self.tool_name).join("wrapper")
    }

    /// `{project}/{tool}/wrapper/{tool}-wrapper.properties`
    pub fn wrapper_properties(&self) -> PathBuf {
        self.wrapper_dir()
            .join(format!("{}-wrapper.properties", self.tool_name))
    }

    /// `{project}/.{tool}/wrapperVersion.txt`
    pub fn installed_marker(&self) -> PathBuf {
        self.root
            .join(format!(".{}", self.tool_name))
            .join("wrapperVersion.txt")
    }

    /// `{project}/{tool}w`
    pub fn launcher_script(&self) -> PathBuf {
        self.root.join(format!("{}w", self.tool_name))
    }

    /// `{project}/{tool}/wrapper/{tool}-wrapper.jar`
    pub fn launcher_jar(&self) -> PathBuf {
        self.wrapper_dir().join(launcher_jar_name(&self.tool_name))
    }

    /// Launcher jar path relative to the project root, with forward slashes.
    pub fn launcher_jar_relative(&self) -> String {
        format!(
            "{}/wrapper/{}",
            self.tool_name,
            launcher_jar_name(&self.tool_name)
        )
    }
}

fn launcher_jar_name(tool_name: &str) -> String {
    format!("{tool_name}-wrapper.jar")
}
