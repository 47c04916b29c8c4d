//! Installation of the pinned tool.
//!
//! This module resolves which version of the delegate tool a project needs,
//! makes sure its distribution is present in the per-user cache, and places
//! the launcher files into the project.
//!
//! # Architecture
//!
//! - `types`: Core types (TargetVersion, HostOs)
//! - `properties`: key=value text format used by the manifest and markers
//! - `version`: Bundled manifest and project markers (VersionResolver)
//! - `paths`: Cache entry and project layout path resolution (ArchiveCache)
//! - `downloader`: HTTP download with redirects, retries and progress
//! - `extractor`: Zip extraction
//! - `script`: Generated launcher script
//! - `reconciler`: The install state machine tying everything together
//!
//! # Example
//!
//! ```ignore
//! use pinwrap_core::install::*;
//! use pinwrap_core::Console;
//!
//! let console = Console::new(1);
//! let resolver = VersionResolver::new(ManifestSource::Embedded(MANIFEST), console.clone());
//! let manifest = resolver.resolve()?;
//! let project = ProjectLayout::new(std::env::current_dir()?, &manifest.tool_name);
//! let marker = resolver.ensure_marker(&project, &manifest.version)?;
//!
//! let cache = ArchiveCache::new(ArchiveCache::default_root(&manifest.tool_name).unwrap());
//! let downloader = Downloader::new(console.clone(), None)?;
//! let extractor = ArchiveExtractor::new(console.clone());
//! let reconciler = InstallReconciler::new(cache, project, downloader, extractor, console);
//! let installed = reconciler.install(&manifest, &marker).await?;
//! println!("Tool jar at {}", installed.jar_path.display());
//! ```

pub mod downloader;
pub mod extractor;
pub mod paths;
pub mod properties;
pub mod reconciler;
pub mod script;
pub mod types;
pub mod version;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use downloader::{DownloadError, DownloadProgress, Downloader};
pub use extractor::{ArchiveExtractor, ExtractError, ExtractReport};
pub use paths::{ArchiveCache, CacheEntry, ProjectLayout};
pub use reconciler::{
    InstallError, InstallOptions, InstallReconciler, InstalledTool, PlacementOutcome,
};
pub use script::LauncherScript;
pub use types::{HostOs, TargetVersion};
pub use version::{
    ConfigError, InstalledVersionMarker, ManifestSource, ToolManifest, VersionResolver,
    WrapperMarker,
};
