//! Pinwrap Core Library
//!
//! This crate provides the core functionality for pinwrap, a small launcher
//! that is checked into a project and makes sure a pinned version of a larger
//! tool is installed before handing control to it. It includes:
//!
//! - Version resolution from the bundled manifest and the project marker
//! - A per-user archive cache keyed by tool name and version
//! - HTTP download with redirect following, retries and progress reporting
//! - Zip extraction with a partial-success policy for individual entries
//! - Reconciliation of the launcher files placed into the project
//! - Spawning the installed tool with inherited standard I/O
//! - User settings (cache location, proxy, Java runtime)

pub mod config;
pub mod console;
pub mod install;
pub mod launch;

// Re-exports for convenience
pub use config::{ProxyConfig, Settings};
pub use console::Console;
pub use install::{
    ArchiveCache, ArchiveExtractor, CacheEntry, ConfigError, DownloadError, Downloader,
    ExtractError, HostOs, InstallError, InstallOptions, InstallReconciler, InstalledTool,
    LauncherScript, ManifestSource, ProjectLayout, TargetVersion, ToolManifest, VersionResolver,
    WrapperMarker,
};
pub use launch::{LaunchError, ProcessLauncher};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
