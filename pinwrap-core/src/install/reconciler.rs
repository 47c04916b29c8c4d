//! Install orchestration.
//!
//! Brings the cache and the project in line with the resolved version:
//!
//! 1. A complete cache entry (archive and jar present) skips the network.
//! 2. Otherwise the archive is downloaded and extracted. A corrupt archive is
//!    deleted and fetched again, up to three extraction attempts in total.
//! 3. The launcher files are placed into the project when the installed
//!    marker disagrees with the wrapper marker.
//! 4. The installed marker is updated and the jar path is returned.
//!
//! Concurrent runs against the same cache or project are not coordinated.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::downloader::{DownloadError, Downloader};
use super::extractor::{make_executable, ArchiveExtractor, ExtractError};
use super::paths::{ArchiveCache, CacheEntry, ProjectLayout};
use super::script::LauncherScript;
use super::types::{HostOs, TargetVersion};
use super::version::{InstalledVersionMarker, ToolManifest, WrapperMarker};
use crate::console::Console;

/// Extraction attempts per install, including the first.
pub const MAX_EXTRACT_ATTEMPTS: u32 = 3;

// ============================================================================
// Errors
// ============================================================================

/// Fatal install failures.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Couldn't create cache directory {path}: {source}")]
    CacheRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("Couldn't extract the distribution after {attempts} attempt(s): {source}")]
    Extract {
        attempts: u32,
        #[source]
        source: ExtractError,
    },
}

// ============================================================================
// Options and Results
// ============================================================================

/// User switches that change how an install behaves.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Leave the project's launcher files alone.
    pub no_overwrite: bool,
}

/// What the placement pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// Placement was switched off.
    Skipped,
    /// Markers agree and every file is in place.
    UpToDate,
    /// Some files were written.
    Placed {
        /// Files written into the project.
        written: Vec<PathBuf>,
        /// Existing files kept because the host never overwrites them.
        preserved: Vec<PathBuf>,
    },
}

/// Result of a successful install.
#[derive(Debug, Clone)]
pub struct InstalledTool {
    /// The tool jar to launch.
    pub jar_path: PathBuf,
    pub version: TargetVersion,
    /// True if the network was used.
    pub downloaded: bool,
    pub placement: PlacementOutcome,
}

// ============================================================================
// Reconciler
// ============================================================================

/// Drives download, extraction and placement for one project.
#[derive(Debug, Clone)]
pub struct InstallReconciler {
    cache: ArchiveCache,
    project: ProjectLayout,
    downloader: Downloader,
    extractor: ArchiveExtractor,
    console: Console,
    script: LauncherScript,
    host: HostOs,
    options: InstallOptions,
}

impl InstallReconciler {
    pub fn new(
        cache: ArchiveCache,
        project: ProjectLayout,
        downloader: Downloader,
        extractor: ArchiveExtractor,
        console: Console,
    ) -> Self {
        let script = LauncherScript::new(project.launcher_jar_relative());
        Self {
            cache,
            project,
            downloader,
            extractor,
            console,
            script,
            host: HostOs::detect(),
            options: InstallOptions::default(),
        }
    }

    /// Overrides the detected host platform.
    pub fn with_host_os(mut self, host: HostOs) -> Self {
        self.host = host;
        self
    }

    /// Replaces the generated launcher script.
    pub fn with_script(mut self, script: LauncherScript) -> Self {
        self.script = script;
        self
    }

    pub fn with_options(mut self, options: InstallOptions) -> Self {
        self.options = options;
        self
    }

    /// Installs the manifest's version and places the launcher files.
    pub async fn install(
        &self,
        manifest: &ToolManifest,
        marker: &WrapperMarker,
    ) -> Result<InstalledTool, InstallError> {
        let version = &manifest.version;
        let entry = self.cache.locate(&manifest.tool_name, version);

        let downloaded = if entry.is_complete() {
            self.console.log(
                2,
                format!(
                    "{} {} already in {}",
                    manifest.tool_name,
                    version,
                    entry.dist_dir.display()
                ),
            );
            false
        } else {
            self.cache
                .ensure_root()
                .map_err(|source| InstallError::CacheRoot {
                    path: self.cache.root().to_path_buf(),
                    source,
                })?;
            let url = self.download_url(manifest, marker);
            self.download_and_extract(&url, &entry).await?;
            true
        };

        if !entry.jar_path.is_file() {
            self.console.warn(format!(
                "Couldn't find {} after installation",
                entry.jar_path.display()
            ));
        }

        let placement = self.place(&entry, marker);
        info!("{} {} ready at {}", manifest.tool_name, version, entry.jar_path.display());

        Ok(InstalledTool {
            jar_path: entry.jar_path,
            version: version.clone(),
            downloaded,
            placement,
        })
    }

    /// The marker's URL override only applies to the version it was written for.
    fn download_url(&self, manifest: &ToolManifest, marker: &WrapperMarker) -> String {
        match &marker.download_url {
            Some(url) if marker.version == manifest.version => url.clone(),
            Some(url) => {
                self.console.warn(format!(
                    "Ignoring download URL {} recorded for version {}",
                    url, marker.version
                ));
                manifest.archive_url()
            }
            None => manifest.archive_url(),
        }
    }

    // ========================================================================
    // Download and extraction
    // ========================================================================

    async fn download_and_extract(&self, url: &str, entry: &CacheEntry) -> Result<(), InstallError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.download(url, &entry.archive_path).await?;

            match self.extractor.extract(&entry.archive_path, self.cache.root()) {
                Ok(report) => {
                    if !report.skipped.is_empty() {
                        self.console.warn(format!(
                            "{} entries of {} couldn't be written",
                            report.skipped.len(),
                            entry.archive_path.display()
                        ));
                    }
                    return Ok(());
                }
                Err(e) if e.is_corrupt() && attempt < MAX_EXTRACT_ATTEMPTS => {
                    self.console.warn(format!("{e}, downloading it again"));
                    remove_archive(&entry.archive_path);
                }
                Err(e) => {
                    return Err(InstallError::Extract {
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }

    /// A bad HTTP status is reported and extraction goes ahead with
    /// whatever is on disk.
    async fn download(&self, url: &str, archive_path: &Path) -> Result<(), InstallError> {
        match self.downloader.fetch(url, archive_path).await {
            Ok(bytes) => {
                debug!("Fetched {} bytes from {}", bytes, url);
                Ok(())
            }
            Err(e) if !e.is_fatal() => {
                self.console.error(&e);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    // ========================================================================
    // Placement
    // ========================================================================

    /// Windows never overwrites the copied launcher jar; the script is
    /// generated by us and is always rewritten when placement runs.
    fn place(&self, entry: &CacheEntry, marker: &WrapperMarker) -> PlacementOutcome {
        if self.options.no_overwrite {
            self.console
                .log(2, "--noOverwrite specified, not copying the wrapper files");
            return PlacementOutcome::Skipped;
        }

        let marker_path = self.project.installed_marker();
        let stale = match InstalledVersionMarker::read(&marker_path) {
            Ok(Some(installed)) if installed.matches(&marker.version) => false,
            Ok(Some(installed)) => {
                self.console.log(
                    2,
                    format!(
                        "Wrapper files are for {}, expected {}",
                        installed.version, marker.version
                    ),
                );
                true
            }
            Ok(None) => true,
            Err(e) => {
                self.console.warn(format!(
                    "Couldn't read {}, placing the wrapper files again: {}",
                    marker_path.display(),
                    e
                ));
                true
            }
        };
        let windows = self.host.is_windows();
        let needs = |dest: &Path| stale || (!windows && !dest.exists());

        let mut written = Vec::new();
        let mut preserved = Vec::new();

        let jar_dest = self.project.launcher_jar();
        if needs(&jar_dest) {
            if windows && jar_dest.exists() {
                self.console.log(
                    2,
                    format!("Windows detected, not overwriting {}", jar_dest.display()),
                );
                preserved.push(jar_dest);
            } else {
                match copy_file(&entry.launcher_jar_path, &jar_dest) {
                    Ok(()) => {
                        self.console
                            .log(2, format!("Copied {}", jar_dest.display()));
                        written.push(jar_dest);
                    }
                    Err(e) => self.console.warn(format!(
                        "Couldn't copy {} to {}: {}",
                        entry.launcher_jar_path.display(),
                        jar_dest.display(),
                        e
                    )),
                }
            }
        }

        let script_dest = self.project.launcher_script();
        if needs(&script_dest) && self.write_script(&script_dest) {
            written.push(script_dest);
        }

        if stale {
            self.record_installed(&marker_path, &marker.version);
        }

        if written.is_empty() && preserved.is_empty() && !stale {
            PlacementOutcome::UpToDate
        } else {
            PlacementOutcome::Placed { written, preserved }
        }
    }

    fn write_script(&self, dest: &Path) -> bool {
        if let Err(e) = self.script.write(dest) {
            self.console
                .warn(format!("Couldn't create {}: {}", dest.display(), e));
            return false;
        }
        self.console.log(2, format!("Created {}", dest.display()));

        if !self.host.is_windows() {
            if let Err(e) = make_executable(dest) {
                self.console.warn(format!(
                    "Couldn't make {} executable: {}",
                    dest.display(),
                    e
                ));
            }
        }
        true
    }

    fn record_installed(&self, marker_path: &Path, version: &TargetVersion) {
        if let Some(parent) = marker_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                self.console.warn(format!(
                    "Couldn't create directory {}: {}",
                    parent.display(),
                    e
                ));
                return;
            }
        }

        let installed = InstalledVersionMarker {
            version: version.to_string(),
        };
        match installed.write(marker_path) {
            Ok(()) => debug!("Recorded installed version {} in {}", version, marker_path.display()),
            Err(e) => self.console.warn(format!(
                "Couldn't write {}: {}",
                marker_path.display(),
                e
            )),
        }
    }
}

fn copy_file(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, to).map(|_| ())
}

fn remove_archive(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Failed to delete {}: {}", path.display(), e);
        }
    }
}
