//! Zip extraction for downloaded distributions.
//!
//! Entry paths are preserved below the output root. An archive that cannot
//! be parsed or decompressed is corrupt and aborts extraction; an entry that
//! cannot be written (permissions, path length, a file in the way) is logged
//! and skipped so the rest of the distribution still lands on disk.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use zip::result::ZipError;

use crate::console::Console;

/// Upper bound for preallocating an entry buffer from its declared size.
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

// ============================================================================
// Errors and Report
// ============================================================================

/// Whole-archive extraction failures.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Couldn't open archive {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Couldn't open zip file {path}: {source}")]
    CorruptArchive {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
}

impl ExtractError {
    /// True if a fresh download might fix this.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::CorruptArchive { .. })
    }
}

/// An entry that was not written.
#[derive(Debug, Clone)]
pub struct SkippedEntry {
    pub name: String,
    pub reason: String,
}

/// Summary of a finished extraction.
#[derive(Debug, Clone, Default)]
pub struct ExtractReport {
    pub files_written: usize,
    pub directories_created: usize,
    pub skipped: Vec<SkippedEntry>,
}

// ============================================================================
// Extractor
// ============================================================================

/// Unpacks zip archives into a directory tree.
#[derive(Debug, Clone)]
pub struct ArchiveExtractor {
    console: Console,
}

impl ArchiveExtractor {
    pub fn new(console: Console) -> Self {
        Self { console }
    }

    /// Extracts every entry of `archive_path` below `output_root`,
    /// overwriting existing files.
    pub fn extract(
        &self,
        archive_path: &Path,
        output_root: &Path,
    ) -> Result<ExtractReport, ExtractError> {
        self.console
            .log(2, format!("Extracting {}", archive_path.display()));
        info!(
            "Extracting {} to {}",
            archive_path.display(),
            output_root.display()
        );

        let corrupt = |source: ZipError| ExtractError::CorruptArchive {
            path: archive_path.to_path_buf(),
            source,
        };

        let file = File::open(archive_path).map_err(|source| ExtractError::Open {
            path: archive_path.to_path_buf(),
            source,
        })?;
        let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(corrupt)?;

        let mut report = ExtractReport::default();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(corrupt)?;
            let name = entry.name().to_string();

            let Some(relative) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
                warn!("Skipping unsafe path in zip: {}", name);
                report.skipped.push(SkippedEntry {
                    name,
                    reason: "path escapes the output directory".to_string(),
                });
                continue;
            };
            let dest_path = output_root.join(relative);

            if entry.is_dir() {
                match fs::create_dir_all(&dest_path) {
                    Ok(()) => report.directories_created += 1,
                    Err(e) => self.skip(&mut report, name, &dest_path, e),
                }
                continue;
            }

            // Read fully first: a read failure is archive damage, a write
            // failure only concerns this entry.
            let mut contents = Vec::with_capacity(entry.size().min(MAX_PREALLOCATION) as usize);
            entry
                .read_to_end(&mut contents)
                .map_err(|e| corrupt(ZipError::Io(e)))?;

            self.console.log(
                2,
                format!("  Writing {} to {}", name, dest_path.display()),
            );
            match write_entry(&dest_path, &contents) {
                Ok(()) => {
                    report.files_written += 1;
                    #[cfg(unix)]
                    apply_unix_mode(&dest_path, entry.unix_mode());
                }
                Err(e) => self.skip(&mut report, name, &dest_path, e),
            }
        }

        debug!(
            "ZIP extraction complete: {} files, {} directories, {} skipped",
            report.files_written,
            report.directories_created,
            report.skipped.len()
        );
        Ok(report)
    }

    fn skip(&self, report: &mut ExtractReport, name: String, dest_path: &Path, error: io::Error) {
        self.console
            .log(2, format!("Couldn't copy to {}", dest_path.display()));
        warn!("Skipping zip entry {}: {}", name, error);
        report.skipped.push(SkippedEntry {
            name,
            reason: error.to_string(),
        });
    }
}

fn write_entry(dest_path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest_path, contents)
}

// ============================================================================
// Unix Permissions
// ============================================================================

#[cfg(unix)]
fn apply_unix_mode(path: &Path, mode: Option<u32>) {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        if mode & 0o111 != 0 {
            let permissions = fs::Permissions::from_mode(mode | 0o755);
            if let Err(e) = fs::set_permissions(path, permissions) {
                debug!("Failed to set permissions on {}: {}", path.display(), e);
            }
        }
    }
}

/// Sets executable permission on a file (Unix only).
///
/// On Windows, this is a no-op.
#[allow(unused_variables)]
pub fn make_executable(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = fs::metadata(path)?.permissions();
        let current_mode = permissions.mode();
        permissions.set_mode(current_mode | 0o755);
        fs::set_permissions(path, permissions)?;

        debug!("Set executable permission on {}", path.display());
    }

    Ok(())
}
