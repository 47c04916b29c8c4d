//! Core types for installation.
//!
//! This module defines the version identifier that flows through every
//! component and the host platform switch that selects the conservative
//! Windows file-placement behaviour.

use std::fmt;
use std::str::FromStr;

// ============================================================================
// Target Version
// ============================================================================

/// Version identifier of the delegate tool, e.g. `1.2.0`.
///
/// Versions end up in file names, so anything that could turn into a
/// different path (separators, `..`, whitespace) is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetVersion(String);

impl TargetVersion {
    /// Validates and wraps a version string.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("version is empty".to_string());
        }
        if trimmed.contains("..") {
            return Err(format!("version contains '..': {trimmed}"));
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, '/' | '\\' | ':'))
        {
            return Err(format!("version contains {bad:?}: {trimmed}"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the version as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TargetVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ============================================================================
// Host Platform
// ============================================================================

/// Operating-system family the launcher is placing files for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOs {
    /// Windows: existing files are never overwritten, no executable bits.
    Windows,
    /// Linux, macOS and other Unix-likes.
    Unix,
}

impl HostOs {
    /// Detects the current platform at compile time.
    pub fn detect() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }

    /// Returns true for Windows.
    pub fn is_windows(&self) -> bool {
        matches!(self, Self::Windows)
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Windows => write!(f, "Windows"),
            Self::Unix => write!(f, "Unix"),
        }
    }
}
