//! Configuration module for pinwrap.
//!
//! Manages optional per-user settings stored as JSON.

mod settings;

pub use settings::{settings_path, ProxyConfig, Settings, SETTINGS_FILE};
