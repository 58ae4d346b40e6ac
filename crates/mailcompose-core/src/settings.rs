//! Persistent composition settings.
//!
//! Settings are read from a JSON file at:
//! 1. `$MAILCOMPOSE_CONFIG` (environment variable)
//! 2. `<config dir>/mailcompose/settings.json`
//! 3. Built-in defaults when the file does not exist

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::markdown::MarkdownOptions;
use crate::template::Template;

/// Environment variable overriding the settings file location.
pub const CONFIG_ENV: &str = "MAILCOMPOSE_CONFIG";

/// Default tracing filter.
const DEFAULT_LOG_FILTER: &str = "mailcompose=info,mailcompose_core=info";

/// Settings that persist across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeSettings {
    /// Markdown rendering options.
    pub markdown: MarkdownOptions,
    /// Custom layout file; the built-in layout is used when unset.
    pub template: Option<PathBuf>,
    /// Tracing filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for ComposeSettings {
    fn default() -> Self {
        Self {
            markdown: MarkdownOptions::default(),
            template: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ComposeSettings {
    /// Returns the settings file location.
    ///
    /// `None` if neither the environment variable nor a config directory is
    /// available.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os(CONFIG_ENV).map(PathBuf::from).or_else(|| {
            dirs::config_dir().map(|dir| dir.join("mailcompose").join("settings.json"))
        })
    }

    /// Loads settings from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(path),
            None => Ok(Self::default()),
        }
    }

    /// Loads settings from a file, falling back to defaults if it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(?path, "settings file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        info!("Settings loaded from {:?}", path);
        Ok(settings)
    }

    /// Writes settings as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        info!("Settings saved to {:?}", path);
        Ok(())
    }

    /// Resolves the configured layout.
    ///
    /// # Errors
    ///
    /// Returns an error if a custom template is configured but unreadable.
    pub fn template(&self) -> Result<Template> {
        self.template
            .as_ref()
            .map_or_else(|| Ok(Template::default_layout()), Template::load)
    }
}
