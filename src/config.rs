//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. an explicit `--config` path (must exist)
//! 2. `$MAILBINDER_CONFIG` (environment variable)
//! 3. `~/.config/mailbinder/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailbinder\config.toml` (Windows)
//! 4. Built-in defaults
//!
//! A file that exists but cannot be read or parsed is a configuration error.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BinderError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Which messages to bind.
    pub search: SearchConfig,
    /// Where messages come from.
    pub source: SourceConfig,
    /// Where the document and attachments go.
    pub output: OutputConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
}

/// Search settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Provider-style query, e.g. `from:billing has:attachment after:2024/01/01`.
    pub query: String,
}

/// Kind of mailbox the source path points at.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// An MBOX file or a directory of `.eml` files.
    #[default]
    Mbox,
    /// A directory of provider-format JSON message dumps.
    Json,
}

/// Mail source settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub path: Option<PathBuf>,
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the document, attachments and config snapshot.
    pub folder: PathBuf,
    /// File name of the assembled document inside `folder`.
    pub document_filename: String,
    /// Copy the effective configuration into `folder` as `config.toml`.
    pub write_config_snapshot: bool,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            cache_dir: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("mailbinder-output"),
            document_filename: "messages.html".to_string(),
            write_config_snapshot: true,
        }
    }
}

impl Config {
    /// Check the settings a run cannot do without.
    pub fn validate(&self) -> Result<()> {
        if self.source.path.is_none() {
            return Err(BinderError::Config(
                "no mail source path configured (set [source].path or pass --source)".into(),
            ));
        }
        let name = self.output.document_filename.trim();
        if name.is_empty() {
            return Err(BinderError::Config(
                "output.document_filename must not be empty".into(),
            ));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(BinderError::Config(format!(
                "output.document_filename must be a bare file name, got '{name}'"
            )));
        }
        Ok(())
    }

    /// Full path of the assembled document.
    pub fn document_path(&self) -> PathBuf {
        self.output.folder.join(&self.output.document_filename)
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// An explicit path must exist. A file found in a standard location must
/// parse. With no file anywhere, the defaults are returned.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(BinderError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        return read_config_file(path);
    }

    match config_file_path() {
        Some(path) if path.exists() => read_config_file(&path),
        _ => {
            tracing::debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

/// Read and parse one TOML config file.
pub fn read_config_file(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        BinderError::Config(format!("cannot read {}: {e}", path.display()))
    })?;
    let cfg = toml::from_str::<Config>(&contents).map_err(|e| {
        BinderError::Config(format!("cannot parse {}: {e}", path.display()))
    })?;
    tracing::info!(path = %path.display(), "Loaded config");
    Ok(cfg)
}

/// Serialize a configuration to pretty TOML.
pub fn to_toml(config: &Config) -> Result<String> {
    toml::to_string_pretty(config)
        .map_err(|e| BinderError::Config(format!("cannot serialize config: {e}")))
}

/// Save configuration to `path`, creating parent directories.
pub fn save_config(config: &Config, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, to_toml(config)?)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILBINDER_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mailbinder").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailbinder")
}
