//! # Configuration
//!
//! Settings come from `weft.toml` (or the file named by `--config`), then
//! from the environment:
//!
//! - `WEFT_ONTOLOGY_URL`: workflow ontology URL (namespace = url + `#`)
//! - `WEFT_DATABASE`: store path
//! - `WEFT_BACKEND`: `file` (single encoded file) or `redb` (ACID database)
//!
//! Command-line flags override both; see [`crate::cli::Cli`].

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use weft_core::{DEFAULT_ONTOLOGY_URL, StorageError, Vocabulary, WeftError};

/// Config file read when `--config` is not given. Missing is fine.
pub const DEFAULT_CONFIG_FILE: &str = "weft.toml";

/// Storage backend of the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// The whole store in one encoded file, rewritten after each change.
    File,
    #[default]
    Redb,
}

impl FromStr for Backend {
    type Err = WeftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Self::File),
            "redb" => Ok(Self::Redb),
            other => Err(WeftError::Serialization(format!(
                "Unknown backend: {other}. Use: file, redb"
            ))),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::File => "file",
            Self::Redb => "redb",
        })
    }
}

/// Resolved CLI settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeftConfig {
    pub ontology_url: String,
    pub database: PathBuf,
    pub backend: Backend,
}

impl Default for WeftConfig {
    fn default() -> Self {
        Self {
            ontology_url: DEFAULT_ONTOLOGY_URL.to_string(),
            database: PathBuf::from("weft.db"),
            backend: Backend::default(),
        }
    }
}

impl WeftConfig {
    /// Parse a TOML document. Absent keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, WeftError> {
        toml::from_str(content)
            .map_err(|e| WeftError::Serialization(format!("Invalid config: {e}")))
    }

    /// Read `path`, or `weft.toml` when no path is given.
    ///
    /// An explicitly named file must exist; the default one may not.
    pub fn load(path: Option<&Path>) -> Result<Self, WeftError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !required && !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| {
            StorageError::Io(format!("Cannot read config '{}': {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Apply `WEFT_*` overrides found by `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), WeftError> {
        if let Some(url) = lookup("WEFT_ONTOLOGY_URL") {
            self.ontology_url = url;
        }
        if let Some(db) = lookup("WEFT_DATABASE") {
            self.database = PathBuf::from(db);
        }
        if let Some(backend) = lookup("WEFT_BACKEND") {
            self.backend = backend.parse()?;
        }
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_process_env(&mut self) -> Result<(), WeftError> {
        self.apply_env(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    #[must_use]
    pub fn vocabulary(&self) -> Vocabulary {
        Vocabulary::new(&self.ontology_url)
    }
}
