//! Configuration for the Tenon CLI.
//!
//! [`TenonConfig`] is layered with `confyg`: built-in defaults, then at most
//! one TOML file, then `TENON_*` environment variables. [`ConfigSource`]
//! decides which file, if any, takes part:
//!
//! 1. `--config <path>`, which must exist
//! 2. the `TENON_CONFIG` environment variable
//! 3. `~/.config/tenon/config.toml`
//!
//! A file found through 2 or 3 is optional; when it is absent the defaults
//! and environment still apply.

use confyg::{Confygery, env};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tenon_core::{Error, ManagerConfig, Result};

/// Prefix of the environment overlay, e.g. `TENON_LOGGING_LEVEL`.
const ENV_PREFIX: &str = "TENON";

/// Variable naming the config file when `--config` is absent.
const CONFIG_PATH_VAR: &str = "TENON_CONFIG";

// ============================================================================
// Configuration structs
// ============================================================================

/// Main configuration for the Tenon CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TenonConfig {
    /// Project name, shown in version and listing output.
    pub project_name: String,

    /// Command manager tunables.
    pub manager: ManagerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when neither `RUST_LOG` nor a verbosity flag
    /// is given, e.g. `"info"` or `"tenon_core=debug"`.
    pub level: Option<String>,
}

impl Default for TenonConfig {
    fn default() -> Self {
        Self {
            project_name: "tenon".to_string(),
            manager: ManagerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ============================================================================
// ConfigSource
// ============================================================================

/// Where the config file comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Named by `--config`.
    Flag(PathBuf),
    /// Named by `TENON_CONFIG`.
    EnvVar(PathBuf),
    /// The per-user default location.
    UserDir(PathBuf),
    /// No file; defaults and environment only.
    BuiltIn,
}

impl ConfigSource {
    /// Pick the source for an optional `--config` value.
    pub fn resolve(explicit: Option<&str>) -> Self {
        if let Some(path) = explicit {
            return Self::Flag(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var(CONFIG_PATH_VAR) {
            return Self::EnvVar(PathBuf::from(path));
        }
        dirs::config_dir()
            .map(|dir| Self::UserDir(dir.join("tenon").join("config.toml")))
            .unwrap_or(Self::BuiltIn)
    }

    /// The file this source points at.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Flag(path) | Self::EnvVar(path) | Self::UserDir(path) => Some(path),
            Self::BuiltIn => None,
        }
    }

    /// The file to read, or `None` to skip the file layer.
    fn file(&self) -> Result<Option<&Path>> {
        match self {
            Self::Flag(path) if !path.exists() => Err(Error::config(format!(
                "config file not found: {}",
                path.display()
            ))),
            _ => Ok(self.path().filter(|path| path.exists())),
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(path) => write!(f, "--config {}", path.display()),
            Self::EnvVar(path) => write!(f, "{CONFIG_PATH_VAR}={}", path.display()),
            Self::UserDir(path) => write!(f, "{}", path.display()),
            Self::BuiltIn => f.write_str("built-in defaults"),
        }
    }
}

// ============================================================================
// Config loading
// ============================================================================

impl TenonConfig {
    /// Sections the environment overlay may reach, e.g. `TENON_MANAGER_*`.
    pub const ENV_SECTIONS: &'static [&'static str] = &["manager", "logging"];

    /// Resolve the source for `explicit` and load from it.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        Self::load_from(&ConfigSource::resolve(explicit))
    }

    /// Layer defaults, the source's file and the environment overlay.
    pub fn load_from(source: &ConfigSource) -> Result<Self> {
        let mut layers =
            Confygery::new().map_err(|e| Error::config(format!("config init: {e}")))?;

        if let Some(path) = source.file()? {
            layers
                .add_file(&path.to_string_lossy())
                .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        }

        let mut overlay = env::Options::with_top_level(ENV_PREFIX);
        for &section in Self::ENV_SECTIONS {
            overlay.add_section(section);
        }
        layers
            .add_env(overlay)
            .map_err(|e| Error::config(format!("config env: {e}")))?;

        layers
            .build()
            .map_err(|e| Error::config(format!("config from {source}: {e}")))
    }
}

// ============================================================================
// Tests
// ============================================================================
