//! User configuration (`config.toml`).
//!
//! ukgen reads the user descriptor from two locations:
//! - Global: `<config dir>/ukgen/config.toml` - User-wide defaults
//! - Project: `config.toml` next to `app.toml` - Project-specific settings
//!
//! Project config takes precedence over global config. Only the merged
//! result is validated, so `memory` may come from either file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::axis::{Bootloader, BuildTool, DebugLevel, RunTool};

/// Default file name of the user descriptor.
pub const CONFIG_FILE: &str = "config.toml";

/// Default output directory for generated scripts.
pub const DEFAULT_SCRIPTS_DIR: &str = "scripts";

/// Errors in the merged user configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(ukgen::config::missing_key),
        help("set `{key}` in config.toml or in the global configuration")
    )]
    MissingKey { key: &'static str },

    #[error("`{key}` must not be empty")]
    #[diagnostic(code(ukgen::config::empty_list))]
    EmptyList { key: &'static str },

    #[error("`memory` must be at least 1 MiB")]
    #[diagnostic(code(ukgen::config::invalid_memory))]
    InvalidMemory,
}

/// One layer of user configuration, as written in a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Guest memory in MiB
    pub memory: Option<u32>,

    /// Generate networked run scripts
    pub networking: Option<bool>,

    /// Run qemu with KVM acceleration
    pub accel: Option<bool>,

    /// Output directory for generated scripts
    pub scripts_dir: Option<PathBuf>,

    /// Directory receiving built kernel images
    pub kernel_dir: Option<PathBuf>,

    /// Directory of the test index
    pub test_dir: Option<PathBuf>,

    pub build_tools: Option<Vec<BuildTool>>,
    pub run_tools: Option<Vec<RunTool>>,
    pub bootloaders: Option<Vec<Bootloader>>,
    pub debug: Option<Vec<DebugLevel>>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.memory.is_some() {
            self.memory = other.memory;
        }
        if other.networking.is_some() {
            self.networking = other.networking;
        }
        if other.accel.is_some() {
            self.accel = other.accel;
        }
        if other.scripts_dir.is_some() {
            self.scripts_dir = other.scripts_dir;
        }
        if other.kernel_dir.is_some() {
            self.kernel_dir = other.kernel_dir;
        }
        if other.test_dir.is_some() {
            self.test_dir = other.test_dir;
        }
        if other.build_tools.is_some() {
            self.build_tools = other.build_tools;
        }
        if other.run_tools.is_some() {
            self.run_tools = other.run_tools;
        }
        if other.bootloaders.is_some() {
            self.bootloaders = other.bootloaders;
        }
        if other.debug.is_some() {
            self.debug = other.debug;
        }
    }

    /// Validate the merged layers and fill in defaults.
    pub fn resolve(self) -> Result<UserConfig, ConfigError> {
        let memory = self.memory.ok_or(ConfigError::MissingKey { key: "memory" })?;
        if memory == 0 {
            return Err(ConfigError::InvalidMemory);
        }

        let scripts_dir = self
            .scripts_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCRIPTS_DIR));
        let kernel_dir = self.kernel_dir.unwrap_or_else(|| scripts_dir.join("kernel"));
        let test_dir = self.test_dir.unwrap_or_else(|| scripts_dir.join("test"));

        Ok(UserConfig {
            memory,
            networking: self.networking.unwrap_or(false),
            accel: self.accel.unwrap_or(false),
            build_tools: non_empty(self.build_tools, BuildTool::ALL, "build_tools")?,
            run_tools: non_empty(self.run_tools, RunTool::ALL, "run_tools")?,
            bootloaders: non_empty(self.bootloaders, &[Bootloader::Multiboot], "bootloaders")?,
            debug: non_empty(self.debug, &[DebugLevel::None], "debug")?,
            scripts_dir,
            kernel_dir,
            test_dir,
        })
    }
}

fn non_empty<T: Copy + PartialEq>(
    value: Option<Vec<T>>,
    default: &[T],
    key: &'static str,
) -> Result<Vec<T>, ConfigError> {
    let mut list = value.unwrap_or_else(|| default.to_vec());
    if list.is_empty() {
        return Err(ConfigError::EmptyList { key });
    }
    let mut seen = Vec::with_capacity(list.len());
    list.retain(|v| {
        if seen.contains(v) {
            false
        } else {
            seen.push(*v);
            true
        }
    });
    Ok(list)
}

/// Validated user configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserConfig {
    pub memory: u32,
    pub networking: bool,
    pub accel: bool,
    pub scripts_dir: PathBuf,
    pub kernel_dir: PathBuf,
    pub test_dir: PathBuf,
    pub build_tools: Vec<BuildTool>,
    pub run_tools: Vec<RunTool>,
    pub bootloaders: Vec<Bootloader>,
    pub debug: Vec<DebugLevel>,
}

/// Load and merge the global and project configuration.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (required)
/// 2. Global config (optional, but must parse when present)
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Result<UserConfig> {
    let mut config = Config::default();

    if let Some(global) = global_path.filter(|p| p.exists()) {
        config.merge(Config::load(global)?);
    }
    config.merge(Config::load(project_path)?);

    config
        .resolve()
        .with_context(|| format!("invalid configuration: {}", project_path.display()))
}

/// Get the global ukgen config directory.
pub fn global_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "ukgen").map(|d| d.config_dir().to_path_buf())
}

/// Get the global config path.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join(CONFIG_FILE))
}
