//! Global context for ukgen operations.
//!
//! Provides centralized access to the working directory, output settings
//! and the location of the global configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use miette::Diagnostic;
use thiserror::Error;

use crate::core::manifest::APP_MANIFEST;
use crate::util::config::global_config_path;

/// Error locating the application descriptor.
#[derive(Debug, Error, Diagnostic)]
pub enum ContextError {
    #[error("could not find `{}` in `{}` or any parent directory", APP_MANIFEST, .dir.display())]
    #[diagnostic(
        code(ukgen::context::manifest_not_found),
        help("run ukgen from the application directory or pass --app")
    )]
    ManifestNotFound { dir: PathBuf },
}

/// Global context containing paths and output settings.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Global configuration file, if any
    global_config: Option<PathBuf>,

    /// Whether to use verbose output
    verbose: bool,

    /// Whether to use colors in output
    color: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext rooted at the current directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        GlobalContext {
            cwd,
            global_config: global_config_path(),
            verbose: false,
            color: true,
        }
    }

    /// Override the global configuration file (`None` disables it).
    pub fn with_global_config(mut self, path: Option<PathBuf>) -> Self {
        self.global_config = path;
        self
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn global_config(&self) -> Option<&Path> {
        self.global_config.as_deref()
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn color(&self) -> bool {
        self.color
    }

    /// Resolve a user-supplied path against the working directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    /// Find `app.toml` starting from cwd and searching upward.
    pub fn find_app_manifest(&self) -> Result<PathBuf, ContextError> {
        let mut current = self.cwd.clone();
        loop {
            let candidate = current.join(APP_MANIFEST);
            if candidate.is_file() {
                return Ok(candidate);
            }
            if !current.pop() {
                return Err(ContextError::ManifestNotFound {
                    dir: self.cwd.clone(),
                });
            }
        }
    }
}
