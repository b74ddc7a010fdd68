//! Test utilities and mocks for ukgen unit tests.
//!
//! Provides a scripted [`CommandSource`] so the probe and everything built
//! on it can be tested without the host's shell, plus fixture builders for
//! descriptors and host tools.
//!
//! # Example
//!
//! ```rust,ignore
//! use ukgen::test_support::{MockCommandSource, gcc};
//!
//! let source = MockCommandSource::new().with_command("gcc-12", "/usr/bin/gcc-12");
//! let host = discover_with(&source, Arch::X86_64);
//! ```

pub mod fixtures;

use std::path::PathBuf;

pub use fixtures::*;

use crate::probe::CommandSource;

/// In-memory command listing.
#[derive(Debug, Clone, Default)]
pub struct MockCommandSource {
    commands: Vec<(String, Option<PathBuf>)>,
}

impl MockCommandSource {
    pub fn new() -> Self {
        MockCommandSource {
            commands: Vec::new(),
        }
    }

    /// List a command resolving to `path`.
    pub fn with_command(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.commands.push((name.into(), Some(path.into())));
        self
    }

    /// List a command that does not resolve to an executable.
    pub fn with_unresolved(mut self, name: impl Into<String>) -> Self {
        self.commands.push((name.into(), None));
        self
    }
}

impl CommandSource for MockCommandSource {
    fn command_names(&self) -> Vec<String> {
        self.commands.iter().map(|(name, _)| name.clone()).collect()
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.commands
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, path)| path.clone())
    }
}
