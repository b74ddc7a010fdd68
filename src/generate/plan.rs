//! Artifact plans.
//!
//! Generators never touch the filesystem. They return [`Artifact`]s which
//! are collected into an [`ArtifactPlan`] and written in one pass.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::util::fs::{ensure_dir, set_executable, write_string};

/// What a generated file is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Repository setup script
    Setup,
    /// Top-level Makefile
    Makefile,
    /// Kconfig defaults for a make build
    Defconfig,
    /// Build script
    Build,
    /// Run script
    Run,
    /// VMM configuration read by a run script
    RunConfig,
    /// Docker rootfs export rules
    Docker,
    /// Test index
    Test,
}

impl ArtifactKind {
    /// Scripts get the executable bit.
    pub fn is_script(&self) -> bool {
        matches!(self, ArtifactKind::Setup | ArtifactKind::Build | ArtifactKind::Run)
    }
}

/// One generated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    #[serde(skip)]
    pub contents: String,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, kind: ArtifactKind, contents: impl Into<String>) -> Self {
        Artifact {
            path: path.into(),
            kind,
            contents: contents.into(),
        }
    }

    pub fn is_executable(&self) -> bool {
        self.kind.is_script()
    }

    /// File name as a string (empty if the path has none).
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// Ordered set of artifacts, unique by path.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArtifactPlan {
    artifacts: Vec<Artifact>,
}

impl ArtifactPlan {
    pub fn new() -> Self {
        ArtifactPlan {
            artifacts: Vec::new(),
        }
    }

    /// Add an artifact. The first artifact for a path wins; a later one with
    /// different contents is dropped with a warning.
    pub fn add(&mut self, artifact: Artifact) {
        match self.artifacts.iter().find(|a| a.path == artifact.path) {
            Some(existing) => {
                if existing.contents != artifact.contents {
                    tracing::warn!(
                        "conflicting contents for {}, keeping the first",
                        artifact.path.display()
                    );
                }
            }
            None => self.artifacts.push(artifact),
        }
    }

    pub fn extend(&mut self, artifacts: impl IntoIterator<Item = Artifact>) {
        for artifact in artifacts {
            self.add(artifact);
        }
    }

    pub fn get(&self, path: &Path) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.path == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter()
    }

    /// Artifacts of one kind, in insertion order.
    pub fn of_kind(&self, kind: ArtifactKind) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter().filter(move |a| a.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Write every artifact, creating directories and marking scripts
    /// executable. Stops at the first I/O error.
    pub fn write(&self) -> Result<()> {
        for artifact in &self.artifacts {
            if let Some(parent) = artifact.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                ensure_dir(parent)?;
            }
            write_string(&artifact.path, &artifact.contents)?;
            if artifact.is_executable() {
                set_executable(&artifact.path)?;
            }
            tracing::debug!("wrote {}", artifact.path.display());
        }
        Ok(())
    }
}
