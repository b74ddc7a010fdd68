//! Implementation of `ukgen generate`.

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use crate::generate::{render, ArtifactPlan, GenerateContext, OutputLayout};
use crate::ops::project::{load_project, Project, ProjectOptions};
use crate::probe::{self, HostCapabilities};
use crate::resolver::{resolve_all, Resolution};
use crate::util::fs::list_files;
use crate::util::GlobalContext;
use crate::variants::enumerate;

/// Options for the generate command.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub project: ProjectOptions,

    /// Render everything but write nothing
    pub dry_run: bool,
}

/// Outcome of a generation run.
#[derive(Debug, Serialize)]
pub struct GenerateResult {
    /// Number of valid variants after exclusion
    pub variant_count: usize,

    /// Resolved and skipped targets
    pub resolution: Resolution,

    /// Every rendered artifact
    pub plan: ArtifactPlan,

    /// Scripts in the output directories that this run did not produce
    pub stale: Vec<PathBuf>,

    /// Whether the plan was written to disk
    pub written: bool,
}

/// Load the project, probe the host and generate.
pub fn generate(gctx: &GlobalContext, opts: &GenerateOptions) -> Result<GenerateResult> {
    let project = load_project(gctx, &opts.project)?;
    let host = probe::discover();
    generate_with(&project, &host, opts.dry_run)
}

/// Generate for `project` against already probed capabilities.
pub fn generate_with(
    project: &Project,
    host: &HostCapabilities,
    dry_run: bool,
) -> Result<GenerateResult> {
    let variants = enumerate(&project.axes, &project.rules);
    let resolution = resolve_all(&variants, &project.requests(), host);
    if resolution.is_empty() {
        tracing::warn!("no target could be resolved, only setup files will be generated");
    }

    let layout = project.layout();
    let ctx = GenerateContext {
        app: &project.app,
        config: &project.config,
        layout: &layout,
    };
    let plan = render(&ctx, &resolution.targets)?;

    let stale = stale_scripts(&layout, &plan)?;
    for path in &stale {
        tracing::warn!("{} was not regenerated", path.display());
    }

    if !dry_run {
        plan.write()?;
        tracing::info!(
            "generated {} file(s) for {} target(s)",
            plan.len(),
            resolution.targets.len()
        );
    }

    Ok(GenerateResult {
        variant_count: variants.len(),
        resolution,
        plan,
        stale,
        written: !dry_run,
    })
}

/// Files under the build and run directories that `plan` does not contain.
fn stale_scripts(layout: &OutputLayout, plan: &ArtifactPlan) -> Result<Vec<PathBuf>> {
    let mut stale = Vec::new();
    for dir in [layout.build_dir(), layout.run_dir()] {
        for path in list_files(&dir)? {
            if plan.get(&path).is_none() {
                stale.push(path);
            }
        }
    }
    Ok(stale)
}
