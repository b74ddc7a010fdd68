//! Target resolution.
//!
//! Joins the valid variants with the application's requested targets and
//! the tools found on the host. The resolver is pure and deterministic: all
//! probing happens before resolution.
//!
//! Unviable requests are never fatal. They are returned in
//! [`Resolution::skipped`] and logged as warnings.

pub mod errors;

pub use errors::{missing_vmm_diagnostic, SkipReason, SkippedTarget};

use serde::Serialize;

use crate::core::axis::{Arch, Platform, RunTool};
use crate::core::target::{TargetConfig, TargetRequest};
use crate::core::variant::{BuildVariant, Variant};
use crate::probe::HostCapabilities;

/// Outcome of resolving one or more target requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub targets: Vec<TargetConfig>,
    pub skipped: Vec<SkippedTarget>,
}

impl Resolution {
    /// Append another resolution, keeping order.
    pub fn extend(&mut self, other: Resolution) {
        self.targets.extend(other.targets);
        self.skipped.extend(other.skipped);
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Platform/arch pairs whose VMM run scripts fall back to a PATH lookup.
    pub fn missing_vmms(&self) -> Vec<(Platform, Arch)> {
        let mut missing = Vec::new();
        for target in &self.targets {
            let variant = &target.variant;
            if target.vmm.is_some() || variant.run_tool != RunTool::Vmm {
                continue;
            }
            let pair = (variant.platform, variant.arch);
            if variant.platform != Platform::Xen && !missing.contains(&pair) {
                missing.push(pair);
            }
        }
        missing
    }
}

/// Resolve one request.
///
/// Every variant accepted by `request` is joined with every compiler for the
/// arch and every VMM for the arch/platform pair. Without a VMM, one target
/// per compiler is produced with `vmm: None`. Without a compiler, the request
/// is skipped.
pub fn resolve(variants: &[Variant], request: &TargetRequest, host: &HostCapabilities) -> Resolution {
    let matching: Vec<BuildVariant> = variants
        .iter()
        .filter_map(|v| match BuildVariant::try_from(v) {
            Ok(typed) => Some(typed),
            Err(e) => {
                tracing::debug!("ignoring variant {}: {}", v, e);
                None
            }
        })
        .filter(|v| request.accepts(v))
        .collect();

    if matching.is_empty() {
        return skip(request, SkipReason::NoValidVariant);
    }

    let compilers = host.compilers_for(request.arch);
    if compilers.is_empty() {
        return skip(request, SkipReason::NoCompiler);
    }

    let vmms = host.vmms_for(request.arch, request.platform);
    if vmms.is_empty() {
        tracing::info!(
            "no VMM found for {}, run scripts will look it up in PATH",
            request
        );
    }

    let mut targets = Vec::new();
    for variant in &matching {
        for compiler in compilers {
            if vmms.is_empty() {
                targets.push(TargetConfig {
                    variant: *variant,
                    compiler: compiler.clone(),
                    vmm: None,
                    einitrd: request.einitrd,
                });
            }
            for vmm in vmms {
                targets.push(TargetConfig {
                    variant: *variant,
                    compiler: compiler.clone(),
                    vmm: Some(vmm.clone()),
                    einitrd: request.einitrd,
                });
            }
        }
    }

    tracing::debug!(
        "{}: {} variant(s), {} target(s)",
        request,
        matching.len(),
        targets.len()
    );
    Resolution {
        targets,
        skipped: Vec::new(),
    }
}

/// Resolve every request in order.
pub fn resolve_all(
    variants: &[Variant],
    requests: &[TargetRequest],
    host: &HostCapabilities,
) -> Resolution {
    let mut resolution = Resolution::default();
    for request in requests {
        resolution.extend(resolve(variants, request, host));
    }
    resolution
}

fn skip(request: &TargetRequest, reason: SkipReason) -> Resolution {
    tracing::warn!("skipping target {}: {}", request, reason);
    Resolution {
        targets: Vec::new(),
        skipped: vec![SkippedTarget {
            request: request.clone(),
            reason,
        }],
    }
}
