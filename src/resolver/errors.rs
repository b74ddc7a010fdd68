//! Skipped targets and their diagnostics.

use std::fmt;

use serde::Serialize;

use crate::core::axis::{Arch, Platform};
use crate::core::target::TargetRequest;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Why a requested target produced no configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The host has no compiler for the target's architecture
    NoCompiler,
    /// Every variant for the target was excluded or filtered out
    NoValidVariant,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoCompiler => write!(f, "no compiler found"),
            SkipReason::NoValidVariant => write!(f, "no valid variant"),
        }
    }
}

/// A request the resolver dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedTarget {
    pub request: TargetRequest,
    pub reason: SkipReason,
}

impl SkippedTarget {
    /// Convert to a user-friendly warning.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::warning(format!("skipping target {}", self.request));
        match self.reason {
            SkipReason::NoCompiler => diag
                .with_context(format!("no compiler found for {}", self.request.arch))
                .with_suggestion(suggestions::INSTALL_COMPILER),
            SkipReason::NoValidVariant => diag
                .with_context("every variant of this target is excluded")
                .with_suggestion(suggestions::RELAX_RULES)
                .with_suggestion(suggestions::VERBOSE),
        }
    }
}

/// Note for a platform/arch pair that has no VMM on the host.
pub fn missing_vmm_diagnostic(platform: Platform, arch: Arch) -> Diagnostic {
    Diagnostic::note(format!(
        "no VMM found for {}/{}",
        platform.short_name(),
        arch
    ))
    .with_context("run scripts will look the VMM up in PATH")
    .with_suggestion(suggestions::INSTALL_VMM)
}

impl fmt::Display for SkippedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.request, self.reason)
    }
}
