//! Command implementations

pub mod completions;
pub mod generate;
pub mod probe;
pub mod targets;
pub mod variants;

use ukgen::resolver::{missing_vmm_diagnostic, Resolution};
use ukgen::util::diagnostic;
use ukgen::util::GlobalContext;

/// Print a warning for every skipped target and a note for every
/// platform without a VMM.
fn report_resolution(gctx: &GlobalContext, resolution: &Resolution) {
    for target in &resolution.skipped {
        diagnostic::emit(&target.to_diagnostic(), gctx.color());
    }
    for (platform, arch) in resolution.missing_vmms() {
        diagnostic::emit(&missing_vmm_diagnostic(platform, arch), gctx.color());
    }
}
