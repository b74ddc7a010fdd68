//! Test index read by the test runner.

use super::{Artifact, ArtifactKind, ArtifactPlan, GenerateContext};

/// File name of the test index inside the test directory.
pub const TEST_CONFIG: &str = "config";

/// `test/config`: the build and run scripts of `plan`, sorted.
pub fn test_config(ctx: &GenerateContext<'_>, plan: &ArtifactPlan) -> Artifact {
    let names = |kind| {
        let mut names: Vec<&str> = plan.of_kind(kind).map(|a| a.file_name()).collect();
        names.sort_unstable();
        names
    };

    let mut contents = String::new();
    for (var, kind) in [("BUILD_SCRIPTS", ArtifactKind::Build), ("RUN_SCRIPTS", ArtifactKind::Run)] {
        push_line!(contents, "{}=\"", var);
        for name in names(kind) {
            push_line!(contents, "{}", name);
        }
        push_line!(contents, "\"");
        push_line!(contents);
    }
    push_line!(contents, "SKIP_BUILD=0");
    push_line!(contents, "SKIP_RUN=0");

    Artifact::new(
        ctx.layout.test_dir.join(TEST_CONFIG),
        ArtifactKind::Test,
        contents,
    )
}
