//! `ukgen generate` command

use anyhow::Result;

use crate::cli::GenerateArgs;
use ukgen::ops::{generate, GenerateOptions};
use ukgen::util::fs::relative_path;
use ukgen::util::GlobalContext;

pub fn execute(gctx: &GlobalContext, args: GenerateArgs) -> Result<()> {
    let opts = GenerateOptions {
        project: args.project.to_options(),
        dry_run: args.dry_run,
    };

    let result = generate(gctx, &opts)?;
    super::report_resolution(gctx, &result.resolution);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if args.dry_run {
        for artifact in result.plan.iter() {
            let path = relative_path(gctx.cwd(), &artifact.path);
            println!("{}", path.display());
        }
        println!();
        println!(
            "{} file(s) would be written for {} target(s)",
            result.plan.len(),
            result.resolution.targets.len()
        );
    }

    Ok(())
}
