//! `ukgen targets` command

use anyhow::Result;

use crate::cli::TargetsArgs;
use ukgen::ops::{format_targets, list_targets, load_project};
use ukgen::probe;
use ukgen::util::GlobalContext;

pub fn execute(gctx: &GlobalContext, args: TargetsArgs) -> Result<()> {
    let project = load_project(gctx, &args.project.to_options())?;
    let host = probe::discover();
    let resolution = list_targets(&project, &host);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
    } else {
        super::report_resolution(gctx, &resolution);
        print!("{}", format_targets(&resolution));
    }

    Ok(())
}
