//! `ukgen variants` command

use anyhow::Result;

use crate::cli::VariantsArgs;
use ukgen::ops::{format_variants, list_variants, load_project};
use ukgen::util::GlobalContext;

pub fn execute(gctx: &GlobalContext, args: VariantsArgs) -> Result<()> {
    let project = load_project(gctx, &args.project.to_options())?;
    let variants = list_variants(&project);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&variants)?);
    } else {
        print!("{}", format_variants(&variants));
    }

    Ok(())
}
