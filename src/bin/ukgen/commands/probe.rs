//! `ukgen probe` command

use anyhow::Result;

use crate::cli::ProbeArgs;
use ukgen::ops::format_capabilities;
use ukgen::probe;

pub fn execute(args: ProbeArgs) -> Result<()> {
    let host = probe::discover();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&host)?);
    } else {
        print!("{}", format_capabilities(&host));
    }

    Ok(())
}
