use anyhow::{bail, Context, Result};
use capplot::{chart, Series};
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <file>", args[0]);
        eprintln!("Example: {} logs/1600000000.log", args[0]);
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);
    let series = Series::read(path)?;
    if series.is_empty() {
        bail!("{} has no data points", path.display());
    }

    chart::show(&series, &args[1]).context("terminal rendering failed")?;
    Ok(())
}
