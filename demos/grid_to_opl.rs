use geo_fixture::{GridBuilder, Scenario};
use std::{env, fs};
use tracing_subscriber::EnvFilter;

/// Turn a `|`-separated node grid (plus optional OPL lines) into importer input
///
/// Set `RUST_LOG=geo_fixture=debug` to see what is being assembled.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 4 {
        eprintln!("Usage: {} <grid-file> [opl-file] [step]", args[0]);
        std::process::exit(1);
    }

    let grid = fs::read_to_string(&args[1])?;
    let rows: Vec<Vec<&str>> = grid
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.trim().trim_matches('|').split('|').collect())
        .collect();

    let mut builder = GridBuilder::new();
    if let Some(step) = args.get(3) {
        builder = builder.with_step(step.parse()?);
    }

    let mut scenario = Scenario::new();
    scenario.set_grid(builder, rows)?;

    if let Some(path) = args.get(2) {
        scenario.add_data(&fs::read_to_string(path)?)?;
    }

    print!("{}", scenario.take_import_payload());

    Ok(())
}
