use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;

use uphitman::bench::{BenchConfig, run_dataset};
use uphitman::solver::Backend;

#[derive(Debug, Parser)]
#[command(name = "bench_dataset")]
struct Cli {
    #[arg(long)]
    dir: String,
    #[arg(long, default_value = "varisat")]
    backend: String,
    #[arg(long = "timeout_ms", default_value_t = 30000)]
    timeout_ms: u64,
    #[arg(long)]
    csv: String,
    #[arg(long, default_value_t = false)]
    minimize_cores: bool,
    #[arg(long, default_value_t = false)]
    progress: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    run_from_args(&cli)
}

fn run_from_args(cli: &Cli) -> Result<()> {
    let Some(backend) = Backend::parse(&cli.backend) else {
        bail!("unknown backend '{}', expected varisat|dpll", cli.backend);
    };
    let cfg = BenchConfig {
        backend,
        minimize_cores: cli.minimize_cores,
    };
    let rows = run_dataset(
        &PathBuf::from(&cli.dir),
        cfg,
        Duration::from_millis(cli.timeout_ms),
        &PathBuf::from(&cli.csv),
        cli.progress,
    )?;
    println!("rows={}", rows.len());
    Ok(())
}
