use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use uphitman::cnf::dimacs::to_wcnf;
use uphitman::cnf::pwcnf::{Dialect, Formula, ParseOptions};
use uphitman::ihs::{Mode, Outcome, SolveOptions, UpHitman};
use uphitman::solver::Backend;

#[derive(Debug, Parser)]
#[command(name = "uphitman")]
#[command(about = "Implicit hitting set MaxSAT solver for partitioned weighted CNF")]
struct Cli {
    /// Log solver progress (overrides RUST_LOG with debug).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    Solve {
        path: String,
        /// Read plain weighted CNF; implies --no-up.
        #[arg(long)]
        wcnf: bool,
        /// Ignore the partitions and relax every soft clause at once.
        #[arg(long = "no-up")]
        no_up: bool,
        #[arg(long, default_value = "varisat")]
        backend: String,
        #[arg(long)]
        minimize_cores: bool,
        #[arg(long = "comment-lead", default_value = "c")]
        comment_lead: Vec<String>,
    },
    Convert {
        path: String,
        #[arg(long)]
        emit: String,
    },
    Stats {
        path: String,
        #[arg(long)]
        wcnf: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Cmd::Solve {
            path,
            wcnf,
            no_up,
            backend,
            minimize_cores,
            comment_lead,
        } => solve_cmd(&path, wcnf, no_up, &backend, minimize_cores, comment_lead)?,
        Cmd::Convert { path, emit } => convert_cmd(&path, &emit)?,
        Cmd::Stats { path, wcnf } => stats_cmd(&path, wcnf)?,
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn load(path: &str, wcnf: bool, comment_lead: Vec<String>) -> Result<Formula> {
    let dialect = if wcnf {
        Dialect::Wcnf
    } else {
        Dialect::from_path(Path::new(path))
    };
    Formula::load(
        path,
        &ParseOptions {
            comment_lead,
            dialect,
        },
    )
}

fn solve_cmd(
    path: &str,
    wcnf: bool,
    no_up: bool,
    backend: &str,
    minimize_cores: bool,
    comment_lead: Vec<String>,
) -> Result<()> {
    let formula = load(path, wcnf, comment_lead)?;
    let Some(backend) = Backend::parse(backend) else {
        bail!("unknown backend '{}', expected varisat|dpll", backend);
    };
    let flat = no_up || wcnf || Dialect::from_path(Path::new(path)) == Dialect::Wcnf;
    let options = SolveOptions {
        mode: if flat { Mode::Flat } else { Mode::Partitioned },
        backend,
        minimize_cores,
    };

    let outcome = UpHitman::new(&formula, options)
        .solve()
        .context("solver failed")?;
    match outcome {
        Outcome::Optimum(sol) => {
            println!("s OPTIMUM FOUND");
            println!("o {}", sol.cost);
            println!();
            let lits = sol
                .model
                .iter()
                .map(|l| l.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            println!("v {}", lits);
            log::debug!(
                "sat_calls={} hs_calls={} cores={} stages={}",
                sol.stats.sat_calls,
                sol.stats.hs_calls,
                sol.stats.cores,
                sol.stats.stages
            );
        }
        Outcome::Infeasible => println!("UNSAT"),
    }
    Ok(())
}

fn convert_cmd(path: &str, emit: &str) -> Result<()> {
    let formula = load(path, false, vec!["c".to_owned()])?;
    let text = to_wcnf(&formula);
    std::fs::write(emit, text).with_context(|| format!("failed to write {}", emit))?;
    println!(
        "vars={} hard={} soft={} top={}",
        formula.num_vars(),
        formula.hard().len(),
        formula.soft().len(),
        formula.top_weight()
    );
    Ok(())
}

fn stats_cmd(path: &str, wcnf: bool) -> Result<()> {
    let formula = load(path, wcnf, vec!["c".to_owned()])?;
    let sizes = formula
        .partitions()
        .map(|(idx, p)| format!("{}:{}", idx, p.len()))
        .collect::<Vec<_>>()
        .join(",");
    println!(
        "vars={} input_vars={} hard={} soft={} top={} offset={}",
        formula.num_vars(),
        formula.input_vars(),
        formula.hard().len(),
        formula.soft().len(),
        formula.top_weight(),
        formula.offset()
    );
    println!("partitions={} sizes={}", formula.num_partitions(), sizes);
    Ok(())
}
