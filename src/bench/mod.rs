use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use log::warn;

use crate::cnf::pwcnf::{Dialect, Formula, ParseOptions};
use crate::ihs::{Mode, Outcome, SolveOptions, UpHitman};
use crate::solver::Backend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchConfig {
    pub backend: Backend,
    pub minimize_cores: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchRow {
    pub path: String,
    pub status: String,
    pub backend: String,
    pub mode: String,
    pub wall_ms: Option<u128>,
    pub sat_calls: Option<usize>,
    pub cores: Option<usize>,
    pub cost: Option<String>,
    pub vars: Option<u32>,
    pub hard: Option<usize>,
    pub soft: Option<usize>,
    pub partitions: Option<usize>,
}

impl BenchRow {
    fn empty(path: &Path, mode: Mode, cfg: BenchConfig) -> Self {
        Self {
            path: path.to_string_lossy().to_string(),
            status: "ok".to_string(),
            backend: cfg.backend.name().to_string(),
            mode: mode_name(mode).to_string(),
            wall_ms: None,
            sat_calls: None,
            cores: None,
            cost: None,
            vars: None,
            hard: None,
            soft: None,
            partitions: None,
        }
    }

    pub fn csv_header() -> &'static str {
        "path,status,backend,mode,wall_ms,sat_calls,cores,cost,vars,hard,soft,partitions"
    }

    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{},{}",
            esc_csv(&self.path),
            self.status,
            self.backend,
            self.mode,
            opt(self.wall_ms),
            opt(self.sat_calls),
            opt(self.cores),
            esc_csv(self.cost.as_deref().unwrap_or_default()),
            opt(self.vars),
            opt(self.hard),
            opt(self.soft),
            opt(self.partitions),
        )
    }
}

/// Solves one instance on a worker thread. A run that exceeds `timeout` is
/// reported as such and its thread is left to finish on its own.
pub fn run_one(path: &Path, mode: Mode, cfg: BenchConfig, timeout: Duration) -> BenchRow {
    let start = Instant::now();
    let (tx, rx) = mpsc::channel();
    let owned = path.to_path_buf();
    std::thread::spawn(move || {
        let row = run_one_inner(&owned, mode, cfg);
        let _ = tx.send(row);
    });

    match rx.recv_timeout(timeout) {
        Ok(mut row) => {
            row.wall_ms = Some(start.elapsed().as_millis());
            row
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            let mut row = BenchRow::empty(path, mode, cfg);
            row.status = "timeout".to_string();
            row.wall_ms = Some(start.elapsed().as_millis());
            row
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            let mut row = BenchRow::empty(path, mode, cfg);
            row.status = "internal_error".to_string();
            row.wall_ms = Some(start.elapsed().as_millis());
            row
        }
    }
}

/// Runs every instance under `dir` in partitioned then flat mode.
pub fn run_dataset(
    dir: &Path,
    cfg: BenchConfig,
    timeout: Duration,
    csv_path: &Path,
    progress: bool,
) -> std::io::Result<Vec<BenchRow>> {
    let paths = discover_paths(dir)?;
    let mut csv = File::create(csv_path)?;
    writeln!(csv, "{}", BenchRow::csv_header())?;
    csv.flush()?;

    let mut rows = Vec::new();
    for path in paths {
        for mode in [Mode::Partitioned, Mode::Flat] {
            let row = run_one(&path, mode, cfg, timeout);
            if progress {
                println!(
                    "path={} mode={} status={} wall_ms={} cost={}",
                    row.path,
                    row.mode,
                    row.status,
                    row.wall_ms.unwrap_or_default(),
                    row.cost.as_deref().unwrap_or_default()
                );
            }
            writeln!(csv, "{}", row.to_csv_line())?;
            csv.flush()?;
            rows.push(row);
        }
    }

    Ok(rows)
}

fn run_one_inner(path: &Path, mode: Mode, cfg: BenchConfig) -> BenchRow {
    let mut row = BenchRow::empty(path, mode, cfg);

    let opts = ParseOptions {
        dialect: Dialect::from_path(path),
        ..ParseOptions::default()
    };
    let formula = match Formula::load(path, &opts) {
        Ok(v) => v,
        Err(e) => {
            warn!("{:#}", e);
            row.status = "parse_error".to_string();
            return row;
        }
    };
    row.vars = Some(formula.num_vars());
    row.hard = Some(formula.hard().len());
    row.soft = Some(formula.soft().len());
    row.partitions = Some(formula.num_partitions());

    let options = SolveOptions {
        mode,
        backend: cfg.backend,
        minimize_cores: cfg.minimize_cores,
    };
    match UpHitman::new(&formula, options).solve() {
        Ok(Outcome::Optimum(sol)) => {
            row.sat_calls = Some(sol.stats.sat_calls);
            row.cores = Some(sol.stats.cores);
            row.cost = Some(sol.cost.to_string());
        }
        Ok(Outcome::Infeasible) => row.status = "unsat".to_string(),
        Err(e) => {
            warn!("{}: {}", row.path, e);
            row.status = "internal_error".to_string();
        }
    }
    row
}

fn discover_paths(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::<PathBuf>::new();
    collect_paths(dir, &mut out)?;
    out.sort();
    Ok(out)
}

fn collect_paths(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let p = entry.path();
        if p.is_dir() {
            collect_paths(&p, out)?;
            continue;
        }
        let ext = p.extension().and_then(|x| x.to_str()).unwrap_or("");
        if ext == "pwcnf" || ext == "wcnf" {
            out.push(p);
        }
    }
    Ok(())
}

pub fn mode_name(mode: Mode) -> &'static str {
    match mode {
        Mode::Partitioned => "partitioned",
        Mode::Flat => "flat",
    }
}

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

fn esc_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
