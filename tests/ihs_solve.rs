mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{brute_force, c, cost_under, w};
use uphitman::cnf::cnf::{Lit, MAX_VAR};
use uphitman::cnf::pwcnf::{Formula, FormulaBuilder, TopWeight};
use uphitman::error::SolveError;
use uphitman::hitting::{Core, ExactHitter, HittingSetOracle};
use uphitman::ihs::{Mode, Outcome, SolveOptions, UpHitman, solve};
use uphitman::random::{RandomShape, random_formula};
use uphitman::solver::{Backend, IncrementalSolver, SolveResult, SolverStats};

const BACKENDS: [Backend; 2] = [Backend::Dpll, Backend::Varisat];

fn opts(mode: Mode, backend: Backend) -> SolveOptions {
    SolveOptions {
        mode,
        backend,
        minimize_cores: false,
    }
}

fn two_soft() -> Formula {
    "p pwcnf 2 3 100 2\n1 100 1 2 0\n1 3 -1 0\n2 5 -2 0\n"
        .parse::<Formula>()
        .expect("parse")
}

#[test]
fn cheaper_soft_clause_is_violated() {
    let f = two_soft();
    for backend in BACKENDS {
        for mode in [Mode::Partitioned, Mode::Flat] {
            let outcome = solve(&f, opts(mode, backend)).expect("solve");
            let sol = outcome.solution().expect("optimum");
            assert_eq!(sol.cost, w(3), "{:?} {:?}", backend, mode);
            assert_eq!(sol.model_dimacs(), vec![1, -2]);
        }
    }
}

#[test]
fn hard_contradiction_is_infeasible() {
    let f = "p pwcnf 1 3 10 1\n1 10 1 0\n1 10 -1 0\n1 2 1 0\n"
        .parse::<Formula>()
        .expect("parse");
    for backend in BACKENDS {
        for mode in [Mode::Partitioned, Mode::Flat] {
            let outcome = solve(&f, opts(mode, backend)).expect("solve");
            assert!(outcome.is_infeasible(), "{:?} {:?}", backend, mode);
        }
    }
}

#[test]
fn no_soft_clauses_still_yields_model() {
    let f = "p pwcnf 2 2 10 1\n1 10 1 0\n1 10 -1 2 0\n"
        .parse::<Formula>()
        .expect("parse");
    for mode in [Mode::Partitioned, Mode::Flat] {
        let sol = solve(&f, opts(mode, Backend::Varisat))
            .expect("solve")
            .solution()
            .cloned()
            .expect("optimum");
        assert_eq!(sol.cost, w(0));
        assert_eq!(sol.model_dimacs(), vec![1, 2]);
    }
}

#[test]
fn empty_soft_clause_always_costs() {
    let f = "p pwcnf 1 2 10 1\n1 4 0\n1 1 1 0\n"
        .parse::<Formula>()
        .expect("parse");
    let sol = solve(&f, opts(Mode::Partitioned, Backend::Varisat))
        .expect("solve")
        .solution()
        .cloned()
        .expect("optimum");
    assert_eq!(sol.cost, w(4));
}

#[test]
fn fractional_weights_stay_exact() {
    let f = "p pwcnf 2 4 10 1\n1 10 1 2 0\n1 1/3 -1 0\n1 1/3 -1 0\n1 0.5 -2 0\n"
        .parse::<Formula>()
        .expect("parse");
    let sol = solve(&f, opts(Mode::Flat, Backend::Dpll))
        .expect("solve")
        .solution()
        .cloned()
        .expect("optimum");
    assert_eq!(sol.cost.to_string(), "1/2");
}

#[test]
fn declared_cost_adds_offset() {
    let f = "p pwcnf 2 2 100 1\n1 -3 1 2 0\n1 2 -1 0\n"
        .parse::<Formula>()
        .expect("parse");
    let sol = solve(&f, opts(Mode::Partitioned, Backend::Varisat))
        .expect("solve")
        .solution()
        .cloned()
        .expect("optimum");
    // best declared: x1 false, x2 false falsifies [1 v 2] for -3
    assert_eq!(sol.declared_cost(&f), w(-3));
}

#[test]
fn modes_and_backends_agree_with_enumeration() {
    for seed in 0..24u64 {
        let shape = RandomShape {
            vars: 6,
            hard: 4,
            soft: 9,
            partitions: 3,
            negative_pct: if seed % 3 == 0 { 30 } else { 0 },
            ..RandomShape::default()
        };
        let f = random_formula(&shape, seed).expect("random formula");
        let expected = brute_force(&f);
        let single = f.with_single_partition();

        for backend in BACKENDS {
            for (formula, mode) in [
                (&f, Mode::Partitioned),
                (&f, Mode::Flat),
                (&single, Mode::Partitioned),
            ] {
                let outcome = solve(formula, opts(mode, backend)).expect("solve");
                let got = outcome.solution().map(|s| s.cost.clone());
                assert_eq!(got, expected, "seed {} {:?} {:?}", seed, backend, mode);

                if let Some(sol) = outcome.solution() {
                    let mut values = vec![false; formula.num_vars() as usize + 1];
                    for lit in &sol.model {
                        values[lit.var as usize] = lit.sign;
                    }
                    assert!(formula
                        .hard()
                        .iter()
                        .all(|cl| uphitman::cnf::cnf::clause_is_satisfied(cl, &values)));
                    assert_eq!(cost_under(formula, &values), sol.cost);
                }
            }
        }
    }
}

#[test]
fn minimized_cores_reach_the_same_optimum() {
    for seed in 100..110u64 {
        let f = random_formula(&RandomShape::default(), seed).expect("random formula");
        let plain = solve(&f, opts(Mode::Partitioned, Backend::Varisat)).expect("solve");
        let minimized = solve(
            &f,
            SolveOptions {
                mode: Mode::Partitioned,
                backend: Backend::Varisat,
                minimize_cores: true,
            },
        )
        .expect("solve");
        assert_eq!(
            plain.solution().map(|s| s.cost.clone()),
            minimized.solution().map(|s| s.cost.clone()),
            "seed {}",
            seed
        );
    }
}

#[test]
fn partitioned_mode_counts_nonempty_stages() {
    let f = "p pwcnf 2 2 10 4\n1 1 1 0\n3 1 2 0\n"
        .parse::<Formula>()
        .expect("parse");
    let sol = solve(&f, opts(Mode::Partitioned, Backend::Varisat))
        .expect("solve")
        .solution()
        .cloned()
        .expect("optimum");
    assert_eq!(sol.stats.stages, 2);
    assert_eq!(sol.stats.relaxation_vars, 2);
}

/// Records every core and checks each hitting set against all of them.
struct Recording {
    inner: ExactHitter,
    seen: Rc<RefCell<Vec<Core>>>,
    sizes: Rc<RefCell<Vec<usize>>>,
}

impl HittingSetOracle for Recording {
    fn hit(&mut self, core: Core) {
        self.seen.borrow_mut().push(core.clone());
        self.inner.hit(core);
    }

    fn get(&mut self) -> Vec<u32> {
        let hs = self.inner.get();
        for core in self.seen.borrow().iter() {
            assert!(core.vars().any(|v| hs.contains(&v)), "core left unhit");
        }
        self.sizes.borrow_mut().push(self.inner.num_cores());
        hs
    }

    fn num_cores(&self) -> usize {
        self.inner.num_cores()
    }
}

fn two_stage_formula() -> Formula {
    let mut b = FormulaBuilder::new(TopWeight::Finite(w(100)));
    b.add_hard(c(&[1, 2]), 1);
    b.add_hard(c(&[3, 4]), 2);
    b.add_clause(c(&[-1]), w(2), 1);
    b.add_clause(c(&[-2]), w(3), 1);
    b.add_clause(c(&[-3]), w(4), 2);
    b.add_clause(c(&[-4]), w(1), 2);
    b.build().expect("build")
}

/// Solves with a [`Recording`] hitter; returns the outcome, every core and
/// the core count seen at each hitting-set request.
fn solve_recorded(f: &Formula, mode: Mode) -> (Outcome, Vec<Core>, Vec<usize>) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sizes = Rc::new(RefCell::new(Vec::new()));
    let hitter = Recording {
        inner: ExactHitter::new(),
        seen: Rc::clone(&seen),
        sizes: Rc::clone(&sizes),
    };
    let outcome = UpHitman::with_oracles(
        f,
        Backend::Dpll.create(),
        Box::new(hitter),
        opts(mode, Backend::Dpll),
    )
    .solve()
    .expect("solve");
    let seen = seen.borrow().clone();
    let sizes = sizes.borrow().clone();
    (outcome, seen, sizes)
}

#[test]
fn cores_carry_across_partitions() {
    let f = two_stage_formula();
    let (outcome, seen, sizes) = solve_recorded(&f, Mode::Partitioned);

    let sol = outcome.solution().expect("optimum");
    assert_eq!(sol.cost, w(3));
    assert_eq!(sol.stats.cores, seen.len());
    assert_eq!(seen.len(), 2);
    assert_eq!(sol.stats.stages, 2);
    // each request inside a stage follows a new core; only the first
    // request of a later stage may repeat the previous count
    assert_eq!(sizes, vec![0, 1, 1, 2]);
    assert!(sizes.windows(2).all(|p| p[0] <= p[1]));
    let repeats = sizes.windows(2).filter(|p| p[0] == p[1]).count();
    assert!(repeats <= sol.stats.stages - 1);
}

#[test]
fn flat_mode_grows_cores_every_round() {
    let f = two_stage_formula();
    let (outcome, seen, sizes) = solve_recorded(&f, Mode::Flat);

    let sol = outcome.solution().expect("optimum");
    assert_eq!(sol.cost, w(3));
    assert_eq!(sol.stats.stages, 1);
    assert_eq!(sizes.len(), seen.len() + 1);
    assert!(sizes.windows(2).all(|p| p[0] < p[1]), "{:?}", sizes);
    assert_eq!(sizes.first().copied(), Some(0));
}

#[test]
fn far_apart_partitions_solve_in_order() {
    let f = "p pwcnf 2 4 100 1\n1 100 1 2 0\n9000000000 3 -1 0\n1 5 -2 0\n70000 1 -2 0\n"
        .parse::<Formula>()
        .expect("parse");
    assert_eq!(f.num_partitions(), 9_000_000_001);
    let sol = solve(&f, opts(Mode::Partitioned, Backend::Varisat))
        .expect("solve")
        .solution()
        .cloned()
        .expect("optimum");
    assert_eq!(sol.cost, w(3));
    assert_eq!(sol.model_dimacs(), vec![1, -2]);
    assert_eq!(sol.stats.stages, 3);
}

#[test]
fn relaxation_past_variable_limit_is_refused() {
    let f = two_soft();
    for mode in [Mode::Partitioned, Mode::Flat] {
        let sat = LyingSolver {
            vars: MAX_VAR,
            ..LyingSolver::default()
        };
        let err = UpHitman::with_oracles(
            &f,
            Box::new(sat),
            Box::new(ExactHitter::new()),
            opts(mode, Backend::Dpll),
        )
        .solve()
        .expect_err("ids exhausted");
        assert!(
            matches!(err, SolveError::TooManyVariables(n) if n == u64::from(MAX_VAR) + 2),
            "{:?}",
            err
        );
    }
}

struct Rogue;

impl HittingSetOracle for Rogue {
    fn hit(&mut self, _core: Core) {}

    fn get(&mut self) -> Vec<u32> {
        vec![9999]
    }

    fn num_cores(&self) -> usize {
        0
    }
}

#[test]
fn unknown_hitting_set_variable_is_contract_error() {
    let f = two_soft();
    let err = UpHitman::with_oracles(
        &f,
        Backend::Dpll.create(),
        Box::new(Rogue),
        SolveOptions::default(),
    )
    .solve()
    .expect_err("rogue hitter");
    assert!(matches!(err, SolveError::Contract(_)));
}

/// Answers unsatisfiable with a core naming an original variable.
#[derive(Default)]
struct LyingSolver {
    vars: u32,
    stats: SolverStats,
    core: Option<Vec<Lit>>,
}

impl IncrementalSolver for LyingSolver {
    fn new_var(&mut self) -> u32 {
        self.vars += 1;
        self.vars
    }

    fn num_vars(&self) -> u32 {
        self.vars
    }

    fn add_clause(&mut self, _clause: Vec<Lit>) {}

    fn solve(&mut self, _assumptions: &[Lit]) -> Result<SolveResult, SolveError> {
        self.stats.solve_calls += 1;
        Ok(SolveResult::Unsat)
    }

    fn model_value(&self, _var: u32) -> Option<bool> {
        None
    }

    fn core(&self) -> Option<Vec<Lit>> {
        self.core.clone()
    }

    fn stats(&self) -> SolverStats {
        self.stats
    }

    fn backend_name(&self) -> &'static str {
        "lying"
    }
}

#[test]
fn foreign_core_literal_is_contract_error() {
    let f = two_soft();
    let sat = LyingSolver {
        core: Some(vec![Lit::pos(1)]),
        ..LyingSolver::default()
    };
    let err = UpHitman::with_oracles(
        &f,
        Box::new(sat),
        Box::new(ExactHitter::new()),
        SolveOptions::default(),
    )
    .solve()
    .expect_err("foreign core");
    assert!(matches!(err, SolveError::Contract(_)));
}

#[test]
fn missing_core_is_contract_error() {
    let f = two_soft();
    let err = UpHitman::with_oracles(
        &f,
        Box::new(LyingSolver::default()),
        Box::new(ExactHitter::new()),
        SolveOptions::default(),
    )
    .solve()
    .expect_err("no core");
    assert!(matches!(err, SolveError::Contract(_)));
}

#[test]
fn outcome_is_reported_through_enum() {
    let f = two_soft();
    match solve(&f, SolveOptions::default()).expect("solve") {
        Outcome::Optimum(sol) => assert!(sol.stats.sat_calls >= 1),
        Outcome::Infeasible => panic!("expected optimum"),
    }
}
