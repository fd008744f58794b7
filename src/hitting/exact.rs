use indexmap::IndexMap;
use log::trace;

use super::{Core, HittingSetOracle};
use crate::cnf::weight::Weight;

/// Branch-and-bound minimum-weight hitting set solver.
///
/// Seeds the bound with a greedy solution, branches on the unhit core with
/// the fewest open candidates, and prunes with a disjoint-core lower bound.
/// Siblings already explored are forbidden in later branches, so every set
/// is visited at most once.
#[derive(Debug, Clone, Default)]
pub struct ExactHitter {
    weights: IndexMap<u32, Weight>,
    cores: Vec<Vec<usize>>,
    cached: Option<Vec<u32>>,
}

impl ExactHitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cost_of(&self, set: &[u32]) -> Weight {
        set.iter().filter_map(|v| self.weights.get(v)).sum()
    }

    fn solve(&self) -> Vec<usize> {
        let n = self.weights.len();
        let weights = self.weights.values().cloned().collect::<Vec<_>>();

        let mut greedy = vec![false; n];
        for core in &self.cores {
            if core.iter().any(|&i| greedy[i]) {
                continue;
            }
            if let Some(&i) = core.iter().min_by_key(|&&i| &weights[i]) {
                greedy[i] = true;
            }
        }
        let best = (0..n).filter(|&i| greedy[i]).collect::<Vec<_>>();
        let best_cost: Weight = best.iter().map(|&i| &weights[i]).sum();

        let mut search = Search {
            weights: &weights,
            cores: &self.cores,
            chosen: vec![false; n],
            forbidden: vec![false; n],
            stack: Vec::new(),
            best,
            best_cost,
            nodes: 0,
        };
        search.dfs(Weight::zero());
        trace!(
            "hitting set over {} cores: cost {} after {} nodes",
            self.cores.len(),
            search.best_cost,
            search.nodes
        );
        search.best
    }
}

impl HittingSetOracle for ExactHitter {
    /// Empty cores cannot be hit and are not recorded.
    fn hit(&mut self, core: Core) {
        if core.is_empty() {
            return;
        }
        let mut idxs = Vec::with_capacity(core.len());
        for (var, w) in core.members() {
            let idx = match self.weights.get_index_of(var) {
                Some(i) => i,
                None => self.weights.insert_full(*var, w.clone()).0,
            };
            idxs.push(idx);
        }
        self.cores.push(idxs);
        self.cached = None;
    }

    fn get(&mut self) -> Vec<u32> {
        if let Some(hs) = &self.cached {
            return hs.clone();
        }
        let mut hs = self
            .solve()
            .into_iter()
            .filter_map(|i| self.weights.get_index(i).map(|(v, _)| *v))
            .collect::<Vec<_>>();
        hs.sort_unstable();
        self.cached = Some(hs.clone());
        hs
    }

    fn num_cores(&self) -> usize {
        self.cores.len()
    }
}

struct Search<'a> {
    weights: &'a [Weight],
    cores: &'a [Vec<usize>],
    chosen: Vec<bool>,
    forbidden: Vec<bool>,
    stack: Vec<usize>,
    best: Vec<usize>,
    best_cost: Weight,
    nodes: usize,
}

impl<'a> Search<'a> {
    fn dfs(&mut self, cost: Weight) {
        self.nodes += 1;
        let cores = self.cores;

        let mut pick = None::<&'a Vec<usize>>;
        let mut pick_open = usize::MAX;
        for core in cores {
            if core.iter().any(|&i| self.chosen[i]) {
                continue;
            }
            let open = core.iter().filter(|&&i| !self.forbidden[i]).count();
            if open == 0 {
                return;
            }
            if open < pick_open {
                pick = Some(core);
                pick_open = open;
            }
        }

        let Some(core) = pick else {
            if cost < self.best_cost {
                self.best_cost = cost;
                self.best = self.stack.clone();
            }
            return;
        };

        if &cost + &self.lower_bound() >= self.best_cost {
            return;
        }

        let mut candidates = core
            .iter()
            .copied()
            .filter(|&i| !self.forbidden[i])
            .collect::<Vec<_>>();
        candidates.sort_by(|&a, &b| self.weights[a].cmp(&self.weights[b]));

        let mut closed = Vec::with_capacity(candidates.len());
        for i in candidates {
            self.chosen[i] = true;
            self.stack.push(i);
            self.dfs(&cost + &self.weights[i]);
            self.stack.pop();
            self.chosen[i] = false;

            self.forbidden[i] = true;
            closed.push(i);
        }
        for i in closed {
            self.forbidden[i] = false;
        }
    }

    /// Sum of the cheapest open member over pairwise-disjoint unhit cores.
    fn lower_bound(&self) -> Weight {
        let mut used = vec![false; self.weights.len()];
        let mut lb = Weight::zero();
        for core in self.cores {
            if core.iter().any(|&i| self.chosen[i] || used[i]) {
                continue;
            }
            let cheapest = core
                .iter()
                .filter(|&&i| !self.forbidden[i])
                .map(|&i| &self.weights[i])
                .min();
            if let Some(w) = cheapest {
                lb += w;
            }
            for &i in core {
                used[i] = true;
            }
        }
        lb
    }
}
