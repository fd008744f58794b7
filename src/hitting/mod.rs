pub mod exact;

use crate::cnf::weight::Weight;

pub use self::exact::ExactHitter;

/// A weighted set of relaxation variables taken from one unsatisfiable
/// oracle call. Members are sorted and distinct; a core is never changed
/// after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Core {
    members: Vec<(u32, Weight)>,
}

impl Core {
    pub fn new(mut members: Vec<(u32, Weight)>) -> Self {
        members.sort_by_key(|(v, _)| *v);
        members.dedup_by_key(|(v, _)| *v);
        Self { members }
    }

    pub fn members(&self) -> &[(u32, Weight)] {
        &self.members
    }

    pub fn vars(&self) -> impl Iterator<Item = u32> + '_ {
        self.members.iter().map(|(v, _)| *v)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Minimum-weight hitting set oracle over a growing core collection.
pub trait HittingSetOracle {
    fn hit(&mut self, core: Core);
    /// A minimum-weight set of variables intersecting every recorded core.
    fn get(&mut self) -> Vec<u32>;
    fn num_cores(&self) -> usize;
}
