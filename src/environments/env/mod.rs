use std::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};
use crate::error::{LearnError, Result};

/// One discretized observation dimension, e.g. position-x with 4 buckets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCategory {
    pub name: String,
    pub cardinality: usize,
}

impl StateCategory {
    pub fn new(name: impl Into<String>, cardinality: usize) -> Self {
        Self { name: name.into(), cardinality }
    }
}

/// Ordered category table plus the size of the action set.
///
/// The order of `categories` fixes both the one-hot layout fed to the network
/// and the row-major layout of the persisted table, so it is kept as a plain
/// vector and never re-sorted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStateSpace")]
pub struct StateSpace {
    categories: Vec<StateCategory>,
    action_count: usize,
}

/// Unchecked wire form; only turned into a `StateSpace` through `new`.
#[derive(Deserialize)]
struct RawStateSpace {
    categories: Vec<StateCategory>,
    action_count: usize,
}

impl TryFrom<RawStateSpace> for StateSpace {
    type Error = LearnError;

    fn try_from(raw: RawStateSpace) -> Result<Self> {
        Self::new(raw.categories, raw.action_count)
    }
}

impl StateSpace {
    pub fn new(categories: Vec<StateCategory>, action_count: usize) -> Result<Self> {
        if categories.is_empty() {
            return Err(LearnError::ConfigMismatch("a state space needs at least one category".into()));
        }
        if let Some(empty) = categories.iter().find(|c| c.cardinality == 0) {
            return Err(LearnError::ConfigMismatch(format!("category '{}' has cardinality 0", empty.name)));
        }
        if action_count == 0 {
            return Err(LearnError::ConfigMismatch("the action set is empty".into()));
        }
        Ok(Self { categories, action_count })
    }

    /// Anonymous categories named `c0`, `c1`, ...
    pub fn from_cardinalities(cardinalities: &[usize], action_count: usize) -> Result<Self> {
        let categories = cardinalities
            .iter()
            .enumerate()
            .map(|(i, &n)| StateCategory::new(format!("c{i}"), n))
            .collect();
        Self::new(categories, action_count)
    }

    pub fn categories(&self) -> &[StateCategory] { &self.categories }

    pub fn category_count(&self) -> usize { self.categories.len() }

    pub fn action_count(&self) -> usize { self.action_count }

    /// Number of distinct discretized states.
    pub fn state_count(&self) -> usize {
        self.categories.iter().map(|c| c.cardinality).product()
    }

    /// Number of state-action cells.
    pub fn cell_count(&self) -> usize {
        self.state_count() * self.action_count
    }

    pub fn check_state(&self, state: &State) -> Result<()> {
        if state.len() != self.categories.len() {
            return Err(LearnError::Dimension {
                what: "state".into(),
                expected: self.categories.len(),
                actual: state.len(),
            });
        }
        for (category, &index) in self.categories.iter().zip(state.indices()) {
            if index >= category.cardinality {
                return Err(LearnError::Range {
                    what: format!("category '{}'", category.name),
                    index,
                    bound: category.cardinality,
                });
            }
        }
        Ok(())
    }

    pub fn check_action(&self, action: Action) -> Result<()> {
        Action::new(action.index(), self.action_count).map(|_| ())
    }

    pub fn actions(&self) -> impl Iterator<Item = Action> {
        (0..self.action_count).map(Action)
    }

    /// Every state in row-major order (last category varies fastest).
    pub fn states(&self) -> impl Iterator<Item = State> + '_ {
        let total = self.state_count();
        (0..total).map(move |mut flat| {
            let mut indices = vec![0; self.categories.len()];
            for (slot, category) in indices.iter_mut().zip(&self.categories).rev() {
                *slot = flat % category.cardinality;
                flat /= category.cardinality;
            }
            State(indices)
        })
    }
}

/// Ordered tuple of categorical indices, one per declared category.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State(Vec<usize>);

impl State {
    pub fn new(indices: Vec<usize>) -> Self { Self(indices) }

    pub fn indices(&self) -> &[usize] { &self.0 }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl From<Vec<usize>> for State {
    fn from(indices: Vec<usize>) -> Self { Self(indices) }
}

impl<const N: usize> From<[usize; N]> for State {
    fn from(indices: [usize; N]) -> Self { Self(indices.to_vec()) }
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Discrete action id in `[0, action_count)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Action(usize);

impl Action {
    pub fn new(index: usize, action_count: usize) -> Result<Self> {
        if index >= action_count {
            return Err(LearnError::Range { what: "action".into(), index, bound: action_count });
        }
        Ok(Self(index))
    }

    pub fn index(self) -> usize { self.0 }

    /// Callers must already have checked `index` against the action count.
    pub(crate) fn from_index(index: usize) -> Self { Self(index) }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "a{}", self.0)
    }
}

/// Environment seen through the learner's eyes: discretized observations,
/// scalar rewards per step and a terminal flag.
pub trait CategoricalEnv {
    fn space(&self) -> &StateSpace;
    fn reset(&mut self);
    fn observe(&self) -> State;
    /// Applies the action and returns the reward earned by it.
    fn step(&mut self, action: Action) -> f64;
    fn is_game_over(&self) -> bool;
    fn score(&self) -> f64;
}
