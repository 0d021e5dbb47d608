use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use rand::Rng;
use tracing::{info, warn};
use crate::algorithms::model_free::q_learning::learner::ValueFunction;
use crate::environments::env::{Action, State, StateSpace};
use crate::error::Result;
use crate::services::algo_helper::encoder::StateActionEncoder;
use crate::services::algo_helper::perceptron::parse_exact;

/// Upper bound (exclusive) of the optimistic initial values.
pub const INITIAL_VALUE_SPAN: f64 = 100.0;

/// Dense state-action value table with a parallel visit counter per cell.
///
/// Cells are laid out row-major over `(category_1, ..., category_k, action)`,
/// the same order the table is persisted in.
#[derive(Clone, Debug)]
pub struct LookupTable {
    encoder: StateActionEncoder,
    values: Vec<f64>,
    access: Vec<u64>,
}

impl LookupTable {
    /// Builds the table with every cell drawn from `[0, 100)`.
    pub fn new<R: Rng + ?Sized>(space: StateSpace, rng: &mut R) -> Self {
        let cells = space.cell_count();
        let mut table = Self {
            encoder: StateActionEncoder::new(space),
            values: vec![0.0; cells],
            access: vec![0; cells],
        };
        table.initialize(rng);
        table
    }

    pub fn space(&self) -> &StateSpace { self.encoder.space() }

    pub fn initialize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for v in &mut self.values {
            *v = rng.gen::<f64>() * INITIAL_VALUE_SPAN;
        }
        self.access.fill(0);
    }

    fn row(&self, state: &State) -> Result<std::ops::Range<usize>> {
        let start = self.encoder.flat_offset(state)?;
        Ok(start..start + self.space().action_count())
    }

    pub fn values(&self, state: &State) -> Result<&[f64]> {
        let row = self.row(state)?;
        Ok(&self.values[row])
    }

    pub fn values_for(&mut self, state: &State) -> Result<&mut [f64]> {
        let row = self.row(state)?;
        Ok(&mut self.values[row])
    }

    pub fn access_counts(&self, state: &State) -> Result<&[u64]> {
        let row = self.row(state)?;
        Ok(&self.access[row])
    }

    pub fn access_counts_for(&mut self, state: &State) -> Result<&mut [u64]> {
        let row = self.row(state)?;
        Ok(&mut self.access[row])
    }

    /// All cells in persisted order.
    pub fn cells(&self) -> &[f64] { &self.values }

    /// Smallest and largest stored value.
    pub fn extent(&self) -> (f64, f64) {
        self.values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut w = BufWriter::new(File::create(path)?);
        for v in &self.values {
            writeln!(w, "{v}")?;
        }
        w.flush()?;
        info!(path = %path.display(), cells = self.values.len(), "saved lookup table");
        Ok(())
    }

    /// Replaces every cell from a file written by [`save`](Self::save).
    /// The table is left untouched unless the file holds exactly one real per cell.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match parse_exact(&text, self.values.len()) {
            Ok(values) => {
                self.values = values;
                info!(path = %path.display(), cells = self.values.len(), "loaded lookup table");
                Ok(())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "rejected lookup table file");
                Err(e)
            }
        }
    }
}

impl ValueFunction for LookupTable {
    fn space(&self) -> &StateSpace { self.encoder.space() }

    fn action_values(&mut self, state: &State) -> Result<Vec<f64>> {
        Ok(self.values(state)?.to_vec())
    }

    fn value(&mut self, state: &State, action: Action) -> Result<f64> {
        self.space().check_action(action)?;
        Ok(self.values(state)?[action.index()])
    }

    fn store(&mut self, state: &State, action: Action, value: f64) -> Result<()> {
        self.space().check_action(action)?;
        self.values_for(state)?[action.index()] = value;
        Ok(())
    }

    fn record_visit(&mut self, state: &State, action: Action) -> Result<()> {
        self.space().check_action(action)?;
        self.access_counts_for(state)?[action.index()] += 1;
        Ok(())
    }
}
