use crate::environments::env::{Action, State, StateSpace};
use crate::error::{LearnError, Result};

/// Maps categorical states and actions onto table coordinates and onto the
/// bipolar one-hot vectors fed to the network.
#[derive(Clone, Debug)]
pub struct StateActionEncoder {
    space: StateSpace,
}

impl StateActionEncoder {
    pub fn new(space: StateSpace) -> Self {
        Self { space }
    }

    pub fn space(&self) -> &StateSpace { &self.space }

    /// Width of a one-hot feature vector: all category blocks plus the action block.
    pub fn width(&self) -> usize {
        self.space.categories().iter().map(|c| c.cardinality).sum::<usize>() + self.space.action_count()
    }

    /// Index tuple used to address the table.
    pub fn encode_index(&self, state: &State) -> Result<Vec<usize>> {
        self.space.check_state(state)?;
        Ok(state.indices().to_vec())
    }

    /// Row-major offset of the first action cell of `state`.
    pub fn flat_offset(&self, state: &State) -> Result<usize> {
        self.space.check_state(state)?;
        let row = self
            .space
            .categories()
            .iter()
            .zip(state.indices())
            .fold(0, |acc, (category, &index)| acc * category.cardinality + index);
        Ok(row * self.space.action_count())
    }

    pub fn encode_one_hot(&self, state: &State, action: Action) -> Result<Vec<f64>> {
        self.space.check_state(state)?;
        self.space.check_action(action)?;

        let mut features = Vec::with_capacity(self.width());
        for (category, &chosen) in self.space.categories().iter().zip(state.indices()) {
            push_block(&mut features, category.cardinality, chosen);
        }
        push_block(&mut features, self.space.action_count(), action.index());
        Ok(features)
    }

    /// Inverse of [`encode_one_hot`](Self::encode_one_hot): picks the largest
    /// entry of every block.
    pub fn decode_one_hot(&self, features: &[f64]) -> Result<(State, Action)> {
        if features.len() != self.width() {
            return Err(LearnError::Dimension {
                what: "one-hot feature vector".into(),
                expected: self.width(),
                actual: features.len(),
            });
        }
        let mut offset = 0;
        let mut indices = Vec::with_capacity(self.space.category_count());
        for category in self.space.categories() {
            indices.push(block_argmax(&features[offset..offset + category.cardinality]));
            offset += category.cardinality;
        }
        let action = Action::from_index(block_argmax(&features[offset..]));
        Ok((State::new(indices), action))
    }
}

fn push_block(features: &mut Vec<f64>, width: usize, chosen: usize) {
    features.extend((0..width).map(|i| if i == chosen { 1.0 } else { -1.0 }));
}

fn block_argmax(block: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in block.iter().enumerate() {
        if v > block[best] {
            best = i;
        }
    }
    best
}
