use std::path::Path;
use rand::Rng;
use tracing::{debug, info};
use crate::algorithms::model_free::q_learning::learner::{TdPolicy, ValueFunction};
use crate::algorithms::model_free::q_learning::lookup_table::LookupTable;
use crate::algorithms::model_free::q_learning::replay_buffer::RecencyBuffer;
use crate::config::NetworkParams;
use crate::environments::env::{Action, State, StateSpace};
use crate::error::{LearnError, Result};
use crate::services::algo_helper::encoder::StateActionEncoder;
use crate::services::algo_helper::helpers::{argmax, normalize_to_unit, total_error};
use crate::services::algo_helper::perceptron::Perceptron;

/// State-action values approximated by a single-output perceptron fed the
/// bipolar one-hot encoding of `(state, action)`.
///
/// Every live update is followed by a replay pass over the most recent
/// transitions, oldest first.
#[derive(Clone, Debug)]
pub struct NeuralValueFunction {
    encoder: StateActionEncoder,
    network: Perceptron,
    replay: RecencyBuffer,
}

impl NeuralValueFunction {
    /// Topology is `[one-hot width, hidden..., 1]`; weights are drawn from `rng`.
    pub fn new<R: Rng + ?Sized>(
        space: StateSpace,
        params: &NetworkParams,
        replay_capacity: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let encoder = StateActionEncoder::new(space);
        let mut counts = Vec::with_capacity(params.hidden_neurons.len() + 2);
        counts.push(encoder.width());
        counts.extend_from_slice(&params.hidden_neurons);
        counts.push(1);

        let mut network = Perceptron::new(&counts, params.activation, params.momentum, params.learning_rate)?;
        network.initialize_weights(rng);
        Ok(Self { encoder, network, replay: RecencyBuffer::new(replay_capacity) })
    }

    pub fn encoder(&self) -> &StateActionEncoder { &self.encoder }

    pub fn network(&self) -> &Perceptron { &self.network }

    pub fn network_mut(&mut self) -> &mut Perceptron { &mut self.network }

    pub fn replay(&self) -> &RecencyBuffer { &self.replay }

    /// Pre-trains the network on every cell of `table`, with the cell values
    /// squeezed into `[-1, 1]` by the table's extent. Returns the total error
    /// measured after each epoch.
    pub fn fit_table(&mut self, table: &LookupTable, epochs: usize) -> Result<Vec<f64>> {
        if table.space() != self.encoder.space() {
            return Err(LearnError::ConfigMismatch("the table and the network describe different state spaces".into()));
        }
        let (min, max) = table.extent();
        let mut inputs = Vec::with_capacity(table.cells().len());
        let mut targets = Vec::with_capacity(table.cells().len());
        for state in table.space().states() {
            let row = table.values(&state)?;
            for action in table.space().actions() {
                inputs.push(self.encoder.encode_one_hot(&state, action)?);
                targets.push(vec![normalize_to_unit(row[action.index()], min, max)]);
            }
        }

        let mut history = Vec::with_capacity(epochs);
        for epoch in 0..epochs {
            for (x, t) in inputs.iter().zip(&targets) {
                self.network.train(x, t)?;
            }
            let outputs = inputs
                .iter()
                .map(|x| self.network.output_for(x))
                .collect::<Result<Vec<_>>>()?;
            let error = total_error(&targets, &outputs)?;
            debug!(epoch, error, "fit epoch");
            history.push(error);
        }
        info!(epochs, final_error = history.last().copied().unwrap_or_default(), "network fitted to lookup table");
        Ok(history)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.network.save(path)
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.network.load(path)
    }
}

fn estimates(network: &mut Perceptron, encoder: &StateActionEncoder, state: &State) -> Result<Vec<f64>> {
    encoder
        .space()
        .actions()
        .map(|action| -> Result<f64> { Ok(network.output_for(&encoder.encode_one_hot(state, action)?)?[0]) })
        .collect()
}

impl ValueFunction for NeuralValueFunction {
    fn space(&self) -> &StateSpace { self.encoder.space() }

    fn action_values(&mut self, state: &State) -> Result<Vec<f64>> {
        estimates(&mut self.network, &self.encoder, state)
    }

    fn value(&mut self, state: &State, action: Action) -> Result<f64> {
        let x = self.encoder.encode_one_hot(state, action)?;
        Ok(self.network.output_for(&x)?[0])
    }

    fn store(&mut self, state: &State, action: Action, value: f64) -> Result<()> {
        let x = self.encoder.encode_one_hot(state, action)?;
        self.network.train(&x, &[value])?;
        Ok(())
    }

    /// Remembers the transition, then walks the whole buffer oldest first and
    /// trains once per entry. Each entry re-estimates its target from the
    /// current network and draws its own exploration coin.
    fn after_update(
        &mut self,
        prev_state: &State,
        prev_action: Action,
        cur_state: &State,
        reward: f64,
        policy: &mut TdPolicy,
    ) -> Result<()> {
        if !self.replay.is_enabled() {
            return Ok(());
        }
        let features = self.encoder.encode_one_hot(prev_state, prev_action)?;
        self.replay.push(features, cur_state.clone(), reward);

        let Self { encoder, network, replay } = self;
        for entry in replay.entries_oldest_first() {
            let values = estimates(network, encoder, &entry.resulting_state)?;
            let optimal = argmax(&values);
            let random = policy.explore(values.len());
            let target = policy.target(&values, optimal, random);
            let old = network.output_for(&entry.features)?[0];
            let new = policy.estimate(old, entry.reward, target);
            network.train(&entry.features, &[new])?;
        }
        debug!(entries = replay.len(), capacity = replay.capacity(), "replayed recent transitions");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;
    use crate::config::LearnerParams;
    use crate::services::algo_helper::activation::Activation;

    fn small_params() -> NetworkParams {
        NetworkParams {
            hidden_neurons: vec![6],
            activation: Activation::BipolarSigmoid,
            momentum: 0.5,
            learning_rate: 0.1,
        }
    }

    fn space() -> StateSpace {
        StateSpace::from_cardinalities(&[2, 2], 2).unwrap()
    }

    fn function(capacity: usize) -> NeuralValueFunction {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        NeuralValueFunction::new(space(), &small_params(), capacity, &mut rng).unwrap()
    }

    fn policy() -> TdPolicy {
        TdPolicy::new(LearnerParams {
            learning_rate: 0.5,
            discount: 0.9,
            exploration_rate: 0.0,
            off_policy: true,
            replay_capacity: 2,
            rng_seed: Some(5),
        })
    }

    #[test]
    fn topology_follows_the_encoder() {
        let f = function(0);
        let widths: Vec<usize> = f.network().layers().iter().map(|l| l.neurons).collect();
        assert_eq!(widths, vec![6, 6, 1]);
    }

    #[test]
    fn one_estimate_per_action() {
        let mut f = function(0);
        let values = f.action_values(&State::from([1, 0])).unwrap();
        assert_eq!(values.len(), 2);
        assert!(values.iter().all(|v| v.abs() < 1.0));
    }

    #[test]
    fn store_moves_the_estimate_towards_the_value() {
        let mut f = function(0);
        let state = State::from([0, 1]);
        let action = Action::new(1, 2).unwrap();
        let before = f.value(&state, action).unwrap();
        f.store(&state, action, 0.9).unwrap();
        let after = f.value(&state, action).unwrap();
        assert!((0.9 - after).abs() < (0.9 - before).abs());
    }

    #[test]
    fn replay_keeps_the_most_recent_transitions() {
        let mut f = function(2);
        let mut p = policy();
        let action = Action::new(0, 2).unwrap();
        for i in 0..3 {
            let prev = State::from([i % 2, 0]);
            f.after_update(&prev, action, &State::from([1, 1]), i as f64, &mut p).unwrap();
        }
        let rewards: Vec<f64> = f.replay().entries_oldest_first().map(|e| e.reward).collect();
        assert_eq!(rewards, vec![1.0, 2.0]);
        let newest = f.replay().entries_oldest_first().last().unwrap();
        assert_eq!(newest.features, f.encoder().encode_one_hot(&State::from([0, 0]), action).unwrap());
    }

    #[test]
    fn replay_retrains_each_entry_towards_its_own_target() {
        let mut f = function(2);
        let mut p = policy();
        let mut mirror = f.network().clone();
        let mut mirror_rng = Xoshiro256PlusPlus::seed_from_u64(5);
        let action = Action::new(1, 2).unwrap();
        let transitions = [
            (State::from([0, 0]), State::from([1, 1]), 1.0),
            (State::from([1, 0]), State::from([0, 1]), -0.5),
            (State::from([1, 1]), State::from([0, 0]), 0.25),
        ];

        let mut held: Vec<(Vec<f64>, State, f64)> = Vec::new();
        for (prev, cur, reward) in &transitions {
            f.after_update(prev, action, cur, *reward, &mut p).unwrap();

            held.push((f.encoder().encode_one_hot(prev, action).unwrap(), cur.clone(), *reward));
            if held.len() > 2 {
                held.remove(0);
            }
            for (x, next, r) in &held {
                let values: Vec<f64> = (0..2)
                    .map(|a| {
                        let y = f.encoder().encode_one_hot(next, Action::new(a, 2).unwrap()).unwrap();
                        mirror.output_for(&y).unwrap()[0]
                    })
                    .collect();
                // epsilon is zero: the coin is drawn but never comes up
                assert!(mirror_rng.gen::<f64>() > 0.0);
                let target = values[argmax(&values)];
                let old = mirror.output_for(x).unwrap()[0];
                mirror.train(x, &[old + 0.5 * (r + 0.9 * target - old)]).unwrap();
            }
            assert_eq!(f.network(), &mirror);
        }
        assert_eq!(p.rng().gen::<f64>(), mirror_rng.gen::<f64>());
    }

    #[test]
    fn disabled_replay_leaves_the_network_alone() {
        let mut f = function(0);
        let before = f.network().clone();
        let mut p = policy();
        let action = Action::new(1, 2).unwrap();
        f.after_update(&State::from([0, 0]), action, &State::from([1, 1]), 1.0, &mut p).unwrap();
        assert!(f.replay().is_empty());
        assert_eq!(f.network(), &before);
        assert_eq!(p.rng().gen::<f64>(), Xoshiro256PlusPlus::seed_from_u64(5).gen::<f64>());
    }

    #[test]
    fn fitting_a_table_lowers_the_error() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(8);
        let table = LookupTable::new(space(), &mut rng);
        let mut f = function(0);
        let history = f.fit_table(&table, 300).unwrap();
        assert_eq!(history.len(), 300);
        assert!(history[299] < history[0]);
    }

    #[test]
    fn fitting_a_foreign_table_is_rejected() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(8);
        let other = LookupTable::new(StateSpace::from_cardinalities(&[4], 2).unwrap(), &mut rng);
        let mut f = function(0);
        assert!(matches!(f.fit_table(&other, 1), Err(LearnError::ConfigMismatch(_))));
    }
}
