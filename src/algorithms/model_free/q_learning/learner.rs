use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::debug;
use crate::algorithms::model_free::q_learning::lookup_table::LookupTable;
use crate::algorithms::model_free::q_learning::neural_q::NeuralValueFunction;
use crate::config::{LearnerParams, NetworkParams};
use crate::environments::env::{Action, State, StateSpace};
use crate::error::Result;
use crate::services::algo_helper::helpers::argmax;

/// What the learner needs from a value representation.
///
/// Implemented by [`LookupTable`] and [`NeuralValueFunction`]; a learner is
/// bound to one of them for its whole life.
pub trait ValueFunction {
    fn space(&self) -> &StateSpace;

    /// Current estimate of every action at `state`, indexed by action id.
    fn action_values(&mut self, state: &State) -> Result<Vec<f64>>;

    fn value(&mut self, state: &State, action: Action) -> Result<f64>;

    /// Moves the estimate of `(state, action)` to `value`.
    fn store(&mut self, state: &State, action: Action, value: f64) -> Result<()>;

    /// Hook run right after a TD update of `(prev_state, prev_action)`.
    fn after_update(
        &mut self,
        _prev_state: &State,
        _prev_action: Action,
        _cur_state: &State,
        _reward: f64,
        _policy: &mut TdPolicy,
    ) -> Result<()> {
        Ok(())
    }

    /// Bookkeeping for the action actually handed back at `state`.
    fn record_visit(&mut self, _state: &State, _action: Action) -> Result<()> {
        Ok(())
    }
}

/// Exploration and TD arithmetic shared by live updates and replay.
///
/// Owns the learner's single random source; every draw the engine makes goes
/// through it, in a fixed order.
#[derive(Clone, Debug)]
pub struct TdPolicy {
    params: LearnerParams,
    rng: Xoshiro256PlusPlus,
}

impl TdPolicy {
    pub fn new(params: LearnerParams) -> Self {
        let rng = match params.rng_seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };
        Self { params, rng }
    }

    pub fn params(&self) -> &LearnerParams { &self.params }

    pub fn rng(&mut self) -> &mut Xoshiro256PlusPlus { &mut self.rng }

    /// One coin draw against epsilon and, only when it comes up, one uniform
    /// draw over the actions.
    pub fn explore(&mut self, action_count: usize) -> Option<usize> {
        if self.rng.gen::<f64>() <= self.params.exploration_rate {
            Some(self.rng.gen_range(0..action_count))
        } else {
            None
        }
    }

    /// Off-policy, or not exploring: the greedy value. Otherwise the value of
    /// the exploratory action about to be taken.
    pub fn target(&self, values: &[f64], optimal: usize, random: Option<usize>) -> f64 {
        match random {
            Some(r) if !self.params.off_policy => values[r],
            _ => values[optimal],
        }
    }

    pub fn estimate(&self, old: f64, reward: f64, target: f64) -> f64 {
        old + self.params.learning_rate * (reward + self.params.discount * target - old)
    }
}

/// Epsilon-greedy TD learner over one value representation.
pub struct ValueLearner<V: ValueFunction> {
    function: V,
    policy: TdPolicy,
}

pub type TabularLearner = ValueLearner<LookupTable>;
pub type NeuralLearner = ValueLearner<NeuralValueFunction>;

impl TabularLearner {
    /// Table cells are randomised from the learner's own random source.
    pub fn tabular(space: StateSpace, params: LearnerParams) -> Self {
        let mut policy = TdPolicy::new(params);
        let table = LookupTable::new(space, policy.rng());
        Self { function: table, policy }
    }
}

impl NeuralLearner {
    /// Network weights are randomised from the learner's own random source.
    pub fn neural(space: StateSpace, params: LearnerParams, network: &NetworkParams) -> Result<Self> {
        let mut policy = TdPolicy::new(params);
        let capacity = policy.params().replay_capacity;
        let function = NeuralValueFunction::new(space, network, capacity, policy.rng())?;
        Ok(Self { function, policy })
    }
}

impl<V: ValueFunction> ValueLearner<V> {
    pub fn function(&self) -> &V { &self.function }

    pub fn function_mut(&mut self) -> &mut V { &mut self.function }

    pub fn params(&self) -> &LearnerParams { self.policy.params() }

    pub fn exploration_rate(&self) -> f64 { self.policy.params.exploration_rate }

    pub fn set_exploration_rate(&mut self, epsilon: f64) { self.policy.params.exploration_rate = epsilon; }

    pub fn learning_rate(&self) -> f64 { self.policy.params.learning_rate }

    pub fn set_learning_rate(&mut self, alpha: f64) { self.policy.params.learning_rate = alpha; }

    pub fn discount(&self) -> f64 { self.policy.params.discount }

    pub fn set_discount(&mut self, gamma: f64) { self.policy.params.discount = gamma; }

    pub fn off_policy(&self) -> bool { self.policy.params.off_policy }

    pub fn set_off_policy(&mut self, off_policy: bool) { self.policy.params.off_policy = off_policy; }

    fn check(&self, state: &State, action: Option<Action>) -> Result<()> {
        let space = self.function.space();
        space.check_state(state)?;
        if let Some(action) = action {
            space.check_action(action)?;
        }
        Ok(())
    }

    pub fn action_values(&mut self, state: &State) -> Result<Vec<f64>> {
        self.check(state, None)?;
        self.function.action_values(state)
    }

    /// Greedy choice at `state`; draws no randomness and changes nothing.
    pub fn greedy_action(&mut self, state: &State) -> Result<Action> {
        let values = self.action_values(state)?;
        Ok(Action::from_index(argmax(&values)))
    }

    /// One decision tick.
    ///
    /// Updates the estimate of `prev` (absent on the first tick of an episode)
    /// towards `reward + gamma * target` and returns the action to take at
    /// `cur_state`. Inputs are validated before anything is drawn or written.
    pub fn update_value(&mut self, cur_state: &State, prev: Option<(&State, Action)>, reward: f64) -> Result<Action> {
        self.check(cur_state, None)?;
        if let Some((prev_state, prev_action)) = prev {
            self.check(prev_state, Some(prev_action))?;
        }

        let values = self.function.action_values(cur_state)?;
        let optimal = argmax(&values);
        let random = self.policy.explore(values.len());

        if let Some((prev_state, prev_action)) = prev {
            let target = self.policy.target(&values, optimal, random);
            let old = self.function.value(prev_state, prev_action)?;
            let new = self.policy.estimate(old, reward, target);
            self.function.store(prev_state, prev_action, new)?;
            debug!(%prev_state, %prev_action, reward, old, new, explored = random.is_some(), "td update");
            self.function.after_update(prev_state, prev_action, cur_state, reward, &mut self.policy)?;
        }

        let chosen = Action::from_index(random.unwrap_or(optimal));
        self.function.record_visit(cur_state, chosen)?;
        Ok(chosen)
    }

    /// Terminal update: the episode ended after `prev_action`, so the target
    /// does not bootstrap from any successor state.
    pub fn finish_episode(&mut self, prev_state: &State, prev_action: Action, reward: f64) -> Result<()> {
        self.check(prev_state, Some(prev_action))?;
        let old = self.function.value(prev_state, prev_action)?;
        let new = self.policy.estimate(old, reward, 0.0);
        self.function.store(prev_state, prev_action, new)?;
        debug!(%prev_state, %prev_action, reward, old, new, "terminal update");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use approx::assert_relative_eq;
    use crate::error::LearnError;
    use crate::services::algo_helper::activation::Activation;
    use crate::services::algo_helper::encoder::StateActionEncoder;
    use crate::services::algo_helper::perceptron::Perceptron;

    fn params(epsilon: f64, off_policy: bool) -> LearnerParams {
        LearnerParams {
            learning_rate: 0.5,
            discount: 0.9,
            exploration_rate: epsilon,
            off_policy,
            replay_capacity: 0,
            rng_seed: Some(42),
        }
    }

    fn two_by_two(epsilon: f64) -> TabularLearner {
        let space = StateSpace::from_cardinalities(&[2, 2], 2).unwrap();
        TabularLearner::tabular(space, params(epsilon, true))
    }

    #[test]
    fn estimate_follows_the_td_rule() {
        let policy = TdPolicy::new(params(0.0, true));
        assert_relative_eq!(policy.estimate(10.0, 5.0, 20.0), 10.0 + 0.5 * (5.0 + 18.0 - 10.0));
    }

    #[test]
    fn target_depends_on_policy_flag() {
        let values = [1.0, 4.0, 2.0];
        let off = TdPolicy::new(params(1.0, true));
        let on = TdPolicy::new(params(1.0, false));
        assert_eq!(off.target(&values, 1, Some(2)), 4.0);
        assert_eq!(on.target(&values, 1, Some(2)), 2.0);
        assert_eq!(on.target(&values, 1, None), 4.0);
    }

    #[test]
    fn greedy_choice_takes_the_lowest_index_on_ties() {
        let mut learner = two_by_two(0.0);
        let state = State::from([0, 1]);
        learner.function_mut().values_for(&state).unwrap().copy_from_slice(&[7.0, 7.0]);
        assert_eq!(learner.update_value(&state, None, 0.0).unwrap().index(), 0);
        learner.function_mut().values_for(&state).unwrap().copy_from_slice(&[1.0, 7.0]);
        assert_eq!(learner.update_value(&state, None, 0.0).unwrap().index(), 1);
    }

    #[test]
    fn returned_action_is_counted() {
        let mut learner = two_by_two(0.0);
        let state = State::from([1, 0]);
        learner.function_mut().values_for(&state).unwrap().copy_from_slice(&[0.0, 1.0]);
        learner.update_value(&state, None, 0.0).unwrap();
        learner.update_value(&state, None, 0.0).unwrap();
        assert_eq!(learner.function().access_counts(&state).unwrap(), &[0, 2]);
    }

    #[test]
    fn full_exploration_is_roughly_uniform() {
        let space = StateSpace::from_cardinalities(&[1], 4).unwrap();
        let mut learner = TabularLearner::tabular(space, params(1.0, true));
        let state = State::from([0]);
        let mut counts = [0usize; 4];
        for _ in 0..4000 {
            counts[learner.update_value(&state, None, 0.0).unwrap().index()] += 1;
        }
        for count in counts {
            assert!((850..=1150).contains(&count), "counts {counts:?}");
        }
    }

    #[test]
    fn repeated_updates_reach_the_fixed_point() {
        let space = StateSpace::from_cardinalities(&[1], 1).unwrap();
        let mut learner = TabularLearner::tabular(space, params(0.0, true));
        let state = State::from([0]);
        let action = Action::new(0, 1).unwrap();
        for _ in 0..500 {
            learner.update_value(&state, Some((&state, action)), 1.0).unwrap();
        }
        assert_relative_eq!(learner.function().values(&state).unwrap()[0], 1.0 / (1.0 - 0.9), epsilon = 1e-6);
    }

    #[test]
    fn invalid_inputs_change_nothing() {
        let mut learner = two_by_two(0.0);
        let before = learner.function().cells().to_vec();
        let good = State::from([0, 0]);
        let err = learner
            .update_value(&good, Some((&State::from([0, 5]), Action::new(0, 2).unwrap())), 1.0)
            .unwrap_err();
        assert!(matches!(err, LearnError::Range { .. }));
        let err = learner.update_value(&State::from([0, 0, 0]), None, 1.0).unwrap_err();
        assert!(matches!(err, LearnError::Dimension { .. }));
        let foreign = Action::new(3, 4).unwrap();
        assert!(matches!(learner.update_value(&good, Some((&good, foreign)), 1.0), Err(LearnError::Range { .. })));
        assert_eq!(learner.function().cells(), before.as_slice());
        assert_eq!(learner.function().access_counts(&good).unwrap(), &[0, 0]);
    }

    #[test]
    fn terminal_update_ignores_successors() {
        let mut learner = two_by_two(0.0);
        let state = State::from([1, 1]);
        let action = Action::new(1, 2).unwrap();
        let old = learner.function().values(&state).unwrap()[1];
        learner.finish_episode(&state, action, 3.0).unwrap();
        assert_relative_eq!(learner.function().values(&state).unwrap()[1], old + 0.5 * (3.0 - old));
    }

    #[test]
    fn setters_change_the_next_tick() {
        let mut learner = two_by_two(0.3);
        learner.set_exploration_rate(0.0);
        learner.set_learning_rate(1.0);
        learner.set_discount(0.0);
        learner.set_off_policy(false);
        assert_eq!(learner.exploration_rate(), 0.0);
        assert!(!learner.off_policy());

        let state = State::from([0, 0]);
        let action = Action::new(0, 2).unwrap();
        learner.update_value(&state, Some((&state, action)), 2.5).unwrap();
        assert_eq!(learner.function().values(&state).unwrap()[0], 2.5);
    }

    /// Straight-line re-derivation of a neural tick: live TD step, push, then
    /// oldest-first replay with a fresh coin per entry.
    struct Mirror {
        network: Perceptron,
        encoder: StateActionEncoder,
        rng: Xoshiro256PlusPlus,
        memory: VecDeque<(Vec<f64>, State, f64)>,
        capacity: usize,
        params: LearnerParams,
        draws: usize,
        explorations: usize,
    }

    impl Mirror {
        fn estimates(&mut self, state: &State) -> Vec<f64> {
            let n = self.encoder.space().action_count();
            (0..n)
                .map(|a| {
                    let x = self.encoder.encode_one_hot(state, Action::new(a, n).unwrap()).unwrap();
                    self.network.output_for(&x).unwrap()[0]
                })
                .collect()
        }

        fn draw(&mut self, n: usize) -> Option<usize> {
            self.draws += 1;
            let coin: f64 = self.rng.gen();
            if coin <= self.params.exploration_rate {
                self.explorations += 1;
                Some(self.rng.gen_range(0..n))
            } else {
                None
            }
        }

        fn learn(&mut self, x: &[f64], values: &[f64], best: usize, random: Option<usize>, reward: f64) {
            let target = match random {
                Some(r) if !self.params.off_policy => values[r],
                _ => values[best],
            };
            let old = self.network.output_for(x).unwrap()[0];
            let new = old + self.params.learning_rate * (reward + self.params.discount * target - old);
            self.network.train(x, &[new]).unwrap();
        }

        fn tick(&mut self, cur: &State, prev: Option<(&State, Action)>, reward: f64) -> usize {
            let values = self.estimates(cur);
            let best = first_max(&values);
            let random = self.draw(values.len());
            if let Some((prev_state, prev_action)) = prev {
                let x = self.encoder.encode_one_hot(prev_state, prev_action).unwrap();
                self.learn(&x, &values, best, random, reward);
                self.memory.push_back((x, cur.clone(), reward));
                if self.memory.len() > self.capacity {
                    self.memory.pop_front();
                }
                for (x, next, r) in self.memory.clone() {
                    let values = self.estimates(&next);
                    let best = first_max(&values);
                    let random = self.draw(values.len());
                    self.learn(&x, &values, best, random, r);
                }
            }
            random.unwrap_or(best)
        }
    }

    fn first_max(values: &[f64]) -> usize {
        let mut best = 0;
        for (i, &v) in values.iter().enumerate() {
            if v > values[best] {
                best = i;
            }
        }
        best
    }

    fn neural_run_matches_mirror(off_policy: bool) {
        let space = StateSpace::from_cardinalities(&[2, 3], 3).unwrap();
        let learner_params = LearnerParams {
            learning_rate: 0.3,
            discount: 0.8,
            exploration_rate: 0.5,
            off_policy,
            replay_capacity: 3,
            rng_seed: Some(91),
        };
        let network_params = NetworkParams {
            hidden_neurons: vec![4],
            activation: Activation::BipolarSigmoid,
            momentum: 0.7,
            learning_rate: 0.05,
        };
        let mut learner = NeuralLearner::neural(space.clone(), learner_params.clone(), &network_params).unwrap();

        let encoder = StateActionEncoder::new(space);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(91);
        let mut network = Perceptron::new(&[encoder.width(), 4, 1], Activation::BipolarSigmoid, 0.7, 0.05).unwrap();
        network.initialize_weights(&mut rng);
        assert_eq!(learner.function().network(), &network);
        let mut mirror = Mirror {
            network,
            encoder,
            rng,
            memory: VecDeque::new(),
            capacity: 3,
            params: learner_params,
            draws: 0,
            explorations: 0,
        };

        let states = [State::from([0, 0]), State::from([1, 2]), State::from([0, 1]), State::from([1, 0])];
        let mut prev: Option<(State, Action)> = None;
        for (i, state) in states.iter().cycle().take(16).enumerate() {
            let reward = (i % 3) as f64 * 0.5 - 0.5;
            let step = prev.as_ref().map(|(s, a)| (s, *a));
            let chosen = learner.update_value(state, step, reward).unwrap();
            let expected = mirror.tick(state, step, reward);
            assert_eq!(chosen.index(), expected, "tick {i}");
            assert_eq!(learner.function().network(), &mirror.network, "tick {i}");
            prev = Some((state.clone(), chosen));
        }

        assert!(mirror.explorations > 0 && mirror.explorations < mirror.draws);
        assert_eq!(learner.function().replay().len(), 3);
        assert_eq!(learner.policy.rng().gen::<f64>(), mirror.rng.gen::<f64>());
    }

    #[test]
    fn off_policy_neural_ticks_are_reproduced_exactly() {
        neural_run_matches_mirror(true);
    }

    #[test]
    fn on_policy_neural_ticks_are_reproduced_exactly() {
        neural_run_matches_mirror(false);
    }
}
