use serde::{Deserialize, Serialize};
use crate::environments::env::{StateCategory, StateSpace};
use crate::error::Result;
use crate::services::algo_helper::activation::Activation;

/**
* -------------------------------------------------------------------------
* ROBOT ARENA STATE SPACE
* -------------------------------------------------------------------------
*/
pub const ARENA_NUM_ACTIONS: usize = 5;

/// Position x/y in 4 buckets, energy low/high, enemy distance close/median/far,
/// gun heated or not. Actions: fire, forward, backward, forward-avoid,
/// backward-avoid.
pub fn robot_arena_space() -> Result<StateSpace> {
    let categories = vec![
        StateCategory::new("PosX", 4),
        StateCategory::new("PosY", 4),
        StateCategory::new("Energy", 2),
        StateCategory::new("EnemyDistance", 3),
        StateCategory::new("GunHeated", 2),
    ];
    StateSpace::new(categories, ARENA_NUM_ACTIONS)
}

/**
* -------------------------------------------------------------------------
* TD LEARNER
* -------------------------------------------------------------------------
*/
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LearnerParams {
    /// alpha
    pub learning_rate: f64,
    /// gamma
    pub discount: f64,
    /// epsilon
    pub exploration_rate: f64,
    /// Bootstrap from the greedy action even when exploring
    pub off_policy: bool,
    /// Transitions replayed through the network every tick, 0 disables replay
    pub replay_capacity: usize,
    /// `None` seeds from entropy
    pub rng_seed: Option<u64>,
}

impl Default for LearnerParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            discount: 0.8,
            exploration_rate: 0.5,
            off_policy: true,
            replay_capacity: 4,
            rng_seed: Some(172_848_556_3),
        }
    }
}

/**
* -------------------------------------------------------------------------
* NEURAL NETWORK VALUE FUNCTION
* -------------------------------------------------------------------------
*/
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkParams {
    pub hidden_neurons: Vec<usize>,
    pub activation: Activation,
    pub momentum: f64,
    pub learning_rate: f64,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            hidden_neurons: vec![80],
            activation: Activation::BipolarSigmoid,
            momentum: 0.6,
            learning_rate: 0.01,
        }
    }
}

/**
* -------------------------------------------------------------------------
* POLICY LOOP
* -------------------------------------------------------------------------
*/
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub num_episodes: usize,
    pub episode_stop: usize,
    pub max_steps: usize,
    pub start_epsilon: f64,
    pub final_epsilon: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            num_episodes: 1_000,
            episode_stop: 100,
            max_steps: 200,
            start_epsilon: 0.5,
            final_epsilon: 0.0,
        }
    }
}
