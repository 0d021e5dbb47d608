//! Temporal-difference value learning over categorical state spaces.
//!
//! A [`ValueLearner`] is bound to one value representation: a dense
//! [`LookupTable`] or a [`NeuralValueFunction`] backed by a small perceptron
//! with recency replay.

pub mod algorithms;
pub mod config;
pub mod environments;
pub mod error;
pub mod gui;
pub mod services;

pub use algorithms::model_free::q_learning::learner::{NeuralLearner, TabularLearner, TdPolicy, ValueFunction, ValueLearner};
pub use algorithms::model_free::q_learning::lookup_table::LookupTable;
pub use algorithms::model_free::q_learning::neural_q::NeuralValueFunction;
pub use environments::env::{Action, CategoricalEnv, State, StateCategory, StateSpace};
pub use error::{LearnError, Result};
