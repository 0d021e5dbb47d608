pub mod learner;
pub mod lookup_table;
pub mod neural_q;
pub mod replay_buffer;
