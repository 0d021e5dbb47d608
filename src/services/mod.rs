pub mod algo_helper;
pub mod envs;
pub mod exports;
