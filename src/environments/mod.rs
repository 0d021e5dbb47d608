pub mod env;
pub mod grid_world;
