pub mod config;
pub mod engine;
pub mod math;
pub mod renderer;
pub mod world;
