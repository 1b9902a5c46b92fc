pub mod engine;
pub mod executor;
