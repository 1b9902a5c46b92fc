mod common;
mod features;

pub mod app;
pub mod config;
pub mod data_model;
pub mod log_sink;
pub mod metrics;
pub mod notify;
pub mod probe;
pub mod probe_engine;
pub mod runtime;
pub mod settings;
pub mod storage;
pub mod telemetry;

#[cfg(test)]
mod test_support;
