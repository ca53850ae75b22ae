pub mod config;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod output;
pub mod payload;
pub mod rate;
pub mod reporter;
pub mod roles;
pub mod sink;
pub mod wire;
