//! # axon-config
//!
//! Configuration system for the Axon runtime. Reads from `axon.toml` and
//! environment variables — in that precedence order — and exposes an opt-in
//! tracing initialization helper for hosts and tests.

pub mod loader;
pub mod schema;
pub mod telemetry;

pub use loader::ConfigLoader;
pub use schema::{AgentConfig, AxonConfig, DeadlineConfig, LoggingConfig, SchedulerConfig};
pub use telemetry::init_tracing;
