//! # axon-core
//!
//! Core types, traits, and primitives for the Axon agent runtime.
//! This crate defines the shared vocabulary used by every other crate in the
//! workspace: the plugin-facing contracts (actions, providers, evaluators,
//! services, task workers) and the data they exchange.

pub mod action;
pub mod error;
pub mod event;
pub mod evaluator;
pub mod message;
pub mod provider;
pub mod service;
pub mod state;
pub mod task;

pub use action::{
    Action, ActionDefinition, ActionOutput, ExampleMessage, HandlerOptions, OutputStream, outputs,
};
pub use error::{AxonError, Result};
pub use evaluator::Evaluator;
pub use event::{EventBus, RuntimeEvent};
pub use message::{Message, Role};
pub use provider::Provider;
pub use service::Service;
pub use state::{NamedOutput, ProviderOutput, State};
pub use task::{Task, TaskMetadata, TaskWorker};
