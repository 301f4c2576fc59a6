//! # axon-runtime
//!
//! The agent runtime kernel — the component that owns service lifecycle,
//! task scheduling, state composition, and the action/evaluator/provider
//! plugin contract.
//!
//! ## Architecture
//!
//! ```text
//!                ┌──────────────┐
//!                │ Inbound msg  │
//!                └──────┬───────┘
//!                       ▼
//!               ┌───────────────┐
//!               │ State Composer│  ← providers (bio, recent messages, ...)
//!               └───────┬───────┘
//!                       ▼
//!               ┌───────────────┐
//!               │   Dispatcher  │  ← validate → select → execute → evaluate
//!               └───────┬───────┘
//!                       │
//!            ┌──────────┼──────────┐
//!            ▼          ▼          ▼
//!      ┌──────────┐ ┌────────┐ ┌─────────┐
//!      │ Services │ │ Tasks  │ │ Plugins │
//!      │ Registry │ │ Sched. │ │ Loader  │
//!      └──────────┘ └────────┘ └─────────┘
//! ```
//!
//! The Task Scheduler runs independently on its own cadence; everything
//! else is driven per message-handling cycle. All registries are scoped to
//! one [`AgentRuntime`] instance so multiple agents can share a process
//! without cross-talk.

pub mod composer;
pub(crate) mod deadline;
pub mod dispatch;
pub mod plugins;
pub mod runtime;
pub mod scheduler;
pub mod services;

pub use composer::StateComposer;
pub use dispatch::{
    ActionCandidate, ActionDispatcher, ActionSelector, CyclePhase, CycleReport,
    FirstValidSelector, ScriptedSelector,
};
pub use plugins::Plugin;
pub use runtime::{AgentRuntime, PluginRecord};
pub use scheduler::TaskScheduler;
pub use services::{ServiceFactory, ServiceRegistry};
