//! # Plugin Loader
//!
//! A plugin is a deployable bundle of actions, providers, evaluators, and
//! service factories plus an optional `init` hook. Plugins declare
//! `dependencies` on other plugins; the loader orders the batch
//! topologically before anything is merged, so a plugin's `init` can assume
//! its dependencies' services are already registered.
//!
//! A missing dependency is fatal ([`AxonError::MissingDependency`]); a name
//! collision between two plugins' components is not — the later-loaded
//! plugin wins, with a warning.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use axon_core::{Action, AxonError, Evaluator, Provider, Result};
use axon_config::AxonConfig;

use crate::runtime::AgentRuntime;
use crate::services::ServiceFactory;

/// The boxed `init(config, runtime)` hook. Called at most once per plugin
/// per runtime lifetime, in dependency order.
pub type InitHook =
    Box<dyn Fn(Arc<AxonConfig>, Arc<AgentRuntime>) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// A bundle of capabilities registered with the runtime in one load step.
pub struct Plugin {
    pub name: String,
    pub description: String,
    /// Names of plugins that must load (and init) before this one.
    pub dependencies: Vec<String>,
    /// Tie-breaker among plugins with no dependency relation; higher loads
    /// first.
    pub priority: i32,
    pub actions: Vec<Arc<dyn Action>>,
    pub providers: Vec<Arc<dyn Provider>>,
    pub evaluators: Vec<Arc<dyn Evaluator>>,
    pub services: Vec<Arc<dyn ServiceFactory>>,
    pub init: Option<InitHook>,
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("dependencies", &self.dependencies)
            .field("priority", &self.priority)
            .field("actions", &self.actions.len())
            .field("providers", &self.providers.len())
            .field("evaluators", &self.evaluators.len())
            .field("services", &self.services.len())
            .field("init", &self.init.is_some())
            .finish()
    }
}

impl Plugin {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            dependencies: vec![],
            priority: 0,
            actions: vec![],
            providers: vec![],
            evaluators: vec![],
            services: vec![],
            init: None,
        }
    }

    pub fn with_dependency(mut self, name: &str) -> Self {
        self.dependencies.push(name.to_string());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_action(mut self, action: Arc<dyn Action>) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluators.push(evaluator);
        self
    }

    pub fn with_service(mut self, factory: Arc<dyn ServiceFactory>) -> Self {
        self.services.push(factory);
        self
    }

    pub fn with_init<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<AxonConfig>, Arc<AgentRuntime>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.init = Some(Box::new(move |config, runtime| {
            Box::pin(hook(config, runtime))
        }));
        self
    }
}

/// Order a batch of plugins so every plugin comes after its dependencies.
///
/// Dependencies already present in `loaded` count as satisfied. Among
/// plugins whose dependencies are all met, higher `priority` loads first,
/// then name order — making the load order deterministic.
pub(crate) fn topological_order(
    plugins: Vec<Plugin>,
    loaded: &HashSet<String>,
) -> Result<Vec<Plugin>> {
    let batch_names: HashSet<String> = plugins.iter().map(|p| p.name.clone()).collect();

    for plugin in &plugins {
        for dep in &plugin.dependencies {
            if !batch_names.contains(dep) && !loaded.contains(dep) {
                return Err(AxonError::MissingDependency {
                    plugin: plugin.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    let mut satisfied: HashSet<String> = loaded.clone();
    let mut remaining = plugins;
    let mut ordered = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let mut ready: Vec<usize> = remaining
            .iter()
            .enumerate()
            .filter(|(_, p)| p.dependencies.iter().all(|d| satisfied.contains(d)))
            .map(|(i, _)| i)
            .collect();

        if ready.is_empty() {
            let stuck = remaining
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(AxonError::DependencyCycle(stuck));
        }

        ready.sort_by(|&a, &b| {
            remaining[b]
                .priority
                .cmp(&remaining[a].priority)
                .then_with(|| remaining[a].name.cmp(&remaining[b].name))
        });

        let plugin = remaining.remove(ready[0]);
        satisfied.insert(plugin.name.clone());
        ordered.push(plugin);
    }

    Ok(ordered)
}
