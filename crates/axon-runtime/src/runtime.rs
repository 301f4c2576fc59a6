//! The per-agent runtime object.
//!
//! One [`AgentRuntime`] coordinates services, tasks, state, and actions for
//! a single agent. Every registry it owns is instance-scoped — never a
//! process-wide static — so multiple agents can run in one process without
//! cross-talk.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::{info, warn};
use uuid::Uuid;

use axon_core::{
    ActionOutput, Evaluator, EventBus, Message, Result, RuntimeEvent, Service, State, Task,
    TaskWorker,
};
use axon_config::AxonConfig;

use crate::composer::StateComposer;
use crate::dispatch::{ActionDispatcher, ActionSelector, CyclePhase, CycleReport, FirstValidSelector};
use crate::plugins::{Plugin, topological_order};
use crate::scheduler::TaskScheduler;
use crate::services::{ServiceFactory, ServiceRegistry};

/// Bookkeeping for a loaded plugin.
#[derive(Debug, Clone)]
pub struct PluginRecord {
    pub name: String,
    pub description: String,
}

/// The single per-agent object coordinating services, tasks, state, and
/// actions.
pub struct AgentRuntime {
    agent_id: Uuid,
    config: Arc<AxonConfig>,
    events: EventBus,
    services: ServiceRegistry,
    scheduler: Arc<TaskScheduler>,
    composer: StateComposer,
    dispatcher: ActionDispatcher,
    evaluators: RwLock<Vec<Arc<dyn Evaluator>>>,
    selector: RwLock<Arc<dyn ActionSelector>>,
    settings: RwLock<HashMap<String, String>>,
    plugins: RwLock<Vec<PluginRecord>>,
    initialized_plugins: RwLock<HashSet<String>>,
}

impl AgentRuntime {
    /// Build a runtime from configuration. The settings map is seeded from
    /// `[settings]` in `axon.toml`; the scheduler is created but not yet
    /// running — see [`AgentRuntime::spawn_scheduler`].
    pub fn new(config: AxonConfig) -> Arc<Self> {
        let config = Arc::new(config);
        let events = EventBus::default();
        let scheduler = Arc::new(TaskScheduler::new(
            &config.scheduler,
            config.deadlines,
            events.clone(),
        ));
        let settings: HashMap<String, String> = config
            .settings
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let agent_id = Uuid::new_v4();
        info!(agent_id = %agent_id, agent = %config.agent.name, "creating agent runtime");

        Arc::new(Self {
            agent_id,
            events: events.clone(),
            services: ServiceRegistry::new(events.clone()),
            scheduler,
            composer: StateComposer::new(config.deadlines),
            dispatcher: ActionDispatcher::new(config.deadlines, events),
            evaluators: RwLock::new(Vec::new()),
            selector: RwLock::new(Arc::new(FirstValidSelector)),
            settings: RwLock::new(settings),
            plugins: RwLock::new(Vec::new()),
            initialized_plugins: RwLock::new(HashSet::new()),
            config,
        })
    }

    pub fn agent_id(&self) -> Uuid {
        self.agent_id
    }

    pub fn agent_name(&self) -> &str {
        &self.config.agent.name
    }

    pub fn config(&self) -> &AxonConfig {
        &self.config
    }

    /// The runtime's event bus; subscribe for lifecycle events.
    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    // ── Plugin loading ─────────────────────────────────────────

    /// Load a batch of plugins in dependency order.
    ///
    /// Fatal errors (missing dependency, dependency cycle, duplicate service
    /// type, failed `init`) abort loading — better to fail fast at startup
    /// than run with an ambiguous registry. Component name collisions are
    /// not fatal: the later-loaded plugin wins, with a warning.
    pub async fn load_plugins(self: &Arc<Self>, plugins: Vec<Plugin>) -> Result<()> {
        let loaded: HashSet<String> = self
            .plugins
            .read()
            .await
            .iter()
            .map(|r| r.name.clone())
            .collect();
        let ordered = topological_order(plugins, &loaded)?;
        for plugin in ordered {
            self.load_ordered(plugin).await?;
        }
        Ok(())
    }

    /// Load a single plugin. Its dependencies must already be loaded.
    pub async fn load_plugin(self: &Arc<Self>, plugin: Plugin) -> Result<()> {
        self.load_plugins(vec![plugin]).await
    }

    /// Names of loaded plugins, in load order.
    pub async fn plugin_records(&self) -> Vec<PluginRecord> {
        self.plugins.read().await.clone()
    }

    async fn load_ordered(self: &Arc<Self>, plugin: Plugin) -> Result<()> {
        info!(plugin = %plugin.name, "loading plugin");

        for action in &plugin.actions {
            let name = action.name().to_string();
            if self.dispatcher.register(action.clone()).await {
                warn!(plugin = %plugin.name, action = %name, "action name collision, later registration wins");
            }
        }
        for provider in &plugin.providers {
            let name = provider.name().to_string();
            if self.composer.register(provider.clone()).await {
                warn!(plugin = %plugin.name, provider = %name, "provider name collision, later registration wins");
            }
        }
        for evaluator in &plugin.evaluators {
            let name = evaluator.name().to_string();
            if self.register_evaluator(evaluator.clone()).await {
                warn!(plugin = %plugin.name, evaluator = %name, "evaluator name collision, later registration wins");
            }
        }

        // Services start before init so dependent plugins (loaded later)
        // and this plugin's own init can look them up.
        for factory in &plugin.services {
            self.start_service(factory.as_ref()).await?;
        }

        if let Some(init) = &plugin.init {
            let already = self
                .initialized_plugins
                .read()
                .await
                .contains(&plugin.name);
            if !already {
                init(self.config.clone(), Arc::clone(self)).await.map_err(|e| {
                    axon_core::AxonError::Plugin {
                        plugin: plugin.name.clone(),
                        reason: format!("init failed: {e}"),
                    }
                })?;
                self.initialized_plugins
                    .write()
                    .await
                    .insert(plugin.name.clone());
            }
        }

        self.events.publish(RuntimeEvent::PluginLoaded {
            plugin: plugin.name.clone(),
        });
        self.plugins.write().await.push(PluginRecord {
            name: plugin.name,
            description: plugin.description,
        });
        Ok(())
    }

    // ── Services ───────────────────────────────────────────────

    /// Start a service through its factory and register the instance.
    pub async fn start_service(self: &Arc<Self>, factory: &dyn ServiceFactory) -> Result<()> {
        let service = factory.start(Arc::clone(self)).await?;
        self.services.register(service).await
    }

    /// Look up a service by type tag. `None` when absent — callers must
    /// null-check; this never errors.
    pub async fn get_service(&self, service_type: &str) -> Option<Arc<dyn Service>> {
        self.services.get(service_type).await
    }

    /// Typed service lookup.
    pub async fn get_service_typed<T: Service>(&self, service_type: &str) -> Option<Arc<T>> {
        self.services.get_typed::<T>(service_type).await
    }

    pub fn service_registry(&self) -> &ServiceRegistry {
        &self.services
    }

    // ── Tasks ──────────────────────────────────────────────────

    pub async fn create_task(&self, task: Task) -> Uuid {
        self.scheduler.create_task(task).await
    }

    pub async fn get_task(&self, task_id: Uuid) -> Option<Task> {
        self.scheduler.get_task(task_id).await
    }

    pub async fn get_tasks(&self, tags: &[String]) -> Vec<Task> {
        self.scheduler.get_tasks(tags).await
    }

    pub async fn delete_task(&self, task_id: Uuid) -> bool {
        self.scheduler.delete_task(task_id).await
    }

    pub async fn register_task_worker(&self, worker: Arc<dyn TaskWorker>) {
        self.scheduler.register_worker(worker).await
    }

    pub fn scheduler(&self) -> Arc<TaskScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Spawn the scheduler loop on its own tokio task.
    pub fn spawn_scheduler(&self) -> tokio::task::JoinHandle<()> {
        let scheduler = Arc::clone(&self.scheduler);
        tokio::spawn(scheduler.run())
    }

    // ── State & dispatch ───────────────────────────────────────

    /// Register a provider outside of plugin loading.
    pub async fn register_provider(&self, provider: Arc<dyn axon_core::Provider>) {
        self.composer.register(provider).await;
    }

    /// Register an action outside of plugin loading.
    pub async fn register_action(&self, action: Arc<dyn axon_core::Action>) {
        self.dispatcher.register(action).await;
    }

    /// Register an evaluator. Returns true when a prior registration with
    /// the same name was replaced.
    pub async fn register_evaluator(&self, evaluator: Arc<dyn Evaluator>) -> bool {
        let mut evaluators = self.evaluators.write().await;
        let name = evaluator.name().to_string();
        let replaced = if let Some(pos) = evaluators.iter().position(|e| e.name() == name) {
            evaluators.remove(pos);
            true
        } else {
            false
        };
        evaluators.push(evaluator);
        replaced
    }

    /// Replace the action selection procedure (e.g. with a model-backed
    /// implementation supplied by the host).
    pub async fn set_selector(&self, selector: Arc<dyn ActionSelector>) {
        *self.selector.write().await = selector;
    }

    /// Compose a fresh state snapshot for a message.
    pub async fn compose_state(&self, message: &Message, filter: Option<&[String]>) -> State {
        self.composer.compose_state(message, filter).await
    }

    /// Narrow refresh: re-run only dynamic providers against a prior
    /// snapshot.
    pub async fn update_recent_state(&self, message: &Message, prior: &State) -> State {
        self.composer.update_recent_state(message, prior).await
    }

    pub fn composer(&self) -> &StateComposer {
        &self.composer
    }

    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    /// Run one full message-handling cycle: compose state, select and
    /// execute an action, then run evaluators. Handler output (and any
    /// error-shaped payload) arrives on `sink`; the report carries the
    /// terminal phase.
    ///
    /// State composition fully completes before dispatch begins. Concurrent
    /// calls for the same session are not serialized here — that is the
    /// persistence layer's responsibility.
    pub async fn handle_message(
        &self,
        message: &Message,
        sink: &mpsc::Sender<ActionOutput>,
    ) -> CycleReport {
        self.events.publish(RuntimeEvent::CycleStarted {
            session_id: message.session_id,
            message_id: message.id,
        });

        // Composing
        let state = self.composer.compose_state(message, None).await;

        // Selecting → Executing
        let selector = self.selector.read().await.clone();
        let report = self
            .dispatcher
            .dispatch(selector.as_ref(), message, &state, sink)
            .await;

        // Evaluators run regardless of the action outcome, each contained.
        let evaluators: Vec<Arc<dyn Evaluator>> = self.evaluators.read().await.clone();
        for evaluator in evaluators {
            if !evaluator.validate(message, Some(&state)).await {
                continue;
            }
            match evaluator.evaluate(message, &state).await {
                Ok(Some(output)) => {
                    let _ = sink.send(output).await;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(evaluator = %evaluator.name(), error = %e, "evaluator failed");
                }
            }
        }

        self.events.publish(RuntimeEvent::CycleFinished {
            session_id: message.session_id,
            message_id: message.id,
            failed: report.phase == CyclePhase::Failed,
        });
        report
    }

    // ── Settings ───────────────────────────────────────────────

    /// Read a setting. Seeded from config, overridable at runtime.
    pub async fn get_setting(&self, key: &str) -> Option<String> {
        self.settings.read().await.get(key).cloned()
    }

    /// Set or override a setting.
    pub async fn set_setting(&self, key: &str, value: impl Into<String>) {
        self.settings.write().await.insert(key.to_string(), value.into());
    }

    // ── Shutdown ───────────────────────────────────────────────

    /// Stop the runtime: signal the scheduler loop, then stop services in
    /// reverse registration order (best-effort).
    pub async fn stop(&self) {
        info!(agent = %self.config.agent.name, "stopping agent runtime");
        self.scheduler.stop();
        self.services.stop_all().await;
        self.events.publish(RuntimeEvent::Shutdown);
    }
}
