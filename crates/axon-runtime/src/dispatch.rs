//! # Action Dispatcher
//!
//! Resolves which registered actions are valid for the current message,
//! delegates the choice among them to an [`ActionSelector`] (typically
//! model-backed, supplied by the host), and runs the chosen handler. The
//! handler's output stream is forwarded item by item to the caller's sink —
//! zero, one, or many emissions are all valid.
//!
//! A handler failure is reported through the sink as an error-shaped
//! output, never propagated: one bad action must not crash the
//! message-handling cycle.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::{debug, warn};

use axon_core::{
    Action, ActionOutput, AxonError, EventBus, HandlerOptions, Message, RuntimeEvent, State,
};
use axon_config::DeadlineConfig;

use crate::deadline::with_deadline;

/// Phases of one message-handling cycle. Terminal in `Done` or `Failed`;
/// no retries at this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Idle,
    Composing,
    Selecting,
    Executing,
    Done,
    Failed,
}

/// Summary of a finished handling cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// Terminal phase: `Done` or `Failed`.
    pub phase: CyclePhase,
    /// Canonical name of the action that ran, if one was selected.
    pub action: Option<String>,
    /// Number of outputs forwarded to the sink by the action handler.
    pub outputs_emitted: usize,
}

impl CycleReport {
    fn done(action: Option<String>, outputs_emitted: usize) -> Self {
        Self {
            phase: CyclePhase::Done,
            action,
            outputs_emitted,
        }
    }

    fn failed(action: Option<String>, outputs_emitted: usize) -> Self {
        Self {
            phase: CyclePhase::Failed,
            action,
            outputs_emitted,
        }
    }
}

/// A valid action presented to the selection procedure.
#[derive(Debug, Clone, Serialize)]
pub struct ActionCandidate {
    pub name: String,
    pub similes: Vec<String>,
    pub description: String,
}

/// The external decision procedure that picks one action (or none) from the
/// valid candidate set. Model-backed implementations live in host crates;
/// the returned name may be a candidate's canonical name or one of its
/// similes.
#[async_trait]
pub trait ActionSelector: Send + Sync {
    async fn select(
        &self,
        message: &Message,
        state: &State,
        candidates: &[ActionCandidate],
    ) -> axon_core::Result<Option<String>>;
}

/// Picks the first valid candidate. The fallback for hosts that have not
/// wired a model-backed selector.
pub struct FirstValidSelector;

#[async_trait]
impl ActionSelector for FirstValidSelector {
    async fn select(
        &self,
        _message: &Message,
        _state: &State,
        candidates: &[ActionCandidate],
    ) -> axon_core::Result<Option<String>> {
        Ok(candidates.first().map(|c| c.name.clone()))
    }
}

/// Returns pre-configured choices in order — deterministic selection for
/// tests and scripted scenarios.
pub struct ScriptedSelector {
    choices: Mutex<Vec<Option<String>>>,
}

impl ScriptedSelector {
    pub fn new(choices: Vec<Option<&str>>) -> Self {
        Self {
            choices: Mutex::new(
                choices
                    .into_iter()
                    .map(|c| c.map(|s| s.to_string()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl ActionSelector for ScriptedSelector {
    async fn select(
        &self,
        _message: &Message,
        _state: &State,
        _candidates: &[ActionCandidate],
    ) -> axon_core::Result<Option<String>> {
        let mut choices = self.choices.lock().await;
        if choices.is_empty() {
            Ok(None)
        } else {
            Ok(choices.remove(0))
        }
    }
}

fn normalize_action_name(s: &str) -> String {
    s.to_lowercase().replace('_', "")
}

/// Owns the action registry and the execution half of the handling cycle.
pub struct ActionDispatcher {
    /// Registration order doubles as candidate presentation order.
    actions: RwLock<Vec<Arc<dyn Action>>>,
    deadlines: DeadlineConfig,
    events: EventBus,
}

impl ActionDispatcher {
    pub fn new(deadlines: DeadlineConfig, events: EventBus) -> Self {
        Self {
            actions: RwLock::new(Vec::new()),
            deadlines,
            events,
        }
    }

    /// Register an action. Re-registering a name replaces the prior action
    /// (later registration wins). Returns true when a prior registration was
    /// replaced.
    pub async fn register(&self, action: Arc<dyn Action>) -> bool {
        let mut actions = self.actions.write().await;
        let name = action.name().to_string();
        let replaced = if let Some(pos) = actions.iter().position(|a| a.name() == name) {
            actions.remove(pos);
            true
        } else {
            false
        };
        actions.push(action);
        debug!(action = %name, replaced, "action registered");
        replaced
    }

    /// Names of registered actions, in registration order.
    pub async fn action_names(&self) -> Vec<String> {
        self.actions
            .read()
            .await
            .iter()
            .map(|a| a.name().to_string())
            .collect()
    }

    /// Collect the subset of actions whose `validate` passes for this
    /// message.
    pub async fn candidates(&self, message: &Message, state: &State) -> Vec<ActionCandidate> {
        let actions: Vec<Arc<dyn Action>> = self.actions.read().await.clone();
        let mut candidates = Vec::new();
        for action in actions {
            if action.validate(message, Some(state)).await {
                let def = action.definition();
                candidates.push(ActionCandidate {
                    name: def.name.clone(),
                    similes: def.similes.clone(),
                    description: def.description.clone(),
                });
            }
        }
        candidates
    }

    /// Resolve a selected name back to its action: exact canonical-name
    /// match first, then simile fallback. Matching ignores case and
    /// underscores.
    pub async fn resolve(&self, chosen: &str) -> Option<Arc<dyn Action>> {
        let normalized = normalize_action_name(chosen);
        let actions = self.actions.read().await;

        if let Some(action) = actions
            .iter()
            .find(|a| normalize_action_name(a.name()) == normalized)
        {
            return Some(action.clone());
        }

        actions
            .iter()
            .find(|a| {
                a.definition()
                    .similes
                    .iter()
                    .any(|s| normalize_action_name(s) == normalized)
            })
            .cloned()
    }

    /// Run the select + execute half of the cycle, forwarding handler output
    /// to `sink`. Composition has already completed by the time this runs.
    pub async fn dispatch(
        &self,
        selector: &dyn ActionSelector,
        message: &Message,
        state: &State,
        sink: &mpsc::Sender<ActionOutput>,
    ) -> CycleReport {
        // Selecting
        let candidates = self.candidates(message, state).await;
        if candidates.is_empty() {
            debug!("no valid actions for message");
            return CycleReport::done(None, 0);
        }

        let chosen = match selector.select(message, state, &candidates).await {
            Ok(chosen) => chosen,
            Err(e) => {
                warn!(error = %e, "action selection failed");
                let _ = sink.send(ActionOutput::error(e.to_string())).await;
                return CycleReport::failed(None, 0);
            }
        };

        let Some(chosen) = chosen else {
            debug!("selector chose no action");
            return CycleReport::done(None, 0);
        };

        let Some(action) = self.resolve(&chosen).await else {
            let err = AxonError::ActionNotFound(chosen);
            warn!(error = %err, "selected action could not be resolved");
            let _ = sink.send(ActionOutput::error(err.to_string())).await;
            return CycleReport::failed(None, 0);
        };

        // Executing
        let name = action.name().to_string();
        self.events.publish(RuntimeEvent::ActionStarted {
            session_id: message.session_id,
            action: name.clone(),
        });

        let options = HandlerOptions::default();
        let invocation = with_deadline(
            self.deadlines.action_ms,
            action.invoke(message, state, &options),
        )
        .await;

        match invocation {
            Ok(mut stream) => {
                let mut emitted = 0usize;
                while let Some(output) = stream.next().await {
                    if sink.send(output).await.is_err() {
                        warn!(action = %name, "output sink closed, dropping remaining output");
                        break;
                    }
                    emitted += 1;
                }
                self.events.publish(RuntimeEvent::ActionCompleted {
                    session_id: message.session_id,
                    action: name.clone(),
                });
                CycleReport::done(Some(name), emitted)
            }
            Err(e) => {
                warn!(action = %name, error = %e, "action handler failed");
                let emitted = usize::from(sink.send(ActionOutput::error(e.to_string())).await.is_ok());
                self.events.publish(RuntimeEvent::ActionFailed {
                    session_id: message.session_id,
                    action: name.clone(),
                    error: e.to_string(),
                });
                CycleReport::failed(Some(name), emitted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axon_core::{ActionDefinition, OutputStream, outputs};
    use uuid::Uuid;

    struct EchoAction {
        def: ActionDefinition,
        valid: bool,
        fail: bool,
    }

    impl EchoAction {
        fn new(name: &str, similes: &[&str]) -> Self {
            Self {
                def: ActionDefinition {
                    name: name.into(),
                    similes: similes.iter().map(|s| s.to_string()).collect(),
                    description: format!("{name} action"),
                    examples: vec![],
                },
                valid: true,
                fail: false,
            }
        }

        fn invalid(mut self) -> Self {
            self.valid = false;
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }
    }

    #[async_trait]
    impl Action for EchoAction {
        fn definition(&self) -> &ActionDefinition {
            &self.def
        }

        async fn validate(&self, _message: &Message, _state: Option<&State>) -> bool {
            self.valid
        }

        async fn invoke(
            &self,
            message: &Message,
            _state: &State,
            _options: &HandlerOptions,
        ) -> axon_core::Result<OutputStream> {
            if self.fail {
                return Err(AxonError::Action {
                    action: self.def.name.clone(),
                    reason: "handler exploded".into(),
                });
            }
            Ok(outputs(vec![ActionOutput::text(format!(
                "echo: {}",
                message.content
            ))]))
        }
    }

    fn dispatcher() -> ActionDispatcher {
        ActionDispatcher::new(DeadlineConfig::default(), EventBus::default())
    }

    #[tokio::test]
    async fn resolves_exact_name_before_simile() {
        let d = dispatcher();
        d.register(Arc::new(EchoAction::new("REPLY", &["RESPOND"]))).await;
        d.register(Arc::new(EchoAction::new("RESPOND", &[]))).await;

        // "RESPOND" is both a canonical name and a simile of REPLY;
        // the canonical name wins.
        let resolved = d.resolve("RESPOND").await.unwrap();
        assert_eq!(resolved.name(), "RESPOND");

        let via_simile = d.resolve("ANSWER").await;
        assert!(via_simile.is_none());
    }

    #[tokio::test]
    async fn resolve_ignores_case_and_underscores() {
        let d = dispatcher();
        d.register(Arc::new(EchoAction::new("TRANSFER_TOKEN", &[]))).await;
        let resolved = d.resolve("transfertoken").await.unwrap();
        assert_eq!(resolved.name(), "TRANSFER_TOKEN");
    }

    #[tokio::test]
    async fn invalid_actions_are_not_candidates() {
        let d = dispatcher();
        d.register(Arc::new(EchoAction::new("A", &[]))).await;
        d.register(Arc::new(EchoAction::new("B", &[]).invalid())).await;

        let msg = Message::user(Uuid::new_v4(), "hi");
        let candidates = d.candidates(&msg, &State::default()).await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "A");
    }

    #[tokio::test]
    async fn handler_failure_becomes_error_output() {
        let d = dispatcher();
        d.register(Arc::new(EchoAction::new("BOOM", &[]).failing())).await;

        let msg = Message::user(Uuid::new_v4(), "hi");
        let (tx, mut rx) = mpsc::channel(8);
        let report = d
            .dispatch(&FirstValidSelector, &msg, &State::default(), &tx)
            .await;

        assert_eq!(report.phase, CyclePhase::Failed);
        assert_eq!(report.action.as_deref(), Some("BOOM"));
        let out = rx.recv().await.unwrap();
        assert!(out.is_error);
        assert!(out.error.unwrap().contains("handler exploded"));
    }

    #[tokio::test]
    async fn no_candidates_is_a_clean_done() {
        let d = dispatcher();
        let msg = Message::user(Uuid::new_v4(), "hi");
        let (tx, mut rx) = mpsc::channel(8);
        let report = d
            .dispatch(&FirstValidSelector, &msg, &State::default(), &tx)
            .await;
        assert_eq!(report.phase, CyclePhase::Done);
        assert!(report.action.is_none());
        drop(tx);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn scripted_selector_returns_choices_in_order() {
        let selector = ScriptedSelector::new(vec![Some("A"), None]);
        let msg = Message::user(Uuid::new_v4(), "hi");
        let state = State::default();
        assert_eq!(
            selector.select(&msg, &state, &[]).await.unwrap().as_deref(),
            Some("A")
        );
        assert_eq!(selector.select(&msg, &state, &[]).await.unwrap(), None);
        assert_eq!(selector.select(&msg, &state, &[]).await.unwrap(), None);
    }
}
