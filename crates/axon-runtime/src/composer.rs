//! # State Composer
//!
//! Aggregates registered providers into one immutable [`State`] snapshot per
//! message-handling cycle. Providers run concurrently; their outputs merge
//! in registration order (last-registered wins on value collisions, text
//! sections joined with a blank line). A failing provider is logged and its
//! contribution omitted — one bad provider never aborts composition.
//!
//! Providers are split into static and dynamic: [`update_recent_state`]
//! re-runs only the dynamic ones and reuses the prior snapshot's static
//! outputs, so expensive static sources (bio, lore) are computed once per
//! conversation context instead of once per turn.
//!
//! [`update_recent_state`]: StateComposer::update_recent_state

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use axon_core::{Message, NamedOutput, Provider, State};
use axon_config::DeadlineConfig;

use crate::deadline::with_deadline;

/// Builds [`State`] snapshots from the registered provider set.
pub struct StateComposer {
    /// Registration order is load-bearing: it drives both value-merge
    /// precedence and text-section ordering.
    providers: RwLock<Vec<Arc<dyn Provider>>>,
    deadlines: DeadlineConfig,
}

impl StateComposer {
    pub fn new(deadlines: DeadlineConfig) -> Self {
        Self {
            providers: RwLock::new(Vec::new()),
            deadlines,
        }
    }

    /// Register a provider.
    ///
    /// Re-registering a name replaces the prior provider and moves it to the
    /// end of the order (the later registration wins both the slot and the
    /// merge precedence). Returns true when a prior registration was replaced.
    pub async fn register(&self, provider: Arc<dyn Provider>) -> bool {
        let mut providers = self.providers.write().await;
        let name = provider.name().to_string();
        let replaced = if let Some(pos) = providers.iter().position(|p| p.name() == name) {
            providers.remove(pos);
            true
        } else {
            false
        };
        providers.push(provider);
        debug!(provider = %name, replaced, "provider registered");
        replaced
    }

    /// Names of registered providers, in registration order.
    pub async fn provider_names(&self) -> Vec<String> {
        self.providers
            .read()
            .await
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Compose a fresh snapshot by running every registered provider
    /// concurrently. `filter`, when given, restricts composition to the
    /// named providers.
    pub async fn compose_state(&self, message: &Message, filter: Option<&[String]>) -> State {
        let providers: Vec<Arc<dyn Provider>> = self
            .providers
            .read()
            .await
            .iter()
            .filter(|p| match filter {
                Some(names) => names.iter().any(|n| n == p.name()),
                None => true,
            })
            .cloned()
            .collect();

        let outputs = join_all(
            providers
                .iter()
                .map(|p| self.run_provider(p.clone(), message, None)),
        )
        .await;

        State::from_outputs(outputs.into_iter().flatten().collect())
    }

    /// Incrementally refresh a prior snapshot: re-run only dynamic providers
    /// (and any provider with no cached output), reuse the rest.
    pub async fn update_recent_state(&self, message: &Message, prior: &State) -> State {
        let providers: Vec<Arc<dyn Provider>> = self.providers.read().await.clone();

        let cached: HashMap<&str, &NamedOutput> = prior
            .outputs()
            .iter()
            .map(|o| (o.provider.as_str(), o))
            .collect();

        // One slot per provider, in registration order. Static providers with
        // a cached output keep it; everything else re-runs.
        let mut slots: Vec<Option<NamedOutput>> = Vec::with_capacity(providers.len());
        let mut pending: Vec<(usize, Arc<dyn Provider>)> = Vec::new();
        for (index, provider) in providers.iter().enumerate() {
            match cached.get(provider.name()) {
                Some(output) if !provider.dynamic() => slots.push(Some((*output).clone())),
                _ => {
                    slots.push(None);
                    pending.push((index, provider.clone()));
                }
            }
        }

        let results = join_all(
            pending
                .iter()
                .map(|(_, p)| self.run_provider(p.clone(), message, Some(prior))),
        )
        .await;

        for ((index, _), result) in pending.into_iter().zip(results) {
            slots[index] = result;
        }

        State::from_outputs(slots.into_iter().flatten().collect())
    }

    async fn run_provider(
        &self,
        provider: Arc<dyn Provider>,
        message: &Message,
        prior: Option<&State>,
    ) -> Option<NamedOutput> {
        match with_deadline(self.deadlines.provider_ms, provider.get(message, prior)).await {
            Ok(output) => Some(NamedOutput {
                provider: provider.name().to_string(),
                dynamic: provider.dynamic(),
                output,
            }),
            Err(e) => {
                warn!(provider = %provider.name(), error = %e, "provider failed, omitting contribution");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axon_core::{AxonError, ProviderOutput};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    struct FixedProvider {
        name: String,
        dynamic: bool,
        text: String,
        calls: Arc<AtomicUsize>,
    }

    impl FixedProvider {
        fn new(name: &str, dynamic: bool, text: &str) -> (Arc<Self>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Arc::new(Self {
                    name: name.into(),
                    dynamic,
                    text: text.into(),
                    calls: calls.clone(),
                }),
                calls,
            )
        }
    }

    #[async_trait]
    impl Provider for FixedProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn dynamic(&self) -> bool {
            self.dynamic
        }

        async fn get(
            &self,
            _message: &Message,
            _prior: Option<&State>,
        ) -> axon_core::Result<ProviderOutput> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(ProviderOutput::text(format!("{} #{n}", self.text)))
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl Provider for FailingProvider {
        fn name(&self) -> &str {
            "broken"
        }

        async fn get(
            &self,
            _message: &Message,
            _prior: Option<&State>,
        ) -> axon_core::Result<ProviderOutput> {
            Err(AxonError::Provider {
                provider: "broken".into(),
                reason: "upstream down".into(),
            })
        }
    }

    #[tokio::test]
    async fn failing_provider_is_omitted() {
        let composer = StateComposer::new(DeadlineConfig::default());
        let (bio, _) = FixedProvider::new("bio", false, "Hello");
        composer.register(bio).await;
        composer.register(Arc::new(FailingProvider)).await;

        let msg = Message::user(Uuid::new_v4(), "hi");
        let state = composer.compose_state(&msg, None).await;
        assert_eq!(state.outputs().len(), 1);
        assert_eq!(state.text(), "Hello #1");
    }

    #[tokio::test]
    async fn update_reruns_only_dynamic_providers() {
        let composer = StateComposer::new(DeadlineConfig::default());
        let (bio, bio_calls) = FixedProvider::new("bio", false, "Hello");
        let (recent, recent_calls) = FixedProvider::new("recent", true, "msg");
        composer.register(bio).await;
        composer.register(recent).await;

        let msg = Message::user(Uuid::new_v4(), "hi");
        let first = composer.compose_state(&msg, None).await;
        assert_eq!(first.text(), "Hello #1\n\nmsg #1");

        let second = composer.update_recent_state(&msg, &first).await;
        assert_eq!(second.text(), "Hello #1\n\nmsg #2");
        assert_eq!(bio_calls.load(Ordering::SeqCst), 1);
        assert_eq!(recent_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn filter_restricts_composition() {
        let composer = StateComposer::new(DeadlineConfig::default());
        let (bio, _) = FixedProvider::new("bio", false, "Hello");
        let (recent, _) = FixedProvider::new("recent", true, "msg");
        composer.register(bio).await;
        composer.register(recent).await;

        let msg = Message::user(Uuid::new_v4(), "hi");
        let state = composer
            .compose_state(&msg, Some(&["recent".to_string()]))
            .await;
        assert_eq!(state.outputs().len(), 1);
        assert_eq!(state.text(), "msg #1");
    }

    #[tokio::test]
    async fn reregistering_replaces_and_moves_to_end() {
        let composer = StateComposer::new(DeadlineConfig::default());
        let (a, _) = FixedProvider::new("dup", false, "first");
        let (b, _) = FixedProvider::new("dup", false, "second");
        let (other, _) = FixedProvider::new("other", false, "mid");
        composer.register(a).await;
        composer.register(other).await;
        let replaced = composer.register(b).await;
        assert!(replaced);
        assert_eq!(composer.provider_names().await, vec!["other", "dup"]);
    }
}
