//! The service registry — one canonical instance per declared service type.
//!
//! Any stateful shared resource (wallet client, connection pool) lives
//! inside exactly one [`Service`] instance, reached through typed lookup.
//! Duplicate registration is a programmer error and fails loudly; a missing
//! service is `None`, never an error.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{error, info};

use axon_core::{AxonError, EventBus, Result, RuntimeEvent, Service};

use crate::runtime::AgentRuntime;

/// Builds a service instance against a live runtime. Plugins declare these;
/// the runtime invokes `start` during plugin loading, then hands the
/// instance to the registry.
#[async_trait]
pub trait ServiceFactory: Send + Sync {
    /// The type tag the started service will register under.
    fn service_type(&self) -> &str;

    /// Start the service. May perform network or filesystem I/O.
    async fn start(&self, runtime: Arc<AgentRuntime>) -> Result<Arc<dyn Service>>;
}

#[derive(Default)]
struct Inner {
    by_type: HashMap<String, Arc<dyn Service>>,
    /// Registration order, for reverse-order shutdown.
    order: Vec<String>,
}

/// Owns every live service instance for one runtime.
pub struct ServiceRegistry {
    inner: RwLock<Inner>,
    events: EventBus,
}

impl ServiceRegistry {
    pub fn new(events: EventBus) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            events,
        }
    }

    /// Register a started service instance.
    ///
    /// Fails with [`AxonError::DuplicateService`] if the type tag is already
    /// live — explicit duplicate registration is a programmer error, not
    /// silently ignored.
    pub async fn register(&self, service: Arc<dyn Service>) -> Result<()> {
        let service_type = service.service_type().to_string();
        let mut inner = self.inner.write().await;
        if inner.by_type.contains_key(&service_type) {
            return Err(AxonError::DuplicateService(service_type));
        }
        info!(service = %service_type, "service registered");
        inner.by_type.insert(service_type.clone(), service);
        inner.order.push(service_type.clone());
        self.events
            .publish(RuntimeEvent::ServiceStarted { service_type });
        Ok(())
    }

    /// Look up a service by type tag. Callers must handle `None`.
    pub async fn get(&self, service_type: &str) -> Option<Arc<dyn Service>> {
        self.inner.read().await.by_type.get(service_type).cloned()
    }

    /// Typed lookup: downcast the instance to its concrete type.
    pub async fn get_typed<T: Service>(&self, service_type: &str) -> Option<Arc<T>> {
        let service = self.get(service_type).await?;
        service.as_any_arc().downcast::<T>().ok()
    }

    /// List `(service_type, capability_description)` for every live service,
    /// in registration order.
    pub async fn list(&self) -> Vec<(String, String)> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|ty| {
                inner
                    .by_type
                    .get(ty)
                    .map(|s| (ty.clone(), s.capability_description().to_string()))
            })
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.by_type.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.by_type.is_empty()
    }

    /// Stop every service in reverse registration order.
    ///
    /// Best-effort: an individual stop failure is logged and shutdown
    /// continues with the remaining services.
    pub async fn stop_all(&self) {
        let drained: Vec<(String, Arc<dyn Service>)> = {
            let mut inner = self.inner.write().await;
            let order = std::mem::take(&mut inner.order);
            order
                .into_iter()
                .rev()
                .filter_map(|ty| inner.by_type.remove(&ty).map(|s| (ty, s)))
                .collect()
        };

        for (service_type, service) in drained {
            if let Err(e) = service.stop().await {
                error!(service = %service_type, error = %e, "service stop failed, continuing shutdown");
            } else {
                info!(service = %service_type, "service stopped");
            }
            self.events
                .publish(RuntimeEvent::ServiceStopped { service_type });
        }
    }
}
