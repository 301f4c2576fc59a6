use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

/// A long-lived singleton capability (wallet client, chain connector, ...).
///
/// At most one live instance per `service_type` per runtime; the Service
/// Registry owns the instance exclusively and stops it at shutdown. Any
/// stateful resource shared between actions and providers is expected to
/// live inside exactly one service; async-safety of that state is the
/// service implementation's own responsibility.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Unique type tag this service registers under.
    fn service_type(&self) -> &str;

    /// What this service can do, for diagnostics and capability listings.
    fn capability_description(&self) -> &str;

    /// Support downcasting to the concrete service type.
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Release resources. May perform network or filesystem I/O; treated
    /// as an opaque async operation by the registry.
    async fn stop(&self) -> crate::Result<()>;
}
