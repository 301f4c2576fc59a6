use async_trait::async_trait;

use crate::message::Message;
use crate::state::{ProviderOutput, State};

/// A named, read-only context source invoked by the State Composer.
///
/// Implementations that need runtime access (service lookups, task queries)
/// capture a handle at construction time rather than receiving one per call.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    /// Dynamic providers are re-run on every incremental refresh; static
    /// provider output is cached for the lifetime of the snapshot chain.
    fn dynamic(&self) -> bool {
        false
    }

    /// Produce this provider's contribution for the given message. `prior`
    /// is the previous snapshot when refreshing, `None` on first composition.
    async fn get(&self, message: &Message, prior: Option<&State>) -> crate::Result<ProviderOutput>;
}
