use async_trait::async_trait;

use crate::action::ActionOutput;
use crate::message::Message;
use crate::state::State;

/// A post-dispatch hook that inspects the finished handling cycle.
///
/// Evaluators run after action dispatch, under the same failure containment:
/// one throwing evaluator never aborts the cycle or its siblings.
#[async_trait]
pub trait Evaluator: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this evaluator applies to the message.
    async fn validate(&self, message: &Message, state: Option<&State>) -> bool;

    /// Run the evaluator. May produce an output for the caller's sink
    /// (e.g. a reflection note) or nothing at all.
    async fn evaluate(
        &self,
        message: &Message,
        state: &State,
    ) -> crate::Result<Option<ActionOutput>>;
}
