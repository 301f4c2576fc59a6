use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;

use crate::message::Message;
use crate::state::State;

/// Describes an action: how it is named, matched, and presented to the
/// selection procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDefinition {
    /// Canonical name, e.g. "REPLY", "TRANSFER_TOKEN".
    pub name: String,
    /// Alternate names the selection procedure may pick instead.
    #[serde(default)]
    pub similes: Vec<String>,
    /// Human-readable description for the selection procedure.
    pub description: String,
    /// Example conversations used to seed few-shot selection.
    #[serde(default)]
    pub examples: Vec<Vec<ExampleMessage>>,
}

/// One turn of an example conversation attached to an action definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleMessage {
    pub speaker: String,
    pub text: String,
    /// The action this turn demonstrates, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// A single emission from an action handler.
///
/// Handlers may emit zero, one, or many of these per invocation; the
/// dispatcher forwards each to the caller's output sink as it arrives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutput {
    pub text: String,
    #[serde(default)]
    pub is_error: bool,
    /// Structured error detail when `is_error` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Optional structured payload alongside the text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ActionOutput {
    /// A plain text emission.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
            error: None,
            data: None,
        }
    }

    /// An error-shaped emission: user-facing text plus the structured detail.
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            text: format!("Something went wrong: {message}"),
            is_error: true,
            error: Some(message),
            data: None,
        }
    }

    /// Attach a structured payload.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// The lazy sequence of outputs produced by an action handler.
pub type OutputStream = Pin<Box<dyn Stream<Item = ActionOutput> + Send>>;

/// Options passed through to an action handler by the dispatcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandlerOptions {
    /// Per-invocation parameters chosen by the selection procedure.
    #[serde(default)]
    pub parameters: serde_json::Map<String, Value>,
}

/// A selectable capability. Registered once per plugin; stateless across
/// invocations except through services the implementation holds on to.
#[async_trait]
pub trait Action: Send + Sync {
    fn definition(&self) -> &ActionDefinition;

    fn name(&self) -> &str {
        &self.definition().name
    }

    /// Whether this action is applicable to the message at all. A `false`
    /// here removes the action from the selection candidate set.
    async fn validate(&self, message: &Message, state: Option<&State>) -> bool;

    /// Run the action. Returns a stream of outputs that the dispatcher
    /// consumes and forwards; an empty stream is a valid result.
    async fn invoke(
        &self,
        message: &Message,
        state: &State,
        options: &HandlerOptions,
    ) -> crate::Result<OutputStream>;
}

/// Wrap a ready list of outputs as an [`OutputStream`].
///
/// Convenience for handlers whose outputs are computed eagerly; handlers
/// that produce output as they work should build the stream directly.
pub fn outputs(items: Vec<ActionOutput>) -> OutputStream {
    Box::pin(futures::stream::iter(items))
}
