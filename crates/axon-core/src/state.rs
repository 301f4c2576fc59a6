use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The result of a single provider invocation.
///
/// All three fields are optional: a provider may contribute structured
/// values for prompt templating, opaque data for downstream handlers,
/// prose text for the flattened context block, or any combination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderOutput {
    /// Key/value pairs merged into the composite state's value map.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub values: serde_json::Map<String, Value>,
    /// Structured payload kept under the provider's own name, never merged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Prose contribution to the flattened context text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ProviderOutput {
    /// An output carrying only text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Add a value entry, consuming and returning the output.
    pub fn with_value(mut self, key: &str, value: Value) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    /// Attach a structured data payload.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// One provider's contribution, tagged with the provider's identity.
///
/// The composer keeps these in provider-registration order; that order is
/// what makes text assembly deterministic and incremental refresh possible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedOutput {
    pub provider: String,
    pub dynamic: bool,
    pub output: ProviderOutput,
}

/// An immutable snapshot of composed conversational context.
///
/// Built by the State Composer once per handling cycle (or incrementally
/// refreshed from a prior snapshot) and handed to action handlers read-only.
/// The raw per-provider outputs are retained alongside the merged views so
/// a refresh can re-run only dynamic providers and reuse the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    outputs: Vec<NamedOutput>,
    values: serde_json::Map<String, Value>,
    data: serde_json::Map<String, Value>,
    text: String,
}

impl State {
    /// Assemble a snapshot from per-provider outputs in registration order.
    ///
    /// Merge rules:
    /// - `values` maps are merged in order, so on a key collision the
    ///   last-registered provider wins (explicit precedence, not accidental);
    /// - `data` payloads are kept under each provider's name, never merged;
    /// - non-empty `text` fields are joined in registration order with a
    ///   blank line between contributions.
    pub fn from_outputs(outputs: Vec<NamedOutput>) -> Self {
        let mut values = serde_json::Map::new();
        let mut data = serde_json::Map::new();
        let mut sections: Vec<&str> = Vec::new();

        for entry in &outputs {
            for (k, v) in &entry.output.values {
                values.insert(k.clone(), v.clone());
            }
            if let Some(payload) = &entry.output.data {
                data.insert(entry.provider.clone(), payload.clone());
            }
            if let Some(text) = &entry.output.text {
                if !text.is_empty() {
                    sections.push(text);
                }
            }
        }

        let text = sections.join("\n\n");
        Self {
            outputs,
            values,
            data,
            text,
        }
    }

    /// The merged value map across all providers.
    pub fn values(&self) -> &serde_json::Map<String, Value> {
        &self.values
    }

    /// Look up a single merged value.
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Per-provider structured data, keyed by provider name.
    pub fn data(&self) -> &serde_json::Map<String, Value> {
        &self.data
    }

    /// The flattened text form for prompt assembly.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The raw per-provider outputs this snapshot was assembled from.
    pub fn outputs(&self) -> &[NamedOutput] {
        &self.outputs
    }

    /// Whether any provider contributed to this snapshot.
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}
