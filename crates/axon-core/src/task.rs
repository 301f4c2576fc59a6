use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known task tags with scheduler-level meaning.
pub mod tags {
    /// Marks a task as recurring even without an update interval.
    pub const REPEAT: &str = "repeat";
    /// Runs on the next scheduler tick regardless of elapsed interval.
    pub const IMMEDIATE: &str = "immediate";
    /// Conventional tag for queued work items.
    pub const QUEUE: &str = "queue";
}

/// A unit of deferred or recurring work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    /// Maps to a registered worker of the same name. The worker may be
    /// registered later or never; a missing worker means the task simply
    /// never executes.
    pub name: String,
    pub description: String,
    /// Owning world/agent scope.
    pub world_id: Uuid,
    /// Used for bulk query and delete.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: TaskMetadata,
    pub created_at: DateTime<Utc>,
}

/// Scheduler-managed and creator-owned task metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskMetadata {
    /// Re-run cadence for recurring tasks, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_interval_ms: Option<u64>,
    /// Stamped by the scheduler after each execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Free-form fields owned by the task creator.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Task {
    pub fn new(name: impl Into<String>, description: impl Into<String>, world_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            world_id,
            tags: vec![],
            metadata: TaskMetadata::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.metadata.update_interval_ms = Some(interval_ms);
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Recurring tasks re-arm after execution; one-shot tasks are deleted.
    pub fn is_recurring(&self) -> bool {
        self.metadata.update_interval_ms.is_some() || self.has_tag(tags::REPEAT)
    }

    /// Superset match: true when this task carries every requested tag.
    pub fn matches_tags(&self, requested: &[String]) -> bool {
        requested.iter().all(|t| self.has_tag(t))
    }
}

/// A named, stateless executor for tasks of the same name.
///
/// Not persisted; lives only in the runtime's in-memory name→worker map.
/// Re-registering a name overwrites the prior worker (last wins).
#[async_trait]
pub trait TaskWorker: Send + Sync {
    fn name(&self) -> &str;

    /// Applicability check run before every execution.
    async fn validate(&self, task: &Task) -> bool;

    /// Execute one cycle of the task.
    async fn execute(
        &self,
        options: &serde_json::Map<String, serde_json::Value>,
        task: &Task,
    ) -> crate::Result<()>;
}
