use thiserror::Error;

/// Unified error type for the entire Axon runtime.
#[derive(Error, Debug)]
pub enum AxonError {
    // ── Service registry errors ────────────────────────────────
    #[error("duplicate service registration: {0}")]
    DuplicateService(String),

    #[error("service error: {service}: {reason}")]
    Service { service: String, reason: String },

    // ── Plugin errors ──────────────────────────────────────────
    #[error("plugin error: {plugin}: {reason}")]
    Plugin { plugin: String, reason: String },

    #[error("plugin {plugin} requires missing dependency: {dependency}")]
    MissingDependency { plugin: String, dependency: String },

    #[error("plugin dependency cycle involving: {0}")]
    DependencyCycle(String),

    // ── Handling-cycle errors ──────────────────────────────────
    #[error("provider error: {provider}: {reason}")]
    Provider { provider: String, reason: String },

    #[error("action error: {action}: {reason}")]
    Action { action: String, reason: String },

    #[error("action not found: {0}")]
    ActionNotFound(String),

    #[error("evaluator error: {evaluator}: {reason}")]
    Evaluator { evaluator: String, reason: String },

    // ── Task errors ────────────────────────────────────────────
    #[error("task error: {task}: {reason}")]
    Task { task: String, reason: String },

    // ── Deadlines ──────────────────────────────────────────────
    #[error("deadline exceeded after {0}ms")]
    DeadlineExceeded(u64),

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    #[error("config validation failed: {field}: {reason}")]
    ConfigValidation { field: String, reason: String },

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AxonError>;
