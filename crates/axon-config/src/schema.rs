use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration — maps to `axon.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AxonConfig {
    pub agent: AgentConfig,
    pub scheduler: SchedulerConfig,
    pub deadlines: DeadlineConfig,
    pub logging: LoggingConfig,
    /// Free-form settings exposed through the runtime settings map.
    /// Plugins read these during `init` for their own configuration.
    pub settings: HashMap<String, String>,
}

// ── Agent ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Display name; also used to derive the agent id when none is given.
    pub name: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "axon".into(),
        }
    }
}

// ── Scheduler ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How often the task scheduler wakes up to look for due tasks.
    pub tick_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
        }
    }
}

// ── Deadlines ──────────────────────────────────────────────────

/// Per-operation-class deadlines. `None` means no timeout — the runtime
/// imposes none by default; each slot is an explicit opt-in.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadlineConfig {
    /// Applied around each provider `get()` during state composition.
    pub provider_ms: Option<u64>,
    /// Applied around each action handler invocation.
    pub action_ms: Option<u64>,
    /// Applied around each task worker execution.
    pub task_ms: Option<u64>,
}

impl DeadlineConfig {
    /// True when no operation class has a deadline configured.
    pub fn is_unbounded(&self) -> bool {
        self.provider_ms.is_none() && self.action_ms.is_none() && self.task_ms.is_none()
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "axon_runtime=debug,info".
    pub level: String,
    /// Emit JSON-formatted log lines instead of the human format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

impl AxonConfig {
    /// Validate the configuration. Returns human-readable warnings for
    /// suspicious-but-usable values; fails on values the runtime cannot
    /// operate with.
    pub fn validate(&self) -> Result<Vec<String>, String> {
        let mut warnings = Vec::new();

        if self.scheduler.tick_interval_ms == 0 {
            return Err("scheduler.tick_interval_ms: must be greater than zero".into());
        }
        if self.scheduler.tick_interval_ms < 100 {
            warnings.push(format!(
                "scheduler.tick_interval_ms is very low ({}ms); the scheduler will busy-poll",
                self.scheduler.tick_interval_ms
            ));
        }

        if self.agent.name.trim().is_empty() {
            return Err("agent.name: must not be empty".into());
        }

        for (slot, value) in [
            ("deadlines.provider_ms", self.deadlines.provider_ms),
            ("deadlines.action_ms", self.deadlines.action_ms),
            ("deadlines.task_ms", self.deadlines.task_ms),
        ] {
            if value == Some(0) {
                warnings.push(format!("{slot} is 0; every call in that class will time out"));
            }
        }

        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AxonConfig::default();
        let warnings = config.validate().unwrap();
        assert!(warnings.is_empty());
        assert_eq!(config.scheduler.tick_interval_ms, 1_000);
        assert!(config.deadlines.is_unbounded());
    }

    #[test]
    fn zero_tick_interval_is_fatal() {
        let mut config = AxonConfig::default();
        config.scheduler.tick_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_deadline_warns() {
        let mut config = AxonConfig::default();
        config.deadlines.action_ms = Some(0);
        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("deadlines.action_ms"));
    }
}
