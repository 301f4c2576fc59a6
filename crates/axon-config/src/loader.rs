use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::schema::AxonConfig;

/// Loads the Axon configuration from disk with environment overrides.
pub struct ConfigLoader {
    config: Arc<RwLock<AxonConfig>>,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > AXON_CONFIG env > ~/.axon/axon.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("AXON_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".axon")
            .join("axon.toml")
    }

    /// Load the config from disk, falling back to defaults when the file
    /// does not exist.
    pub fn load(path: Option<&Path>) -> axon_core::Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            let raw = std::fs::read_to_string(&config_path)?;
            toml::from_str::<AxonConfig>(&raw).map_err(|e| {
                axon_core::AxonError::Config(format!(
                    "failed to parse {}: {}",
                    config_path.display(),
                    e
                ))
            })?
        } else {
            warn!(?config_path, "config file not found, using defaults");
            AxonConfig::default()
        };

        // Apply environment variable overrides
        let config = Self::apply_env_overrides(config);

        // Validate config — log warnings, fail on errors
        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(e) => {
                return Err(axon_core::AxonError::Config(e));
            }
        }

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// Get a read snapshot of the current config.
    pub fn get(&self) -> AxonConfig {
        self.config.read().clone()
    }

    /// Get a shared reference for subscription.
    pub fn shared(&self) -> Arc<RwLock<AxonConfig>> {
        Arc::clone(&self.config)
    }

    /// Path the config was loaded from.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply env var overrides (AXON_AGENT_NAME, AXON_LOG_LEVEL, ...).
    /// Settings can be injected with the `AXON_SETTING_` prefix: the env
    /// var `AXON_SETTING_RPC_URL=...` becomes the setting `RPC_URL`.
    fn apply_env_overrides(mut config: AxonConfig) -> AxonConfig {
        if let Ok(v) = std::env::var("AXON_AGENT_NAME") {
            config.agent.name = v;
        }
        if let Ok(v) = std::env::var("AXON_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Ok(v) = std::env::var("AXON_SCHEDULER_TICK_MS") {
            if let Ok(ms) = v.parse::<u64>() {
                config.scheduler.tick_interval_ms = ms;
            }
        }
        for (key, value) in std::env::vars() {
            if let Some(name) = key.strip_prefix("AXON_SETTING_") {
                if !name.is_empty() {
                    config.settings.insert(name.to_string(), value);
                }
            }
        }
        config
    }
}
