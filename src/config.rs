use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

/// Env var naming an optional JSON config file.
pub const CONFIG_PATH_VAR: &str = "ONE_MORE_TASK_CONFIG";
pub const SEED_VAR: &str = "ONE_MORE_TASK_SEED";
pub const TICK_VAR: &str = "ONE_MORE_TASK_TICK";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value for {var}: {value:?}")]
    BadEnv { var: &'static str, value: String },

    #[error("{0} must be positive and finite")]
    NonPositive(&'static str),
}

/// Simulation tuning that is not part of the game's balance tables.
/// All durations are in simulated seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub seed: u64,
    /// Fixed step used to subdivide `advance` calls.
    pub tick_seconds: f64,
    /// Upper bound on the elapsed time a single `advance` call simulates.
    pub max_catch_up_seconds: f64,
    pub offline_cap_seconds: f64,
    pub offline_min_seconds: f64,
    pub offline_efficiency: f64,
    pub task_expiry_seconds: f64,
    pub task_removal_grace: f64,
    pub incident_removal_grace: f64,
    pub log_capacity: usize,
    pub stall_log_cooldown: f64,
    pub warning_cooldown: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0x0_4e_4f_52_45,
            tick_seconds: 0.1,
            max_catch_up_seconds: 5.0,
            offline_cap_seconds: 8.0 * 3600.0,
            offline_min_seconds: 10.0,
            offline_efficiency: 0.5,
            task_expiry_seconds: 30.0,
            task_removal_grace: 0.3,
            incident_removal_grace: 0.5,
            log_capacity: 200,
            stall_log_cooldown: 10.0,
            warning_cooldown: 3.0,
        }
    }
}

impl SimConfig {
    /// Loads `.env`, then the optional JSON file named by
    /// `ONE_MORE_TASK_CONFIG`, then individual env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        if dotenvy::dotenv().is_ok() {
            info!("Loaded .env");
        }

        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::default(),
        };

        if let Ok(raw) = std::env::var(SEED_VAR) {
            config.seed = raw.trim().parse().map_err(|_| ConfigError::BadEnv {
                var: SEED_VAR,
                value: raw.clone(),
            })?;
        }
        if let Ok(raw) = std::env::var(TICK_VAR) {
            config.tick_seconds = raw.trim().parse().map_err(|_| ConfigError::BadEnv {
                var: TICK_VAR,
                value: raw.clone(),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.tick_seconds) {
            return Err(ConfigError::NonPositive("tick_seconds"));
        }
        if !positive(self.max_catch_up_seconds) {
            return Err(ConfigError::NonPositive("max_catch_up_seconds"));
        }
        if !positive(self.offline_cap_seconds) {
            return Err(ConfigError::NonPositive("offline_cap_seconds"));
        }
        if self.log_capacity == 0 {
            return Err(ConfigError::NonPositive("log_capacity"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: SimConfig = serde_json::from_str(r#"{ "seed": 7, "log_capacity": 50 }"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.log_capacity, 50);
        assert_eq!(config.tick_seconds, SimConfig::default().tick_seconds);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_tick() {
        let config = SimConfig {
            tick_seconds: 0.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive("tick_seconds"))
        ));
    }
}
