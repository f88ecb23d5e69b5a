//! Configuration management for the sentiment advisor.
//!
//! Loads settings from environment variables and config files.

use crate::error::{PolicyError, PolicyResult};
use crate::policy::BootstrapMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Learning and exploration parameters
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Sentiment label thresholds
    #[serde(default)]
    pub signal: SignalConfig,
    /// Value table storage
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Learning rate (0.0-1.0)
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Discount factor applied to the future-value estimate (0.0-1.0)
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    /// Probability of a random action (0.0-1.0)
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// Seed for the exploration RNG; entropy-seeded when unset
    #[serde(default)]
    pub seed: Option<u64>,
    /// Source of the future-value estimate in updates
    #[serde(default)]
    pub bootstrap: BootstrapMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Compound scores at or above this are Positive
    #[serde(default = "default_positive_threshold")]
    pub positive_threshold: f64,
    /// Compound scores at or below this are Negative
    #[serde(default = "default_negative_threshold")]
    pub negative_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite database holding the value table snapshot
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Recent decisions shown by `status --verbose`
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

// Default value functions
fn default_alpha() -> f64 {
    0.1
}

fn default_gamma() -> f64 {
    0.9
}

fn default_epsilon() -> f64 {
    0.2
}

fn default_positive_threshold() -> f64 {
    0.05
}

fn default_negative_threshold() -> f64 {
    -0.05
}

fn default_db_path() -> String {
    "data/value_table.db".to_string()
}

fn default_history_limit() -> usize {
    10
}

impl Config {
    /// Load configuration from environment variables and config files.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::default().separator("__").prefix("SADV"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        self.policy.validate()?;

        anyhow::ensure!(
            self.signal.negative_threshold <= self.signal.positive_threshold,
            "negative_threshold must not exceed positive_threshold"
        );

        anyhow::ensure!(
            !self.persistence.db_path.trim().is_empty(),
            "db_path must not be empty"
        );

        Ok(())
    }
}

impl PolicyConfig {
    /// Check that every learning parameter lies in [0, 1].
    pub fn validate(&self) -> PolicyResult<()> {
        for (name, value) in [
            ("alpha", self.alpha),
            ("gamma", self.gamma),
            ("epsilon", self.epsilon),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PolicyError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            gamma: default_gamma(),
            epsilon: default_epsilon(),
            seed: None,
            bootstrap: BootstrapMode::default(),
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            positive_threshold: default_positive_threshold(),
            negative_threshold: default_negative_threshold(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            history_limit: default_history_limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.policy.alpha, 0.1);
        assert_eq!(config.policy.gamma, 0.9);
        assert_eq!(config.policy.epsilon, 0.2);
        assert_eq!(config.policy.bootstrap, BootstrapMode::SameState);
    }

    #[test]
    fn test_out_of_range_parameters_rejected() {
        let mut config = Config::default();
        config.policy.epsilon = 1.5;
        assert_eq!(
            config.policy.validate(),
            Err(PolicyError::InvalidParameter {
                name: "epsilon",
                value: 1.5
            })
        );
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.policy.alpha = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut config = Config::default();
        config.signal.negative_threshold = 0.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let source = r#"
            [policy]
            epsilon = 0.0
            seed = 42
            bootstrap = "successor"
        "#;
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.policy.epsilon, 0.0);
        assert_eq!(config.policy.seed, Some(42));
        assert_eq!(config.policy.bootstrap, BootstrapMode::Successor);
        assert_eq!(config.policy.alpha, 0.1);
        assert_eq!(config.persistence.db_path, "data/value_table.db");
    }
}
