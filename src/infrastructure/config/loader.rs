use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_turns: {0}. Must be at least 1")]
    InvalidMaxTurns(usize),

    #[error("Invalid hard_max_turns: {hard}. Must be at least max_turns ({max})")]
    InvalidHardMaxTurns { hard: usize, max: usize },

    #[error("Invalid threshold {name}: {value}. Must be between 0.0 and 1.0")]
    ThresholdOutOfRange { name: String, value: f64 },

    #[error(
        "Invalid similarity thresholds: low_similarity ({0}) must be less than mid_similarity ({1})"
    )]
    InvalidSimilarityBands(f64, f64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Invalid batch concurrency: {0}. Must be at least 1")]
    InvalidConcurrency(usize),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .matchwright/config.yaml (project config)
    /// 3. .matchwright/local.yaml (local overrides, optional)
    /// 4. Environment variables (MATCHWRIGHT_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".matchwright/config.yaml"))
            .merge(Yaml::file(".matchwright/local.yaml"))
            .merge(Env::prefixed("MATCHWRIGHT_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring
    /// environment overrides
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("MATCHWRIGHT_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let conversation = &config.conversation;
        if conversation.max_turns == 0 {
            return Err(ConfigError::InvalidMaxTurns(conversation.max_turns));
        }
        if let Some(hard) = conversation.hard_max_turns {
            if hard < conversation.max_turns {
                return Err(ConfigError::InvalidHardMaxTurns {
                    hard,
                    max: conversation.max_turns,
                });
            }
        }
        if conversation.lookback_window == 0 {
            return Err(ConfigError::ValidationFailed(
                "conversation.lookback_window must be at least 1".to_string(),
            ));
        }

        let outcome = &conversation.outcome_thresholds;
        let early = &conversation.early_exit;
        let review = &config.review;
        let caps = &review.caps;
        let unit_values = [
            ("outcome_thresholds.mutual", outcome.mutual),
            ("outcome_thresholds.interested", outcome.interested),
            ("outcome_thresholds.needs_more_info", outcome.needs_more_info),
            ("outcome_thresholds.follow_up", outcome.follow_up),
            ("early_exit.not_a_fit_below", early.not_a_fit_below),
            ("early_exit.mutual_side_b_above", early.mutual_side_b_above),
            ("early_exit.mutual_side_a_above", early.mutual_side_a_above),
            ("review.low_similarity", review.low_similarity),
            ("review.mid_similarity", review.mid_similarity),
            ("review.caps.not_a_fit", caps.not_a_fit),
            ("review.caps.outcome_downgrade", caps.outcome_downgrade),
            ("review.caps.outcome", caps.outcome),
            ("review.caps.low_similarity_downgrade", caps.low_similarity_downgrade),
            ("review.caps.low_similarity_next_step", caps.low_similarity_next_step),
            ("review.caps.low_similarity", caps.low_similarity),
            ("review.caps.mid_similarity", caps.mid_similarity),
        ];
        for (name, value) in unit_values {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange {
                    name: name.to_string(),
                    value,
                });
            }
        }
        if review.low_similarity >= review.mid_similarity {
            return Err(ConfigError::InvalidSimilarityBands(
                review.low_similarity,
                review.mid_similarity,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(
                config.logging.rotation.clone(),
            ));
        }

        if config.batch.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(config.batch.concurrency));
        }

        if config.embeddings.max_batch_size == 0 || config.vector_store.upsert_batch_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "embedding and upsert batch sizes must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
