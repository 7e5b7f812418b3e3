//! Configuration loading from disk.

use std::fmt;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::Config;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single semantic validation failure.
#[derive(Debug)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: &'static str,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;

    validate(&config)?;

    Ok(config)
}

/// Semantic checks; returns every violation, not just the first.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.net.buff_size == 0 {
        errors.push(ValidationError {
            field: "net.buff_size",
            message: "must be positive",
        });
    }

    if config.net.timeout_ms == 0 {
        errors.push(ValidationError {
            field: "net.timeout_ms",
            message: "must be positive",
        });
    }

    if config.pow.challenge_len == 0 {
        errors.push(ValidationError {
            field: "pow.challenge_len",
            message: "must be positive",
        });
    }

    // The bit check runs against a 32-byte SHA-256 digest, so no challenge
    // length buys more than 256 usable bits.
    let difficulty_cap = (config.pow.challenge_len * 8).min(256);
    if config.pow.max_difficulty == 0 || config.pow.max_difficulty as usize > difficulty_cap {
        errors.push(ValidationError {
            field: "pow.max_difficulty",
            message: "must be between 1 and min(challenge_len * 8, 256)",
        });
    }

    if !config.pow.rate_difficulty_factor.is_finite() || config.pow.rate_difficulty_factor < 0.0 {
        errors.push(ValidationError {
            field: "pow.rate_difficulty_factor",
            message: "must be a non-negative finite number",
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors))
    }
}
