//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, cache bound > 0)
//! - Check the metrics address parses when metrics are on
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.request.timeout_ms == 0 {
        errors.push(ValidationError {
            field: "request.timeout_ms",
            message: "must be greater than 0".into(),
        });
    }

    if config.breaker.enabled && config.breaker.cooldown_ms == 0 {
        errors.push(ValidationError {
            field: "breaker.cooldown_ms",
            message: "must be greater than 0 when the breaker is enabled".into(),
        });
    }

    if config.cache.max_entries == Some(0) {
        errors.push(ValidationError {
            field: "cache.max_entries",
            message: "must be at least 1, or unset for no bound".into(),
        });
    }

    if config.observability.log_level.trim().is_empty() {
        errors.push(ValidationError {
            field: "observability.log_level",
            message: "must not be empty".into(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError {
            field: "observability.metrics_address",
            message: format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
