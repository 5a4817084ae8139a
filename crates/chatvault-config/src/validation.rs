// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as positive rates, known source kinds, and non-empty
//! paths.

use crate::diagnostic::ConfigError;
use crate::model::ChatvaultConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ChatvaultConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.bind_address must not be empty".to_string(),
        });
    } else {
        let addr = config.server.bind_address.trim();
        let is_valid_ip = addr.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = addr
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!(
                    "server.bind_address `{addr}` is not a valid IP address or hostname"
                ),
            });
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    match config.source.kind.as_str() {
        "replay" => {
            if config.source.replay_path.is_none() {
                errors.push(ConfigError::Validation {
                    message: "source.replay_path is required when source.kind = \"replay\""
                        .to_string(),
                });
            }
        }
        other => {
            errors.push(ConfigError::Validation {
                message: format!("source.kind `{other}` is not a known adapter (expected `replay`)"),
            });
        }
    }

    if config.ingest.requests_per_second <= 0.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "ingest.requests_per_second must be positive, got {}",
                config.ingest.requests_per_second
            ),
        });
    }

    if config.ingest.burst < 1.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "ingest.burst must be at least 1, got {}",
                config.ingest.burst
            ),
        });
    }

    if config.ingest.page_size == 0 {
        errors.push(ConfigError::Validation {
            message: "ingest.page_size must be at least 1".to_string(),
        });
    }

    if config.ingest.max_pages_per_task == 0 {
        errors.push(ConfigError::Validation {
            message: "ingest.max_pages_per_task must be at least 1".to_string(),
        });
    }

    if config.ingest.retry_max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "ingest.retry_max_attempts must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
