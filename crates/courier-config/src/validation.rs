// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-zero windows and a usable splitter length.

use crate::diagnostic::ConfigError;
use crate::model::CourierConfig;

/// The splitter reserves 50 bytes of headroom when hard-splitting oversized
/// lines; a max length at or below that cannot produce usable chunks.
const MIN_MESSAGE_LENGTH: usize = 100;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CourierConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !VALID_LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "service.log_level must be one of {VALID_LOG_LEVELS:?}, got `{}`",
                config.service.log_level
            ),
        });
    }

    if config.delivery.max_message_length < MIN_MESSAGE_LENGTH {
        errors.push(ConfigError::Validation {
            message: format!(
                "delivery.max_message_length must be at least {MIN_MESSAGE_LENGTH}, got {}",
                config.delivery.max_message_length
            ),
        });
    }

    if config.delivery.queue_stale_after_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "delivery.queue_stale_after_ms must be greater than zero".to_string(),
        });
    }

    if config.media.supported_formats.is_empty() {
        errors.push(ConfigError::Validation {
            message: "media.supported_formats must not be empty".to_string(),
        });
    }

    if config.media.max_file_size == 0 {
        errors.push(ConfigError::Validation {
            message: "media.max_file_size must be greater than zero".to_string(),
        });
    }

    if config.rate_limit.enabled {
        if config.rate_limit.per_recipient == 0 {
            errors.push(ConfigError::Validation {
                message: "rate_limit.per_recipient must be at least 1 when enabled".to_string(),
            });
        }
        if config.rate_limit.window_ms == 0 {
            errors.push(ConfigError::Validation {
                message: "rate_limit.window_ms must be greater than zero when enabled"
                    .to_string(),
            });
        }
    }

    if config.transport.max_reconnect_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "transport.max_reconnect_attempts must be at least 1".to_string(),
        });
    }

    if config.transport.restart_base_delay_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "transport.restart_base_delay_ms must be greater than zero".to_string(),
        });
    }

    if config.transport.session_name.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "transport.session_name must not be empty".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = CourierConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn tiny_max_message_length_is_rejected() {
        let mut config = CourierConfig::default();
        config.delivery.max_message_length = 50;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e
            .to_string()
            .contains("delivery.max_message_length")));
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let mut config = CourierConfig::default();
        config.service.log_level = "loud".into();
        config.media.supported_formats.clear();
        config.rate_limit.per_recipient = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn disabled_rate_limit_skips_its_checks() {
        let mut config = CourierConfig::default();
        config.rate_limit.enabled = false;
        config.rate_limit.per_recipient = 0;
        config.rate_limit.window_ms = 0;
        assert!(validate_config(&config).is_ok());
    }
}
