// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Courier delivery layer.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Courier configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CourierConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Transport session and restart-policy settings.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Message delivery pacing and retry settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Media validation settings.
    #[serde(default)]
    pub media: MediaConfig,

    /// Per-recipient rate limiting settings.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service instance.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "courier".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Transport session and restart-policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    /// Session identifier passed to the transport adapter.
    #[serde(default = "default_session_name")]
    pub session_name: String,

    /// Pairing challenges tolerated before forcing a restart.
    #[serde(default = "default_pairing_retry_limit")]
    pub pairing_retry_limit: u32,

    /// Automatic reconnect attempts before giving up for good.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Base restart delay; the effective delay is `base * attempt`.
    #[serde(default = "default_restart_base_delay_ms")]
    pub restart_base_delay_ms: u64,

    /// Window within which a second authentication failure is fatal.
    #[serde(default = "default_auth_failure_window_ms")]
    pub auth_failure_window_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            session_name: default_session_name(),
            pairing_retry_limit: default_pairing_retry_limit(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            restart_base_delay_ms: default_restart_base_delay_ms(),
            auth_failure_window_ms: default_auth_failure_window_ms(),
        }
    }
}

fn default_session_name() -> String {
    "courier-session".to_string()
}

fn default_pairing_retry_limit() -> u32 {
    3
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_restart_base_delay_ms() -> u64 {
    5_000
}

fn default_auth_failure_window_ms() -> u64 {
    60_000
}

/// Message delivery pacing and retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Maximum length of a single outbound message chunk.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,

    /// Whether to signal a composing indicator before sending.
    #[serde(default = "default_send_typing")]
    pub send_typing: bool,

    /// Pause after the composing indicator, before the first chunk.
    #[serde(default = "default_typing_delay_ms")]
    pub typing_delay_ms: u64,

    /// Pause between consecutive chunks and between drained queue items.
    #[serde(default = "default_inter_message_delay_ms")]
    pub inter_message_delay_ms: u64,

    /// Maximum transport-failure retries for an immediate send.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Pause before each retry attempt.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Age past which a queued item is discarded instead of sent.
    #[serde(default = "default_queue_stale_after_ms")]
    pub queue_stale_after_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_message_length: default_max_message_length(),
            send_typing: default_send_typing(),
            typing_delay_ms: default_typing_delay_ms(),
            inter_message_delay_ms: default_inter_message_delay_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            queue_stale_after_ms: default_queue_stale_after_ms(),
        }
    }
}

fn default_max_message_length() -> usize {
    4_000
}

fn default_send_typing() -> bool {
    true
}

fn default_typing_delay_ms() -> u64 {
    1_000
}

fn default_inter_message_delay_ms() -> u64 {
    500
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2_000
}

fn default_queue_stale_after_ms() -> u64 {
    300_000
}

/// Media validation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MediaConfig {
    /// Maximum media payload size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    /// Allowed mimetype subtypes, e.g. `jpeg`, `png`.
    #[serde(default = "default_supported_formats")]
    pub supported_formats: Vec<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            supported_formats: default_supported_formats(),
        }
    }
}

fn default_max_file_size() -> usize {
    5 * 1024 * 1024
}

fn default_supported_formats() -> Vec<String> {
    ["jpg", "jpeg", "png", "webp"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Per-recipient rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Master switch; when false, admission always succeeds and no
    /// per-recipient bookkeeping is kept.
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,

    /// Admitted sends per recipient within the window.
    #[serde(default = "default_rate_limit_per_recipient")]
    pub per_recipient: usize,

    /// Sliding window length in milliseconds.
    #[serde(default = "default_rate_limit_window_ms")]
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            per_recipient: default_rate_limit_per_recipient(),
            window_ms: default_rate_limit_window_ms(),
        }
    }
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_rate_limit_per_recipient() -> usize {
    10
}

fn default_rate_limit_window_ms() -> u64 {
    3_600_000
}
