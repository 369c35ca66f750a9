// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Collects every problem instead of failing fast so operators can fix a
//! config file in one pass.

use hachi_core::ProcessingTier;

use crate::diagnostic::ConfigError;
use crate::model::HachiConfig;

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &HachiConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::validation("gateway.host must not be empty"));
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        errors.push(ConfigError::validation(format!(
            "gateway.host `{host}` is not a valid IP address or hostname"
        )));
    }

    if config.conversation.max_history == 0 {
        errors.push(ConfigError::validation(
            "conversation.max_history must be at least 1",
        ));
    }

    for tier in ProcessingTier::ALL {
        if config.tier_timeout(tier).is_zero() {
            errors.push(ConfigError::validation(format!(
                "{}.timeout_secs must be greater than 0",
                section_name(tier)
            )));
        }
    }

    check_url(&mut errors, "tier2.base_url", &config.tier2.base_url);
    check_url(&mut errors, "tier3.base_url", &config.tier3.base_url);

    for (key, temperature) in [
        ("tier2.temperature", config.tier2.temperature),
        ("tier3.temperature", config.tier3.temperature),
    ] {
        if !(0.0..=2.0).contains(&temperature) {
            errors.push(ConfigError::validation(format!(
                "{key} must be between 0.0 and 2.0, got {temperature}"
            )));
        }
    }

    if config.tier2.model.trim().is_empty() {
        errors.push(ConfigError::validation("tier2.model must not be empty"));
    }

    if config.tier3.daily_token_quota == Some(0) {
        errors.push(ConfigError::validation(
            "tier3.daily_token_quota of 0 blocks every call; disable tier3 instead",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn section_name(tier: ProcessingTier) -> &'static str {
    match tier {
        ProcessingTier::Rule => "rule",
        ProcessingTier::Tier1 => "tier1",
        ProcessingTier::Tier2 => "tier2",
        ProcessingTier::Tier3 => "tier3",
    }
}

fn check_url(errors: &mut Vec<ConfigError>, key: &str, url: &str) {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(ConfigError::validation(format!(
            "{key} must start with http:// or https://, got `{url}`"
        )));
    }
}
