// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./hachi.toml` > `~/.config/hachi/hachi.toml` > `/etc/hachi/hachi.toml`
//! with environment variable overrides via `HACHI_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::HachiConfig;

/// Top-level sections that environment variables may target.
const ENV_SECTIONS: &[&str] = &[
    "companion",
    "gateway",
    "conversation",
    "rule",
    "tier1",
    "tier2",
    "tier3",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/hachi/hachi.toml` (system-wide)
/// 3. `~/.config/hachi/hachi.toml` (user XDG config)
/// 4. `./hachi.toml` (local directory)
/// 5. `HACHI_*` environment variables
pub fn load_config() -> Result<HachiConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<HachiConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HachiConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<HachiConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HachiConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(HachiConfig::default()))
        .merge(Toml::file("/etc/hachi/hachi.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("hachi/hachi.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("hachi.toml"))
        .merge(env_provider())
}

/// Map a lowercased, prefix-stripped env key onto a dotted config path.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `tier2_base_url` maps to `tier2.base_url` rather than `tier2.base.url`.
pub fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
fn env_provider() -> Env {
    Env::prefixed("HACHI_").map(|key| map_env_key(key.as_str()).into())
}
