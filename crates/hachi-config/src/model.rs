// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Hachi companion router.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use hachi_core::ProcessingTier;
use serde::{Deserialize, Serialize};

/// Top-level Hachi configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HachiConfig {
    /// Companion persona and logging.
    #[serde(default)]
    pub companion: CompanionConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Conversation history settings.
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Scripted rule tier.
    #[serde(default)]
    pub rule: RuleConfig,

    /// Decision-tree tier.
    #[serde(default)]
    pub tier1: Tier1Config,

    /// Local LLM tier (Ollama).
    #[serde(default)]
    pub tier2: Tier2Config,

    /// Cloud LLM tier (Anthropic).
    #[serde(default)]
    pub tier3: Tier3Config,
}

impl HachiConfig {
    /// Whether the given tier is switched on.
    pub fn tier_enabled(&self, tier: ProcessingTier) -> bool {
        match tier {
            ProcessingTier::Rule => self.rule.enabled,
            ProcessingTier::Tier1 => self.tier1.enabled,
            ProcessingTier::Tier2 => self.tier2.enabled,
            ProcessingTier::Tier3 => self.tier3.enabled,
        }
    }

    /// Per-call deadline the cascade applies to the given tier.
    pub fn tier_timeout(&self, tier: ProcessingTier) -> Duration {
        let secs = match tier {
            ProcessingTier::Rule => self.rule.timeout_secs,
            ProcessingTier::Tier1 => self.tier1.timeout_secs,
            ProcessingTier::Tier2 => self.tier2.timeout_secs,
            ProcessingTier::Tier3 => self.tier3.timeout_secs,
        };
        Duration::from_secs(secs)
    }

    /// Switch a tier on or off. Used by the CLI `--disable-tier` flag and tests.
    pub fn set_tier_enabled(&mut self, tier: ProcessingTier, enabled: bool) {
        match tier {
            ProcessingTier::Rule => self.rule.enabled = enabled,
            ProcessingTier::Tier1 => self.tier1.enabled = enabled,
            ProcessingTier::Tier2 => self.tier2.enabled = enabled,
            ProcessingTier::Tier3 => self.tier3.enabled = enabled,
        }
    }
}

/// Companion identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CompanionConfig {
    /// Character name shown in dialogue.
    #[serde(default = "default_companion_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Learner level assumed for new conversations.
    #[serde(default = "default_language_level")]
    pub default_language_level: String,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            name: default_companion_name(),
            log_level: default_log_level(),
            default_language_level: default_language_level(),
        }
    }
}

fn default_companion_name() -> String {
    "Hachi".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_language_level() -> String {
    "beginner".to_string()
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Bind host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Install the Prometheus recorder and serve `GET /metrics`.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            metrics_enabled: true,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Where conversation histories live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    File,
}

/// Conversation history configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConversationConfig {
    /// Maximum turns retained per conversation (FIFO eviction).
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Number of recent turns included in LLM prompts.
    #[serde(default = "default_prompt_turns")]
    pub prompt_turns: usize,

    /// Storage backend.
    #[serde(default)]
    pub store: StoreKind,

    /// Directory for the file store. Defaults to `<data_dir>/hachi/conversations`.
    #[serde(default)]
    pub store_dir: Option<String>,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            prompt_turns: default_prompt_turns(),
            store: StoreKind::default(),
            store_dir: None,
        }
    }
}

fn default_max_history() -> usize {
    10
}

fn default_prompt_turns() -> usize {
    3
}

/// Scripted rule tier configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_local_timeout")]
    pub timeout_secs: u64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: default_local_timeout(),
        }
    }
}

/// Decision-tree tier configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Tier1Config {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_local_timeout")]
    pub timeout_secs: u64,

    /// Directory of JSON decision trees that override the built-in ones.
    #[serde(default)]
    pub trees_dir: Option<String>,
}

impl Default for Tier1Config {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: default_local_timeout(),
            trees_dir: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_local_timeout() -> u64 {
    2
}

/// Local LLM (Ollama) tier configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Tier2Config {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_ollama_timeout")]
    pub timeout_secs: u64,

    /// Ollama base URL.
    #[serde(default = "default_ollama_url")]
    pub base_url: String,

    /// Model tag served by Ollama.
    #[serde(default = "default_ollama_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_tier2_max_tokens")]
    pub max_tokens: u32,
}

impl Default for Tier2Config {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: default_ollama_timeout(),
            base_url: default_ollama_url(),
            model: default_ollama_model(),
            temperature: default_temperature(),
            max_tokens: default_tier2_max_tokens(),
        }
    }
}

fn default_ollama_timeout() -> u64 {
    60
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_tier2_max_tokens() -> u32 {
    512
}

/// Cloud LLM (Anthropic) tier configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Tier3Config {
    /// Off by default: the cloud tier needs an API key.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_cloud_timeout")]
    pub timeout_secs: u64,

    /// API key. `None` falls back to the `ANTHROPIC_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_anthropic_url")]
    pub base_url: String,

    #[serde(default = "default_anthropic_model")]
    pub model: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_tier3_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Input plus output tokens allowed per UTC day. `None` means unlimited.
    #[serde(default)]
    pub daily_token_quota: Option<u64>,
}

impl Default for Tier3Config {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_secs: default_cloud_timeout(),
            api_key: None,
            base_url: default_anthropic_url(),
            model: default_anthropic_model(),
            api_version: default_api_version(),
            max_tokens: default_tier3_max_tokens(),
            temperature: default_temperature(),
            daily_token_quota: None,
        }
    }
}

fn default_cloud_timeout() -> u64 {
    30
}

fn default_anthropic_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-haiku-20241022".to_string()
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_tier3_max_tokens() -> u32 {
    1024
}
