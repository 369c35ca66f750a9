// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Hachi companion router.

use std::time::Duration;

use thiserror::Error;

use crate::types::ProcessingTier;

/// The primary error type used across tier processors, the cascade, and storage.
#[derive(Debug, Error)]
pub enum HachiError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// The tier is switched off in configuration. The cascade skips it.
    #[error("tier {tier} is disabled")]
    TierDisabled { tier: ProcessingTier },

    /// A tier processor failed (network, parse, missing tree, quota).
    #[error("tier {tier} failed: {message}")]
    TierProcessing {
        tier: ProcessingTier,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A tier name or registration that the router does not know about.
    #[error("unknown processing tier: {0}")]
    UnknownTier(String),

    /// The classifier could not match the input with any table.
    #[error("classification ambiguous (confidence {confidence:.2})")]
    ClassificationAmbiguous { confidence: f32 },

    /// A tier call exceeded its deadline.
    #[error("tier {tier} timed out after {duration:?}")]
    Timeout {
        tier: ProcessingTier,
        duration: Duration,
    },

    /// Conversation store failures (I/O, serialization).
    #[error("storage error: {message}")]
    Storage {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A decision tree document could not be loaded.
    #[error("decision tree `{tree}` is invalid: {message}")]
    TreeLoad { tree: String, message: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HachiError {
    /// Shorthand for a processing failure without an underlying source.
    pub fn processing(tier: ProcessingTier, message: impl Into<String>) -> Self {
        HachiError::TierProcessing {
            tier,
            message: message.into(),
            source: None,
        }
    }

    /// Whether the cascade should absorb this error and move to the next lower tier.
    ///
    /// Everything except [`HachiError::UnknownTier`] is recoverable: an unknown
    /// tier means the router itself is wired incorrectly.
    pub fn is_cascade_recoverable(&self) -> bool {
        !matches!(self, HachiError::UnknownTier(_))
    }
}

impl From<serde_json::Error> for HachiError {
    fn from(err: serde_json::Error) -> Self {
        HachiError::Storage {
            message: format!("serialization failed: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

impl From<std::io::Error> for HachiError {
    fn from(err: std::io::Error) -> Self {
        HachiError::Storage {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}
