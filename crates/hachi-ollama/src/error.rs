// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classified Ollama failures.

use hachi_core::{HachiError, ProcessingTier};
use strum::Display;

/// What went wrong talking to Ollama.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum OllamaErrorKind {
    /// Server unreachable or connection refused.
    Connection,
    /// Model missing or not pulled.
    Model,
    /// Request took too long.
    Timeout,
    /// Body was empty or not the JSON we expected.
    Content,
    /// Server ran out of memory or other resources.
    Memory,
    /// The model answered, but with an unusable reply.
    InvalidResponse,
    Unknown,
}

impl OllamaErrorKind {
    /// Whether a single retry might succeed.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            OllamaErrorKind::Connection | OllamaErrorKind::Timeout | OllamaErrorKind::InvalidResponse
        )
    }

    /// Guess the kind from a server error message.
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        let has = |terms: &[&str]| terms.iter().any(|t| lower.contains(t));
        if has(&["connect", "connection", "network", "unreachable", "refused"]) {
            OllamaErrorKind::Connection
        } else if has(&["model", "not found", "doesn't exist"]) {
            OllamaErrorKind::Model
        } else if has(&["timeout", "timed out", "too long"]) {
            OllamaErrorKind::Timeout
        } else if has(&["memory", "resources", "capacity"]) {
            OllamaErrorKind::Memory
        } else if has(&["content", "filter", "safety", "inappropriate"]) {
            OllamaErrorKind::Content
        } else if has(&["invalid", "malformed"]) {
            OllamaErrorKind::InvalidResponse
        } else {
            OllamaErrorKind::Unknown
        }
    }
}

/// A classified Ollama error.
#[derive(Debug, thiserror::Error)]
#[error("ollama {kind} error: {message}")]
pub struct OllamaError {
    pub kind: OllamaErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl OllamaError {
    pub fn new(kind: OllamaErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Classify a transport-level failure from reqwest.
    pub fn from_transport(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            OllamaErrorKind::Timeout
        } else if err.is_connect() {
            OllamaErrorKind::Connection
        } else if err.is_decode() || err.is_body() {
            OllamaErrorKind::Content
        } else {
            OllamaErrorKind::Connection
        };
        Self::new(kind, format!("request to Ollama failed: {err}")).with_source(err)
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

impl From<OllamaError> for HachiError {
    fn from(err: OllamaError) -> Self {
        HachiError::TierProcessing {
            tier: ProcessingTier::Tier2,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}
