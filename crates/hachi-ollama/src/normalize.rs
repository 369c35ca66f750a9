// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The one place Ollama response bodies are turned into reply text.
//!
//! Servers may answer a non-streaming request with NDJSON anyway, and some
//! models wrap their reasoning in `<think>` tags. Both are handled here so
//! the client and processor only ever see clean, validated text.

use hachi_context::clean_reply;
use tracing::{debug, warn};

use crate::error::{OllamaError, OllamaErrorKind};
use crate::types::GenerateChunk;

/// Turn a successful `/api/generate` body into validated reply text.
///
/// The body shape decides the parse, not the header: a single JSON document
/// is read as one chunk, anything else spanning several lines as NDJSON.
pub fn normalize_response(content_type: Option<&str>, body: &[u8]) -> Result<String, OllamaError> {
    let text = std::str::from_utf8(body).map_err(|e| {
        OllamaError::new(OllamaErrorKind::Content, "response body is not UTF-8").with_source(e)
    })?;

    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return Err(OllamaError::new(
            OllamaErrorKind::Content,
            "empty response received from Ollama",
        ));
    }

    let raw = match serde_json::from_str::<GenerateChunk>(text) {
        Ok(chunk) => chunk.response,
        Err(_) if lines.len() > 1 => {
            debug!(content_type, lines = lines.len(), "ndjson body received for a non-streaming request");
            concat_ndjson(&lines)?
        }
        Err(e) => {
            return Err(OllamaError::new(
                OllamaErrorKind::Content,
                format!("invalid JSON response: {e}"),
            )
            .with_source(e));
        }
    };

    clean_reply(&raw).map_err(|defect| {
        OllamaError::new(OllamaErrorKind::InvalidResponse, defect.to_string()).with_source(defect)
    })
}

/// Concatenate the `response` field of every NDJSON line.
fn concat_ndjson(lines: &[&str]) -> Result<String, OllamaError> {
    let mut out = String::new();
    let mut parsed = 0usize;
    for line in lines {
        match serde_json::from_str::<GenerateChunk>(line) {
            Ok(chunk) => {
                parsed += 1;
                out.push_str(&chunk.response);
            }
            Err(error) => warn!(%error, "skipping malformed ndjson line"),
        }
    }
    if parsed == 0 {
        return Err(OllamaError::new(
            OllamaErrorKind::Content,
            "no JSON line in multi-line response",
        ));
    }
    Ok(out)
}
