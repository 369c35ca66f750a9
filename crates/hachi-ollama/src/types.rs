// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama `/api/generate` wire types.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub options: GenerateOptions,
    /// Always false. Some servers stream NDJSON regardless.
    pub stream: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    /// Ollama's name for the output token limit.
    pub num_predict: u32,
}

/// One JSON object from `/api/generate`, either the whole reply or an NDJSON
/// fragment of it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub eval_count: Option<u32>,
}

/// Error body returned on non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_num_predict_inside_options() {
        let req = GenerateRequest {
            model: "llama3".into(),
            prompt: "hi".into(),
            options: GenerateOptions {
                temperature: 0.5,
                num_predict: 64,
            },
            stream: false,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["options"]["num_predict"], 64);
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn chunk_tolerates_missing_fields() {
        let chunk: GenerateChunk = serde_json::from_str(r#"{"model":"llama3"}"#).unwrap();
        assert!(chunk.response.is_empty());
        assert!(!chunk.done);
    }
}
