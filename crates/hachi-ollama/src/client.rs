// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for Ollama's native `/api/generate` endpoint.
//!
//! Provides [`OllamaClient`], which builds the request, classifies failures,
//! and retries transient ones once.

use std::time::Duration;

use hachi_config::model::Tier2Config;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::error::{OllamaError, OllamaErrorKind};
use crate::normalize::normalize_response;
use crate::types::{ApiErrorResponse, GenerateOptions, GenerateRequest};

/// HTTP client for a single Ollama model.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
    retry_delay: Duration,
    /// Whole tier deadline; every attempt and retry pause must fit inside it.
    deadline: Duration,
}

/// Shortest per-attempt HTTP timeout, even under a tiny tier deadline.
const MIN_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(250);

impl OllamaClient {
    /// Build a client from the tier-2 configuration section.
    pub fn new(config: &Tier2Config) -> Result<Self, OllamaError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| {
                OllamaError::new(OllamaErrorKind::Connection, format!("failed to build HTTP client: {e}"))
                    .with_source(e)
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
            deadline: Duration::from_secs(config.timeout_secs.max(1)),
        })
    }

    /// HTTP timeout for a single attempt.
    ///
    /// The tier deadline is split across the first call, the retry pause, and
    /// the retry, so a timed-out first call still leaves room to retry.
    pub fn attempt_timeout(&self) -> Duration {
        let pauses = self.retry_delay * self.max_retries;
        let budget = self.deadline.saturating_sub(pauses);
        (budget / (self.max_retries + 1)).max(MIN_ATTEMPT_TIMEOUT)
    }

    /// Override the pause before the retry.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate a reply for `prompt`.
    ///
    /// Connection failures, timeouts, and unusable replies are retried once.
    pub async fn generate(&self, prompt: &str) -> Result<String, OllamaError> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
            stream: false,
        };

        let mut attempt = 0;
        loop {
            match self.generate_once(&request).await {
                Ok(text) => return Ok(text),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(attempt, kind = %err.kind, error = %err.message, "retrying ollama request after transient error");
                    metrics::counter!("hachi_llm_retries_total", "provider" => "ollama").increment(1);
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn generate_once(&self, request: &GenerateRequest) -> Result<String, OllamaError> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .timeout(self.attempt_timeout())
            .json(request)
            .send()
            .await
            .map_err(OllamaError::from_transport)?;

        let status = response.status();
        debug!(status = %status, model = self.model.as_str(), "ollama response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(OllamaError::from_transport)?;
        normalize_response(content_type.as_deref(), &body)
    }
}

fn classify_status(status: StatusCode, body: &str) -> OllamaError {
    let message = serde_json::from_str::<ApiErrorResponse>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.to_string());

    let kind = match status {
        StatusCode::NOT_FOUND => OllamaErrorKind::Model,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => OllamaErrorKind::Timeout,
        _ => OllamaErrorKind::from_message(&message),
    };
    OllamaError::new(kind, format!("Ollama returned {status}: {message}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> OllamaClient {
        let config = Tier2Config {
            base_url: base_url.to_string(),
            model: "llama3".into(),
            max_tokens: 128,
            ..Tier2Config::default()
        };
        OllamaClient::new(&config)
            .unwrap()
            .with_retry_delay(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn generate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama3",
                "stream": false,
                "options": { "num_predict": 128 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "llama3",
                "response": "えき (eki) means station.",
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = test_client(&server.uri()).generate("What is eki?").await.unwrap();
        assert_eq!(text, "えき (eki) means station.");
    }

    #[tokio::test]
    async fn missing_model_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({ "error": "model 'llama3' not found" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).generate("hi").await.unwrap_err();
        assert_eq!(err.kind, OllamaErrorKind::Model);
    }

    #[tokio::test]
    async fn invalid_reply_is_retried_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "response": "Hachi: ✓", "done": true })),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "きっぷ (kippu) means ticket.",
                "done": true
            })))
            .mount(&server)
            .await;

        let text = test_client(&server.uri()).generate("hi").await.unwrap();
        assert_eq!(text, "きっぷ (kippu) means ticket.");
    }

    #[test]
    fn retries_are_counted() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();

        let text = metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                let server = MockServer::start().await;
                Mock::given(method("POST"))
                    .and(path("/api/generate"))
                    .respond_with(ResponseTemplate::new(504).set_body_string("gateway timeout"))
                    .up_to_n_times(1)
                    .mount(&server)
                    .await;
                Mock::given(method("POST"))
                    .and(path("/api/generate"))
                    .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                        "response": "えき (eki) means station.",
                        "done": true
                    })))
                    .mount(&server)
                    .await;
                test_client(&server.uri()).generate("hi").await
            })
        })
        .unwrap();

        assert_eq!(text, "えき (eki) means station.");
        let rendered = handle.render();
        assert!(
            rendered.contains("hachi_llm_retries_total{provider=\"ollama\"} 1"),
            "{rendered}"
        );
    }

    #[tokio::test]
    async fn out_of_memory_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({ "error": "not enough memory available" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).generate("hi").await.unwrap_err();
        assert_eq!(err.kind, OllamaErrorKind::Memory);
    }

    #[test]
    fn attempts_fit_inside_the_tier_deadline() {
        for secs in [2, 30, 60] {
            let config = Tier2Config {
                timeout_secs: secs,
                ..Tier2Config::default()
            };
            let client = OllamaClient::new(&config).unwrap();
            let deadline = Duration::from_secs(secs);
            let worst_case = client.attempt_timeout() * 2 + Duration::from_secs(1);
            assert!(worst_case <= deadline, "{secs}s: {worst_case:?}");
        }
    }

    #[tokio::test]
    async fn timed_out_attempt_is_retried_within_deadline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "response": "late", "done": true }))
                    .set_delay(Duration::from_secs(5)),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "きっぷ (kippu) means ticket.",
                "done": true
            })))
            .mount(&server)
            .await;

        let config = Tier2Config {
            base_url: server.uri(),
            timeout_secs: 2,
            ..Tier2Config::default()
        };
        let client = OllamaClient::new(&config)
            .unwrap()
            .with_retry_delay(Duration::from_millis(10));
        assert!(client.attempt_timeout() < Duration::from_secs(1));

        let started = std::time::Instant::now();
        let text = client.generate("hi").await.unwrap();
        assert_eq!(text, "きっぷ (kippu) means ticket.");
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_error() {
        // Nothing listens on port 9 on the loopback interface.
        let err = test_client("http://127.0.0.1:9").generate("hi").await.unwrap_err();
        assert_eq!(err.kind, OllamaErrorKind::Connection);
    }
}
