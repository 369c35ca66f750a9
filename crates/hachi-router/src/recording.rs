// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder can collect these; `hachi
//! serve` installs the Prometheus one. Without a recorder every call is a
//! no-op.

use std::time::Duration;

use hachi_core::{IntentCategory, ProcessingTier};
use metrics::{describe_counter, describe_histogram};

use crate::cascade::AttemptOutcome;

/// Register all Hachi metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("hachi_requests_total", "Companion requests by intent");
    describe_counter!(
        "hachi_tier_attempts_total",
        "Cascade attempts by tier and outcome"
    );
    describe_counter!(
        "hachi_fallbacks_total",
        "Requests answered below their preferred tier"
    );
    describe_counter!(
        "hachi_cascade_exhausted_total",
        "Requests where no tier answered"
    );
    describe_counter!(
        "hachi_llm_retries_total",
        "Upstream LLM retries by provider"
    );
    describe_histogram!(
        "hachi_tier_latency_seconds",
        "Processor latency per invoked tier in seconds"
    );
}

/// Label value for an attempt outcome.
pub fn outcome_label(outcome: &AttemptOutcome) -> &'static str {
    match outcome {
        AttemptOutcome::Succeeded => "succeeded",
        AttemptOutcome::Disabled => "disabled",
        AttemptOutcome::Failed(_) => "failed",
        AttemptOutcome::TimedOut(_) => "timed_out",
    }
}

/// Record a classified request.
pub fn record_request(intent: IntentCategory) {
    metrics::counter!("hachi_requests_total", "intent" => intent.to_string()).increment(1);
}

/// Record one cascade attempt.
pub fn record_attempt(tier: ProcessingTier, outcome: &AttemptOutcome) {
    metrics::counter!(
        "hachi_tier_attempts_total",
        "tier" => tier.to_string(),
        "outcome" => outcome_label(outcome)
    )
    .increment(1);
}

/// Record how long an invoked tier took, whatever its outcome.
pub fn record_tier_latency(tier: ProcessingTier, elapsed: Duration) {
    metrics::histogram!("hachi_tier_latency_seconds", "tier" => tier.to_string())
        .record(elapsed.as_secs_f64());
}

/// Record an answer from a cheaper tier than the one classification picked.
pub fn record_fallback(preferred: ProcessingTier, answered: ProcessingTier) {
    metrics::counter!(
        "hachi_fallbacks_total",
        "from" => preferred.to_string(),
        "to" => answered.to_string()
    )
    .increment(1);
}

/// Record a cascade that ended in the fallback apology.
pub fn record_exhausted(preferred: ProcessingTier) {
    metrics::counter!("hachi_cascade_exhausted_total", "from" => preferred.to_string())
        .increment(1);
}
