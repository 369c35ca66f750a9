// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tier cascade: try the preferred tier, then each cheaper one.
//!
//! Tiers are tried one at a time, strictly downward, once each. A processor
//! error, a timeout, or a disabled tier moves on to the next lower tier. If
//! even the rule tier does not answer, the fixed apology is returned.

use std::sync::Arc;
use std::time::{Duration, Instant};

use hachi_config::HachiConfig;
use hachi_core::{
    ClassifiedRequest, ConversationContext, HachiError, ProcessingTier, FALLBACK_APOLOGY,
};
use tracing::{debug, error, info, warn};

use crate::recording;
use crate::registry::ProcessorRegistry;

/// What happened when the cascade reached a tier.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Succeeded,
    /// Switched off; the processor was not invoked.
    Disabled,
    /// The processor (or its builder) returned an error.
    Failed(String),
    TimedOut(Duration),
}

/// One step of a cascade run.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub tier: ProcessingTier,
    pub outcome: AttemptOutcome,
}

/// The cascade's answer plus the trail it took to get there.
#[derive(Debug, Clone)]
pub struct CascadeOutcome {
    pub text: String,
    /// The tier that answered, or `Rule` when every tier failed.
    pub tier: ProcessingTier,
    pub attempts: Vec<Attempt>,
    /// True when no tier answered and `text` is the fallback apology.
    pub exhausted: bool,
}

impl CascadeOutcome {
    /// Tiers whose processor was actually invoked.
    pub fn invoked_tiers(&self) -> Vec<ProcessingTier> {
        self.attempts
            .iter()
            .filter(|a| a.outcome != AttemptOutcome::Disabled)
            .map(|a| a.tier)
            .collect()
    }
}

/// Drives a classified request down the tier ladder.
pub struct CascadeController {
    registry: Arc<ProcessorRegistry>,
    timeouts: [Duration; 4],
}

impl CascadeController {
    pub fn new(registry: Arc<ProcessorRegistry>, config: &HachiConfig) -> Self {
        Self {
            registry,
            timeouts: ProcessingTier::ALL.map(|tier| config.tier_timeout(tier)),
        }
    }

    /// Override one tier's deadline.
    pub fn with_timeout(mut self, tier: ProcessingTier, timeout: Duration) -> Self {
        self.timeouts[tier.rank()] = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<ProcessorRegistry> {
        &self.registry
    }

    /// Run the cascade starting at the request's preferred tier.
    ///
    /// Only [`HachiError::UnknownTier`] escapes; every other failure is
    /// recorded as an attempt and absorbed.
    pub async fn run(
        &self,
        request: &ClassifiedRequest,
        context: &ConversationContext,
    ) -> Result<CascadeOutcome, HachiError> {
        let request_id = request.request_id();
        let mut attempts = Vec::with_capacity(request.processing_tier.rank() + 1);

        for tier in request.processing_tier.cascade_from() {
            let processor = match self.registry.get_processor(tier).await {
                Ok(processor) => processor,
                Err(HachiError::TierDisabled { .. }) => {
                    debug!(request_id, tier = %tier, "tier disabled, skipping");
                    push_attempt(&mut attempts, tier, AttemptOutcome::Disabled);
                    continue;
                }
                Err(err) if !err.is_cascade_recoverable() => {
                    error!(request_id, tier = %tier, error = %err, "cascade misconfigured");
                    return Err(err);
                }
                Err(err) => {
                    warn!(request_id, tier = %tier, error = %err, "tier unavailable, falling back");
                    push_attempt(&mut attempts, tier, AttemptOutcome::Failed(err.to_string()));
                    continue;
                }
            };

            let limit = self.timeouts[tier.rank()];
            let start = Instant::now();
            let result = tokio::time::timeout(limit, processor.process(request, context)).await;
            recording::record_tier_latency(tier, start.elapsed());
            match result {
                Ok(Ok(text)) => {
                    info!(
                        request_id,
                        tier = %tier,
                        processor = processor.name(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "tier answered"
                    );
                    push_attempt(&mut attempts, tier, AttemptOutcome::Succeeded);
                    if tier != request.processing_tier {
                        recording::record_fallback(request.processing_tier, tier);
                    }
                    return Ok(CascadeOutcome {
                        text,
                        tier,
                        attempts,
                        exhausted: false,
                    });
                }
                Ok(Err(err)) if !err.is_cascade_recoverable() => {
                    error!(request_id, tier = %tier, error = %err, "cascade misconfigured");
                    return Err(err);
                }
                Ok(Err(err)) => {
                    warn!(
                        request_id,
                        tier = %tier,
                        error = %err,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "tier failed, falling back"
                    );
                    push_attempt(&mut attempts, tier, AttemptOutcome::Failed(err.to_string()));
                }
                Err(_) => {
                    let err = HachiError::Timeout {
                        tier,
                        duration: limit,
                    };
                    warn!(request_id, tier = %tier, error = %err, "tier timed out, falling back");
                    push_attempt(&mut attempts, tier, AttemptOutcome::TimedOut(limit));
                }
            }
        }

        warn!(
            request_id,
            attempts = attempts.len(),
            "every tier failed, sending fallback apology"
        );
        recording::record_exhausted(request.processing_tier);
        Ok(CascadeOutcome {
            text: FALLBACK_APOLOGY.to_string(),
            tier: ProcessingTier::Rule,
            attempts,
            exhausted: true,
        })
    }
}

/// Record the attempt as a metric and append it to the trail.
fn push_attempt(attempts: &mut Vec<Attempt>, tier: ProcessingTier, outcome: AttemptOutcome) {
    recording::record_attempt(tier, &outcome);
    attempts.push(Attempt { tier, outcome });
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use hachi_core::{
        CompanionRequest, ComplexityLevel, IntentCategory, Processor, RequestType,
    };
    use hachi_test_utils::MockProcessor;

    use super::*;

    fn request_at(tier: ProcessingTier) -> ClassifiedRequest {
        ClassifiedRequest {
            request: CompanionRequest::new("where is the exit?", RequestType::Assistance),
            intent: IntentCategory::DirectionGuidance,
            complexity: ComplexityLevel::Simple,
            processing_tier: tier,
            confidence: 0.9,
            extracted_entities: HashMap::new(),
        }
    }

    fn context() -> ConversationContext {
        ConversationContext::new("c1", "p1", "beginner", "station_entrance")
    }

    fn controller(registry: ProcessorRegistry) -> CascadeController {
        CascadeController::new(Arc::new(registry), &HachiConfig::default())
    }

    fn mock(processor: MockProcessor) -> Arc<dyn Processor> {
        Arc::new(processor)
    }

    #[tokio::test]
    async fn preferred_tier_answers_directly() {
        let tier2 = Arc::new(MockProcessor::replying(ProcessingTier::Tier2, "ollama says hi"));
        let rule = Arc::new(MockProcessor::replying(ProcessingTier::Rule, "rule"));
        let mut registry = ProcessorRegistry::new();
        registry
            .register_processor(ProcessingTier::Tier2, tier2.clone())
            .register_processor(ProcessingTier::Rule, rule.clone());

        let outcome = controller(registry)
            .run(&request_at(ProcessingTier::Tier2), &context())
            .await
            .unwrap();
        assert_eq!(outcome.text, "ollama says hi");
        assert_eq!(outcome.tier, ProcessingTier::Tier2);
        assert!(!outcome.exhausted);
        assert_eq!(tier2.call_count(), 1);
        assert_eq!(rule.call_count(), 0);
    }

    #[tokio::test]
    async fn failures_fall_down_in_order() {
        let mut registry = ProcessorRegistry::new();
        registry
            .register_processor(ProcessingTier::Tier3, mock(MockProcessor::failing(ProcessingTier::Tier3, "quota")))
            .register_processor(ProcessingTier::Tier2, mock(MockProcessor::failing(ProcessingTier::Tier2, "down")))
            .register_processor(ProcessingTier::Tier1, mock(MockProcessor::failing(ProcessingTier::Tier1, "no tree")))
            .register_processor(ProcessingTier::Rule, mock(MockProcessor::replying(ProcessingTier::Rule, "scripted")));

        let outcome = controller(registry)
            .run(&request_at(ProcessingTier::Tier3), &context())
            .await
            .unwrap();
        let tiers: Vec<_> = outcome.attempts.iter().map(|a| a.tier).collect();
        assert_eq!(tiers, ProcessingTier::ALL.iter().rev().copied().collect::<Vec<_>>());
        assert_eq!(outcome.tier, ProcessingTier::Rule);
        assert_eq!(outcome.text, "scripted");
        assert!(matches!(outcome.attempts[0].outcome, AttemptOutcome::Failed(ref m) if m.contains("quota")));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_counts_as_failure() {
        let slow = Arc::new(MockProcessor::sleeping(ProcessingTier::Tier2, Duration::from_secs(120)));
        let mut registry = ProcessorRegistry::new();
        registry
            .register_processor(ProcessingTier::Tier2, slow.clone())
            .register_processor(ProcessingTier::Tier1, mock(MockProcessor::replying(ProcessingTier::Tier1, "tree")));

        let outcome = controller(registry)
            .with_timeout(ProcessingTier::Tier2, Duration::from_secs(1))
            .run(&request_at(ProcessingTier::Tier2), &context())
            .await
            .unwrap();
        assert_eq!(outcome.tier, ProcessingTier::Tier1);
        assert_eq!(
            outcome.attempts[0].outcome,
            AttemptOutcome::TimedOut(Duration::from_secs(1))
        );
        assert_eq!(slow.call_count(), 1);
    }

    #[tokio::test]
    async fn disabled_tiers_are_skipped_without_invocation() {
        let tier1 = Arc::new(MockProcessor::replying(ProcessingTier::Tier1, "tree"));
        let mut registry = ProcessorRegistry::new();
        registry
            .register_processor(ProcessingTier::Tier1, tier1.clone())
            .register_processor(ProcessingTier::Rule, mock(MockProcessor::replying(ProcessingTier::Rule, "rule")))
            .set_enabled(ProcessingTier::Tier1, false);

        let outcome = controller(registry)
            .run(&request_at(ProcessingTier::Tier1), &context())
            .await
            .unwrap();
        assert_eq!(outcome.tier, ProcessingTier::Rule);
        assert_eq!(outcome.attempts[0].outcome, AttemptOutcome::Disabled);
        assert_eq!(outcome.invoked_tiers(), vec![ProcessingTier::Rule]);
        assert_eq!(tier1.call_count(), 0);
    }

    #[tokio::test]
    async fn all_disabled_returns_apology_at_rule() {
        let mut registry = ProcessorRegistry::new();
        for tier in ProcessingTier::ALL {
            registry
                .register_processor(tier, mock(MockProcessor::replying(tier, "never")))
                .set_enabled(tier, false);
        }

        let outcome = controller(registry)
            .run(&request_at(ProcessingTier::Tier3), &context())
            .await
            .unwrap();
        assert!(outcome.exhausted);
        assert_eq!(outcome.text, FALLBACK_APOLOGY);
        assert_eq!(outcome.tier, ProcessingTier::Rule);
        assert_eq!(outcome.attempts.len(), 4);
        assert!(outcome.invoked_tiers().is_empty());
    }

    #[tokio::test]
    async fn unknown_tier_is_surfaced() {
        // Nothing registered for Tier1.
        let mut registry = ProcessorRegistry::new();
        registry.register_processor(ProcessingTier::Rule, mock(MockProcessor::replying(ProcessingTier::Rule, "rule")));

        let err = controller(registry)
            .run(&request_at(ProcessingTier::Tier1), &context())
            .await
            .unwrap_err();
        assert!(matches!(err, HachiError::UnknownTier(_)));
    }

    #[test]
    fn cascade_records_attempts_fallbacks_and_latency() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        let mut registry = ProcessorRegistry::new();
        registry
            .register_processor(ProcessingTier::Tier2, mock(MockProcessor::sleeping(ProcessingTier::Tier2, Duration::from_secs(120))))
            .register_processor(ProcessingTier::Tier1, mock(MockProcessor::failing(ProcessingTier::Tier1, "no tree")))
            .register_processor(ProcessingTier::Rule, mock(MockProcessor::replying(ProcessingTier::Rule, "scripted")));
        let controller = controller(registry).with_timeout(ProcessingTier::Tier2, Duration::from_secs(1));

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();
        let outcome = metrics::with_local_recorder(&recorder, || {
            runtime.block_on(controller.run(&request_at(ProcessingTier::Tier2), &context()))
        })
        .unwrap();
        assert_eq!(outcome.tier, ProcessingTier::Rule);

        let text = handle.render();
        for line in [
            "hachi_tier_attempts_total{tier=\"tier_2\",outcome=\"timed_out\"} 1",
            "hachi_tier_attempts_total{tier=\"tier_1\",outcome=\"failed\"} 1",
            "hachi_tier_attempts_total{tier=\"rule\",outcome=\"succeeded\"} 1",
            "hachi_fallbacks_total{from=\"tier_2\",to=\"rule\"} 1",
            "hachi_tier_latency_seconds_count{tier=\"tier_2\"} 1",
            "hachi_tier_latency_seconds_count{tier=\"rule\"} 1",
        ] {
            assert!(text.contains(line), "missing `{line}` in:\n{text}");
        }
        assert!(!text.contains("hachi_cascade_exhausted_total"));
    }

    #[test]
    fn exhausted_cascade_is_counted() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        let mut registry = ProcessorRegistry::new();
        for tier in ProcessingTier::ALL {
            registry
                .register_processor(tier, mock(MockProcessor::replying(tier, "never")))
                .set_enabled(tier, false);
        }
        let controller = controller(registry);

        let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
        metrics::with_local_recorder(&recorder, || {
            runtime.block_on(controller.run(&request_at(ProcessingTier::Tier1), &context()))
        })
        .unwrap();

        let text = handle.render();
        assert!(text.contains("hachi_cascade_exhausted_total{from=\"tier_1\"} 1"), "{text}");
        assert!(text.contains("hachi_tier_attempts_total{tier=\"tier_1\",outcome=\"disabled\"} 1"), "{text}");
        assert!(!text.contains("hachi_tier_latency_seconds"), "{text}");
    }

    #[tokio::test]
    async fn never_climbs_above_preferred_tier() {
        let tier3 = Arc::new(MockProcessor::replying(ProcessingTier::Tier3, "cloud"));
        let mut registry = ProcessorRegistry::new();
        registry
            .register_processor(ProcessingTier::Tier3, tier3.clone())
            .register_processor(ProcessingTier::Rule, mock(MockProcessor::failing(ProcessingTier::Rule, "broken")));

        let outcome = controller(registry)
            .run(&request_at(ProcessingTier::Rule), &context())
            .await
            .unwrap();
        assert!(outcome.exhausted);
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(tier3.call_count(), 0);
    }
}
