// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock tier processor for deterministic testing.
//!
//! `MockProcessor` implements `Processor` with a scripted queue of
//! behaviours, enabling cascade and handler tests without network calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use hachi_core::{ClassifiedRequest, ConversationContext, HachiError, ProcessingTier, Processor};

/// What the mock does on one call.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return this text.
    Reply(String),
    /// Fail with a `TierProcessing` error carrying this message.
    Fail(String),
    /// Sleep, then reply. Used to trip cascade timeouts.
    Sleep(Duration),
}

/// A tier processor that follows a script.
///
/// Behaviours are popped from a FIFO queue. When the queue is empty, the
/// default behaviour repeats.
pub struct MockProcessor {
    tier: ProcessingTier,
    script: Mutex<VecDeque<MockBehavior>>,
    default: MockBehavior,
    calls: AtomicUsize,
    inputs: Mutex<Vec<String>>,
}

impl MockProcessor {
    fn with_default(tier: ProcessingTier, default: MockBehavior) -> Self {
        Self {
            tier,
            script: Mutex::new(VecDeque::new()),
            default,
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Always replies with `text`.
    pub fn replying(tier: ProcessingTier, text: impl Into<String>) -> Self {
        Self::with_default(tier, MockBehavior::Reply(text.into()))
    }

    /// Always fails with `message`.
    pub fn failing(tier: ProcessingTier, message: impl Into<String>) -> Self {
        Self::with_default(tier, MockBehavior::Fail(message.into()))
    }

    /// Always sleeps for `delay` before replying.
    pub fn sleeping(tier: ProcessingTier, delay: Duration) -> Self {
        Self::with_default(tier, MockBehavior::Sleep(delay))
    }

    /// Plays `script` in order, then replies "mock response" forever.
    pub fn scripted(tier: ProcessingTier, script: Vec<MockBehavior>) -> Self {
        let mock = Self::replying(tier, "mock response");
        Self {
            script: Mutex::new(VecDeque::from(script)),
            ..mock
        }
    }

    /// Number of times `process` was invoked.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Player inputs seen, in call order.
    pub async fn seen_inputs(&self) -> Vec<String> {
        self.inputs.lock().await.clone()
    }

    async fn next_behavior(&self) -> MockBehavior {
        self.script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.default.clone())
    }
}

#[async_trait]
impl Processor for MockProcessor {
    fn tier(&self) -> ProcessingTier {
        self.tier
    }

    fn name(&self) -> &str {
        "mock"
    }

    async fn process(
        &self,
        request: &ClassifiedRequest,
        _context: &ConversationContext,
    ) -> Result<String, HachiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().await.push(request.player_input().to_string());

        match self.next_behavior().await {
            MockBehavior::Reply(text) => Ok(text),
            MockBehavior::Fail(message) => Err(HachiError::processing(self.tier, message)),
            MockBehavior::Sleep(delay) => {
                tokio::time::sleep(delay).await;
                Ok(format!("slow reply from {}", self.tier))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use hachi_core::{CompanionRequest, ComplexityLevel, IntentCategory, RequestType};

    use super::*;

    fn request() -> ClassifiedRequest {
        ClassifiedRequest {
            request: CompanionRequest::new("hint please", RequestType::Hint),
            intent: IntentCategory::GeneralHint,
            complexity: ComplexityLevel::Simple,
            processing_tier: ProcessingTier::Tier2,
            confidence: 0.8,
            extracted_entities: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn script_then_default() {
        let mock = MockProcessor::scripted(
            ProcessingTier::Tier2,
            vec![
                MockBehavior::Fail("down".into()),
                MockBehavior::Reply("up again".into()),
            ],
        );
        let ctx = ConversationContext::new("c", "p", "beginner", "");

        assert!(mock.process(&request(), &ctx).await.is_err());
        assert_eq!(mock.process(&request(), &ctx).await.unwrap(), "up again");
        assert_eq!(mock.process(&request(), &ctx).await.unwrap(), "mock response");
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.seen_inputs().await, vec!["hint please"; 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn sleeping_mock_replies_after_delay() {
        let mock = MockProcessor::sleeping(ProcessingTier::Tier3, Duration::from_secs(30));
        let ctx = ConversationContext::new("c", "p", "beginner", "");
        let text = mock.process(&request(), &ctx).await.unwrap();
        assert_eq!(text, "slow reply from tier_3");
    }
}
