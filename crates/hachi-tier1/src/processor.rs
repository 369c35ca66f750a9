// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decision-tree processor for [`ProcessingTier::Tier1`].

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use hachi_config::model::Tier1Config;
use hachi_core::{ClassifiedRequest, ConversationContext, HachiError, ProcessingTier, Processor};
use tracing::{debug, info};

use crate::library::TreeLibrary;
use crate::walker::{walk, WalkInput};

/// Walks the decision tree registered for the request's intent.
#[derive(Debug, Clone)]
pub struct Tier1Processor {
    library: Arc<TreeLibrary>,
}

impl Tier1Processor {
    pub fn new(library: Arc<TreeLibrary>) -> Self {
        Self { library }
    }

    /// Build from configuration: built-in trees, overridden by `trees_dir`.
    pub fn from_config(config: &Tier1Config) -> Result<Self, HachiError> {
        let library = match config.trees_dir.as_deref() {
            Some(dir) => TreeLibrary::builtin_with_dir(Path::new(dir))?,
            None => TreeLibrary::builtin()?,
        };
        info!(trees = library.len(), "tier1 decision trees ready");
        Ok(Self::new(Arc::new(library)))
    }

    pub fn library(&self) -> Arc<TreeLibrary> {
        Arc::clone(&self.library)
    }
}

#[async_trait]
impl Processor for Tier1Processor {
    fn tier(&self) -> ProcessingTier {
        ProcessingTier::Tier1
    }

    fn name(&self) -> &str {
        "decision-tree"
    }

    async fn process(
        &self,
        request: &ClassifiedRequest,
        context: &ConversationContext,
    ) -> Result<String, HachiError> {
        let tree = self.library.for_intent(request.intent).ok_or_else(|| {
            HachiError::processing(
                ProcessingTier::Tier1,
                format!("no decision tree for intent {}", request.intent),
            )
        })?;

        let start = Instant::now();
        let input = WalkInput::from_request(tree, request, context);
        let outcome = walk(tree, input)?;
        debug!(
            request_id = request.request_id(),
            tree = tree.id.as_str(),
            path = ?outcome.path,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "decision tree walked"
        );
        Ok(outcome.text)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use hachi_core::{CompanionRequest, ComplexityLevel, IntentCategory, RequestType};

    use super::*;

    fn classified(input: &str, intent: IntentCategory, entities: &[(&str, &str)]) -> ClassifiedRequest {
        ClassifiedRequest {
            request: CompanionRequest::new(input, RequestType::Assistance),
            intent,
            complexity: ComplexityLevel::Simple,
            processing_tier: ProcessingTier::Tier1,
            confidence: 0.9,
            extracted_entities: entities
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[tokio::test]
    async fn missing_tree_is_a_processing_error() {
        let processor = Tier1Processor::new(Arc::new(TreeLibrary::empty()));
        let ctx = ConversationContext::new("c", "p", "beginner", "");
        let err = processor
            .process(&classified("hi", IntentCategory::VocabularyHelp, &[]), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HachiError::TierProcessing {
                tier: ProcessingTier::Tier1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn default_config_loads_builtin_trees() {
        let processor = Tier1Processor::from_config(&Tier1Config::default()).unwrap();
        let ctx = ConversationContext::new("c", "p", "beginner", "");
        let text = processor
            .process(
                &classified("What does eki mean?", IntentCategory::VocabularyHelp, &[("word", "eki")]),
                &ctx,
            )
            .await
            .unwrap();
        assert!(text.contains("means"), "{text}");
        assert!(text.contains("えき"), "{text}");
    }
}
