// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tier processor construction and caching.
//!
//! The registry is built once at startup and shared by reference. Each tier
//! has an `enabled` flag and, optionally, a builder. A processor is built on
//! first use and cached; a failed build is not cached, so the next request
//! tries again.

use std::sync::Arc;

use hachi_anthropic::Tier3Processor;
use hachi_config::HachiConfig;
use hachi_core::{HachiError, ProcessingTier, Processor};
use hachi_ollama::Tier2Processor;
use hachi_tier1::{RuleProcessor, Tier1Processor, TreeLibrary};
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Constructs the processor for one tier.
pub type ProcessorBuilder =
    Box<dyn Fn() -> Result<Arc<dyn Processor>, HachiError> + Send + Sync>;

struct TierSlot {
    enabled: bool,
    builder: Option<ProcessorBuilder>,
    cell: OnceCell<Arc<dyn Processor>>,
}

impl TierSlot {
    fn empty() -> Self {
        Self {
            enabled: true,
            builder: None,
            cell: OnceCell::new(),
        }
    }
}

/// Lazily built, cached processors keyed by tier.
pub struct ProcessorRegistry {
    slots: [TierSlot; 4],
}

impl ProcessorRegistry {
    /// A registry with every tier enabled and no builders.
    pub fn new() -> Self {
        Self {
            slots: [
                TierSlot::empty(),
                TierSlot::empty(),
                TierSlot::empty(),
                TierSlot::empty(),
            ],
        }
    }

    /// The production wiring: rule templates, decision trees, Ollama, Anthropic.
    pub fn from_config(config: &HachiConfig) -> Self {
        let mut registry = Self::new();
        for tier in ProcessingTier::ALL {
            registry.set_enabled(tier, config.tier_enabled(tier));
        }

        let tier1 = config.tier1.clone();
        registry.register(ProcessingTier::Rule, move || {
            let rule = match load_library(&tier1) {
                Ok(library) => RuleProcessor::new().with_glossaries(Arc::new(library)),
                Err(err) => {
                    warn!(error = %err, "rule tier starting without tree glossaries");
                    RuleProcessor::new()
                }
            };
            Ok(Arc::new(rule) as Arc<dyn Processor>)
        });

        let tier1 = config.tier1.clone();
        registry.register(ProcessingTier::Tier1, move || {
            Ok(Arc::new(Tier1Processor::from_config(&tier1)?) as Arc<dyn Processor>)
        });

        let shared = Arc::new(config.clone());
        let tier2_config = Arc::clone(&shared);
        registry.register(ProcessingTier::Tier2, move || {
            Ok(Arc::new(Tier2Processor::new(&tier2_config)?) as Arc<dyn Processor>)
        });
        registry.register(ProcessingTier::Tier3, move || {
            Ok(Arc::new(Tier3Processor::new(&shared)?) as Arc<dyn Processor>)
        });

        registry
    }

    /// Register (or replace) the builder for a tier.
    pub fn register<F>(&mut self, tier: ProcessingTier, builder: F) -> &mut Self
    where
        F: Fn() -> Result<Arc<dyn Processor>, HachiError> + Send + Sync + 'static,
    {
        let slot = &mut self.slots[tier.rank()];
        slot.builder = Some(Box::new(builder));
        slot.cell = OnceCell::new();
        self
    }

    /// Register an already built processor.
    pub fn register_processor(
        &mut self,
        tier: ProcessingTier,
        processor: Arc<dyn Processor>,
    ) -> &mut Self {
        self.register(tier, move || Ok(Arc::clone(&processor)))
    }

    pub fn set_enabled(&mut self, tier: ProcessingTier, enabled: bool) -> &mut Self {
        self.slots[tier.rank()].enabled = enabled;
        self
    }

    pub fn is_enabled(&self, tier: ProcessingTier) -> bool {
        self.slots[tier.rank()].enabled
    }

    /// Whether the tier's processor has been built and cached.
    pub fn is_built(&self, tier: ProcessingTier) -> bool {
        self.slots[tier.rank()].cell.initialized()
    }

    /// The processor for `tier`, building it on first use.
    ///
    /// # Errors
    ///
    /// - [`HachiError::TierDisabled`] if the tier is switched off. The builder
    ///   is not run.
    /// - [`HachiError::UnknownTier`] if nothing was registered for the tier.
    /// - [`HachiError::TierProcessing`] if the builder failed.
    pub async fn get_processor(
        &self,
        tier: ProcessingTier,
    ) -> Result<Arc<dyn Processor>, HachiError> {
        let slot = &self.slots[tier.rank()];
        if !slot.enabled {
            return Err(HachiError::TierDisabled { tier });
        }
        let Some(builder) = slot.builder.as_ref() else {
            return Err(HachiError::UnknownTier(format!("no processor registered for {tier}")));
        };

        slot.cell
            .get_or_try_init(|| async {
                let processor = builder().map_err(|err| build_failure(tier, err))?;
                info!(tier = %tier, processor = processor.name(), "tier processor initialized");
                Ok::<_, HachiError>(processor)
            })
            .await
            .cloned()
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn load_library(config: &hachi_config::model::Tier1Config) -> Result<TreeLibrary, HachiError> {
    match &config.trees_dir {
        Some(dir) => TreeLibrary::builtin_with_dir(std::path::Path::new(dir)),
        None => TreeLibrary::builtin(),
    }
}

/// Builder errors surface as processing failures so the cascade moves on.
fn build_failure(tier: ProcessingTier, err: HachiError) -> HachiError {
    match err {
        err @ HachiError::TierProcessing { .. } => err,
        other => HachiError::TierProcessing {
            tier,
            message: format!("failed to build processor: {other}"),
            source: Some(Box::new(other)),
        },
    }
}
