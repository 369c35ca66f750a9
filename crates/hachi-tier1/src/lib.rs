// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The two local, deterministic tiers of the Hachi cascade.
//!
//! [`RuleProcessor`] answers from scripted templates and never fails.
//! [`Tier1Processor`] walks JSON decision trees keyed by intent.

pub mod library;
pub mod processor;
pub mod render;
pub mod rule;
pub mod tree;
pub mod walker;

pub use library::TreeLibrary;
pub use processor::Tier1Processor;
pub use rule::RuleProcessor;
pub use tree::{DecisionTree, NodeKind};
pub use walker::{walk, WalkInput, WalkOutcome};
