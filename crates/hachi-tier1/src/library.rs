// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The set of decision trees available to the tier-1 processor.

use std::collections::HashMap;
use std::path::Path;

use hachi_core::{HachiError, IntentCategory};
use tracing::{debug, info, warn};

use crate::tree::DecisionTree;

/// Tree documents compiled into the binary.
const BUILTIN_TREES: &[(&str, &str)] = &[
    ("vocabulary", include_str!("../trees/vocabulary.json")),
    ("grammar", include_str!("../trees/grammar.json")),
    ("directions", include_str!("../trees/directions.json")),
    ("tickets", include_str!("../trees/tickets.json")),
    ("hints", include_str!("../trees/hints.json")),
];

/// Read-only collection of trees, addressable by id and by intent.
#[derive(Debug, Clone, Default)]
pub struct TreeLibrary {
    trees: HashMap<String, DecisionTree>,
    by_intent: HashMap<IntentCategory, String>,
}

impl TreeLibrary {
    /// An empty library. Every intent lacks a tree.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The trees shipped with the crate.
    pub fn builtin() -> Result<Self, HachiError> {
        let mut library = Self::empty();
        for (name, json) in BUILTIN_TREES {
            let tree = DecisionTree::from_json(json).map_err(|e| HachiError::TreeLoad {
                tree: (*name).to_string(),
                message: e.to_string(),
            })?;
            library.insert(tree);
        }
        Ok(library)
    }

    /// Built-in trees overlaid with every `*.json` file in `dir`.
    ///
    /// A file whose `id` matches a built-in tree replaces it. Unreadable or
    /// invalid files are skipped with a warning so one bad tree does not take
    /// the tier down.
    pub fn builtin_with_dir(dir: &Path) -> Result<Self, HachiError> {
        let mut library = Self::builtin()?;
        let entries = std::fs::read_dir(dir).map_err(|e| HachiError::Config(format!(
            "cannot read tier1.trees_dir `{}`: {e}",
            dir.display()
        )))?;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let loaded = std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|json| DecisionTree::from_json(&json).map_err(|e| e.to_string()));
            match loaded {
                Ok(tree) => {
                    info!(tree = tree.id.as_str(), path = %path.display(), "loaded decision tree");
                    library.insert(tree);
                }
                Err(error) => warn!(path = %path.display(), %error, "skipping decision tree"),
            }
        }
        Ok(library)
    }

    /// Add or replace a tree.
    pub fn insert(&mut self, tree: DecisionTree) {
        if let Some(intent) = tree.intent {
            self.by_intent.insert(intent, tree.id.clone());
        }
        debug!(tree = tree.id.as_str(), nodes = tree.len(), "tree registered");
        self.trees.insert(tree.id.clone(), tree);
    }

    pub fn get(&self, id: &str) -> Option<&DecisionTree> {
        self.trees.get(id)
    }

    pub fn for_intent(&self, intent: IntentCategory) -> Option<&DecisionTree> {
        self.by_intent.get(&intent).and_then(|id| self.trees.get(id))
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}
