// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Walks a [`DecisionTree`] for a single request.

use std::collections::HashMap;

use hachi_core::{ClassifiedRequest, ConversationContext, HachiError, ProcessingTier};
use tracing::trace;

use crate::render::render;
use crate::tree::{Action, DecisionTree, NodeKind};

/// Upper bound on node visits per walk. Trees whose edges cycle without
/// consuming a signal hit this and fail the tier.
pub const MAX_STEPS: usize = 32;

/// Result of a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOutcome {
    pub text: String,
    /// Node ids visited, root first.
    pub path: Vec<String>,
}

/// Input to a walk: ordered transition signals and template variables.
#[derive(Debug, Clone, Default)]
pub struct WalkInput {
    pub signals: Vec<String>,
    pub vars: HashMap<String, String>,
}

impl WalkInput {
    /// Derive signals and variables from a request and its conversation.
    ///
    /// Signal order matters: a question node follows the first signal it has
    /// an explicit edge for. `known_word` precedes `word_provided` so a tree
    /// can branch on whether the glossary recognises the word.
    pub fn from_request(
        tree: &DecisionTree,
        request: &ClassifiedRequest,
        context: &ConversationContext,
    ) -> Self {
        let mut vars: HashMap<String, String> = request
            .extracted_entities
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let lower = request.player_input().to_lowercase();
        let asks_kanji = lower.contains("kanji");
        let asks_example = lower.contains("example");

        // "Show me the kanji" carries no word; borrow it from the last turn.
        if !vars.contains_key("word") && (asks_kanji || asks_example) {
            if let Some(word) = context.last_turn().and_then(|t| t.entities.get("word")) {
                vars.insert("word".to_string(), word.clone());
            }
        }
        if let Some(target) = &request.request.target_entity {
            vars.entry("target".to_string()).or_insert_with(|| target.clone());
        }
        if let Some(destination) = &request.request.target_location {
            vars.entry("location".to_string())
                .or_insert_with(|| destination.clone());
        }
        let here = if request.request.game_context.player_location.is_empty() {
            context.current_location.clone()
        } else {
            request.request.game_context.player_location.clone()
        };
        if !here.is_empty() {
            vars.insert("current_location".to_string(), here);
        }
        vars.insert("player_input".to_string(), request.player_input().to_string());

        let mut signals = Vec::new();
        if let Some(word) = vars.get("word").cloned() {
            if let Some(entry) = tree.lookup(&word) {
                signals.push("known_word".to_string());
                merge_entry(&mut vars, entry);
            }
            signals.push("word_provided".to_string());
        }
        if vars.contains_key("location") {
            signals.push("location_provided".to_string());
        }
        if vars.contains_key("destination") {
            signals.push("destination_provided".to_string());
        }
        if vars.contains_key("grammar_point") {
            signals.push("grammar_point_provided".to_string());
        }
        if vars.contains_key("text") {
            signals.push("text_provided".to_string());
        }
        if asks_kanji {
            signals.push("ask_for_kanji".to_string());
        }
        if asks_example {
            signals.push("ask_for_example".to_string());
        }
        if ["how much", "price", "cost", "fare"]
            .iter()
            .any(|k| lower.contains(k))
        {
            signals.push("ask_price".to_string());
        }
        if is_negative(&lower) {
            signals.push("no".to_string());
        } else if is_affirmative(&lower) {
            signals.push("yes".to_string());
        }

        Self { signals, vars }
    }
}

fn merge_entry(vars: &mut HashMap<String, String>, entry: &HashMap<String, String>) {
    for (k, v) in entry {
        vars.entry(k.clone()).or_insert_with(|| v.clone());
    }
}

fn is_affirmative(lower: &str) -> bool {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| matches!(w, "yes" | "yeah" | "sure" | "ok" | "okay" | "thanks" | "thank" | "hai"))
}

fn is_negative(lower: &str) -> bool {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| matches!(w, "no" | "nope" | "iie"))
}

/// Walk `tree` from its root.
pub fn walk(tree: &DecisionTree, mut input: WalkInput) -> Result<WalkOutcome, HachiError> {
    let mut current = tree.root();
    let mut path = Vec::new();

    for _ in 0..MAX_STEPS {
        let node = tree.node(current);
        path.push(node.id.clone());
        trace!(tree = tree.id.as_str(), node = node.id.as_str(), "visit");

        let next = match node.kind {
            NodeKind::Response | NodeKind::Exit => {
                return Ok(WalkOutcome {
                    text: render(&node.message, &input.vars),
                    path,
                });
            }
            NodeKind::Question => {
                let hit = input
                    .signals
                    .iter()
                    .position(|s| node.edge(s).is_some());
                match hit {
                    Some(pos) => {
                        let signal = input.signals.remove(pos);
                        node.edge(&signal)
                    }
                    None => {
                        return Ok(WalkOutcome {
                            text: render(&node.message, &input.vars),
                            path,
                        });
                    }
                }
            }
            NodeKind::Process => {
                let outcome = match &node.action {
                    Some(Action::Lookup { var }) => {
                        let entry = input
                            .vars
                            .get(var)
                            .and_then(|value| tree.lookup(value))
                            .cloned();
                        match entry {
                            Some(entry) => {
                                merge_entry(&mut input.vars, &entry);
                                "found"
                            }
                            None => "not_found",
                        }
                    }
                    None => "default",
                };
                node.follow(outcome)
            }
        };

        current = next.ok_or_else(|| {
            HachiError::processing(
                ProcessingTier::Tier1,
                format!("node `{}` in tree `{}` has no way forward", node.id, tree.id),
            )
        })?;
    }

    Err(HachiError::processing(
        ProcessingTier::Tier1,
        format!("tree `{}` exceeded {MAX_STEPS} steps", tree.id),
    ))
}
