// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decision tree documents and their immutable in-memory graph.
//!
//! A tree is stored as an arena: nodes live in a `Vec` and transitions hold
//! indices into it. Every non-exit node must declare a `default` edge, and
//! edges naming a node that does not exist are rerouted at load time to the
//! `fallback` node (or the root when the tree has none).

use std::collections::HashMap;

use hachi_core::{HachiError, IntentCategory};
use serde::Deserialize;
use tracing::warn;

/// Name of the catch-all transition.
pub const DEFAULT_EDGE: &str = "default";

/// Node id that receives rerouted edges.
pub const FALLBACK_NODE: &str = "fallback";

/// On-disk representation of a tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreeDocument {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Intent this tree serves. `None` means it is only reachable by id.
    #[serde(default)]
    pub intent: Option<IntentCategory>,
    pub root_node: String,
    pub nodes: HashMap<String, NodeDocument>,
    /// Lookup table for `lookup:<var>` actions, keyed by lowercase term.
    #[serde(default)]
    pub glossary: HashMap<String, HashMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeDocument {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub transitions: HashMap<String, String>,
}

/// The four node variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Prompts the player. Follows an explicit edge when a signal matches,
    /// otherwise its message is the reply.
    Question,
    /// Replies with its message.
    Response,
    /// Runs an action and follows the edge named by the action's outcome.
    Process,
    /// Terminal. Replies with its message.
    Exit,
}

/// Action a process node performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Look the value of a variable up in the glossary. Outcomes are
    /// `found` (entry fields merged into the variables) and `not_found`.
    Lookup { var: String },
}

impl Action {
    fn parse(raw: &str) -> Option<Action> {
        let (verb, arg) = raw.split_once(':')?;
        match verb.trim() {
            "lookup" if !arg.trim().is_empty() => Some(Action::Lookup {
                var: arg.trim().to_string(),
            }),
            _ => None,
        }
    }
}

/// A node in the arena.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub message: String,
    pub action: Option<Action>,
    edges: Vec<(String, usize)>,
    default: Option<usize>,
}

impl Node {
    /// Target of an explicitly named edge. Never matches `default`.
    pub fn edge(&self, key: &str) -> Option<usize> {
        self.edges
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, idx)| *idx)
    }

    /// Target of the catch-all edge. Always `Some` for non-exit nodes.
    pub fn default_edge(&self) -> Option<usize> {
        self.default
    }

    /// Named edge if present, else the default edge.
    pub fn follow(&self, key: &str) -> Option<usize> {
        self.edge(key).or(self.default)
    }
}

/// An immutable, validated decision tree.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    pub id: String,
    pub name: String,
    pub description: String,
    pub intent: Option<IntentCategory>,
    root: usize,
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    glossary: HashMap<String, HashMap<String, String>>,
}

impl DecisionTree {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, HachiError> {
        let doc: TreeDocument = serde_json::from_str(json).map_err(|e| HachiError::TreeLoad {
            tree: "<unparsed>".to_string(),
            message: e.to_string(),
        })?;
        Self::from_document(doc)
    }

    /// Validate a document and lower it into the arena.
    pub fn from_document(doc: TreeDocument) -> Result<Self, HachiError> {
        let invalid = |message: String| HachiError::TreeLoad {
            tree: doc.id.clone(),
            message,
        };

        // Stable node order keeps indices reproducible across loads.
        let mut ids: Vec<&String> = doc.nodes.keys().collect();
        ids.sort();
        let index: HashMap<String, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| ((*id).clone(), i))
            .collect();

        let root = *index
            .get(&doc.root_node)
            .ok_or_else(|| invalid(format!("root node `{}` does not exist", doc.root_node)))?;
        let reroute = index.get(FALLBACK_NODE).copied().unwrap_or(root);

        let mut nodes = Vec::with_capacity(ids.len());
        for id in ids {
            let raw = &doc.nodes[id];

            let action = match (&raw.action, raw.kind) {
                (Some(a), NodeKind::Process) => Some(
                    Action::parse(a)
                        .ok_or_else(|| invalid(format!("node `{id}` has unknown action `{a}`")))?,
                ),
                (None, NodeKind::Process) => {
                    return Err(invalid(format!("process node `{id}` has no action")));
                }
                (Some(_), _) => {
                    return Err(invalid(format!("node `{id}` has an action but is not a process node")));
                }
                (None, _) => None,
            };

            let mut edges = Vec::new();
            let mut default = None;
            let mut keys: Vec<&String> = raw.transitions.keys().collect();
            keys.sort();
            for key in keys {
                let target = &raw.transitions[key];
                let idx = match index.get(target) {
                    Some(idx) => *idx,
                    None => {
                        warn!(
                            tree = doc.id.as_str(),
                            node = id.as_str(),
                            edge = key.as_str(),
                            target = target.as_str(),
                            "transition targets unknown node, rerouting to fallback"
                        );
                        reroute
                    }
                };
                if key == DEFAULT_EDGE {
                    default = Some(idx);
                } else {
                    edges.push((key.clone(), idx));
                }
            }

            if raw.kind != NodeKind::Exit && default.is_none() {
                return Err(invalid(format!("node `{id}` has no `default` transition")));
            }

            nodes.push(Node {
                id: id.clone(),
                kind: raw.kind,
                message: raw.message.clone(),
                action,
                edges,
                default,
            });
        }

        let glossary = doc
            .glossary
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();

        Ok(Self {
            id: doc.id,
            name: doc.name,
            description: doc.description,
            intent: doc.intent,
            root,
            nodes,
            index,
            glossary,
        })
    }

    pub fn root(&self) -> usize {
        self.root
    }

    pub fn node(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find a glossary entry by key, or by any of its `romaji`, `japanese`,
    /// or `meaning` fields. Case-insensitive.
    pub fn lookup(&self, term: &str) -> Option<&HashMap<String, String>> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return None;
        }
        self.glossary.get(&term).or_else(|| {
            self.glossary.values().find(|entry| {
                ["romaji", "japanese", "meaning"]
                    .iter()
                    .filter_map(|field| entry.get(*field))
                    .any(|v| v.to_lowercase() == term)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"{
        "id": "t", "name": "Test", "root_node": "start",
        "nodes": {
            "start": { "type": "question", "message": "Pick", "transitions": { "yes": "done", "no": "nowhere", "default": "start" } },
            "done": { "type": "exit", "message": "Bye" }
        },
        "glossary": { "Eki": { "japanese": "えき", "romaji": "eki", "meaning": "station" } }
    }"#;

    #[test]
    fn loads_into_arena() {
        let tree = DecisionTree::from_json(SMALL).unwrap();
        assert_eq!(tree.len(), 2);
        let root = tree.node(tree.root());
        assert_eq!(root.id, "start");
        assert_eq!(root.kind, NodeKind::Question);
        let done = root.edge("yes").unwrap();
        assert_eq!(tree.node(done).kind, NodeKind::Exit);
    }

    #[test]
    fn unknown_target_reroutes_to_root_without_fallback() {
        let tree = DecisionTree::from_json(SMALL).unwrap();
        let root = tree.node(tree.root());
        assert_eq!(root.edge("no"), Some(tree.root()));
    }

    #[test]
    #[tracing_test::traced_test]
    fn unknown_target_prefers_fallback_node() {
        let json = r#"{
            "id": "t", "name": "T", "root_node": "a",
            "nodes": {
                "a": { "type": "question", "message": "?", "transitions": { "x": "missing", "default": "a" } },
                "fallback": { "type": "question", "message": "Again?", "transitions": { "default": "a" } }
            }
        }"#;
        let tree = DecisionTree::from_json(json).unwrap();
        let target = tree.node(tree.root()).edge("x").unwrap();
        assert_eq!(tree.node(target).id, "fallback");
        assert!(logs_contain("rerouting to fallback"));
    }

    #[test]
    fn non_exit_node_requires_default_edge() {
        let json = r#"{
            "id": "t", "name": "T", "root_node": "a",
            "nodes": { "a": { "type": "response", "message": "hi", "transitions": {} } }
        }"#;
        let err = DecisionTree::from_json(json).unwrap_err();
        assert!(err.to_string().contains("default"), "{err}");
    }

    #[test]
    fn missing_root_is_rejected() {
        let json = r#"{ "id": "t", "name": "T", "root_node": "zzz", "nodes": {} }"#;
        assert!(matches!(
            DecisionTree::from_json(json),
            Err(HachiError::TreeLoad { .. })
        ));
    }

    #[test]
    fn process_node_needs_known_action() {
        let json = r#"{
            "id": "t", "name": "T", "root_node": "p",
            "nodes": { "p": { "type": "process", "action": "teleport:x", "transitions": { "default": "p" } } }
        }"#;
        assert!(DecisionTree::from_json(json).is_err());
    }

    #[test]
    fn glossary_lookup_by_key_or_field() {
        let tree = DecisionTree::from_json(SMALL).unwrap();
        assert_eq!(tree.lookup("EKI").unwrap()["meaning"], "station");
        assert_eq!(tree.lookup("station").unwrap()["romaji"], "eki");
        assert_eq!(tree.lookup("えき").unwrap()["meaning"], "station");
        assert!(tree.lookup("densha").is_none());
    }
}
