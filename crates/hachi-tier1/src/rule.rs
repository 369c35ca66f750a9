// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted rule tier: intent-keyed reply templates with entity substitution.
//!
//! This is the floor of the cascade. It never fails: when no intent template
//! can be filled from the request, a generic fallback template is used.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use hachi_core::{ClassifiedRequest, ConversationContext, HachiError, IntentCategory, ProcessingTier, Processor};
use tracing::debug;

use crate::library::TreeLibrary;
use crate::render::{is_satisfied, render};

/// Templates that need no variables. Always at least one.
const FALLBACK_TEMPLATES: &[&str] = &[
    "I'm not sure I understand. Could you rephrase that?",
    "I don't have information about that. Can I help with something else?",
    "I'm still learning and don't know about that yet.",
];

fn builtin_templates(intent: IntentCategory) -> &'static [&'static str] {
    match intent {
        IntentCategory::VocabularyHelp => &[
            "'{meaning}' in Japanese is {japanese} ({romaji}).",
            "The Japanese word '{japanese}' ({romaji}) means '{meaning}' in English.",
            "'{japanese}' ({romaji}) is the Japanese word for '{meaning}'.",
        ],
        IntentCategory::GrammarExplanation => &[
            "The particle {japanese} ({romaji}) {explanation}",
            "In Japanese, {japanese} ({romaji}) is the {meaning}. It {explanation}",
            "Grammar points can be tricky! Ask me about a particle like wa, wo, or ni.",
        ],
        IntentCategory::DirectionGuidance => &[
            "To get to the {meaning}, {directions}",
            "Here's how to reach the {meaning}: {directions}",
            "Ask a station attendant: すみません、{location} は どこ です か (sumimasen, ... wa doko desu ka)?",
        ],
        IntentCategory::TranslationConfirmation => &[
            "Let me check '{text}'. Try saying it out loud and I'll listen for the particles!",
            "Translations are hard to check from the rulebook. Say it slowly: each word, then the particle.",
        ],
        IntentCategory::TicketInfo => &[
            "To buy a ticket, say きっぷ を ください (kippu wo kudasai) at the counter.",
            "Tickets are sold at the ticket machine. Look for the きっぷ (kippu) sign.",
        ],
        IntentCategory::CasualChat => &[
            "Woof! こんにちは (konnichiwa)! Shall we keep exploring the station?",
            "Wan wan! I'm happy to travel with you. Where shall we go next?",
        ],
        IntentCategory::GeneralHint => &[
            "Here's a hint: {hint}",
            "Let me give you a tip: {hint}",
            "Try looking around the {current_location}. Something here might help you.",
            "If you're stuck, try asking me how to say something in Japanese!",
        ],
    }
}

/// Scripted processor for [`ProcessingTier::Rule`].
#[derive(Debug, Clone)]
pub struct RuleProcessor {
    templates: HashMap<IntentCategory, Vec<String>>,
    fallback: Vec<String>,
    glossaries: Option<Arc<TreeLibrary>>,
}

impl Default for RuleProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleProcessor {
    /// Processor with the built-in template set.
    pub fn new() -> Self {
        let templates = [
            IntentCategory::VocabularyHelp,
            IntentCategory::GrammarExplanation,
            IntentCategory::DirectionGuidance,
            IntentCategory::TranslationConfirmation,
            IntentCategory::TicketInfo,
            IntentCategory::CasualChat,
            IntentCategory::GeneralHint,
        ]
        .into_iter()
        .map(|intent| {
            let set = builtin_templates(intent).iter().map(|t| t.to_string()).collect();
            (intent, set)
        })
        .collect();

        Self {
            templates,
            fallback: FALLBACK_TEMPLATES.iter().map(|t| t.to_string()).collect(),
            glossaries: None,
        }
    }

    /// Fill template variables from the glossaries of the decision trees too.
    pub fn with_glossaries(mut self, library: Arc<TreeLibrary>) -> Self {
        self.glossaries = Some(library);
        self
    }

    /// Replace the templates for one intent. An empty set leaves only the
    /// fallback templates for that intent.
    pub fn with_templates(mut self, intent: IntentCategory, templates: Vec<String>) -> Self {
        self.templates.insert(intent, templates);
        self
    }

    /// Choose and render a reply.
    pub fn respond(&self, request: &ClassifiedRequest, context: &ConversationContext) -> String {
        let vars = self.variables(request, context);

        let candidates: Vec<&String> = self
            .templates
            .get(&request.intent)
            .into_iter()
            .flatten()
            .filter(|t| is_satisfied(t, &vars))
            .collect();

        let pool: Vec<&String> = if candidates.is_empty() {
            self.fallback.iter().collect()
        } else {
            candidates
        };

        let pick = stable_index(request.request_id(), pool.len());
        debug!(
            request_id = request.request_id(),
            intent = %request.intent,
            candidates = pool.len(),
            pick,
            "rule template chosen"
        );
        match pool.get(pick) {
            Some(template) => render(template, &vars),
            None => FALLBACK_TEMPLATES[0].to_string(),
        }
    }

    fn variables(&self, request: &ClassifiedRequest, context: &ConversationContext) -> HashMap<String, String> {
        let mut vars: HashMap<String, String> = request
            .extracted_entities
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let here = if request.request.game_context.player_location.is_empty() {
            context.current_location.as_str()
        } else {
            request.request.game_context.player_location.as_str()
        };
        if !here.is_empty() {
            vars.insert("current_location".to_string(), here.replace('_', " "));
        }

        if let Some(tree) = self
            .glossaries
            .as_ref()
            .and_then(|library| library.for_intent(request.intent))
        {
            let term = ["word", "grammar_point", "location"]
                .iter()
                .find_map(|k| vars.get(*k).cloned())
                .or_else(|| (!here.is_empty()).then(|| here.to_string()));
            if let Some(entry) = term.as_deref().and_then(|t| tree.lookup(t)) {
                for (k, v) in entry {
                    vars.entry(k.clone()).or_insert_with(|| v.clone());
                }
            }
        }
        vars
    }
}

/// Deterministic index in `0..len` derived from the request id.
fn stable_index(request_id: &str, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let hash = request_id
        .bytes()
        .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
    hash % len
}

#[async_trait]
impl Processor for RuleProcessor {
    fn tier(&self) -> ProcessingTier {
        ProcessingTier::Rule
    }

    fn name(&self) -> &str {
        "rule"
    }

    async fn process(
        &self,
        request: &ClassifiedRequest,
        context: &ConversationContext,
    ) -> Result<String, HachiError> {
        Ok(self.respond(request, context))
    }
}
