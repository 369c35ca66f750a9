// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly for the LLM tiers.
//!
//! A prompt is built from five sections, in order: the companion persona,
//! the intent-specific task, the game situation, recent conversation turns,
//! and the player's question followed by the response rules. Empty sections
//! are dropped.

use hachi_core::{ClassifiedRequest, ConversationContext, IntentCategory};

use crate::state::{detect_state, ConversationState};

const RESPONSE_RULES: &str = "\
RULES:
1. Keep the reply under 3 sentences.
2. Use only JLPT N5 level Japanese, written in hiragana.
3. Follow every Japanese phrase with its romaji in parentheses.
4. Introduce at most one new concept.
5. Only talk about Japanese, navigating the station, or how to play the game. Politely steer anything else back.";

/// Builds LLM prompts from a classified request and a conversation snapshot.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    companion_name: String,
    history_turns: usize,
    extra_instructions: Option<String>,
}

impl PromptBuilder {
    pub fn new(companion_name: impl Into<String>, history_turns: usize) -> Self {
        Self {
            companion_name: companion_name.into(),
            history_turns,
            extra_instructions: None,
        }
    }

    /// Append tier-specific instructions after the response rules.
    pub fn with_extra_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.extra_instructions = Some(instructions.into());
        self
    }

    /// Assemble the full prompt.
    pub fn build(&self, request: &ClassifiedRequest, context: &ConversationContext) -> String {
        let state = detect_state(request.player_input(), context);

        let sections = [
            Some(self.persona()),
            Some(intent_task(request.intent).to_string()),
            situation(request, context),
            self.history(context),
            state.prompt_guidance().map(str::to_string),
            Some(question(request)),
            Some(RESPONSE_RULES.to_string()),
            self.extra_instructions.clone(),
        ];

        sections
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// The conversation state the prompt was built for. Exposed for logging.
    pub fn state_for(&self, request: &ClassifiedRequest, context: &ConversationContext) -> ConversationState {
        detect_state(request.player_input(), context)
    }

    fn persona(&self) -> String {
        format!(
            "You are {name}, a friendly Akita dog who lives at a busy Tokyo railway station. \
             You help an English-speaking traveller learn beginner Japanese while they find their way around. \
             Speak warmly and briefly, as {name}.",
            name = self.companion_name
        )
    }

    fn history(&self, context: &ConversationContext) -> Option<String> {
        if self.history_turns == 0 || context.request_history.is_empty() {
            return None;
        }
        let lines: Vec<String> = context
            .recent_turns(self.history_turns)
            .map(|turn| {
                format!(
                    "Player: {}\n{}: {}",
                    turn.player_input, self.companion_name, turn.response_text
                )
            })
            .collect();
        Some(format!("RECENT CONVERSATION:\n{}", lines.join("\n")))
    }
}

fn intent_task(intent: IntentCategory) -> &'static str {
    match intent {
        IntentCategory::VocabularyHelp => {
            "TASK: Explain a Japanese word. Give the word in hiragana, its English meaning, \
             and one short example sentence a traveller could use at the station. \
             Example: \"Ticket is きっぷ (kippu). You can say: きっぷ を ください (kippu wo kudasai).\""
        }
        IntentCategory::GrammarExplanation => {
            "TASK: Explain one JLPT N5 grammar point with one simple station example. \
             Example: \"Use を (wo) for tickets. きっぷ を かいます (kippu wo kaimasu) means 'I buy a ticket.'\""
        }
        IntentCategory::DirectionGuidance => {
            "TASK: Help the player find their way. Name the place in Japanese and give one short direction."
        }
        IntentCategory::TranslationConfirmation => {
            "TASK: Check the player's translation. Say whether it is right, then give the natural phrasing."
        }
        IntentCategory::TicketInfo => {
            "TASK: Help the player buy or use a train ticket. Teach one useful phrase for the ticket machine or counter."
        }
        IntentCategory::CasualChat => {
            "TASK: Reply to small talk in character, then nudge the player back toward their journey."
        }
        IntentCategory::GeneralHint => {
            "TASK: Give the player a gentle hint about what to do next without solving it for them."
        }
    }
}

fn situation(request: &ClassifiedRequest, context: &ConversationContext) -> Option<String> {
    let game = &request.request.game_context;
    let location = if game.player_location.is_empty() {
        context.current_location.as_str()
    } else {
        game.player_location.as_str()
    };

    let mut lines = Vec::new();
    if !location.is_empty() {
        lines.push(format!("Location: {}", location.replace('_', " ")));
    }
    if let Some(quest) = &game.current_quest {
        match &game.quest_step {
            Some(step) => lines.push(format!("Quest: {quest} (step: {step})")),
            None => lines.push(format!("Quest: {quest}")),
        }
    }
    if !game.nearby_entities.is_empty() {
        lines.push(format!("Nearby: {}", game.nearby_entities.join(", ")));
    }
    if !context.player_language_level.is_empty() {
        lines.push(format!("Learner level: {}", context.player_language_level));
    }

    if lines.is_empty() {
        None
    } else {
        Some(format!("SITUATION:\n{}", lines.join("\n")))
    }
}

fn question(request: &ClassifiedRequest) -> String {
    let mut out = format!("PLAYER ASKS: {}", request.player_input());
    let mut entities: Vec<_> = request
        .extracted_entities
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .collect();
    if !entities.is_empty() {
        entities.sort();
        let joined: Vec<String> = entities.iter().map(|(k, v)| format!("{k}={v}")).collect();
        out.push_str(&format!("\n(Detected: {})", joined.join(", ")));
    }
    out
}
