// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Walks of the built-in decision trees through the public processor API.

use std::collections::HashMap;
use std::sync::Arc;

use hachi_core::{
    ClassifiedRequest, CompanionRequest, ComplexityLevel, ConversationContext, GameContext,
    HachiError, IntentCategory, ProcessingTier, Processor, RequestType, Turn,
};
use hachi_tier1::{walk, RuleProcessor, Tier1Processor, TreeLibrary, WalkInput};

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

fn fresh_context() -> ConversationContext {
    ConversationContext::new("conv-1", "player-1", "beginner", "station_entrance")
}

fn builtin() -> Tier1Processor {
    Tier1Processor::new(Arc::new(TreeLibrary::builtin().unwrap()))
}

#[test]
fn ticket_question_walks_ask_word_then_provide_meaning() {
    let library = TreeLibrary::builtin().unwrap();
    let tree = library.for_intent(IntentCategory::VocabularyHelp).unwrap();
    let request = classified(
        "How do I say ticket in Japanese?",
        IntentCategory::VocabularyHelp,
        &[("word", "ticket")],
    );

    let outcome = walk(tree, WalkInput::from_request(tree, &request, &fresh_context())).unwrap();

    assert_eq!(outcome.path, vec!["ask_word", "provide_meaning"]);
    assert!(outcome.text.contains("means"), "{}", outcome.text);
    assert!(outcome.text.contains("きっぷ"), "{}", outcome.text);
    assert!(outcome.text.contains("kippu"), "{}", outcome.text);
}

#[tokio::test]
async fn kanji_follow_up_reuses_word_from_history() {
    let processor = builtin();
    let mut ctx = fresh_context();
    let earlier = classified("What does kippu mean?", IntentCategory::VocabularyHelp, &[("word", "kippu")]);
    ctx.request_history
        .push_back(Turn::from_exchange(&earlier, "きっぷ (kippu) means \"ticket\"", ProcessingTier::Tier1));

    let text = processor
        .process(
            &classified("Show me the kanji", IntentCategory::VocabularyHelp, &[]),
            &ctx,
        )
        .await
        .unwrap();

    assert!(text.contains("切符"), "{text}");
}

#[tokio::test]
async fn unknown_word_gets_a_gentle_reply() {
    let text = builtin()
        .process(
            &classified("What does zzyzx mean?", IntentCategory::VocabularyHelp, &[("word", "zzyzx")]),
            &fresh_context(),
        )
        .await
        .unwrap();
    assert!(text.contains("zzyzx"), "{text}");
}

#[tokio::test]
async fn directions_use_the_destination_glossary() {
    let text = builtin()
        .process(
            &classified(
                "Where is the ticket office?",
                IntentCategory::DirectionGuidance,
                &[("location", "ticket office")],
            ),
            &fresh_context(),
        )
        .await
        .unwrap();
    assert!(text.contains("きっぷうりば"), "{text}");
    assert!(text.contains("left"), "{text}");
}

#[tokio::test]
async fn grammar_point_is_explained() {
    let text = builtin()
        .process(
            &classified(
                "Explain the particle 'wo'",
                IntentCategory::GrammarExplanation,
                &[("grammar_point", "wo")],
            ),
            &fresh_context(),
        )
        .await
        .unwrap();
    assert!(text.starts_with("を (wo)"), "{text}");
}

#[tokio::test]
async fn ticket_price_question_follows_price_edge() {
    let text = builtin()
        .process(
            &classified("How much is a ticket?", IntentCategory::TicketInfo, &[]),
            &fresh_context(),
        )
        .await
        .unwrap();
    assert!(text.contains("いくら"), "{text}");
}

#[tokio::test]
async fn hints_depend_on_player_location() {
    let processor = builtin();
    let mut request = classified("I'm stuck", IntentCategory::GeneralHint, &[]);
    request.request = request.request.with_game_context(GameContext {
        player_location: "ticket_office".into(),
        ..GameContext::default()
    });

    let text = processor.process(&request, &fresh_context()).await.unwrap();
    assert!(text.contains("kippu wo kudasai"), "{text}");

    let nowhere = ConversationContext::new("c", "p", "beginner", "");
    let text = processor
        .process(&classified("I'm stuck", IntentCategory::GeneralHint, &[]), &nowhere)
        .await
        .unwrap();
    assert!(text.starts_with("Here's a hint: look around"), "{text}");
}

#[tokio::test]
async fn translation_has_no_tree_but_rule_tier_answers() {
    let request = classified(
        "Is 'kippu wo kudasai' correct?",
        IntentCategory::TranslationConfirmation,
        &[("text", "kippu wo kudasai")],
    );

    let err = builtin().process(&request, &fresh_context()).await.unwrap_err();
    assert!(matches!(err, HachiError::TierProcessing { tier: ProcessingTier::Tier1, .. }));

    let reply = RuleProcessor::new().process(&request, &fresh_context()).await.unwrap();
    assert!(!reply.is_empty());
    assert!(!reply.contains('{'), "{reply}");
}

#[tokio::test]
async fn trees_dir_override_changes_replies() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("chat.json"),
        r#"{
            "id": "chat", "name": "Small talk", "intent": "casual_chat", "root_node": "greet",
            "nodes": { "greet": { "type": "exit", "message": "Wan! Hello from a custom tree." } }
        }"#,
    )
    .unwrap();

    let config = hachi_config::model::Tier1Config {
        trees_dir: Some(dir.path().display().to_string()),
        ..Default::default()
    };
    let processor = Tier1Processor::from_config(&config).unwrap();
    let text = processor
        .process(&classified("hello!", IntentCategory::CasualChat, &[]), &fresh_context())
        .await
        .unwrap();
    assert_eq!(text, "Wan! Hello from a custom tree.");
}
