//! Integration tests for Slice 4
//!
//! Annotator seam: prompt, tolerant reply parsing, history trimming

use std::sync::Arc;
use journey_stage::core::annotation::{build_messages, EMPTY_REPLY_FALLBACK, GARBLED_REPLY_FALLBACK};
use journey_stage::core::{build_annotator_prompt, parse_annotator_reply, trim_history, TurnProcessor};
use journey_stage::types::{ChatMessage, QuestionnaireConfig, TurnReason};
use pretty_assertions::assert_eq;
use serde_json::json;

fn builtin() -> QuestionnaireConfig {
    QuestionnaireConfig::builtin().unwrap()
}

#[test]
fn test_clean_reply() {
    let reply = parse_annotator_reply(
        r#"{"assistant_message": "That sounds exciting.", "signals": {"Q1": 2, "Q2": null}}"#,
    );
    assert_eq!(reply.assistant_message, "That sounds exciting.");
    assert_eq!(reply.signals["Q1"], json!(2));
    assert_eq!(reply.signals["Q2"], json!(null));
}

#[test]
fn test_reply_wrapped_in_prose_and_fence() {
    let raw = "Sure! Here is my answer:\n```json\n{\"assistant_message\": \"How are evenings?\", \"signals\": {\"Q5\": 1}}\n```\nHope that helps.";
    let reply = parse_annotator_reply(raw);
    assert_eq!(reply.assistant_message, "How are evenings?");
    assert_eq!(reply.signals["Q5"], json!(1));
}

/// Message and signals split over two objects
#[test]
fn test_multiple_objects_merge_signals() {
    let raw = r#"{"assistant_message": "Tell me more."} {"signals": {"Q3": -1}} {"signals": {"Q4": 2}}"#;
    let reply = parse_annotator_reply(raw);
    assert_eq!(reply.assistant_message, "Tell me more.");
    assert_eq!(reply.signals.len(), 2);
    assert_eq!(reply.signals["Q3"], json!(-1));
    assert_eq!(reply.signals["Q4"], json!(2));
}

#[test]
fn test_message_paired_with_signals_wins() {
    let raw = r#"{"assistant_message": "draft"} {"assistant_message": "final", "signals": {"Q1": 1}}"#;
    assert_eq!(parse_annotator_reply(raw).assistant_message, "final");
}

#[test]
fn test_later_signal_overrides_earlier() {
    let raw = r#"{"signals": {"Q1": 1}} {"assistant_message": "ok", "signals": {"Q1": -2}}"#;
    assert_eq!(parse_annotator_reply(raw).signals["Q1"], json!(-2));
}

#[test]
fn test_array_of_fragments() {
    let raw = r#"[{"text": "I hear you."}, {"signals": {"Q7": 2}}, "stray"]"#;
    let reply = parse_annotator_reply(raw);
    assert_eq!(reply.assistant_message, "I hear you.");
    assert_eq!(reply.signals["Q7"], json!(2));
}

#[test]
fn test_python_style_reply() {
    let raw = "{'assistant_message': 'Noted.', 'signals': {'Q9': None, 'Q10': 1}}";
    let reply = parse_annotator_reply(raw);
    assert_eq!(reply.assistant_message, "Noted.");
    assert_eq!(reply.signals["Q9"], json!(null));
    assert_eq!(reply.signals["Q10"], json!(1));
}

/// Python-style reply whose message needs double quotes for an apostrophe
#[test]
fn test_python_style_reply_with_mixed_quotes() {
    let raw = r#"{'assistant_message': "It's been a long week, hasn't it?", 'signals': {'Q2': -1, 'Q8': None}}"#;
    let reply = parse_annotator_reply(raw);
    assert_eq!(reply.assistant_message, "It's been a long week, hasn't it?");
    assert_eq!(reply.signals["Q2"], json!(-1));
    assert_eq!(reply.signals["Q8"], json!(null));
}

#[test]
fn test_empty_reply_uses_fallback() {
    for raw in ["", "   \n\t"] {
        let reply = parse_annotator_reply(raw);
        assert_eq!(reply.assistant_message, EMPTY_REPLY_FALLBACK);
        assert!(reply.signals.is_empty());
    }
}

#[test]
fn test_plain_text_reply_kept() {
    let reply = parse_annotator_reply("What has surprised you most so far?");
    assert_eq!(reply.assistant_message, "What has surprised you most so far?");
    assert!(reply.signals.is_empty());
}

#[test]
fn test_structured_only_reply_without_message() {
    let reply = parse_annotator_reply("```\n{\"signals\": {\"Q1\": 2}}\n```");
    assert_eq!(reply.assistant_message, GARBLED_REPLY_FALLBACK);
    assert_eq!(reply.signals["Q1"], json!(2));
}

#[test]
fn test_prompt_lists_questions_and_scale() {
    let cfg = builtin();
    let prompt = build_annotator_prompt(&cfg);
    for q in &cfg.questions {
        assert!(prompt.contains(&format!("- {}: {}", q.id, q.text)));
    }
    assert!(prompt.contains("-2, -1, 0, 1, 2"));
    assert!(prompt.contains("\"Q20\": null"));
    assert!(prompt.contains("assistant_message"));
}

#[test]
fn test_build_messages_orders_system_history_user() {
    let cfg = builtin();
    let history: Vec<_> = (0..10)
        .map(|i| {
            let role = if i % 2 == 0 { "user" } else { "assistant" };
            json!({"role": role, "content": i.to_string()})
        })
        .collect();
    let messages = build_messages(&cfg, &history, "now", 4);

    assert_eq!(messages.len(), 6);
    assert_eq!(messages[0].role, "system");
    assert_eq!(messages[1], ChatMessage::user("6"));
    assert_eq!(messages[5], ChatMessage::user("now"));
}

#[test]
fn test_trim_history_zero_window() {
    let history = vec![json!({"role": "user", "content": "hi"})];
    assert!(trim_history(&history, 0).is_empty());
}

/// A parsed reply drives a turn: junk values are dropped, valid ones merged
#[test]
fn test_parsed_reply_feeds_turn_processor() {
    let processor = TurnProcessor::new(Arc::new(builtin()));
    let raw = r#"Okay. {"assistant_message": "Glad to hear it.", "signals": {"Q11": 2, "Q12": "high", "Q99": 1}}"#;
    let reply = parse_annotator_reply(raw);

    let result = processor.process(None, &reply.signals);
    assert_eq!(result.outcome.reason, TurnReason::T001_SIGNALS_MERGED);
    assert_eq!(result.state.signals.len(), 1);
    assert_eq!(result.state.signals["Q11"], Some(2));
    assert_eq!(result.outcome.signals["Q12"], None);
    assert!(!result.outcome.signals.contains_key("Q99"));
}
