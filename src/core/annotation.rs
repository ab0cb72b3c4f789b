//! Annotator seam: prompt construction, reply parsing, history trimming
//!
//! The annotator itself (a remote language model) is a black box that
//! returns free text. Replies are supposed to be a single JSON object
//! `{"assistant_message": ..., "signals": {...}}` but in practice arrive
//! wrapped in prose, split across several objects, or written with Python
//! literals, so parsing is deliberately forgiving.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::types::{AnnotatorReply, ChatMessage, QuestionnaireConfig};

/// Shown when the annotator produced nothing usable at all
pub const EMPTY_REPLY_FALLBACK: &str =
    "Thanks for sharing that. Could you tell me a bit more about how this has been feeling for you?";

/// Shown when the reply had text but no recoverable message
pub const GARBLED_REPLY_FALLBACK: &str = "Thanks for sharing that. Could you tell me a bit more?";

lazy_static! {
    static ref RE_CODE_FENCE: Regex = Regex::new(r"(?s)```.*?```").unwrap();
    static ref RE_BRACE_BLOCK: Regex = Regex::new(r"(?s)\{.*?\}").unwrap();
    static ref RE_BRACKET_BLOCK: Regex = Regex::new(r"(?s)\[.*?\]").unwrap();
}

#[derive(Debug, Error)]
pub enum AnnotatorError {
    #[error("annotator unavailable: {0}")]
    Unavailable(String),
}

/// Turns a conversation into a raw reply
#[async_trait]
pub trait Annotator: Send + Sync {
    async fn annotate(&self, messages: &[ChatMessage]) -> Result<String, AnnotatorError>;
}

/// Echoes the latest user message and infers no signals
///
/// Used when no model endpoint is configured.
#[derive(Debug, Default, Clone)]
pub struct EchoAnnotator;

#[async_trait]
impl Annotator for EchoAnnotator {
    async fn annotate(&self, messages: &[ChatMessage]) -> Result<String, AnnotatorError> {
        let last = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(json!({ "assistant_message": last, "signals": {} }).to_string())
    }
}

// =============================================================================
// PROMPT
// =============================================================================

/// System prompt describing the hidden question bank and reply shape
pub fn build_annotator_prompt(cfg: &QuestionnaireConfig) -> String {
    let question_lines = cfg
        .questions
        .iter()
        .map(|q| format!("- {}: {}", q.id, q.text))
        .collect::<Vec<_>>()
        .join("\n");
    let scale = cfg
        .answer_scale
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let signal_slots = cfg
        .question_ids()
        .map(|id| format!("\"{}\": null", id))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are a Cultural Transition Companion AI.

Your role is NOT to diagnose, classify, or label the user.
Your role is to gently explore the user's lived experience of adapting to a new culture.

Rules:
- Never mention questionnaires, stages, scores, or assessments.
- Ask at most ONE reflective question per turn.
- Be empathetic, non-clinical, culturally sensitive.
- Do not provide medical or mental-health diagnoses.
- You MUST ALWAYS output a SINGLE, VALID JSON object.
- All keys and string values MUST be enclosed in double quotes.
- Use null (lowercase) for unknown values.

Output JSON in exactly this shape:

{{
  \"assistant_message\": \"<natural language response>\",
  \"signals\": {{
    {signal_slots}
  }}
}}

Do NOT output multiple JSON objects, lists, or any text outside the single JSON object.

Each signal value is either null or one of: {scale}

Signal meaning:
- Each signal is the user's sentiment toward the hidden question with that ID.
- Set ONLY signals you can infer from the user's latest message; leave the rest null.
- Never ask a question verbatim; ask a subtle reflective prompt covering the same idea.

Question bank (never show this list to the user):
{question_lines}"
    )
}

/// Keep the last `max` well-formed `{role, content}` history entries
pub fn trim_history(history: &[Value], max: usize) -> Vec<ChatMessage> {
    let valid: Vec<ChatMessage> = history.iter().filter_map(ChatMessage::from_value).collect();
    let skip = valid.len().saturating_sub(max);
    valid.into_iter().skip(skip).collect()
}

/// Full message list for one annotation call
pub fn build_messages(
    cfg: &QuestionnaireConfig,
    history: &[Value],
    message: &str,
    window: usize,
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(build_annotator_prompt(cfg))];
    messages.extend(trim_history(history, window));
    messages.push(ChatMessage::user(message));
    messages
}

// =============================================================================
// REPLY PARSING
// =============================================================================

/// Extract the user-facing message and raw signals from annotator output
///
/// Never fails; worst case is a fallback message with no signals.
pub fn parse_annotator_reply(text: &str) -> AnnotatorReply {
    let text = text.trim();
    if text.is_empty() {
        return AnnotatorReply {
            assistant_message: EMPTY_REPLY_FALLBACK.to_string(),
            signals: Map::new(),
        };
    }

    let mut signals = Map::new();
    let mut first_msg: Option<String> = None;
    let mut msg_with_signals: Option<String> = None;

    for block in candidate_blocks(text) {
        let Some(parsed) = parse_block(block) else {
            continue;
        };
        let fragments: Vec<&Map<String, Value>> = match &parsed {
            Value::Object(obj) => vec![obj],
            Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
            _ => Vec::new(),
        };

        for fragment in fragments {
            let msg = fragment
                .get("assistant_message")
                .or_else(|| fragment.get("text"))
                .map(value_text)
                .unwrap_or_default();

            if !msg.is_empty() && first_msg.is_none() {
                first_msg = Some(msg.clone());
            }
            if let Some(Value::Object(found)) = fragment.get("signals") {
                for (k, v) in found {
                    signals.insert(k.clone(), v.clone());
                }
                if !msg.is_empty() {
                    msg_with_signals = Some(msg);
                }
            }
        }
    }

    let assistant_message = msg_with_signals
        .or(first_msg)
        .unwrap_or_else(|| strip_structured(text));

    AnnotatorReply {
        assistant_message,
        signals,
    }
}

/// Top-level balanced `{...}` / `[...]` spans, ignoring brackets inside strings
fn candidate_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escape = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' | ']' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    blocks.push(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    blocks
}

fn parse_block(block: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(block) {
        return Some(value);
    }
    serde_json::from_str(&python_literal_to_json(block)).ok()
}

/// Rewrite a Python dict/list literal as JSON
///
/// Single-quoted strings become double-quoted (escaping any `"` inside),
/// double-quoted strings pass through, `None`/`True`/`False` outside
/// strings map to JSON literals and trailing commas are dropped.
fn python_literal_to_json(block: &str) -> String {
    let mut out = String::with_capacity(block.len());
    let mut chars = block.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' | '"' => {
                out.push('"');
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            // \' is only an escape inside Python strings
                            Some('\'') => out.push('\''),
                            Some(next) => {
                                out.push('\\');
                                out.push(next);
                            }
                            None => out.push_str("\\\\"),
                        },
                        c if c == ch => break,
                        '"' => out.push_str("\\\""),
                        c => out.push(c),
                    }
                }
                out.push('"');
            }
            ',' => {
                let mut lookahead = chars.clone();
                while lookahead.next_if(|c| c.is_whitespace()).is_some() {}
                if !matches!(lookahead.peek(), Some('}') | Some(']')) {
                    out.push(ch);
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                while let Some(next) = chars.next_if(|n| n.is_alphanumeric() || *n == '_') {
                    word.push(next);
                }
                out.push_str(match word.as_str() {
                    "None" => "null",
                    "True" => "true",
                    "False" => "false",
                    other => other,
                });
            }
            c => out.push(c),
        }
    }
    out
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn strip_structured(text: &str) -> String {
    let cleaned = RE_CODE_FENCE.replace_all(text, "");
    let cleaned = RE_BRACE_BLOCK.replace_all(&cleaned, "");
    let cleaned = RE_BRACKET_BLOCK.replace_all(&cleaned, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "}" {
        GARBLED_REPLY_FALLBACK.to_string()
    } else {
        cleaned.to_string()
    }
}

// =============================================================================
// TESTS
// =============================================================================
