//! Questionnaire loading and fingerprinting
//!
//! Loading validates the document structure and fills in 0.0 for any
//! declared stage a question does not weight. The fingerprint is a SHA-256
//! over a key-sorted canonical JSON rendering (`", "` / `": "` separators,
//! non-ASCII escaped as `\uXXXX`), truncated to 12 hex chars.
//!
//! The rendering always includes `version` and `answer_scale`, defaulted
//! when the document omits them. Fingerprints recorded for definitions that
//! declare both keys (the built-in one included) are reproduced exactly;
//! a definition relying on the defaults hashes as if it had declared them.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::types::{Question, QuestionnaireConfig};
use crate::{DEFAULT_ANSWER_SCALE, DEFAULT_CONFIG_VERSION, DEFAULT_QUESTIONNAIRE_JSON, FINGERPRINT_LEN};

/// Structural problems in a questionnaire definition; fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("questionnaire is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read questionnaire {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("questionnaire must be a JSON object")]
    NotAnObject,

    #[error("questionnaire is missing `{field}`")]
    MissingField { field: &'static str },

    #[error("questionnaire field `{field}` has the wrong shape")]
    InvalidField { field: &'static str },

    #[error("questionnaire field `{field}` must not be empty")]
    Empty { field: &'static str },

    #[error("question #{index} is missing `{field}`")]
    MissingQuestionField { index: usize, field: &'static str },

    #[error("question #{index} field `{field}` has the wrong shape")]
    InvalidQuestionField { index: usize, field: &'static str },

    #[error("duplicate question id `{0}`")]
    DuplicateQuestion(String),

    #[error("duplicate stage code `{0}`")]
    DuplicateStage(String),

    #[error("question `{question}` has a non-numeric weight for stage `{stage}`")]
    InvalidWeight { question: String, stage: String },

    #[error("answer_scale must contain only integers")]
    InvalidScale,
}

impl QuestionnaireConfig {
    /// The questionnaire compiled into the crate
    pub fn builtin() -> Result<Self, ConfigError> {
        load(DEFAULT_QUESTIONNAIRE_JSON)
    }

    /// Content fingerprint, see [`fingerprint`]
    pub fn fingerprint(&self) -> String {
        fingerprint(self)
    }
}

/// Parse and validate a JSON questionnaire definition
pub fn load(raw: &str) -> Result<QuestionnaireConfig, ConfigError> {
    let value: Value = serde_json::from_str(raw)?;
    load_value(value)
}

/// Read a questionnaire definition from disk
pub fn load_path(path: impl AsRef<Path>) -> Result<QuestionnaireConfig, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load(&raw)
}

/// Validate an already-parsed definition
pub fn load_value(value: Value) -> Result<QuestionnaireConfig, ConfigError> {
    let obj = value.as_object().ok_or(ConfigError::NotAnObject)?;

    let stages = parse_stages(obj)?;
    let answer_scale = parse_scale(obj)?;

    let raw_questions = obj
        .get("questions")
        .ok_or(ConfigError::MissingField { field: "questions" })?
        .as_array()
        .ok_or(ConfigError::InvalidField { field: "questions" })?;
    if raw_questions.is_empty() {
        return Err(ConfigError::Empty { field: "questions" });
    }

    let mut seen = HashSet::new();
    let mut questions = Vec::with_capacity(raw_questions.len());
    for (index, raw) in raw_questions.iter().enumerate() {
        let question = parse_question(index, raw, &stages)?;
        if !seen.insert(question.id.clone()) {
            return Err(ConfigError::DuplicateQuestion(question.id));
        }
        questions.push(question);
    }

    let version = match obj.get("version") {
        None | Some(Value::Null) => DEFAULT_CONFIG_VERSION.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    Ok(QuestionnaireConfig {
        version,
        stages,
        answer_scale,
        questions,
    })
}

fn parse_stages(obj: &Map<String, Value>) -> Result<Vec<String>, ConfigError> {
    let raw = obj
        .get("stages")
        .ok_or(ConfigError::MissingField { field: "stages" })?
        .as_array()
        .ok_or(ConfigError::InvalidField { field: "stages" })?;
    if raw.is_empty() {
        return Err(ConfigError::Empty { field: "stages" });
    }

    let mut stages: Vec<String> = Vec::with_capacity(raw.len());
    for item in raw {
        let code = item
            .as_str()
            .ok_or(ConfigError::InvalidField { field: "stages" })?;
        if stages.iter().any(|s| s == code) {
            return Err(ConfigError::DuplicateStage(code.to_string()));
        }
        stages.push(code.to_string());
    }
    Ok(stages)
}

fn parse_scale(obj: &Map<String, Value>) -> Result<Vec<i64>, ConfigError> {
    match obj.get("answer_scale") {
        None | Some(Value::Null) => Ok(DEFAULT_ANSWER_SCALE.to_vec()),
        Some(Value::Array(items)) => {
            if items.is_empty() {
                return Err(ConfigError::Empty { field: "answer_scale" });
            }
            items
                .iter()
                .map(|v| v.as_i64().ok_or(ConfigError::InvalidScale))
                .collect()
        }
        Some(_) => Err(ConfigError::InvalidScale),
    }
}

fn parse_question(index: usize, raw: &Value, stages: &[String]) -> Result<Question, ConfigError> {
    let obj = raw
        .as_object()
        .ok_or(ConfigError::InvalidQuestionField { index, field: "question" })?;

    let id = required_str(obj, index, "id")?;
    let text = required_str(obj, index, "text")?;
    let raw_weights = obj
        .get("weights")
        .ok_or(ConfigError::MissingQuestionField { index, field: "weights" })?
        .as_object()
        .ok_or(ConfigError::InvalidQuestionField { index, field: "weights" })?;

    // Only declared stages survive; undeclared weight keys are dropped.
    let mut weights = BTreeMap::new();
    for stage in stages {
        let weight = match raw_weights.get(stage) {
            None => 0.0,
            Some(v) => weight_value(v).ok_or_else(|| ConfigError::InvalidWeight {
                question: id.clone(),
                stage: stage.clone(),
            })?,
        };
        weights.insert(stage.clone(), weight);
    }

    Ok(Question { id, text, weights })
}

fn required_str(obj: &Map<String, Value>, index: usize, field: &'static str) -> Result<String, ConfigError> {
    obj.get(field)
        .ok_or(ConfigError::MissingQuestionField { index, field })?
        .as_str()
        .map(str::to_string)
        .ok_or(ConfigError::InvalidQuestionField { index, field })
}

fn weight_value(value: &Value) -> Option<f64> {
    let weight = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    // inf/NaN would poison every probability they touch
    weight.filter(|w| w.is_finite())
}

// =============================================================================
// FINGERPRINT
// =============================================================================

/// Deterministic content digest of a loaded questionnaire
///
/// Stable under key reordering of the source document; changes with any
/// stage, scale, weight, text or version change.
pub fn fingerprint(cfg: &QuestionnaireConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(cfg).as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..FINGERPRINT_LEN].to_string()
}

/// Canonical rendering hashed by [`fingerprint`]
pub fn canonical_json(cfg: &QuestionnaireConfig) -> String {
    let questions: Vec<Value> = cfg
        .questions
        .iter()
        .map(|q| json!({ "id": q.id, "text": q.text, "weights": q.weights }))
        .collect();
    let value = json!({
        "version": cfg.version,
        "stages": cfg.stages,
        "answer_scale": cfg.answer_scale,
        "questions": questions,
    });

    let mut out = String::new();
    write_canonical(&value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_ascii_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_ascii_string(key, out);
                out.push_str(": ");
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
    }
}

fn write_ascii_string(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 || !c.is_ascii() => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

// =============================================================================
// TESTS
// =============================================================================
