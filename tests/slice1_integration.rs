//! Integration tests for Slice 1
//!
//! Questionnaire loading, fingerprinting and signal normalization

use journey_stage::core::{fingerprint, load, load_path, normalize, normalize_value, ConfigError};
use journey_stage::types::{known_count, QuestionnaireConfig};
use journey_stage::{DEFAULT_QUESTIONNAIRE_JSON, FINGERPRINT_LEN};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn builtin() -> QuestionnaireConfig {
    QuestionnaireConfig::builtin().expect("built-in questionnaire loads")
}

/// The built-in definition matches what deployed snapshots were recorded under
#[test]
fn test_builtin_fingerprint_is_stable() {
    let cfg = builtin();
    assert_eq!(cfg.version, "spec-v0.5-default");
    assert_eq!(cfg.stages, vec!["FS", "HM", "IC", "SA"]);
    assert_eq!(cfg.question_count(), 20);
    assert_eq!(fingerprint(&cfg), "7f7601a399aa");
}

#[test]
fn test_fingerprint_deterministic() {
    let a = fingerprint(&builtin());
    let b = fingerprint(&builtin());
    assert_eq!(a, b);
    assert_eq!(a.len(), FINGERPRINT_LEN);
}

#[test]
fn test_fingerprint_stable_under_key_reordering() {
    let ordered = r#"{"version": "v1", "stages": ["A", "B"], "answer_scale": [-1, 0, 1],
        "questions": [{"id": "Q1", "text": "t", "weights": {"A": 1, "B": 0}}]}"#;
    let shuffled = r#"{"questions": [{"weights": {"B": 0, "A": 1}, "text": "t", "id": "Q1"}],
        "answer_scale": [-1, 0, 1], "stages": ["A", "B"], "version": "v1"}"#;
    assert_eq!(
        fingerprint(&load(ordered).unwrap()),
        fingerprint(&load(shuffled).unwrap())
    );
}

#[test]
fn test_fingerprint_changes_with_content() {
    let base: Value = serde_json::from_str(DEFAULT_QUESTIONNAIRE_JSON).unwrap();
    let original = fingerprint(&builtin());

    let mut weight_changed = base.clone();
    weight_changed["questions"][0]["weights"]["FS"] = json!(2);
    assert_ne!(fingerprint(&load(&weight_changed.to_string()).unwrap()), original);

    let mut stages_changed = base.clone();
    stages_changed["stages"] = json!(["FS", "HM", "IC"]);
    assert_ne!(fingerprint(&load(&stages_changed.to_string()).unwrap()), original);

    let mut scale_changed = base;
    scale_changed["answer_scale"] = json!([-1, 0, 1]);
    assert_ne!(fingerprint(&load(&scale_changed.to_string()).unwrap()), original);
}

#[test]
fn test_every_question_weights_every_stage() {
    let cfg = load(
        r#"{"stages": ["A", "B", "C"], "questions": [
            {"id": "Q1", "text": "t", "weights": {"B": 1}},
            {"id": "Q2", "text": "t", "weights": {}}
        ]}"#,
    )
    .unwrap();
    for q in &cfg.questions {
        assert_eq!(q.weights.len(), 3, "question {} must weight every stage", q.id);
    }
    assert_eq!(cfg.question("Q1").unwrap().weight("A"), 0.0);
}

#[test]
fn test_missing_weights_is_config_error() {
    let err = load(r#"{"stages": ["A"], "questions": [{"id": "Q1", "text": "t"}]}"#).unwrap_err();
    assert!(matches!(err, ConfigError::MissingQuestionField { field: "weights", .. }));
}

#[test]
fn test_load_path_reports_missing_file() {
    let err = load_path("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_load_path_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("q.json");
    std::fs::write(&path, DEFAULT_QUESTIONNAIRE_JSON).unwrap();
    assert_eq!(load_path(&path).unwrap(), builtin());
}

/// Every declared question appears in the output, valid or not
#[test]
fn test_normalize_covers_all_questions() {
    let cfg = builtin();
    let incoming = json!({"Q1": 2, "Q2": "1", "Q3": 7, "Q4": 1.5, "Q5": true, "Q6": null, "Q77": 2});
    let normalized = normalize(&cfg, incoming.as_object().unwrap());

    assert_eq!(normalized.len(), 20);
    assert_eq!(normalized["Q1"], Some(2));
    assert_eq!(normalized["Q2"], Some(1));
    assert_eq!(normalized["Q3"], None);
    assert_eq!(normalized["Q4"], None);
    assert_eq!(normalized["Q5"], None);
    assert_eq!(normalized["Q6"], None);
    assert_eq!(normalized["Q20"], None);
    assert!(!normalized.contains_key("Q77"));
    assert_eq!(known_count(&normalized), 2);
}

#[test]
fn test_normalize_non_object_degrades_to_nulls() {
    let cfg = builtin();
    for junk in [json!(null), json!([1, 2]), json!("Q1=2"), json!(3)] {
        let normalized = normalize_value(&cfg, &junk);
        assert_eq!(normalized.len(), 20);
        assert_eq!(known_count(&normalized), 0);
    }
}

#[test]
fn test_normalize_respects_custom_scale() {
    let cfg = load(
        r#"{"stages": ["A"], "answer_scale": [-3, 3],
            "questions": [{"id": "Q1", "text": "t", "weights": {"A": 1}},
                          {"id": "Q2", "text": "t", "weights": {"A": 1}}]}"#,
    )
    .unwrap();
    let normalized = normalize(&cfg, json!({"Q1": 3, "Q2": 1}).as_object().unwrap());
    assert_eq!(normalized["Q1"], Some(3));
    assert_eq!(normalized["Q2"], None);
}
