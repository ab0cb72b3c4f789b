//! Signal normalizer: raw annotator values → validated signal map
//!
//! Never fails. Anything that is not losslessly an integer on the answer
//! scale becomes `None`.

use serde_json::{Map, Value};
use crate::types::{QuestionnaireConfig, SignalMap};

/// Coerce one raw value into a scale member
///
/// Accepts integers, floats with no fractional part and strings holding an
/// integer. Booleans, fractional numbers, containers and null yield `None`.
///
/// Booleans are refused even though `true`/`false` could pass as 1/0: on a
/// Likert scale that would read "true" as mild agreement and "false" as
/// neutral, which is a guess about the annotator's intent rather than a
/// lossless conversion.
pub fn coerce(value: &Value, allowed: &[i64]) -> Option<i64> {
    let int = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(i),
            None => n.as_f64().and_then(integral_f64),
        },
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    allowed.contains(&int).then_some(int)
}

fn integral_f64(f: f64) -> Option<i64> {
    // Beyond ±2^53 an f64 no longer pins down a single integer.
    const EXACT: f64 = 9_007_199_254_740_992.0;
    (f.is_finite() && f.fract() == 0.0 && f.abs() <= EXACT).then_some(f as i64)
}

/// Normalize a batch of incoming signals against the questionnaire
///
/// The result holds an entry for every declared question; unknown ids in
/// `incoming` are dropped.
pub fn normalize(cfg: &QuestionnaireConfig, incoming: &Map<String, Value>) -> SignalMap {
    cfg.questions
        .iter()
        .map(|q| {
            let value = incoming
                .get(&q.id)
                .and_then(|v| coerce(v, &cfg.answer_scale));
            (q.id.clone(), value)
        })
        .collect()
}

/// Same as [`normalize`], for an arbitrary JSON value
///
/// Anything other than an object normalizes to an all-null map.
pub fn normalize_value(cfg: &QuestionnaireConfig, incoming: &Value) -> SignalMap {
    match incoming.as_object() {
        Some(map) => normalize(cfg, map),
        None => normalize(cfg, &Map::new()),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCALE: [i64; 5] = [-2, -1, 0, 1, 2];

    #[test]
    fn test_coerce_integers() {
        assert_eq!(coerce(&json!(2), &SCALE), Some(2));
        assert_eq!(coerce(&json!(-2), &SCALE), Some(-2));
        assert_eq!(coerce(&json!(0), &SCALE), Some(0));
    }

    #[test]
    fn test_coerce_out_of_scale() {
        assert_eq!(coerce(&json!(3), &SCALE), None);
        assert_eq!(coerce(&json!(-7), &SCALE), None);
    }

    #[test]
    fn test_coerce_whole_float() {
        assert_eq!(coerce(&json!(1.0), &SCALE), Some(1));
        assert_eq!(coerce(&json!(-2.0), &SCALE), Some(-2));
    }

    #[test]
    fn test_coerce_fractional_float_is_lossy() {
        assert_eq!(coerce(&json!(1.5), &SCALE), None);
    }

    #[test]
    fn test_coerce_strings() {
        assert_eq!(coerce(&json!("2"), &SCALE), Some(2));
        assert_eq!(coerce(&json!(" -1 "), &SCALE), Some(-1));
        assert_eq!(coerce(&json!("two"), &SCALE), None);
        assert_eq!(coerce(&json!("1.0"), &SCALE), None);
    }

    #[test]
    fn test_coerce_booleans_are_unknown() {
        assert_eq!(coerce(&json!(true), &SCALE), None);
        assert_eq!(coerce(&json!(false), &SCALE), None);
    }

    #[test]
    fn test_coerce_other_types() {
        assert_eq!(coerce(&json!(null), &SCALE), None);
        assert_eq!(coerce(&json!(true), &SCALE), None);
        assert_eq!(coerce(&json!([1]), &SCALE), None);
        assert_eq!(coerce(&json!({"v": 1}), &SCALE), None);
        assert_eq!(coerce(&json!(f64::MAX), &SCALE), None);
    }
}
