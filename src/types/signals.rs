//! Signal maps: question id → inferred answer

use std::collections::BTreeMap;

/// Per-question signal values; `None` means "no opinion yet"
pub type SignalMap = BTreeMap<String, Option<i64>>;

/// Number of questions with a known value
pub fn known_count(signals: &SignalMap) -> usize {
    signals.values().filter(|v| v.is_some()).count()
}

/// Does the map carry at least one non-null signal?
///
/// Callers use this to skip merging turns that would only add a no-op
/// snapshot to history.
pub fn has_signal(signals: &SignalMap) -> bool {
    signals.values().any(Option::is_some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_count_ignores_nulls() {
        let mut map = SignalMap::new();
        map.insert("Q1".into(), Some(2));
        map.insert("Q2".into(), None);
        map.insert("Q3".into(), Some(0));
        assert_eq!(known_count(&map), 2);
        assert!(has_signal(&map));
    }

    #[test]
    fn test_all_null_map_has_no_signal() {
        let mut map = SignalMap::new();
        map.insert("Q1".into(), None);
        assert!(!has_signal(&map));
        assert!(!has_signal(&SignalMap::new()));
    }
}
