//! Change detection over the parts of the payload that define the weekly
//! template. Substitutions (`CLASS_EXCHANGE`) are not part of the fingerprint,
//! so a substitution-only update does not trigger a resynchronization.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::source::dto::{self, RawSnapshot};

/// Key of the persisted fingerprint row in `sync_meta`.
pub const DIGEST_KEY: &str = "schedule_digest";

const DIGESTED_SECTIONS: [&str; 3] = [dto::CLASSES, dto::CLASS_SCHEDULE, dto::TEACHERS];

/// Hex SHA-256 of the digested sections, serialized with sorted keys.
/// Absent sections are hashed as `null`.
pub fn digest(raw: &RawSnapshot) -> String {
    let mut subset = Map::new();
    for key in DIGESTED_SECTIONS {
        let section = raw.section(key).cloned().unwrap_or(Value::Null);
        subset.insert(key.to_string(), section);
    }

    let canonical = canonicalize(Value::Object(subset));
    // Serializing a `Value` cannot fail: every map key is already a string.
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
    format!("{:x}", Sha256::digest(&bytes))
}

pub fn has_changed(new_digest: &str, stored: Option<&str>) -> bool {
    stored != Some(new_digest)
}

/// Rebuilds every object with its keys in sorted order.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, canonicalize(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawSnapshot {
        RawSnapshot::from_value(value).expect("object payload")
    }

    fn sample() -> Value {
        json!({
            "CLASSES": {"5": "10A", "6": "10B"},
            "TEACHERS": {"044": "Smith"},
            "CLASS_SCHEDULE": {"60": {"5": {"101": {"s": ["036"], "t": ["044"], "r": ["005"]}}}},
            "SUBJECTS": {"036": "Math"},
            "CLASS_EXCHANGE": {"5": {"20.01.2026": {"3": {"s": "F"}}}}
        })
    }

    #[test]
    fn test_digest_is_stable() {
        assert_eq!(digest(&raw(sample())), digest(&raw(sample())));
        assert_eq!(digest(&raw(sample())).len(), 64);
    }

    #[test]
    fn test_digest_ignores_key_order() {
        let reordered = json!({
            "CLASS_EXCHANGE": {"5": {"20.01.2026": {"3": {"s": "F"}}}},
            "SUBJECTS": {"036": "Math"},
            "CLASS_SCHEDULE": {"60": {"5": {"101": {"r": ["005"], "t": ["044"], "s": ["036"]}}}},
            "TEACHERS": {"044": "Smith"},
            "CLASSES": {"6": "10B", "5": "10A"}
        });
        assert_eq!(digest(&raw(sample())), digest(&raw(reordered)));
    }

    #[test]
    fn test_digest_tracks_digested_sections() {
        let base = digest(&raw(sample()));

        let mut classes = sample();
        classes["CLASSES"]["7"] = json!("11A");
        assert_ne!(base, digest(&raw(classes)));

        let mut teachers = sample();
        teachers["TEACHERS"]["044"] = json!("Smith J.");
        assert_ne!(base, digest(&raw(teachers)));

        let mut schedule = sample();
        schedule["CLASS_SCHEDULE"]["60"]["5"]["101"]["r"] = json!(["006"]);
        assert_ne!(base, digest(&raw(schedule)));
    }

    #[test]
    fn test_digest_ignores_substitutions_and_lookups() {
        let base = digest(&raw(sample()));

        let mut substitutions = sample();
        substitutions["CLASS_EXCHANGE"]["5"]["21.01.2026"] = json!({"2": {"s": ["036"]}});
        assert_eq!(base, digest(&raw(substitutions)));

        let mut without = sample();
        without.as_object_mut().unwrap().remove("CLASS_EXCHANGE");
        assert_eq!(base, digest(&raw(without)));

        let mut subjects = sample();
        subjects["SUBJECTS"]["036"] = json!("Algebra");
        assert_eq!(base, digest(&raw(subjects)));
    }

    #[test]
    fn test_has_changed() {
        assert!(has_changed("abc", None));
        assert!(has_changed("abc", Some("abd")));
        assert!(!has_changed("abc", Some("abc")));
    }
}
