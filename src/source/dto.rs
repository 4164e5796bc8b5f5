use serde_json::{Map, Value};

pub const CLASSES: &str = "CLASSES";
pub const TEACHERS: &str = "TEACHERS";
pub const SUBJECTS: &str = "SUBJECTS";
pub const ROOMS: &str = "ROOMS";
pub const CLASS_SCHEDULE: &str = "CLASS_SCHEDULE";
pub const CLASS_EXCHANGE: &str = "CLASS_EXCHANGE";

/// The decoded data object embedded in the upstream asset, untouched.
///
/// Top-level sections keep their document order so that "first period" in
/// `CLASS_SCHEDULE` means the first one the source wrote.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSnapshot {
    sections: Map<String, Value>,
}

impl RawSnapshot {
    pub fn new(sections: Map<String, Value>) -> Self {
        Self { sections }
    }

    /// Returns `None` unless `value` is a JSON object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(sections) => Some(Self { sections }),
            _ => None,
        }
    }

    pub fn section(&self, key: &str) -> Option<&Value> {
        self.sections.get(key)
    }

    pub fn object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.sections.get(key).and_then(Value::as_object)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }
}
