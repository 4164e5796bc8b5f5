use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClassRecord {
    pub id: i64,
    pub external_id: String,
    pub name: String,
    pub grade_level: i64,
}

/// A class as described by the upstream payload, before it has an internal id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClass {
    pub external_id: String,
    pub name: String,
    pub grade_level: i64,
}
