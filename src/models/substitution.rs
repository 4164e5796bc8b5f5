use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One-day override of a lesson slot.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubstitutionRecord {
    pub id: i64,
    pub class_id: i64,
    pub date: NaiveDate,
    pub lesson_number: i64,
    pub subject_name: Option<String>,
    pub teacher_name: Option<String>,
    pub room_number: Option<String>,
    pub is_cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubstitution {
    pub class_external_id: String,
    pub date: NaiveDate,
    pub lesson_number: i64,
    pub subject_name: Option<String>,
    pub teacher_name: Option<String>,
    pub room_number: Option<String>,
    pub is_cancelled: bool,
}
