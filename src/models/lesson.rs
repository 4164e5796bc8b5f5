use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One slot of the recurring weekly template.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LessonSlot {
    pub id: i64,
    pub class_id: i64,
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: i64,
    pub lesson_number: i64,
    pub subject_name: String,
    pub teacher_name: String,
    pub room_number: String,
}

/// A normalized lesson that still refers to its class by upstream id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLesson {
    pub class_external_id: String,
    pub day_of_week: i64,
    pub lesson_number: i64,
    pub subject_name: String,
    pub teacher_name: String,
    pub room_number: String,
}
