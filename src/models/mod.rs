pub mod class;
pub mod lesson;
pub mod substitution;
pub mod teacher;

use serde::Serialize;

pub use class::{ClassRecord, NewClass};
pub use lesson::{LessonSlot, NewLesson};
pub use substitution::{NewSubstitution, SubstitutionRecord};
pub use teacher::{NewTeacher, TeacherRecord};

/// The normalized form of one upstream payload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DomainSnapshot {
    pub classes: Vec<NewClass>,
    pub teachers: Vec<NewTeacher>,
    pub lessons: Vec<NewLesson>,
    pub substitutions: Vec<NewSubstitution>,
}

/// Row counts across the persisted schedule tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub classes: i64,
    pub teachers: i64,
    pub lessons: i64,
    pub substitutions: i64,
}
