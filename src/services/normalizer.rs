//! Turns the loosely typed upstream payload into strict domain rows.
//!
//! Everything here is lenient: a missing section yields no rows, and an entry
//! that cannot be decoded is skipped and counted instead of failing the run.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::models::{DomainSnapshot, NewClass, NewLesson, NewSubstitution, NewTeacher};
use crate::source::dto::{self, RawSnapshot};

/// Subject reference marking a substitution slot as cancelled.
pub const CANCELLED_SENTINEL: &str = "F";

const SUBSTITUTION_DATE_FORMAT: &str = "%d.%m.%Y";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

impl<T> Default for Normalized<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub classes_skipped: usize,
    pub teachers_skipped: usize,
    pub lessons_skipped: usize,
    pub substitutions_skipped: usize,
}

impl NormalizeReport {
    pub fn total(&self) -> usize {
        self.classes_skipped + self.teachers_skipped + self.lessons_skipped + self.substitutions_skipped
    }
}

pub fn normalize(raw: &RawSnapshot) -> (DomainSnapshot, NormalizeReport) {
    let classes = normalize_classes(raw);
    let teachers = normalize_teachers(raw);
    let lessons = normalize_lessons(raw);
    let substitutions = normalize_substitutions(raw);

    let report = NormalizeReport {
        classes_skipped: classes.skipped,
        teachers_skipped: teachers.skipped,
        lessons_skipped: lessons.skipped,
        substitutions_skipped: substitutions.skipped,
    };

    info!(
        "Normalized {} classes, {} teachers, {} lessons, {} substitutions",
        classes.records.len(),
        teachers.records.len(),
        lessons.records.len(),
        substitutions.records.len()
    );
    if report.total() > 0 {
        warn!("Skipped malformed entries: {:?}", report);
    }

    let snapshot = DomainSnapshot {
        classes: classes.records,
        teachers: teachers.records,
        lessons: lessons.records,
        substitutions: substitutions.records,
    };
    (snapshot, report)
}

pub fn normalize_classes(raw: &RawSnapshot) -> Normalized<NewClass> {
    let mut out = Normalized::default();
    let Some(classes) = raw.object(dto::CLASSES) else {
        return out;
    };

    for (external_id, raw_name) in classes {
        match scalar_text(raw_name) {
            Some(name) => out.records.push(NewClass {
                external_id: external_id.clone(),
                grade_level: grade_level(&name),
                name,
            }),
            None => out.skipped += 1,
        }
    }
    out
}

pub fn normalize_teachers(raw: &RawSnapshot) -> Normalized<NewTeacher> {
    let mut out = Normalized::default();
    let Some(teachers) = raw.object(dto::TEACHERS) else {
        return out;
    };

    for (external_id, raw_name) in teachers {
        match scalar_text(raw_name).filter(|name| !name.is_empty()) {
            Some(name) => out.records.push(NewTeacher {
                external_id: external_id.clone(),
                name,
            }),
            None => out.skipped += 1,
        }
    }
    out
}

pub fn normalize_lessons(raw: &RawSnapshot) -> Normalized<NewLesson> {
    let mut out = Normalized::default();
    let Some(periods) = raw.object(dto::CLASS_SCHEDULE) else {
        return out;
    };
    // Only the first period published by the source is active.
    let Some(period) = periods.values().next() else {
        return out;
    };
    let Some(schedule) = period.as_object() else {
        out.skipped += 1;
        return out;
    };

    let lookups = Lookups::from_raw(raw);

    for (class_external_id, class_schedule) in schedule {
        let Some(slots) = class_schedule.as_object() else {
            out.skipped += 1;
            continue;
        };

        for (slot_key, slot_data) in slots {
            let (Some((day_of_week, lesson_number)), Some(slot)) =
                (decode_slot_key(slot_key), slot_data.as_object())
            else {
                out.skipped += 1;
                continue;
            };

            out.records.push(NewLesson {
                class_external_id: class_external_id.clone(),
                day_of_week,
                lesson_number,
                subject_name: lookups.subjects.names(slot.get("s")),
                teacher_name: lookups.teachers.names(slot.get("t")),
                room_number: lookups.rooms.names(slot.get("r")),
            });
        }
    }
    out
}

pub fn normalize_substitutions(raw: &RawSnapshot) -> Normalized<NewSubstitution> {
    let mut out = Normalized::default();
    let Some(exchanges) = raw.object(dto::CLASS_EXCHANGE) else {
        return out;
    };

    let lookups = Lookups::from_raw(raw);

    for (class_external_id, dates) in exchanges {
        let Some(dates) = dates.as_object() else {
            out.skipped += 1;
            continue;
        };

        for (date_str, slots) in dates {
            let (Ok(date), Some(slots)) = (
                NaiveDate::parse_from_str(date_str, SUBSTITUTION_DATE_FORMAT),
                slots.as_object(),
            ) else {
                out.skipped += 1;
                continue;
            };

            for (slot_key, slot_data) in slots {
                let (Some(lesson_number), Some(slot)) =
                    (parse_lesson_number(slot_key), slot_data.as_object())
                else {
                    out.skipped += 1;
                    continue;
                };

                let record = if is_cancelled(slot) {
                    NewSubstitution {
                        class_external_id: class_external_id.clone(),
                        date,
                        lesson_number,
                        subject_name: None,
                        teacher_name: None,
                        room_number: None,
                        is_cancelled: true,
                    }
                } else {
                    NewSubstitution {
                        class_external_id: class_external_id.clone(),
                        date,
                        lesson_number,
                        subject_name: Some(lookups.subjects.names(slot.get("s"))),
                        teacher_name: Some(lookups.teachers.names(slot.get("t"))),
                        room_number: Some(lookups.rooms.names(slot.get("r"))),
                        is_cancelled: false,
                    }
                };
                out.records.push(record);
            }
        }
    }
    out
}

/// First run of decimal digits in a class name, `0` when there is none.
pub fn grade_level(name: &str) -> i64 {
    let digits: String = name
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Splits a weekly slot key `DLL` into `(day_of_week, lesson_number)`.
///
/// The source numbers days from 1 (Monday); the result is 0-based.
pub fn decode_slot_key(key: &str) -> Option<(i64, i64)> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: i64 = key.parse().ok()?;
    let day_of_week = value / 100 - 1;
    let lesson_number = value % 100;
    if !(0..=6).contains(&day_of_week) || lesson_number < 1 {
        return None;
    }
    Some((day_of_week, lesson_number))
}

fn parse_lesson_number(key: &str) -> Option<i64> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse::<i64>().ok().filter(|n| *n > 0)
}

fn is_cancelled(slot: &Map<String, Value>) -> bool {
    matches!(slot.get("s"), Some(Value::String(s)) if s == CANCELLED_SENTINEL)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Ids are stringly typed upstream; empty strings and zero are "no id".
fn reference_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

struct Lookup<'a> {
    table: Option<&'a Map<String, Value>>,
}

impl Lookup<'_> {
    fn resolve(&self, id: String) -> String {
        self.table
            .and_then(|table| table.get(&id))
            .and_then(scalar_text)
            .unwrap_or(id)
    }

    /// Resolves a reference field (array, or a bare scalar) into one label.
    /// Several ids mean a merged or co-taught group.
    fn names(&self, field: Option<&Value>) -> String {
        let ids: Vec<String> = match field {
            Some(Value::Array(items)) => items.iter().filter_map(reference_id).collect(),
            Some(other) => reference_id(other).into_iter().collect(),
            None => Vec::new(),
        };
        ids.into_iter()
            .map(|id| self.resolve(id))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

struct Lookups<'a> {
    subjects: Lookup<'a>,
    teachers: Lookup<'a>,
    rooms: Lookup<'a>,
}

impl<'a> Lookups<'a> {
    fn from_raw(raw: &'a RawSnapshot) -> Self {
        Self {
            subjects: Lookup { table: raw.object(dto::SUBJECTS) },
            teachers: Lookup { table: raw.object(dto::TEACHERS) },
            rooms: Lookup { table: raw.object(dto::ROOMS) },
        }
    }
}
