use std::collections::HashMap;

use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::db::repository;
use crate::error::SyncError;
use crate::models::{DomainSnapshot, NewClass, NewLesson, NewSubstitution, NewTeacher};

/// Reconciles a normalized snapshot into the store in one transaction.
pub struct SyncService {
    db: SqlitePool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub classes_inserted: usize,
    pub classes_updated: usize,
    pub teachers_inserted: usize,
    pub lessons_inserted: usize,
    pub lessons_dropped: usize,
    pub substitutions_inserted: usize,
    pub substitutions_dropped: usize,
}

impl SyncService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Upserts classes and teachers, replaces lessons and substitutions, and
    /// records `digest`, all committed together. On any error the transaction
    /// is dropped and nothing is persisted.
    pub async fn apply(
        &self,
        snapshot: &DomainSnapshot,
        digest: &str,
    ) -> Result<SyncSummary, SyncError> {
        info!("Starting sync...");
        let mut summary = SyncSummary::default();
        let mut tx = self.db.begin().await?;

        info!("Step 1: Upserting {} classes", snapshot.classes.len());
        let class_map = upsert_classes(&mut tx, &snapshot.classes, &mut summary).await?;

        info!("Step 2: Inserting new teachers");
        summary.teachers_inserted = insert_new_teachers(&mut tx, &snapshot.teachers).await?;

        info!("Step 3: Replacing lessons");
        let (inserted, dropped) = replace_lessons(&mut tx, &class_map, &snapshot.lessons).await?;
        summary.lessons_inserted = inserted;
        summary.lessons_dropped = dropped;

        info!("Step 4: Replacing substitutions");
        let (inserted, dropped) =
            replace_substitutions(&mut tx, &class_map, &snapshot.substitutions).await?;
        summary.substitutions_inserted = inserted;
        summary.substitutions_dropped = dropped;

        repository::store_digest(&mut *tx, digest).await?;
        tx.commit().await?;

        info!("Sync committed: {:?}", summary);
        Ok(summary)
    }
}

/// Returns externalId -> internal id for every class in the snapshot.
async fn upsert_classes(
    conn: &mut SqliteConnection,
    classes: &[NewClass],
    summary: &mut SyncSummary,
) -> Result<HashMap<String, i64>, sqlx::Error> {
    let existing: HashMap<String, _> = repository::fetch_classes(&mut *conn)
        .await?
        .into_iter()
        .map(|c| (c.external_id.clone(), c))
        .collect();

    let mut class_map = HashMap::with_capacity(classes.len());
    for class in classes {
        let id = match existing.get(&class.external_id) {
            Some(current) => {
                if current.name != class.name || current.grade_level != class.grade_level {
                    repository::update_class(&mut *conn, current.id, class).await?;
                    summary.classes_updated += 1;
                }
                current.id
            }
            None => {
                summary.classes_inserted += 1;
                repository::insert_class(&mut *conn, class).await?
            }
        };
        class_map.insert(class.external_id.clone(), id);
    }
    Ok(class_map)
}

async fn insert_new_teachers(
    conn: &mut SqliteConnection,
    teachers: &[NewTeacher],
) -> Result<usize, sqlx::Error> {
    let mut inserted = 0;
    for teacher in teachers {
        if repository::insert_teacher_if_absent(&mut *conn, teacher).await? {
            inserted += 1;
        }
    }
    Ok(inserted)
}

async fn replace_lessons(
    conn: &mut SqliteConnection,
    class_map: &HashMap<String, i64>,
    lessons: &[NewLesson],
) -> Result<(usize, usize), sqlx::Error> {
    let removed = repository::delete_all_lessons(&mut *conn).await?;
    debug!("Cleared {} lesson rows", removed);

    let mut inserted = 0;
    let mut dropped = 0;
    for lesson in lessons {
        match class_map.get(&lesson.class_external_id) {
            Some(&class_id) => {
                repository::insert_lesson(&mut *conn, class_id, lesson).await?;
                inserted += 1;
            }
            None => {
                debug!("Dropping lesson for unknown class {}", lesson.class_external_id);
                dropped += 1;
            }
        }
    }
    Ok((inserted, dropped))
}

async fn replace_substitutions(
    conn: &mut SqliteConnection,
    class_map: &HashMap<String, i64>,
    substitutions: &[NewSubstitution],
) -> Result<(usize, usize), sqlx::Error> {
    let removed = repository::delete_all_substitutions(&mut *conn).await?;
    debug!("Cleared {} substitution rows", removed);

    let mut inserted = 0;
    let mut dropped = 0;
    for substitution in substitutions {
        match class_map.get(&substitution.class_external_id) {
            Some(&class_id) => {
                repository::insert_substitution(&mut *conn, class_id, substitution).await?;
                inserted += 1;
            }
            None => {
                debug!(
                    "Dropping substitution for unknown class {}",
                    substitution.class_external_id
                );
                dropped += 1;
            }
        }
    }
    Ok((inserted, dropped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test db");
        crate::db::migrate(&pool).await.expect("Failed to run migrations");
        pool
    }

    fn lesson(class: &str, day: i64, number: i64, subject: &str) -> NewLesson {
        NewLesson {
            class_external_id: class.to_string(),
            day_of_week: day,
            lesson_number: number,
            subject_name: subject.to_string(),
            teacher_name: String::new(),
            room_number: "005".to_string(),
        }
    }

    fn snapshot() -> DomainSnapshot {
        DomainSnapshot {
            classes: vec![
                NewClass {
                    external_id: "5".to_string(),
                    name: "10A".to_string(),
                    grade_level: 10,
                },
                NewClass {
                    external_id: "6".to_string(),
                    name: "9B".to_string(),
                    grade_level: 9,
                },
            ],
            teachers: vec![NewTeacher {
                external_id: "044".to_string(),
                name: "Smith".to_string(),
            }],
            lessons: vec![
                lesson("5", 0, 1, "Math"),
                lesson("6", 1, 2, "History"),
                lesson("99", 2, 3, "Orphan"),
            ],
            substitutions: vec![NewSubstitution {
                class_external_id: "5".to_string(),
                date: NaiveDate::from_ymd_opt(2026, 1, 20).unwrap(),
                lesson_number: 1,
                subject_name: None,
                teacher_name: None,
                room_number: None,
                is_cancelled: true,
            }],
        }
    }

    #[tokio::test]
    async fn test_apply_inserts_and_drops_unmapped() {
        let pool = setup_test_db().await;
        let service = SyncService::new(pool.clone());

        let summary = service.apply(&snapshot(), "d1").await.expect("apply");
        assert_eq!(summary.classes_inserted, 2);
        assert_eq!(summary.teachers_inserted, 1);
        assert_eq!(summary.lessons_inserted, 2);
        assert_eq!(summary.lessons_dropped, 1);
        assert_eq!(summary.substitutions_inserted, 1);

        let lessons = repository::fetch_lessons(&pool).await.expect("lessons");
        assert!(lessons.iter().all(|l| l.subject_name != "Orphan"));

        let digest = repository::get_digest(&pool).await.expect("digest").expect("row");
        assert_eq!(digest.value, "d1");
    }

    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let pool = setup_test_db().await;
        let service = SyncService::new(pool.clone());

        service.apply(&snapshot(), "d1").await.expect("first apply");
        let before = repository::count_entities(&pool).await.expect("count");
        let ids_before: Vec<i64> = repository::fetch_classes(&pool)
            .await
            .expect("classes")
            .iter()
            .map(|c| c.id)
            .collect();

        let summary = service.apply(&snapshot(), "d1").await.expect("second apply");
        let after = repository::count_entities(&pool).await.expect("count");
        let ids_after: Vec<i64> = repository::fetch_classes(&pool)
            .await
            .expect("classes")
            .iter()
            .map(|c| c.id)
            .collect();

        assert_eq!(before, after);
        assert_eq!(ids_before, ids_after);
        assert_eq!(summary.classes_inserted, 0);
        assert_eq!(summary.classes_updated, 0);
        assert_eq!(summary.teachers_inserted, 0);
    }

    #[tokio::test]
    async fn test_apply_updates_classes_but_not_teachers() {
        let pool = setup_test_db().await;
        let service = SyncService::new(pool.clone());
        service.apply(&snapshot(), "d1").await.expect("apply");

        let mut changed = snapshot();
        changed.classes[0].name = "11A".to_string();
        changed.classes[0].grade_level = 11;
        changed.teachers[0].name = "Smith J.".to_string();
        changed.classes.pop();
        changed.lessons.truncate(1);

        let summary = service.apply(&changed, "d2").await.expect("apply");
        assert_eq!(summary.classes_updated, 1);

        let classes = repository::fetch_classes(&pool).await.expect("classes");
        // Classes absent from the fetch stay behind.
        assert_eq!(classes.len(), 2);
        assert!(classes.iter().any(|c| c.name == "11A" && c.grade_level == 11));

        let teachers = repository::fetch_teachers(&pool).await.expect("teachers");
        assert_eq!(teachers[0].name, "Smith");

        let lessons = repository::fetch_lessons(&pool).await.expect("lessons");
        assert_eq!(lessons.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_apply_leaves_prior_state() {
        let pool = setup_test_db().await;
        let service = SyncService::new(pool.clone());
        service.apply(&snapshot(), "d1").await.expect("apply");
        let before = repository::count_entities(&pool).await.expect("count");

        // day_of_week violates the table CHECK constraint mid-transaction.
        let mut broken = snapshot();
        broken.lessons.push(lesson("5", 9, 1, "Broken"));
        broken.classes.push(NewClass {
            external_id: "7".to_string(),
            name: "8C".to_string(),
            grade_level: 8,
        });

        assert!(service.apply(&broken, "d2").await.is_err());

        let after = repository::count_entities(&pool).await.expect("count");
        assert_eq!(before, after);
        let digest = repository::get_digest(&pool).await.expect("digest").expect("row");
        assert_eq!(digest.value, "d1");
    }
}
