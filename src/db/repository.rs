use chrono::Utc;
use serde::Serialize;
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};

use crate::models::{
    ClassRecord, EntityCounts, LessonSlot, NewClass, NewLesson, NewSubstitution, NewTeacher,
    SubstitutionRecord, TeacherRecord,
};
use crate::services::digest::DIGEST_KEY;

/// The last committed schedule fingerprint.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SyncDigest {
    pub value: String,
    pub updated_at: Option<String>,
}

pub async fn fetch_classes<'e, E>(db: E) -> Result<Vec<ClassRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, ClassRecord>(
        "SELECT id, external_id, name, grade_level FROM classes ORDER BY grade_level, name",
    )
    .fetch_all(db)
    .await
}

pub async fn fetch_teachers<'e, E>(db: E) -> Result<Vec<TeacherRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, TeacherRecord>("SELECT id, external_id, name FROM teachers ORDER BY name")
        .fetch_all(db)
        .await
}

pub async fn fetch_lessons<'e, E>(db: E) -> Result<Vec<LessonSlot>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, LessonSlot>(
        r#"
        SELECT id, class_id, day_of_week, lesson_number, subject_name, teacher_name, room_number
        FROM lessons
        ORDER BY class_id, day_of_week, lesson_number
        "#,
    )
    .fetch_all(db)
    .await
}

pub async fn fetch_substitutions<'e, E>(db: E) -> Result<Vec<SubstitutionRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, SubstitutionRecord>(
        r#"
        SELECT id, class_id, date, lesson_number, subject_name, teacher_name, room_number, is_cancelled
        FROM substitutions
        ORDER BY date, class_id, lesson_number
        "#,
    )
    .fetch_all(db)
    .await
}

pub async fn count_entities(db: &SqlitePool) -> Result<EntityCounts, sqlx::Error> {
    let classes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM classes")
        .fetch_one(db)
        .await?;
    let teachers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teachers")
        .fetch_one(db)
        .await?;
    let lessons: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons")
        .fetch_one(db)
        .await?;
    let substitutions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM substitutions")
        .fetch_one(db)
        .await?;

    Ok(EntityCounts {
        classes,
        teachers,
        lessons,
        substitutions,
    })
}

pub async fn get_digest<'e, E>(db: E) -> Result<Option<SyncDigest>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, SyncDigest>("SELECT value, updated_at FROM sync_meta WHERE key = ?")
        .bind(DIGEST_KEY)
        .fetch_optional(db)
        .await
}

pub async fn store_digest<'e, E>(db: E, value: &str) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        INSERT INTO sync_meta (key, value, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(DIGEST_KEY)
    .bind(value)
    .bind(now)
    .execute(db)
    .await?;
    Ok(())
}

/// Identities that opted into change notifications.
pub async fn list_subscribers<'e, E>(db: E) -> Result<Vec<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar(
        "SELECT telegram_id FROM users WHERE notification_enabled = 1 ORDER BY telegram_id",
    )
    .fetch_all(db)
    .await
}

pub async fn upsert_subscriber<'e, E>(
    db: E,
    telegram_id: i64,
    username: Option<&str>,
    notification_enabled: bool,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO users (telegram_id, username, notification_enabled)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(telegram_id) DO UPDATE
        SET username = excluded.username,
            notification_enabled = excluded.notification_enabled
        "#,
    )
    .bind(telegram_id)
    .bind(username)
    .bind(notification_enabled)
    .execute(db)
    .await?;
    Ok(())
}

/// Returns the internal id allocated for the new class.
pub async fn insert_class<'e, E>(db: E, class: &NewClass) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("INSERT INTO classes (external_id, name, grade_level) VALUES (?, ?, ?)")
        .bind(&class.external_id)
        .bind(&class.name)
        .bind(class.grade_level)
        .execute(db)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn update_class<'e, E>(db: E, id: i64, class: &NewClass) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE classes SET name = ?, grade_level = ? WHERE id = ?")
        .bind(&class.name)
        .bind(class.grade_level)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

/// Existing teachers are left untouched; returns whether a row was inserted.
pub async fn insert_teacher_if_absent<'e, E>(db: E, teacher: &NewTeacher) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO teachers (external_id, name) VALUES (?, ?) ON CONFLICT(external_id) DO NOTHING",
    )
    .bind(&teacher.external_id)
    .bind(&teacher.name)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_all_lessons<'e, E>(db: E) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    Ok(sqlx::query("DELETE FROM lessons").execute(db).await?.rows_affected())
}

pub async fn insert_lesson<'e, E>(db: E, class_id: i64, lesson: &NewLesson) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO lessons
            (class_id, day_of_week, lesson_number, subject_name, teacher_name, room_number)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(class_id)
    .bind(lesson.day_of_week)
    .bind(lesson.lesson_number)
    .bind(&lesson.subject_name)
    .bind(&lesson.teacher_name)
    .bind(&lesson.room_number)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn delete_all_substitutions<'e, E>(db: E) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    Ok(sqlx::query("DELETE FROM substitutions").execute(db).await?.rows_affected())
}

pub async fn insert_substitution<'e, E>(
    db: E,
    class_id: i64,
    substitution: &NewSubstitution,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO substitutions
            (class_id, date, lesson_number, subject_name, teacher_name, room_number, is_cancelled)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(class_id)
    .bind(substitution.date)
    .bind(substitution.lesson_number)
    .bind(&substitution.subject_name)
    .bind(&substitution.teacher_name)
    .bind(&substitution.room_number)
    .bind(substitution.is_cancelled)
    .execute(db)
    .await?;
    Ok(())
}
