use chrono::{DateTime, NaiveDate, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use track_core::model::{
    ChapterChecklist, ChapterId, ChapterProgress, ConfidenceLevel, FocusDay, RevisionId,
    RevisionLog, SectionScore, StudySession, StudySessionId, Subject, TestScore, TestScoreId,
    TestType, User, UserId,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Map a write failure, surfacing unique-constraint hits as `Conflict`.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn chapter_id_from_i64(v: i64) -> Result<ChapterId, StorageError> {
    Ok(ChapterId::new(i64_to_u64("chapter_id", v)?))
}

pub(crate) fn parse_subject(s: &str) -> Result<Subject, StorageError> {
    s.parse::<Subject>().map_err(ser)
}

fn optional_subject(row: &SqliteRow, column: &str) -> Result<Option<Subject>, StorageError> {
    row.try_get::<Option<String>, _>(column)
        .map_err(ser)?
        .map(|s| parse_subject(&s))
        .transpose()
}

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<User, StorageError> {
    let approved_by = row
        .try_get::<Option<i64>, _>("approved_by")
        .map_err(ser)?
        .map(user_id_from_i64)
        .transpose()?;
    let target_exam_year = row
        .try_get::<Option<i64>, _>("target_exam_year")
        .map_err(ser)?
        .map(|y| i32::try_from(y).map_err(ser))
        .transpose()?;

    Ok(User::from_persisted(
        user_id_from_i64(row.try_get("id").map_err(ser)?)?,
        row.try_get("username").map_err(ser)?,
        row.try_get("full_name").map_err(ser)?,
        target_exam_year,
        row.try_get::<bool, _>("is_active").map_err(ser)?,
        row.try_get::<bool, _>("is_admin").map_err(ser)?,
        row.try_get::<DateTime<Utc>, _>("created_at").map_err(ser)?,
        row.try_get("last_login").map_err(ser)?,
        row.try_get("approved_at").map_err(ser)?,
        approved_by,
    ))
}

pub(crate) fn map_chapter_row(row: &SqliteRow) -> Result<ChapterProgress, StorageError> {
    let subject: String = row.try_get("subject").map_err(ser)?;
    // `is_completed` is a denormalized column; completion is re-derived from the flags.
    let checklist = ChapterChecklist::new(
        row.try_get("material_read").map_err(ser)?,
        row.try_get("lecture_watched").map_err(ser)?,
        row.try_get("questions_solved").map_err(ser)?,
        row.try_get("revised").map_err(ser)?,
    );

    Ok(ChapterProgress::from_persisted(
        chapter_id_from_i64(row.try_get("id").map_err(ser)?)?,
        user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        parse_subject(&subject)?,
        row.try_get("chapter_name").map_err(ser)?,
        i64_to_u32("chapter_order", row.try_get("chapter_order").map_err(ser)?)?,
        checklist,
        i64_to_u32("revision_count", row.try_get("revision_count").map_err(ser)?)?,
        row.try_get("last_revised_at").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    ))
}

pub(crate) fn map_session_row(row: &SqliteRow) -> Result<StudySession, StorageError> {
    Ok(StudySession {
        id: StudySessionId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?),
        user_id: user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        date: row.try_get::<NaiveDate, _>("date").map_err(ser)?,
        subject: optional_subject(row, "subject")?,
        duration_minutes: i64_to_u32(
            "duration_minutes",
            row.try_get("duration_minutes").map_err(ser)?,
        )?,
        notes: row.try_get("notes").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

fn section(row: &SqliteRow, prefix: &str) -> Result<Option<SectionScore>, StorageError> {
    let score: Option<i64> = row.try_get(format!("{prefix}_score").as_str()).map_err(ser)?;
    let total: Option<i64> = row.try_get(format!("{prefix}_total").as_str()).map_err(ser)?;
    match (score, total) {
        (Some(score), Some(total)) => Ok(Some(SectionScore {
            score: i64_to_u32("section score", score)?,
            total: i64_to_u32("section total", total)?,
        })),
        (None, None) => Ok(None),
        _ => Err(StorageError::Serialization(format!(
            "incomplete {prefix} section"
        ))),
    }
}

pub(crate) fn map_test_row(row: &SqliteRow) -> Result<TestScore, StorageError> {
    let test_type: String = row.try_get("test_type").map_err(ser)?;
    Ok(TestScore {
        id: TestScoreId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?),
        user_id: user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        name: row.try_get("name").map_err(ser)?,
        date: row.try_get("date").map_err(ser)?,
        test_type: test_type.parse::<TestType>().map_err(ser)?,
        physics: section(row, "physics")?,
        chemistry: section(row, "chemistry")?,
        biology: section(row, "biology")?,
        total_score: i64_to_u32("total_score", row.try_get("total_score").map_err(ser)?)?,
        total_marks: i64_to_u32("total_marks", row.try_get("total_marks").map_err(ser)?)?,
        notes: row.try_get("notes").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_revision_row(row: &SqliteRow) -> Result<RevisionLog, StorageError> {
    let confidence = row
        .try_get::<Option<i64>, _>("confidence")
        .map_err(ser)?
        .map(|c| {
            let c = u8::try_from(c).map_err(ser)?;
            ConfidenceLevel::new(c).map_err(ser)
        })
        .transpose()?;

    Ok(RevisionLog {
        id: RevisionId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?),
        user_id: user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        chapter_id: chapter_id_from_i64(row.try_get("chapter_id").map_err(ser)?)?,
        revised_at: row.try_get("revised_at").map_err(ser)?,
        revision_number: i64_to_u32(
            "revision_number",
            row.try_get("revision_number").map_err(ser)?,
        )?,
        confidence,
        notes: row.try_get("notes").map_err(ser)?,
    })
}

pub(crate) fn map_focus_row(row: &SqliteRow) -> Result<FocusDay, StorageError> {
    Ok(FocusDay {
        user_id: user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        date: row.try_get("date").map_err(ser)?,
        sessions_completed: i64_to_u32(
            "sessions_completed",
            row.try_get("sessions_completed").map_err(ser)?,
        )?,
        total_focus_minutes: i64_to_u32(
            "total_focus_minutes",
            row.try_get("total_focus_minutes").map_err(ser)?,
        )?,
        subject: optional_subject(row, "subject")?,
    })
}

pub(crate) fn count_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    i64_to_u64(field, v)
}
