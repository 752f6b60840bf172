use chrono::{DateTime, Utc};
use track_core::model::{
    ChapterId, ChapterProgress, ChapterUpdateOutcome, ChecklistUpdate, NewChapter, RevisionNote,
    Subject, UserId,
};

use super::SqliteRepository;
use super::mapping::{chapter_id_from_i64, conn, id_i64, map_chapter_row, write_err};
use super::revision_repo::insert_revision_in;
use crate::repository::{ChapterRepository, StorageError};

const CHAPTER_COLUMNS: &str = "id, user_id, subject, chapter_name, chapter_order, \
                               material_read, lecture_watched, questions_solved, revised, \
                               revision_count, last_revised_at, created_at, updated_at";

#[async_trait::async_trait]
impl ChapterRepository for SqliteRepository {
    async fn insert_chapters(
        &self,
        chapters: Vec<NewChapter>,
    ) -> Result<Vec<ChapterProgress>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let mut out = Vec::with_capacity(chapters.len());

        for chapter in chapters {
            let res = sqlx::query(
                r"
                INSERT INTO chapter_progress (
                    user_id, subject, chapter_name, chapter_order, created_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                ",
            )
            .bind(id_i64("user_id", chapter.user_id.value())?)
            .bind(chapter.subject.as_str())
            .bind(&chapter.chapter_name)
            .bind(i64::from(chapter.chapter_order))
            .bind(chapter.created_at)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;

            out.push(chapter.assign_id(chapter_id_from_i64(res.last_insert_rowid())?));
        }

        tx.commit().await.map_err(conn)?;
        Ok(out)
    }

    async fn get_chapter(&self, id: ChapterId) -> Result<Option<ChapterProgress>, StorageError> {
        let mut pooled = self.pool.acquire().await.map_err(conn)?;
        fetch_chapter_in(&mut pooled, id).await
    }

    async fn apply_update(
        &self,
        id: ChapterId,
        update: ChecklistUpdate,
        now: DateTime<Utc>,
    ) -> Result<ChapterUpdateOutcome, StorageError> {
        let mut tx = self.begin_write().await?;

        let mut chapter = fetch_chapter_in(&mut tx, id)
            .await?
            .ok_or(StorageError::NotFound)?;
        let outcome = chapter.apply_update(update, now);
        update_chapter_in(&mut tx, &chapter).await?;

        if outcome.newly_revised {
            let log = RevisionNote::default().into_log(
                chapter.user_id(),
                id,
                outcome.revision_count,
                now,
            );
            insert_revision_in(&mut tx, &log).await?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(outcome)
    }

    async fn chapters_for_user(
        &self,
        user_id: UserId,
        subject: Option<Subject>,
    ) -> Result<Vec<ChapterProgress>, StorageError> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {CHAPTER_COLUMNS}
            FROM chapter_progress
            WHERE user_id = ?1 AND (?2 IS NULL OR subject = ?2)
            ORDER BY
                CASE subject WHEN 'physics' THEN 0 WHEN 'chemistry' THEN 1 ELSE 2 END,
                chapter_order,
                id
            "
        ))
        .bind(id_i64("user_id", user_id.value())?)
        .bind(subject.map(Subject::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_chapter_row(&row)?);
        }
        Ok(out)
    }
}

/// Read a chapter on `db`, which may be an open transaction.
pub(crate) async fn fetch_chapter_in(
    db: &mut sqlx::SqliteConnection,
    id: ChapterId,
) -> Result<Option<ChapterProgress>, StorageError> {
    let row = sqlx::query(&format!(
        "SELECT {CHAPTER_COLUMNS} FROM chapter_progress WHERE id = ?1"
    ))
    .bind(id_i64("chapter_id", id.value())?)
    .fetch_optional(&mut *db)
    .await
    .map_err(conn)?;
    row.as_ref().map(map_chapter_row).transpose()
}

/// Write a chapter's mutable columns on `db`, which may be an open transaction.
///
/// `is_completed` is always written from the derived accessor.
pub(crate) async fn update_chapter_in(
    db: &mut sqlx::SqliteConnection,
    chapter: &ChapterProgress,
) -> Result<(), StorageError> {
    let checklist = chapter.checklist();
    let res = sqlx::query(
        r"
        UPDATE chapter_progress SET
            material_read = ?2,
            lecture_watched = ?3,
            questions_solved = ?4,
            revised = ?5,
            is_completed = ?6,
            revision_count = ?7,
            last_revised_at = ?8,
            updated_at = ?9
        WHERE id = ?1 AND user_id = ?10
        ",
    )
    .bind(id_i64("chapter_id", chapter.id().value())?)
    .bind(checklist.material_read)
    .bind(checklist.lecture_watched)
    .bind(checklist.questions_solved)
    .bind(checklist.revised)
    .bind(chapter.is_completed())
    .bind(i64::from(chapter.revision_count()))
    .bind(chapter.last_revised_at())
    .bind(chapter.updated_at())
    .bind(id_i64("user_id", chapter.user_id().value())?)
    .execute(db)
    .await
    .map_err(conn)?;

    if res.rows_affected() == 0 {
        return Err(StorageError::NotFound);
    }
    Ok(())
}
