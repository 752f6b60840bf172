use chrono::{DateTime, Utc};
use track_core::model::{ChapterId, NewRevisionLog, RevisionId, RevisionLog, RevisionNote, UserId};

use super::SqliteRepository;
use super::chapter_repo::{fetch_chapter_in, update_chapter_in};
use super::mapping::{conn, count_from_i64, id_i64, map_revision_row};
use crate::repository::{RevisionRepository, StorageError};

const REVISION_COLUMNS: &str =
    "id, user_id, chapter_id, revised_at, revision_number, confidence, notes";

#[async_trait::async_trait]
impl RevisionRepository for SqliteRepository {
    async fn record_revision(
        &self,
        chapter_id: ChapterId,
        note: RevisionNote,
        now: DateTime<Utc>,
    ) -> Result<RevisionLog, StorageError> {
        let mut tx = self.begin_write().await?;

        let mut chapter = fetch_chapter_in(&mut tx, chapter_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        let number = chapter.record_revision(now);
        update_chapter_in(&mut tx, &chapter).await?;

        let log = note.into_log(chapter.user_id(), chapter_id, number, now);
        let id = insert_revision_in(&mut tx, &log).await?;

        tx.commit().await.map_err(conn)?;
        Ok(log.assign_id(id))
    }

    async fn recent_revisions(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<RevisionLog>, StorageError> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {REVISION_COLUMNS}
            FROM revision_logs
            WHERE user_id = ?1
            ORDER BY revised_at DESC, id DESC
            LIMIT ?2
            "
        ))
        .bind(id_i64("user_id", user_id.value())?)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_revision_row).collect()
    }

    async fn revisions_for_chapter(
        &self,
        chapter_id: ChapterId,
    ) -> Result<Vec<RevisionLog>, StorageError> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {REVISION_COLUMNS}
            FROM revision_logs
            WHERE chapter_id = ?1
            ORDER BY revision_number ASC, id ASC
            "
        ))
        .bind(id_i64("chapter_id", chapter_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_revision_row).collect()
    }
}

/// Append a log entry on `db`, which may be an open transaction.
pub(crate) async fn insert_revision_in(
    db: &mut sqlx::SqliteConnection,
    log: &NewRevisionLog,
) -> Result<RevisionId, StorageError> {
    let res = sqlx::query(
        r"
        INSERT INTO revision_logs (
            user_id, chapter_id, revised_at, revision_number, confidence, notes
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ",
    )
    .bind(id_i64("user_id", log.user_id.value())?)
    .bind(id_i64("chapter_id", log.chapter_id.value())?)
    .bind(log.revised_at)
    .bind(i64::from(log.revision_number))
    .bind(log.confidence.map(|c| i64::from(c.value())))
    .bind(&log.notes)
    .execute(&mut *db)
    .await
    .map_err(conn)?;

    Ok(RevisionId::new(count_from_i64("id", res.last_insert_rowid())?))
}
