use std::collections::HashSet;

use chrono::NaiveDate;
use sqlx::Row;
use track_core::model::{NewStudySession, StudySession, StudySessionId, Subject, UserId};

use super::SqliteRepository;
use super::mapping::{conn, count_from_i64, id_i64, map_session_row, ser};
use crate::repository::{MinutesSummary, StorageError, StudySessionRepository};

const SESSION_COLUMNS: &str = "id, user_id, date, subject, duration_minutes, notes, created_at";

#[async_trait::async_trait]
impl StudySessionRepository for SqliteRepository {
    async fn insert_session(
        &self,
        session: NewStudySession,
    ) -> Result<StudySession, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO study_sessions (user_id, date, subject, duration_minutes, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(id_i64("user_id", session.user_id.value())?)
        .bind(session.date)
        .bind(session.subject.map(Subject::as_str))
        .bind(i64::from(session.duration_minutes))
        .bind(&session.notes)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        let id = StudySessionId::new(count_from_i64("id", res.last_insert_rowid())?);
        Ok(session.assign_id(id))
    }

    async fn sessions_between(
        &self,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<StudySession>, StorageError> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {SESSION_COLUMNS}
            FROM study_sessions
            WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
            ORDER BY date ASC, id ASC
            "
        ))
        .bind(id_i64("user_id", user_id.value())?)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_session_row).collect()
    }

    async fn recent_sessions(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<StudySession>, StorageError> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {SESSION_COLUMNS}
            FROM study_sessions
            WHERE user_id = ?1
            ORDER BY date DESC, id DESC
            LIMIT ?2
            "
        ))
        .bind(id_i64("user_id", user_id.value())?)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_session_row).collect()
    }

    async fn minutes_summary(
        &self,
        user_id: UserId,
        since: Option<NaiveDate>,
    ) -> Result<MinutesSummary, StorageError> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) AS session_count, COALESCE(SUM(duration_minutes), 0) AS total_minutes
            FROM study_sessions
            WHERE user_id = ?1 AND (?2 IS NULL OR date >= ?2)
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;

        Ok(MinutesSummary {
            session_count: count_from_i64(
                "session_count",
                row.try_get("session_count").map_err(ser)?,
            )?,
            total_minutes: count_from_i64(
                "total_minutes",
                row.try_get("total_minutes").map_err(ser)?,
            )?,
        })
    }

    async fn study_dates_between(
        &self,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<HashSet<NaiveDate>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT DISTINCT date
            FROM study_sessions
            WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| row.try_get::<NaiveDate, _>("date").map_err(ser))
            .collect()
    }
}
