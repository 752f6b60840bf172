use chrono::NaiveDate;
use track_core::model::{FocusDay, Subject, UserId};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_focus_row};
use crate::repository::{FocusRepository, StorageError};

#[async_trait::async_trait]
impl FocusRepository for SqliteRepository {
    async fn get_focus_day(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<FocusDay>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, date, sessions_completed, total_focus_minutes, subject
            FROM focus_days
            WHERE user_id = ?1 AND date = ?2
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;
        row.as_ref().map(map_focus_row).transpose()
    }

    async fn record_focus_session(
        &self,
        user_id: UserId,
        date: NaiveDate,
        work_minutes: u32,
        subject: Option<Subject>,
    ) -> Result<FocusDay, StorageError> {
        let row = sqlx::query(
            r"
            INSERT INTO focus_days (user_id, date, sessions_completed, total_focus_minutes, subject)
            VALUES (?1, ?2, 1, ?3, ?4)
            ON CONFLICT(user_id, date) DO UPDATE SET
                sessions_completed = focus_days.sessions_completed + 1,
                total_focus_minutes = focus_days.total_focus_minutes + excluded.total_focus_minutes,
                subject = COALESCE(excluded.subject, focus_days.subject)
            RETURNING user_id, date, sessions_completed, total_focus_minutes, subject
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(date)
        .bind(i64::from(work_minutes))
        .bind(subject.map(Subject::as_str))
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;
        map_focus_row(&row)
    }

    async fn focus_days_between(
        &self,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<FocusDay>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, date, sessions_completed, total_focus_minutes, subject
            FROM focus_days
            WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
            ORDER BY date ASC
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_focus_row).collect()
    }
}
