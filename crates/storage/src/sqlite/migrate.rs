use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            full_name TEXT,
            target_exam_year INTEGER,
            is_active INTEGER NOT NULL DEFAULT 0,
            is_admin INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            last_login TEXT,
            approved_at TEXT,
            approved_by INTEGER REFERENCES users(id) ON DELETE SET NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS chapter_progress (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            subject TEXT NOT NULL,
            chapter_name TEXT NOT NULL,
            chapter_order INTEGER NOT NULL CHECK (chapter_order BETWEEN 1 AND 100),
            material_read INTEGER NOT NULL DEFAULT 0,
            lecture_watched INTEGER NOT NULL DEFAULT 0,
            questions_solved INTEGER NOT NULL DEFAULT 0,
            revised INTEGER NOT NULL DEFAULT 0,
            is_completed INTEGER NOT NULL DEFAULT 0,
            revision_count INTEGER NOT NULL DEFAULT 0 CHECK (revision_count >= 0),
            last_revised_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (user_id, subject, chapter_name),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS study_sessions (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            subject TEXT,
            duration_minutes INTEGER NOT NULL CHECK (duration_minutes BETWEEN 1 AND 1440),
            notes TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS test_scores (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            date TEXT NOT NULL,
            test_type TEXT NOT NULL,
            physics_score INTEGER,
            physics_total INTEGER,
            chemistry_score INTEGER,
            chemistry_total INTEGER,
            biology_score INTEGER,
            biology_total INTEGER,
            total_score INTEGER NOT NULL CHECK (total_score >= 0),
            total_marks INTEGER NOT NULL CHECK (total_marks > 0),
            percentage REAL NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS revision_logs (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            chapter_id INTEGER NOT NULL,
            revised_at TEXT NOT NULL,
            revision_number INTEGER NOT NULL,
            confidence INTEGER CHECK (confidence BETWEEN 1 AND 5),
            notes TEXT,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (chapter_id) REFERENCES chapter_progress(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS focus_days (
            user_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            sessions_completed INTEGER NOT NULL DEFAULT 0,
            total_focus_minutes INTEGER NOT NULL DEFAULT 0,
            subject TEXT,
            PRIMARY KEY (user_id, date),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_chapter_progress_user_subject
            ON chapter_progress (user_id, subject, chapter_order);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_study_sessions_user_date
            ON study_sessions (user_id, date);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_test_scores_user_date
            ON test_scores (user_id, date);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_revision_logs_user_revised
            ON revision_logs (user_id, revised_at);
    ",
];

/// Runs versioned migrations, each in its own transaction.
///
/// Version 1 creates accounts, chapter progress, study sessions, test scores,
/// revision logs, focus days and their indexes.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        for statement in SCHEMA_V1 {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
