use sqlx::Row;
use track_core::model::{NewUser, User, UserId};

use super::SqliteRepository;
use super::mapping::{
    conn, count_from_i64, id_i64, map_user_row, ser, user_id_from_i64, write_err,
};
use crate::repository::{StorageError, UserCounts, UserFilter, UserRepository};

const USER_COLUMNS: &str = "id, username, full_name, target_exam_year, is_active, is_admin, \
                            created_at, last_login, approved_at, approved_by";

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn insert_user(&self, user: NewUser) -> Result<User, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO users (username, full_name, target_exam_year, is_active, is_admin, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(user.target_exam_year)
        .bind(user.is_active)
        .bind(user.is_admin)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(user.assign_id(user_id_from_i64(res.last_insert_rowid())?))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
            .bind(id_i64("user_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(map_user_row).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;
        row.as_ref().map(map_user_row).transpose()
    }

    async fn update_user(&self, user: &User) -> Result<(), StorageError> {
        let approved_by = user
            .approved_by()
            .map(|id| id_i64("approved_by", id.value()))
            .transpose()?;
        let res = sqlx::query(
            r"
            UPDATE users SET
                full_name = ?2,
                target_exam_year = ?3,
                is_active = ?4,
                is_admin = ?5,
                last_login = ?6,
                approved_at = ?7,
                approved_by = ?8
            WHERE id = ?1
            ",
        )
        .bind(id_i64("user_id", user.id().value())?)
        .bind(user.full_name())
        .bind(user.target_exam_year())
        .bind(user.is_active())
        .bind(user.is_admin())
        .bind(user.last_login())
        .bind(user.approved_at())
        .bind(approved_by)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StorageError> {
        // Owned rows go with the account through ON DELETE CASCADE.
        let res = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id_i64("user_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_users(&self, filter: UserFilter, limit: u32) -> Result<Vec<User>, StorageError> {
        let predicate = match filter {
            UserFilter::All => "",
            UserFilter::Pending => "AND is_active = 0",
            UserFilter::Active => "AND is_active = 1",
        };
        let rows = sqlx::query(&format!(
            r"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE is_admin = 0 {predicate}
            ORDER BY created_at DESC, id DESC
            LIMIT ?1
            "
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            users.push(map_user_row(&row)?);
        }
        Ok(users)
    }

    async fn count_users(&self) -> Result<UserCounts, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN is_active = 1 THEN 1 ELSE 0 END), 0) AS active
            FROM users
            WHERE is_admin = 0
            ",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;

        let total = count_from_i64("total", row.try_get("total").map_err(ser)?)?;
        let active = count_from_i64("active", row.try_get("active").map_err(ser)?)?;
        Ok(UserCounts {
            total,
            active,
            pending: total.saturating_sub(active),
        })
    }
}
