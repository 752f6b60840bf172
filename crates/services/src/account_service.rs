use std::sync::Arc;

use serde::Serialize;
use storage::repository::{ChapterRepository, StorageError, UserFilter, UserRepository};
use track_core::model::{
    NewChapter, NewUser, RegistrationDraft, SyllabusEntry, User, UserError, UserId,
};

use crate::Clock;
use crate::access::{Actor, require_admin};
use crate::error::{AccessError, AccountError};

/// Number of registrations shown on the admin overview.
const RECENT_REGISTRATIONS: u32 = 5;

/// Student account counts plus the newest registrations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminOverview {
    pub total_students: u64,
    pub active_students: u64,
    pub pending_students: u64,
    pub recent_registrations: Vec<User>,
}

/// Registration, the approval gate, and admin account management.
#[derive(Clone)]
pub struct AccountService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    chapters: Arc<dyn ChapterRepository>,
}

impl AccountService {
    #[must_use]
    pub fn new(
        clock: Clock,
        users: Arc<dyn UserRepository>,
        chapters: Arc<dyn ChapterRepository>,
    ) -> Self {
        Self {
            clock,
            users,
            chapters,
        }
    }

    /// Create a pending student account and enrol it in `syllabus`.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Validation` for invalid input or syllabus entries.
    /// Returns `AccountError::UsernameTaken` if the username already exists.
    /// Returns `AccountError::Storage` if persistence fails.
    pub async fn register(
        &self,
        draft: RegistrationDraft,
        syllabus: &[SyllabusEntry],
    ) -> Result<User, AccountError> {
        let now = self.clock.now();
        let new_user = draft.validate(now)?;
        for entry in syllabus {
            entry.validate()?;
        }

        let user = self.users.insert_user(new_user).await.map_err(|e| match e {
            StorageError::Conflict => AccountError::UsernameTaken,
            other => AccountError::Storage(other),
        })?;

        let chapters = syllabus
            .iter()
            .map(|entry| NewChapter::from_entry(user.id(), entry, now))
            .collect::<Result<Vec<_>, _>>()?;

        if let Err(err) = self.chapters.insert_chapters(chapters).await {
            // Leave no half-enrolled account behind.
            self.users.delete_user(user.id()).await?;
            return Err(err.into());
        }

        log::info!(
            "registered user {} ({}) with {} chapters, awaiting approval",
            user.id(),
            user.username(),
            syllabus.len()
        );
        Ok(user)
    }

    /// Pass the approval gate and stamp `last_login`.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::UnknownUser` if no such username exists.
    /// Returns `AccountError::Access` with `PendingApproval` for unapproved students.
    pub async fn sign_in(&self, username: &str) -> Result<User, AccountError> {
        let mut user = self
            .users
            .find_by_username(username.trim())
            .await?
            .ok_or(AccountError::UnknownUser)?;

        if !user.can_sign_in() {
            log::warn!("sign-in refused for pending user {}", user.id());
            return Err(AccessError::PendingApproval.into());
        }
        user.record_sign_in(self.clock.now())?;
        self.users.update_user(&user).await?;
        Ok(user)
    }

    /// Resolve the caller for subsequent service operations.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::UnknownUser` if the account does not exist.
    pub async fn actor(&self, user_id: UserId) -> Result<Actor, AccountError> {
        Ok(Actor::from(&self.load(user_id).await?))
    }

    /// Create the administrator account if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Validation` if the username is invalid, or
    /// `AccountError::Storage` if persistence fails.
    pub async fn ensure_admin(&self, username: &str) -> Result<User, AccountError> {
        if let Some(existing) = self.users.find_by_username(username.trim()).await? {
            if !existing.is_admin() {
                log::warn!("configured admin username {username} belongs to a student");
                return Err(AccessError::AdminRequired.into());
            }
            return Ok(existing);
        }

        let admin = self
            .users
            .insert_user(NewUser::admin(username, self.clock.now())?)
            .await?;
        log::info!("created admin account {}", admin.username());
        Ok(admin)
    }

    /// # Errors
    ///
    /// Returns `AccountError::Access` unless `actor` is an admin, and
    /// `AccountError::Validation` if the account is an admin or already active.
    pub async fn approve(&self, actor: &Actor, user_id: UserId) -> Result<User, AccountError> {
        require_admin(actor)?;
        let mut user = self.load(user_id).await?;
        user.approve(actor.id(), self.clock.now())?;
        self.users.update_user(&user).await?;
        log::info!("user {} approved by {}", user.id(), actor.id());
        Ok(user)
    }

    /// Delete a pending registration.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Access` unless `actor` is an admin, and
    /// `AccountError::Validation` if the account is an admin or already active.
    pub async fn reject(&self, actor: &Actor, user_id: UserId) -> Result<(), AccountError> {
        require_admin(actor)?;
        let user = self.load(user_id).await?;
        user.ensure_mutable()?;
        if user.is_active() {
            return Err(UserError::AlreadyActive.into());
        }
        self.users.delete_user(user_id).await?;
        log::info!("registration of {} rejected by {}", user.username(), actor.id());
        Ok(())
    }

    /// Return an active student to the pending state.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Access` unless `actor` is an admin, and
    /// `AccountError::Validation` for admin accounts.
    pub async fn deactivate(&self, actor: &Actor, user_id: UserId) -> Result<User, AccountError> {
        require_admin(actor)?;
        let mut user = self.load(user_id).await?;
        user.deactivate()?;
        self.users.update_user(&user).await?;
        log::info!("user {} deactivated by {}", user.id(), actor.id());
        Ok(user)
    }

    /// Delete a student and all of their data.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Access` unless `actor` is an admin, and
    /// `AccountError::Validation` for admin accounts.
    pub async fn delete(&self, actor: &Actor, user_id: UserId) -> Result<(), AccountError> {
        require_admin(actor)?;
        let user = self.load(user_id).await?;
        user.ensure_mutable()?;
        self.users.delete_user(user_id).await?;
        log::info!("user {} ({}) deleted by {}", user.id(), user.username(), actor.id());
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AccountError::Access` unless `actor` is an admin.
    pub async fn list_pending(&self, actor: &Actor, limit: u32) -> Result<Vec<User>, AccountError> {
        self.list_users(actor, UserFilter::Pending, limit).await
    }

    /// # Errors
    ///
    /// Returns `AccountError::Access` unless `actor` is an admin.
    pub async fn list_users(
        &self,
        actor: &Actor,
        filter: UserFilter,
        limit: u32,
    ) -> Result<Vec<User>, AccountError> {
        require_admin(actor)?;
        Ok(self.users.list_users(filter, limit).await?)
    }

    /// # Errors
    ///
    /// Returns `AccountError::Access` unless `actor` is an admin.
    pub async fn overview(&self, actor: &Actor) -> Result<AdminOverview, AccountError> {
        require_admin(actor)?;
        let counts = self.users.count_users().await?;
        let recent_registrations = self
            .users
            .list_users(UserFilter::All, RECENT_REGISTRATIONS)
            .await?;
        Ok(AdminOverview {
            total_students: counts.total,
            active_students: counts.active,
            pending_students: counts.pending,
            recent_registrations,
        })
    }

    async fn load(&self, user_id: UserId) -> Result<User, AccountError> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or(AccountError::UnknownUser)
    }
}
