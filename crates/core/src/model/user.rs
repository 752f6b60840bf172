use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::UserId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("username must be between 3 and 64 characters (got {len})")]
    UsernameLength { len: usize },

    #[error("full name must be at most 128 characters (got {len})")]
    FullNameTooLong { len: usize },

    #[error("target exam year must be between 2024 and 2030 (got {0})")]
    InvalidExamYear(i32),

    #[error("admin accounts cannot be modified")]
    AdminImmutable,

    #[error("account is pending admin approval")]
    PendingApproval,

    #[error("account is already active")]
    AlreadyActive,
}

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 64;
pub const FULL_NAME_MAX_LEN: usize = 128;
pub const EXAM_YEAR_RANGE: std::ops::RangeInclusive<i32> = 2024..=2030;

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Account lifecycle as seen by the approval gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// Registered, waiting for an admin to approve.
    Pending,
    /// Approved student.
    Active,
    /// Administrator. Always allowed in, never modified by admin actions.
    Admin,
}

//
// ─── REGISTRATION ──────────────────────────────────────────────────────────────
//

/// Unvalidated registration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationDraft {
    pub username: String,
    pub full_name: Option<String>,
    pub target_exam_year: Option<i32>,
}

impl RegistrationDraft {
    /// Validate the draft into a pending student account.
    ///
    /// # Errors
    ///
    /// Returns `UserError` when the username, full name or exam year is out of range.
    pub fn validate(self, now: DateTime<Utc>) -> Result<NewUser, UserError> {
        let username = validate_username(&self.username)?;

        let full_name = match self.full_name.map(|n| n.trim().to_owned()) {
            Some(name) if name.is_empty() => None,
            Some(name) => {
                let len = name.chars().count();
                if len > FULL_NAME_MAX_LEN {
                    return Err(UserError::FullNameTooLong { len });
                }
                Some(name)
            }
            None => None,
        };

        if let Some(year) = self.target_exam_year {
            if !EXAM_YEAR_RANGE.contains(&year) {
                return Err(UserError::InvalidExamYear(year));
            }
        }

        Ok(NewUser {
            username,
            full_name,
            target_exam_year: self.target_exam_year,
            is_active: false,
            is_admin: false,
            created_at: now,
        })
    }
}

fn validate_username(raw: &str) -> Result<String, UserError> {
    let username = raw.trim();
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(UserError::UsernameLength { len });
    }
    Ok(username.to_owned())
}

/// A validated account that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub full_name: Option<String>,
    pub target_exam_year: Option<i32>,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl NewUser {
    /// Builds the bootstrap administrator account.
    ///
    /// # Errors
    ///
    /// Returns `UserError::UsernameLength` if the username is out of range.
    pub fn admin(username: &str, now: DateTime<Utc>) -> Result<Self, UserError> {
        Ok(Self {
            username: validate_username(username)?,
            full_name: Some("System Administrator".to_owned()),
            target_exam_year: None,
            is_active: true,
            is_admin: true,
            created_at: now,
        })
    }

    #[must_use]
    pub fn assign_id(self, id: UserId) -> User {
        User {
            id,
            username: self.username,
            full_name: self.full_name,
            target_exam_year: self.target_exam_year,
            is_active: self.is_active,
            is_admin: self.is_admin,
            created_at: self.created_at,
            last_login: None,
            approved_at: None,
            approved_by: None,
        }
    }
}

//
// ─── USER ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    id: UserId,
    username: String,
    full_name: Option<String>,
    target_exam_year: Option<i32>,
    is_active: bool,
    is_admin: bool,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
    approved_at: Option<DateTime<Utc>>,
    approved_by: Option<UserId>,
}

impl User {
    /// Rehydrate a user from persisted storage.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_persisted(
        id: UserId,
        username: String,
        full_name: Option<String>,
        target_exam_year: Option<i32>,
        is_active: bool,
        is_admin: bool,
        created_at: DateTime<Utc>,
        last_login: Option<DateTime<Utc>>,
        approved_at: Option<DateTime<Utc>>,
        approved_by: Option<UserId>,
    ) -> Self {
        Self {
            id,
            username,
            full_name,
            target_exam_year,
            is_active,
            is_admin,
            created_at,
            last_login,
            approved_at,
            approved_by,
        }
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn full_name(&self) -> Option<&str> {
        self.full_name.as_deref()
    }

    #[must_use]
    pub fn target_exam_year(&self) -> Option<i32> {
        self.target_exam_year
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn last_login(&self) -> Option<DateTime<Utc>> {
        self.last_login
    }

    #[must_use]
    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at
    }

    #[must_use]
    pub fn approved_by(&self) -> Option<UserId> {
        self.approved_by
    }

    #[must_use]
    pub fn status(&self) -> UserStatus {
        if self.is_admin {
            UserStatus::Admin
        } else if self.is_active {
            UserStatus::Active
        } else {
            UserStatus::Pending
        }
    }

    /// Whether the approval gate lets this account in.
    #[must_use]
    pub fn can_sign_in(&self) -> bool {
        self.is_admin || self.is_active
    }

    /// Stamp a successful sign-in.
    ///
    /// # Errors
    ///
    /// Returns `UserError::PendingApproval` for inactive students.
    pub fn record_sign_in(&mut self, now: DateTime<Utc>) -> Result<(), UserError> {
        if !self.can_sign_in() {
            return Err(UserError::PendingApproval);
        }
        self.last_login = Some(now);
        Ok(())
    }

    /// Activate a pending student on behalf of `admin`.
    ///
    /// # Errors
    ///
    /// Returns `UserError::AdminImmutable` for admin accounts and
    /// `UserError::AlreadyActive` if the account was already approved.
    pub fn approve(&mut self, admin: UserId, now: DateTime<Utc>) -> Result<(), UserError> {
        self.ensure_mutable()?;
        if self.is_active {
            return Err(UserError::AlreadyActive);
        }
        self.is_active = true;
        self.approved_at = Some(now);
        self.approved_by = Some(admin);
        Ok(())
    }

    /// Switch a student back to the pending state.
    ///
    /// # Errors
    ///
    /// Returns `UserError::AdminImmutable` for admin accounts.
    pub fn deactivate(&mut self) -> Result<(), UserError> {
        self.ensure_mutable()?;
        self.is_active = false;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `UserError::AdminImmutable` for admin accounts.
    pub fn ensure_mutable(&self) -> Result<(), UserError> {
        if self.is_admin {
            return Err(UserError::AdminImmutable);
        }
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn draft(username: &str) -> RegistrationDraft {
        RegistrationDraft {
            username: username.to_owned(),
            full_name: Some("  Asha Rao ".into()),
            target_exam_year: Some(2026),
        }
    }

    #[test]
    fn registration_creates_pending_student() {
        let user = draft("asha").validate(fixed_now()).unwrap().assign_id(UserId::new(2));
        assert_eq!(user.status(), UserStatus::Pending);
        assert_eq!(user.full_name(), Some("Asha Rao"));
        assert!(!user.can_sign_in());
    }

    #[test]
    fn registration_rejects_short_username() {
        let err = draft(" ab ").validate(fixed_now()).unwrap_err();
        assert_eq!(err, UserError::UsernameLength { len: 2 });
    }

    #[test]
    fn registration_rejects_exam_year_out_of_range() {
        let mut d = draft("asha");
        d.target_exam_year = Some(2031);
        assert_eq!(
            d.validate(fixed_now()).unwrap_err(),
            UserError::InvalidExamYear(2031)
        );
    }

    #[test]
    fn blank_full_name_is_dropped() {
        let mut d = draft("asha");
        d.full_name = Some("   ".into());
        let user = d.validate(fixed_now()).unwrap();
        assert_eq!(user.full_name, None);
    }

    #[test]
    fn approval_activates_and_records_approver() {
        let mut user = draft("asha").validate(fixed_now()).unwrap().assign_id(UserId::new(2));
        user.approve(UserId::new(1), fixed_now()).unwrap();
        assert_eq!(user.status(), UserStatus::Active);
        assert_eq!(user.approved_by(), Some(UserId::new(1)));
        assert_eq!(
            user.approve(UserId::new(1), fixed_now()).unwrap_err(),
            UserError::AlreadyActive
        );
    }

    #[test]
    fn pending_user_cannot_sign_in() {
        let mut user = draft("asha").validate(fixed_now()).unwrap().assign_id(UserId::new(2));
        assert_eq!(
            user.record_sign_in(fixed_now()).unwrap_err(),
            UserError::PendingApproval
        );
        assert!(user.last_login().is_none());
    }

    #[test]
    fn admin_is_immutable() {
        let mut admin = NewUser::admin("admin", fixed_now())
            .unwrap()
            .assign_id(UserId::new(1));
        assert_eq!(admin.status(), UserStatus::Admin);
        assert_eq!(admin.deactivate().unwrap_err(), UserError::AdminImmutable);
        admin.record_sign_in(fixed_now()).unwrap();
        assert_eq!(admin.last_login(), Some(fixed_now()));
    }
}
