//! Who may read or change whose tracker data.
//!
//! Students own their rows. Administrators may read any student's data but
//! never change it. Accounts still awaiting approval are locked out.

use track_core::model::{User, UserId};

use crate::error::AccessError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

/// The authenticated caller of a service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    id: UserId,
    is_admin: bool,
    is_active: bool,
}

impl Actor {
    #[must_use]
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id(),
            is_admin: user.is_admin(),
            is_active: user.is_active(),
        }
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self::from_user(user)
    }
}

/// Check that `actor` may access data owned by `owner`.
///
/// # Errors
///
/// Returns `AccessError::PendingApproval` for unapproved students and
/// `AccessError::Forbidden` for anything outside the actor's rights.
pub fn authorize(actor: &Actor, owner: UserId, mode: AccessMode) -> Result<(), AccessError> {
    if !actor.is_admin && !actor.is_active {
        log::warn!("denied {mode:?} on user {owner} to pending user {}", actor.id);
        return Err(AccessError::PendingApproval);
    }
    if actor.id == owner {
        return Ok(());
    }
    if actor.is_admin && mode == AccessMode::Read {
        return Ok(());
    }
    log::warn!("denied {mode:?} on user {owner} to user {}", actor.id);
    Err(AccessError::Forbidden)
}

/// # Errors
///
/// Returns `AccessError::AdminRequired` unless `actor` is an administrator.
pub fn require_admin(actor: &Actor) -> Result<(), AccessError> {
    if actor.is_admin {
        Ok(())
    } else {
        log::warn!("user {} attempted an admin operation", actor.id);
        Err(AccessError::AdminRequired)
    }
}
