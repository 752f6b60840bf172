//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use track_core::model::{
    ChapterError, RevisionError, StudySessionError, TestScoreError, UserError,
};

/// Rejections raised by the access policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AccessError {
    #[error("you do not have permission to access this data")]
    Forbidden,
    #[error("account is pending admin approval")]
    PendingApproval,
    #[error("administrator privileges required")]
    AdminRequired,
}

/// Errors emitted by `AccountService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AccountError {
    #[error("username is already taken")]
    UsernameTaken,
    #[error("user not found")]
    UnknownUser,
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Validation(#[from] track_core::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("chapter not found")]
    ChapterNotFound,
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Validation(#[from] track_core::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `StudyService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudyError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Validation(#[from] track_core::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `TestService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TestError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Validation(#[from] track_core::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `FocusService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FocusError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `DashboardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DashboardError {
    #[error("user not found")]
    UnknownUser,
    #[error("admin accounts have no dashboard")]
    NotAStudent,
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Study(#[from] StudyError),
    #[error(transparent)]
    Test(#[from] TestError),
    #[error(transparent)]
    Focus(#[from] FocusError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Account(#[from] AccountError),
}

/// Route domain validation errors through `track_core::Error`.
macro_rules! validation_from {
    ($target:ty: $($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for $target {
                fn from(err: $source) -> Self {
                    Self::Validation(track_core::Error::from(err))
                }
            }
        )+
    };
}

validation_from!(AccountError: UserError, ChapterError);
validation_from!(ProgressError: ChapterError, RevisionError);
validation_from!(StudyError: StudySessionError);
validation_from!(TestError: TestScoreError);
