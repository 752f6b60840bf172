use thiserror::Error;

use crate::model::{
    ChapterError, RevisionError, StudySessionError, TestScoreError, UserError,
};

/// Any validation failure raised by the domain model.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Chapter(#[from] ChapterError),
    #[error(transparent)]
    StudySession(#[from] StudySessionError),
    #[error(transparent)]
    TestScore(#[from] TestScoreError),
    #[error(transparent)]
    Revision(#[from] RevisionError),
}
