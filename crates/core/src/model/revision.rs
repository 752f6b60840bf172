use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::{ChapterId, RevisionId, UserId};
use crate::model::study::normalize_notes;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RevisionError {
    #[error("confidence level must be between 1 and 5 (got {0})")]
    InvalidConfidence(u8),

    #[error("notes must be at most 500 characters (got {len})")]
    NotesTooLong { len: usize },
}

pub const REVISION_NOTES_MAX_LEN: usize = 500;

//
// ─── CONFIDENCE ────────────────────────────────────────────────────────────────
//

/// Self-reported confidence after a revision, from 1 (very low) to 5 (very high).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConfidenceLevel(u8);

impl ConfidenceLevel {
    /// # Errors
    ///
    /// Returns `RevisionError::InvalidConfidence` outside 1..=5.
    pub fn new(value: u8) -> Result<Self, RevisionError> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RevisionError::InvalidConfidence(value))
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

//
// ─── REVISION LOG ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionDraft {
    pub confidence: Option<u8>,
    pub notes: Option<String>,
}

impl RevisionDraft {
    /// # Errors
    ///
    /// Returns `RevisionError` if confidence or notes are out of range.
    pub fn validate(self) -> Result<RevisionNote, RevisionError> {
        let confidence = self.confidence.map(ConfidenceLevel::new).transpose()?;
        let notes = normalize_notes(self.notes, REVISION_NOTES_MAX_LEN)
            .map_err(|len| RevisionError::NotesTooLong { len })?;
        Ok(RevisionNote { confidence, notes })
    }
}

/// Validated confidence and notes, not yet tied to a revision number.
///
/// The number is assigned by whoever increments the chapter counter, so it
/// always matches the stored `revision_count`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionNote {
    pub confidence: Option<ConfidenceLevel>,
    pub notes: Option<String>,
}

impl RevisionNote {
    #[must_use]
    pub fn into_log(
        self,
        user_id: UserId,
        chapter_id: ChapterId,
        revision_number: u32,
        revised_at: DateTime<Utc>,
    ) -> NewRevisionLog {
        NewRevisionLog {
            user_id,
            chapter_id,
            revised_at,
            revision_number,
            confidence: self.confidence,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRevisionLog {
    pub user_id: UserId,
    pub chapter_id: ChapterId,
    pub revised_at: DateTime<Utc>,
    pub revision_number: u32,
    pub confidence: Option<ConfidenceLevel>,
    pub notes: Option<String>,
}

impl NewRevisionLog {
    #[must_use]
    pub fn assign_id(self, id: RevisionId) -> RevisionLog {
        RevisionLog {
            id,
            user_id: self.user_id,
            chapter_id: self.chapter_id,
            revised_at: self.revised_at,
            revision_number: self.revision_number,
            confidence: self.confidence,
            notes: self.notes,
        }
    }
}

/// History entry for one revision pass over a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionLog {
    pub id: RevisionId,
    pub user_id: UserId,
    pub chapter_id: ChapterId,
    pub revised_at: DateTime<Utc>,
    pub revision_number: u32,
    pub confidence: Option<ConfidenceLevel>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn confidence_range() {
        assert!(ConfidenceLevel::new(0).is_err());
        assert_eq!(ConfidenceLevel::new(5).unwrap().value(), 5);
        assert_eq!(
            ConfidenceLevel::new(6).unwrap_err(),
            RevisionError::InvalidConfidence(6)
        );
    }

    #[test]
    fn draft_validates_into_log() {
        let log = RevisionDraft {
            confidence: Some(4),
            notes: Some("".into()),
        }
        .validate()
        .unwrap()
        .into_log(UserId::new(1), ChapterId::new(9), 3, fixed_now())
        .assign_id(RevisionId::new(1));

        assert_eq!(log.revision_number, 3);
        assert_eq!(log.confidence.map(ConfidenceLevel::value), Some(4));
        assert_eq!(log.notes, None);
    }
}
