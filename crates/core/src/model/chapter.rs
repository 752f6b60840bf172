use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ChapterId, UserId};
use crate::model::subject::Subject;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChapterError {
    #[error("chapter name must be between 3 and 256 characters (got {len})")]
    NameLength { len: usize },

    #[error("chapter order must be between 1 and 100 (got {0})")]
    InvalidOrder(u32),
}

pub const CHAPTER_NAME_MIN_LEN: usize = 3;
pub const CHAPTER_NAME_MAX_LEN: usize = 256;
pub const CHAPTER_ORDER_MAX: u32 = 100;

//
// ─── CHECKLIST ─────────────────────────────────────────────────────────────────
//

/// The four independent study steps tracked for every chapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChapterChecklist {
    pub material_read: bool,
    pub lecture_watched: bool,
    pub questions_solved: bool,
    pub revised: bool,
}

impl ChapterChecklist {
    #[must_use]
    pub fn new(
        material_read: bool,
        lecture_watched: bool,
        questions_solved: bool,
        revised: bool,
    ) -> Self {
        Self {
            material_read,
            lecture_watched,
            questions_solved,
            revised,
        }
    }

    #[must_use]
    pub fn is_completed(self) -> bool {
        evaluate_completion(self)
    }
}

/// A chapter is complete exactly when all four checklist steps are done.
#[must_use]
pub fn evaluate_completion(flags: ChapterChecklist) -> bool {
    flags.material_read & flags.lecture_watched & flags.questions_solved & flags.revised
}

/// Partial checklist change; `None` leaves a flag untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ChecklistUpdate {
    pub material_read: Option<bool>,
    pub lecture_watched: Option<bool>,
    pub questions_solved: Option<bool>,
    pub revised: Option<bool>,
}

/// Result of applying a [`ChecklistUpdate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChapterUpdateOutcome {
    pub is_completed: bool,
    pub revision_count: u32,
    /// True when this update flipped `revised` from false to true.
    pub newly_revised: bool,
}

//
// ─── SYLLABUS ──────────────────────────────────────────────────────────────────
//

/// One chapter of the caller-provided syllabus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyllabusEntry {
    pub subject: Subject,
    pub chapter_name: String,
    pub chapter_order: u32,
}

impl SyllabusEntry {
    /// Number the given chapter names from 1 in list order.
    #[must_use]
    pub fn numbered<S: AsRef<str>>(subject: Subject, names: &[S]) -> Vec<Self> {
        names
            .iter()
            .zip(1..)
            .map(|(name, order)| Self {
                subject,
                chapter_name: name.as_ref().to_owned(),
                chapter_order: order,
            })
            .collect()
    }

    /// # Errors
    ///
    /// Returns `ChapterError` if the name length or order is out of range.
    pub fn validate(&self) -> Result<(), ChapterError> {
        let len = self.chapter_name.trim().chars().count();
        if !(CHAPTER_NAME_MIN_LEN..=CHAPTER_NAME_MAX_LEN).contains(&len) {
            return Err(ChapterError::NameLength { len });
        }
        if self.chapter_order == 0 || self.chapter_order > CHAPTER_ORDER_MAX {
            return Err(ChapterError::InvalidOrder(self.chapter_order));
        }
        Ok(())
    }
}

/// A chapter row for a user that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChapter {
    pub user_id: UserId,
    pub subject: Subject,
    pub chapter_name: String,
    pub chapter_order: u32,
    pub created_at: DateTime<Utc>,
}

impl NewChapter {
    /// # Errors
    ///
    /// Returns `ChapterError` if the syllabus entry is invalid.
    pub fn from_entry(
        user_id: UserId,
        entry: &SyllabusEntry,
        now: DateTime<Utc>,
    ) -> Result<Self, ChapterError> {
        entry.validate()?;
        Ok(Self {
            user_id,
            subject: entry.subject,
            chapter_name: entry.chapter_name.trim().to_owned(),
            chapter_order: entry.chapter_order,
            created_at: now,
        })
    }

    #[must_use]
    pub fn assign_id(self, id: ChapterId) -> ChapterProgress {
        ChapterProgress {
            id,
            user_id: self.user_id,
            subject: self.subject,
            chapter_name: self.chapter_name,
            chapter_order: self.chapter_order,
            checklist: ChapterChecklist::default(),
            revision_count: 0,
            last_revised_at: None,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

//
// ─── CHAPTER PROGRESS ──────────────────────────────────────────────────────────
//

/// Per-user progress through one syllabus chapter.
///
/// Completion is never stored on its own; it is always derived from the checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterProgress {
    id: ChapterId,
    user_id: UserId,
    subject: Subject,
    chapter_name: String,
    chapter_order: u32,
    checklist: ChapterChecklist,
    revision_count: u32,
    last_revised_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ChapterProgress {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_persisted(
        id: ChapterId,
        user_id: UserId,
        subject: Subject,
        chapter_name: String,
        chapter_order: u32,
        checklist: ChapterChecklist,
        revision_count: u32,
        last_revised_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            subject,
            chapter_name,
            chapter_order,
            checklist,
            revision_count,
            last_revised_at,
            created_at,
            updated_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> ChapterId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn subject(&self) -> Subject {
        self.subject
    }

    #[must_use]
    pub fn chapter_name(&self) -> &str {
        &self.chapter_name
    }

    #[must_use]
    pub fn chapter_order(&self) -> u32 {
        self.chapter_order
    }

    #[must_use]
    pub fn checklist(&self) -> ChapterChecklist {
        self.checklist
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.checklist.is_completed()
    }

    #[must_use]
    pub fn revision_count(&self) -> u32 {
        self.revision_count
    }

    #[must_use]
    pub fn last_revised_at(&self) -> Option<DateTime<Utc>> {
        self.last_revised_at
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Apply checklist changes.
    ///
    /// When `revised` goes from false to true the revision counter is bumped
    /// and `last_revised_at` is stamped with `now`.
    pub fn apply_update(
        &mut self,
        update: ChecklistUpdate,
        now: DateTime<Utc>,
    ) -> ChapterUpdateOutcome {
        if let Some(v) = update.material_read {
            self.checklist.material_read = v;
        }
        if let Some(v) = update.lecture_watched {
            self.checklist.lecture_watched = v;
        }
        if let Some(v) = update.questions_solved {
            self.checklist.questions_solved = v;
        }

        let mut newly_revised = false;
        if let Some(v) = update.revised {
            if v && !self.checklist.revised {
                self.revision_count = self.revision_count.saturating_add(1);
                self.last_revised_at = Some(now);
                newly_revised = true;
            }
            self.checklist.revised = v;
        }

        self.updated_at = now;
        ChapterUpdateOutcome {
            is_completed: self.is_completed(),
            revision_count: self.revision_count,
            newly_revised,
        }
    }

    /// Record an explicit revision pass and return the new revision number.
    pub fn record_revision(&mut self, now: DateTime<Utc>) -> u32 {
        self.revision_count = self.revision_count.saturating_add(1);
        self.last_revised_at = Some(now);
        self.checklist.revised = true;
        self.updated_at = now;
        self.revision_count
    }

    /// A revised chapter is due again once `reminder_days` have passed since
    /// its last revision.
    #[must_use]
    pub fn needs_revision(&self, now: DateTime<Utc>, reminder_days: u32) -> bool {
        if !self.checklist.revised {
            return false;
        }
        let threshold = now - Duration::days(i64::from(reminder_days));
        self.last_revised_at.is_some_and(|at| at < threshold)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
