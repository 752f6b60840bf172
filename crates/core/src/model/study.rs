use std::collections::HashSet;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::{StudySessionId, UserId};
use crate::model::subject::Subject;

//
// ─── STREAK ────────────────────────────────────────────────────────────────────
//

/// Longest streak the backward walk will ever report.
pub const MAX_STREAK_DAYS: u32 = 365;

/// Count consecutive days ending at `today` that appear in `study_dates`.
///
/// The walk starts at `today` and stops at the first missing day, or after
/// [`MAX_STREAK_DAYS`] steps.
#[must_use]
pub fn compute_streak(study_dates: &HashSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut day = today;
    while streak < MAX_STREAK_DAYS && study_dates.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

/// First day of the date window a streak ending at `today` can reach.
#[must_use]
pub fn streak_window_start(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(MAX_STREAK_DAYS - 1)))
        .unwrap_or(NaiveDate::MIN)
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudySessionError {
    #[error("duration must be between 1 and 1440 minutes (got {0})")]
    InvalidDuration(u32),

    #[error("notes must be at most 500 characters (got {len})")]
    NotesTooLong { len: usize },
}

pub const MAX_SESSION_MINUTES: u32 = 1440;
pub const SESSION_NOTES_MAX_LEN: usize = 500;

//
// ─── SESSIONS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudySessionDraft {
    pub user_id: UserId,
    pub date: NaiveDate,
    pub subject: Option<Subject>,
    pub duration_minutes: u32,
    pub notes: Option<String>,
}

impl StudySessionDraft {
    /// # Errors
    ///
    /// Returns `StudySessionError` if the duration or notes are out of range.
    pub fn validate(self, now: DateTime<Utc>) -> Result<NewStudySession, StudySessionError> {
        if self.duration_minutes == 0 || self.duration_minutes > MAX_SESSION_MINUTES {
            return Err(StudySessionError::InvalidDuration(self.duration_minutes));
        }
        let notes = normalize_notes(self.notes, SESSION_NOTES_MAX_LEN)
            .map_err(|len| StudySessionError::NotesTooLong { len })?;

        Ok(NewStudySession {
            user_id: self.user_id,
            date: self.date,
            subject: self.subject,
            duration_minutes: self.duration_minutes,
            notes,
            created_at: now,
        })
    }
}

/// Trim notes, drop empty ones, and enforce a character limit.
///
/// On overflow the offending length is returned as the error.
pub(crate) fn normalize_notes(notes: Option<String>, max: usize) -> Result<Option<String>, usize> {
    match notes.map(|n| n.trim().to_owned()) {
        Some(n) if n.is_empty() => Ok(None),
        Some(n) => {
            let len = n.chars().count();
            if len > max { Err(len) } else { Ok(Some(n)) }
        }
        None => Ok(None),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudySession {
    pub user_id: UserId,
    pub date: NaiveDate,
    pub subject: Option<Subject>,
    pub duration_minutes: u32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewStudySession {
    #[must_use]
    pub fn assign_id(self, id: StudySessionId) -> StudySession {
        StudySession {
            id,
            user_id: self.user_id,
            date: self.date,
            subject: self.subject,
            duration_minutes: self.duration_minutes,
            notes: self.notes,
            created_at: self.created_at,
        }
    }
}

/// A logged block of study time on a calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudySession {
    pub id: StudySessionId,
    pub user_id: UserId,
    pub date: NaiveDate,
    pub subject: Option<Subject>,
    pub duration_minutes: u32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
