use std::sync::Arc;

use chrono::{Days, NaiveDate};
use storage::repository::StudySessionRepository;
use track_core::model::stats::daily_series;
use track_core::model::{
    DailyStudy, StudySession, StudySessionDraft, StudyTotals, UserId, compute_streak,
    streak_window_start,
};

use crate::Clock;
use crate::access::{AccessMode, Actor, authorize};
use crate::error::StudyError;

/// Study-time logging, totals, and the daily streak.
#[derive(Clone)]
pub struct StudyService {
    clock: Clock,
    sessions: Arc<dyn StudySessionRepository>,
}

impl StudyService {
    #[must_use]
    pub fn new(clock: Clock, sessions: Arc<dyn StudySessionRepository>) -> Self {
        Self { clock, sessions }
    }

    /// # Errors
    ///
    /// Returns `StudyError::Access` unless `actor` owns `draft.user_id`, and
    /// `StudyError::Validation` for an out-of-range duration or notes.
    pub async fn log_session(
        &self,
        actor: &Actor,
        draft: StudySessionDraft,
    ) -> Result<StudySession, StudyError> {
        authorize(actor, draft.user_id, AccessMode::Write)?;
        let session = draft.validate(self.clock.now())?;
        Ok(self.sessions.insert_session(session).await?)
    }

    /// # Errors
    ///
    /// Returns `StudyError::Access` if `actor` may not read the user's data.
    pub async fn recent_sessions(
        &self,
        actor: &Actor,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<StudySession>, StudyError> {
        authorize(actor, user_id, AccessMode::Read)?;
        Ok(self.sessions.recent_sessions(user_id, limit).await?)
    }

    /// All-time totals, or totals over the last `days` days including today.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Access` if `actor` may not read the user's data.
    pub async fn totals(
        &self,
        actor: &Actor,
        user_id: UserId,
        days: Option<u32>,
    ) -> Result<StudyTotals, StudyError> {
        authorize(actor, user_id, AccessMode::Read)?;
        let since = days.map(|d| self.window_start(d));
        let summary = self.sessions.minutes_summary(user_id, since).await?;
        Ok(StudyTotals::from_totals(
            summary.session_count,
            summary.total_minutes,
        ))
    }

    /// Consecutive study days ending today.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Access` if `actor` may not read the user's data.
    pub async fn streak(&self, actor: &Actor, user_id: UserId) -> Result<u32, StudyError> {
        authorize(actor, user_id, AccessMode::Read)?;
        let today = self.clock.today();
        let dates = self
            .sessions
            .study_dates_between(user_id, streak_window_start(today), today)
            .await?;
        let streak = compute_streak(&dates, today);
        log::debug!("user {user_id} streak {streak} over {} study days", dates.len());
        Ok(streak)
    }

    /// Per-day minutes for the last `days` days, oldest first. Days without
    /// sessions are omitted.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Access` if `actor` may not read the user's data.
    pub async fn daily_series(
        &self,
        actor: &Actor,
        user_id: UserId,
        days: u32,
    ) -> Result<Vec<DailyStudy>, StudyError> {
        authorize(actor, user_id, AccessMode::Read)?;
        let today = self.clock.today();
        let sessions = self
            .sessions
            .sessions_between(user_id, self.window_start(days), today)
            .await?;
        Ok(daily_series(&sessions))
    }

    fn window_start(&self, days: u32) -> NaiveDate {
        let today = self.clock.today();
        today
            .checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
            .unwrap_or(NaiveDate::MIN)
    }
}
