use std::sync::Arc;

use chrono::Days;
use serde::Serialize;
use storage::repository::FocusRepository;
use track_core::model::{FocusDay, FocusStats, Subject, UserId};

use crate::Clock;
use crate::access::{AccessMode, Actor, authorize};
use crate::config::FocusSettings;
use crate::error::FocusError;

/// Today's counter after a finished interval, plus the break that follows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FocusCompletion {
    pub day: FocusDay,
    pub break_minutes: u32,
}

/// Pomodoro-style focus counters, one row per user and day.
#[derive(Clone)]
pub struct FocusService {
    clock: Clock,
    settings: FocusSettings,
    focus: Arc<dyn FocusRepository>,
}

impl FocusService {
    #[must_use]
    pub fn new(clock: Clock, settings: FocusSettings, focus: Arc<dyn FocusRepository>) -> Self {
        Self {
            clock,
            settings,
            focus,
        }
    }

    /// Count one finished work interval for today.
    ///
    /// The long break follows every `cycles_before_long_break`-th interval.
    ///
    /// # Errors
    ///
    /// Returns `FocusError::Access` unless `actor` owns `user_id`.
    pub async fn complete_session(
        &self,
        actor: &Actor,
        user_id: UserId,
        subject: Option<Subject>,
    ) -> Result<FocusCompletion, FocusError> {
        authorize(actor, user_id, AccessMode::Write)?;
        let day = self
            .focus
            .record_focus_session(user_id, self.clock.today(), self.settings.work_minutes, subject)
            .await?;
        let break_minutes = self.settings.break_after(day.sessions_completed);
        Ok(FocusCompletion { day, break_minutes })
    }

    /// Today's counter, zeroed if nothing was completed yet.
    ///
    /// # Errors
    ///
    /// Returns `FocusError::Access` if `actor` may not read the user's data.
    pub async fn today(&self, actor: &Actor, user_id: UserId) -> Result<FocusDay, FocusError> {
        authorize(actor, user_id, AccessMode::Read)?;
        let today = self.clock.today();
        Ok(self
            .focus
            .get_focus_day(user_id, today)
            .await?
            .unwrap_or_else(|| FocusDay::empty(user_id, today)))
    }

    /// Totals over the last `days` days including today.
    ///
    /// # Errors
    ///
    /// Returns `FocusError::Access` if `actor` may not read the user's data.
    pub async fn stats(
        &self,
        actor: &Actor,
        user_id: UserId,
        days: u32,
    ) -> Result<FocusStats, FocusError> {
        authorize(actor, user_id, AccessMode::Read)?;
        let today = self.clock.today();
        let from = today
            .checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
            .unwrap_or(today);
        let rows = self.focus.focus_days_between(user_id, from, today).await?;
        Ok(FocusStats::from_days(&rows))
    }
}
