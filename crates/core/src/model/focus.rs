use chrono::NaiveDate;
use serde::Serialize;

use crate::model::ids::UserId;
use crate::model::stats::minutes_to_hours;
use crate::model::subject::Subject;

/// Per-day focus-timer counter for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FocusDay {
    pub user_id: UserId,
    pub date: NaiveDate,
    pub sessions_completed: u32,
    pub total_focus_minutes: u32,
    pub subject: Option<Subject>,
}

impl FocusDay {
    #[must_use]
    pub fn empty(user_id: UserId, date: NaiveDate) -> Self {
        Self {
            user_id,
            date,
            sessions_completed: 0,
            total_focus_minutes: 0,
            subject: None,
        }
    }

    /// Count one finished work interval of `work_minutes`.
    ///
    /// A provided subject replaces the previous one; `None` keeps it.
    pub fn complete_session(&mut self, work_minutes: u32, subject: Option<Subject>) {
        self.sessions_completed = self.sessions_completed.saturating_add(1);
        self.total_focus_minutes = self.total_focus_minutes.saturating_add(work_minutes);
        if subject.is_some() {
            self.subject = subject;
        }
    }
}

/// Totals over a window of focus days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FocusStats {
    pub dates: Vec<NaiveDate>,
    pub sessions: Vec<u32>,
    pub total_sessions: u32,
    pub total_hours: f64,
}

impl FocusStats {
    /// `days` is expected in date order.
    #[must_use]
    pub fn from_days(days: &[FocusDay]) -> Self {
        let total_minutes: u64 = days.iter().map(|d| u64::from(d.total_focus_minutes)).sum();
        Self {
            dates: days.iter().map(|d| d.date).collect(),
            sessions: days.iter().map(|d| d.sessions_completed).collect(),
            total_sessions: days.iter().map(|d| d.sessions_completed).sum(),
            total_hours: minutes_to_hours(total_minutes),
        }
    }
}
