use std::sync::Arc;

use serde::Serialize;
use storage::repository::UserRepository;
use track_core::model::{DailyStudy, FocusDay, ProgressSummary, TestScore, User, UserId};

use crate::access::{AccessMode, Actor, authorize};
use crate::error::DashboardError;
use crate::focus_service::FocusService;
use crate::progress_service::ProgressService;
use crate::study_service::StudyService;
use crate::test_service::TestService;

const DASHBOARD_DAYS: u32 = 7;
const DASHBOARD_TESTS: u32 = 5;

/// Everything the student landing page shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub user: User,
    pub progress: ProgressSummary,
    pub study_hours_last_7_days: f64,
    pub daily_study: Vec<DailyStudy>,
    pub streak_days: u32,
    pub recent_tests: Vec<TestScore>,
    pub revision_due: usize,
    pub focus_today: FocusDay,
}

/// Read-only roll-up over the other services.
#[derive(Clone)]
pub struct DashboardService {
    users: Arc<dyn UserRepository>,
    progress: ProgressService,
    study: StudyService,
    tests: TestService,
    focus: FocusService,
}

impl DashboardService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        progress: ProgressService,
        study: StudyService,
        tests: TestService,
        focus: FocusService,
    ) -> Self {
        Self {
            users,
            progress,
            study,
            tests,
            focus,
        }
    }

    /// Build the dashboard of `user_id` as seen by `actor`.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Access` if `actor` may not read the user's data,
    /// `DashboardError::UnknownUser` if the account does not exist, and
    /// `DashboardError::NotAStudent` for admin accounts.
    pub async fn view(&self, actor: &Actor, user_id: UserId) -> Result<Dashboard, DashboardError> {
        authorize(actor, user_id, AccessMode::Read)?;
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(DashboardError::UnknownUser)?;
        if user.is_admin() {
            return Err(DashboardError::NotAStudent);
        }

        let progress = self.progress.progress_summary(actor, user_id).await?;
        let revision_due = self.progress.revision_due(actor, user_id).await?.len();
        let week = self
            .study
            .totals(actor, user_id, Some(DASHBOARD_DAYS))
            .await?;
        let daily_study = self
            .study
            .daily_series(actor, user_id, DASHBOARD_DAYS)
            .await?;
        let streak_days = self.study.streak(actor, user_id).await?;
        let recent_tests = self.tests.recent(actor, user_id, DASHBOARD_TESTS).await?;
        let focus_today = self.focus.today(actor, user_id).await?;

        Ok(Dashboard {
            user,
            progress,
            study_hours_last_7_days: week.total_hours,
            daily_study,
            streak_days,
            recent_tests,
            revision_due,
            focus_today,
        })
    }
}
