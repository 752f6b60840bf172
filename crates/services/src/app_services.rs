use std::sync::Arc;

use storage::repository::Storage;
use track_core::model::User;

use crate::Clock;
use crate::account_service::AccountService;
use crate::config::TrackerConfig;
use crate::dashboard_service::DashboardService;
use crate::error::AppServicesError;
use crate::focus_service::FocusService;
use crate::progress_service::ProgressService;
use crate::study_service::StudyService;
use crate::test_service::TestService;

/// Assembles app-facing services and bootstraps the admin account.
#[derive(Clone)]
pub struct AppServices {
    config: TrackerConfig,
    admin: User,
    accounts: Arc<AccountService>,
    progress: Arc<ProgressService>,
    study: Arc<StudyService>,
    tests: Arc<TestService>,
    focus: Arc<FocusService>,
    dashboard: Arc<DashboardService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or admin setup fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: TrackerConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(&storage, clock, config).await
    }

    /// Build services over an existing storage aggregate.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the admin account cannot be ensured.
    pub async fn from_storage(
        storage: &Storage,
        clock: Clock,
        config: TrackerConfig,
    ) -> Result<Self, AppServicesError> {
        let accounts = AccountService::new(
            clock,
            Arc::clone(&storage.users),
            Arc::clone(&storage.chapters),
        );
        let admin = accounts.ensure_admin(&config.admin_username).await?;

        let progress = ProgressService::new(
            clock,
            config.revision_reminder_days,
            Arc::clone(&storage.chapters),
            Arc::clone(&storage.revisions),
        );
        let study = StudyService::new(clock, Arc::clone(&storage.study_sessions));
        let tests = TestService::new(clock, Arc::clone(&storage.tests));
        let focus = FocusService::new(clock, config.focus, Arc::clone(&storage.focus));
        let dashboard = DashboardService::new(
            Arc::clone(&storage.users),
            progress.clone(),
            study.clone(),
            tests.clone(),
            focus.clone(),
        );

        Ok(Self {
            config,
            admin,
            accounts: Arc::new(accounts),
            progress: Arc::new(progress),
            study: Arc::new(study),
            tests: Arc::new(tests),
            focus: Arc::new(focus),
            dashboard: Arc::new(dashboard),
        })
    }

    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    #[must_use]
    pub fn admin(&self) -> &User {
        &self.admin
    }

    #[must_use]
    pub fn accounts(&self) -> Arc<AccountService> {
        Arc::clone(&self.accounts)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn study(&self) -> Arc<StudyService> {
        Arc::clone(&self.study)
    }

    #[must_use]
    pub fn tests(&self) -> Arc<TestService> {
        Arc::clone(&self.tests)
    }

    #[must_use]
    pub fn focus(&self) -> Arc<FocusService> {
        Arc::clone(&self.focus)
    }

    #[must_use]
    pub fn dashboard(&self) -> Arc<DashboardService> {
        Arc::clone(&self.dashboard)
    }
}
