use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use storage::repository::TestScoreRepository;
use track_core::model::stats::round_to;
use track_core::model::{Subject, TestScore, TestScoreDraft, UserId};

use crate::Clock;
use crate::access::{AccessMode, Actor, authorize};
use crate::error::TestError;

/// One test on the performance chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub name: String,
    pub percentage: f64,
    pub physics: Option<f64>,
    pub chemistry: Option<f64>,
    pub biology: Option<f64>,
}

/// Test performance over time, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestTrend {
    pub points: Vec<TrendPoint>,
    pub average_percentage: f64,
    pub best_percentage: f64,
}

impl TestTrend {
    /// `tests` may come in any order; points are sorted by date.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_tests(tests: &[TestScore]) -> Self {
        let mut points: Vec<TrendPoint> = tests
            .iter()
            .map(|t| TrendPoint {
                date: t.date,
                name: t.name.clone(),
                percentage: t.percentage(),
                physics: t.subject_percentage(Subject::Physics),
                chemistry: t.subject_percentage(Subject::Chemistry),
                biology: t.subject_percentage(Subject::Biology),
            })
            .collect();
        points.sort_by_key(|p| p.date);

        let (average_percentage, best_percentage) = if points.is_empty() {
            (0.0, 0.0)
        } else {
            let sum: f64 = points.iter().map(|p| p.percentage).sum();
            let best = points.iter().map(|p| p.percentage).fold(0.0, f64::max);
            (round_to(sum / points.len() as f64, 2), best)
        };

        Self {
            points,
            average_percentage,
            best_percentage,
        }
    }
}

/// Mock test results.
#[derive(Clone)]
pub struct TestService {
    clock: Clock,
    tests: Arc<dyn TestScoreRepository>,
}

impl TestService {
    #[must_use]
    pub fn new(clock: Clock, tests: Arc<dyn TestScoreRepository>) -> Self {
        Self { clock, tests }
    }

    /// # Errors
    ///
    /// Returns `TestError::Access` unless `actor` owns `draft.user_id`, and
    /// `TestError::Validation` for out-of-range scores or a score above its marks.
    pub async fn record(&self, actor: &Actor, draft: TestScoreDraft) -> Result<TestScore, TestError> {
        authorize(actor, draft.user_id, AccessMode::Write)?;
        let test = draft.validate(self.clock.now())?;
        Ok(self.tests.insert_test(test).await?)
    }

    /// Every test, newest first.
    ///
    /// # Errors
    ///
    /// Returns `TestError::Access` if `actor` may not read the user's data.
    pub async fn list(&self, actor: &Actor, user_id: UserId) -> Result<Vec<TestScore>, TestError> {
        authorize(actor, user_id, AccessMode::Read)?;
        Ok(self.tests.tests_for_user(user_id, None).await?)
    }

    /// # Errors
    ///
    /// Returns `TestError::Access` if `actor` may not read the user's data.
    pub async fn recent(
        &self,
        actor: &Actor,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<TestScore>, TestError> {
        authorize(actor, user_id, AccessMode::Read)?;
        Ok(self.tests.tests_for_user(user_id, Some(limit)).await?)
    }

    /// # Errors
    ///
    /// Returns `TestError::Access` if `actor` may not read the user's data.
    pub async fn trend(&self, actor: &Actor, user_id: UserId) -> Result<TestTrend, TestError> {
        let tests = self.list(actor, user_id).await?;
        Ok(TestTrend::from_tests(&tests))
    }
}
