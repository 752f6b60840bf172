use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{TestScoreId, UserId};
use crate::model::stats::round_to;
use crate::model::study::normalize_notes;
use crate::model::subject::Subject;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TestScoreError {
    #[error("test name must be between 1 and 256 characters (got {len})")]
    NameLength { len: usize },

    #[error("{subject} score must be between 0 and 1000 (got {score})")]
    SectionScoreRange { subject: Subject, score: u32 },

    #[error("{subject} total marks must be between 1 and 1000 (got {total})")]
    SectionTotalRange { subject: Subject, total: u32 },

    #[error("{subject} score cannot exceed {subject} total marks")]
    SectionExceedsTotal { subject: Subject },

    #[error("total score must be between 0 and 2000 (got {0})")]
    TotalScoreRange(u32),

    #[error("total marks must be between 1 and 2000 (got {0})")]
    TotalMarksRange(u32),

    #[error("total score cannot exceed total marks")]
    ScoreExceedsMarks,

    #[error("notes must be at most 1000 characters (got {len})")]
    NotesTooLong { len: usize },

    #[error("unknown test type: {0}")]
    UnknownTestType(String),
}

pub const TEST_NAME_MAX_LEN: usize = 256;
pub const TEST_NOTES_MAX_LEN: usize = 1000;
pub const SECTION_MAX: u32 = 1000;
pub const TOTAL_MAX: u32 = 2000;

//
// ─── TEST TYPE ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    FullLength,
    ChapterTest,
    SubjectTest,
    OnlineTest,
    OfflineTest,
    Other,
}

impl TestType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TestType::FullLength => "full_length",
            TestType::ChapterTest => "chapter_test",
            TestType::SubjectTest => "subject_test",
            TestType::OnlineTest => "online_test",
            TestType::OfflineTest => "offline_test",
            TestType::Other => "other",
        }
    }
}

impl FromStr for TestType {
    type Err = TestScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full_length" => Ok(TestType::FullLength),
            "chapter_test" => Ok(TestType::ChapterTest),
            "subject_test" => Ok(TestType::SubjectTest),
            "online_test" => Ok(TestType::OnlineTest),
            "offline_test" => Ok(TestType::OfflineTest),
            "other" => Ok(TestType::Other),
            _ => Err(TestScoreError::UnknownTestType(s.to_owned())),
        }
    }
}

//
// ─── SECTIONS ──────────────────────────────────────────────────────────────────
//

/// Marks obtained in one subject section of a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionScore {
    pub score: u32,
    pub total: u32,
}

impl SectionScore {
    fn validate(self, subject: Subject) -> Result<Self, TestScoreError> {
        if self.score > SECTION_MAX {
            return Err(TestScoreError::SectionScoreRange {
                subject,
                score: self.score,
            });
        }
        if self.total == 0 || self.total > SECTION_MAX {
            return Err(TestScoreError::SectionTotalRange {
                subject,
                total: self.total,
            });
        }
        if self.score > self.total {
            return Err(TestScoreError::SectionExceedsTotal { subject });
        }
        Ok(self)
    }

    /// Section percentage rounded to one decimal.
    #[must_use]
    pub fn percentage(self) -> f64 {
        round_to(f64::from(self.score) / f64::from(self.total) * 100.0, 1)
    }
}

//
// ─── TEST SCORE ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestScoreDraft {
    pub user_id: UserId,
    pub name: String,
    pub date: NaiveDate,
    pub test_type: TestType,
    pub physics: Option<SectionScore>,
    pub chemistry: Option<SectionScore>,
    pub biology: Option<SectionScore>,
    pub total_score: u32,
    pub total_marks: u32,
    pub notes: Option<String>,
}

impl TestScoreDraft {
    /// # Errors
    ///
    /// Returns `TestScoreError` for any out-of-range field or a score above its marks.
    pub fn validate(self, now: DateTime<Utc>) -> Result<NewTestScore, TestScoreError> {
        let name = self.name.trim().to_owned();
        let len = name.chars().count();
        if len == 0 || len > TEST_NAME_MAX_LEN {
            return Err(TestScoreError::NameLength { len });
        }

        let physics = self
            .physics
            .map(|s| s.validate(Subject::Physics))
            .transpose()?;
        let chemistry = self
            .chemistry
            .map(|s| s.validate(Subject::Chemistry))
            .transpose()?;
        let biology = self
            .biology
            .map(|s| s.validate(Subject::Biology))
            .transpose()?;

        if self.total_score > TOTAL_MAX {
            return Err(TestScoreError::TotalScoreRange(self.total_score));
        }
        if self.total_marks == 0 || self.total_marks > TOTAL_MAX {
            return Err(TestScoreError::TotalMarksRange(self.total_marks));
        }
        if self.total_score > self.total_marks {
            return Err(TestScoreError::ScoreExceedsMarks);
        }

        let notes = normalize_notes(self.notes, TEST_NOTES_MAX_LEN)
            .map_err(|len| TestScoreError::NotesTooLong { len })?;

        Ok(NewTestScore {
            user_id: self.user_id,
            name,
            date: self.date,
            test_type: self.test_type,
            physics,
            chemistry,
            biology,
            total_score: self.total_score,
            total_marks: self.total_marks,
            notes,
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTestScore {
    pub user_id: UserId,
    pub name: String,
    pub date: NaiveDate,
    pub test_type: TestType,
    pub physics: Option<SectionScore>,
    pub chemistry: Option<SectionScore>,
    pub biology: Option<SectionScore>,
    pub total_score: u32,
    pub total_marks: u32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewTestScore {
    /// Overall percentage rounded to two decimals.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        overall_percentage(self.total_score, self.total_marks)
    }

    #[must_use]
    pub fn assign_id(self, id: TestScoreId) -> TestScore {
        TestScore {
            id,
            user_id: self.user_id,
            name: self.name,
            date: self.date,
            test_type: self.test_type,
            physics: self.physics,
            chemistry: self.chemistry,
            biology: self.biology,
            total_score: self.total_score,
            total_marks: self.total_marks,
            notes: self.notes,
            created_at: self.created_at,
        }
    }
}

/// A recorded mock test result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestScore {
    pub id: TestScoreId,
    pub user_id: UserId,
    pub name: String,
    pub date: NaiveDate,
    pub test_type: TestType,
    pub physics: Option<SectionScore>,
    pub chemistry: Option<SectionScore>,
    pub biology: Option<SectionScore>,
    pub total_score: u32,
    pub total_marks: u32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TestScore {
    /// Overall percentage rounded to two decimals.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        overall_percentage(self.total_score, self.total_marks)
    }

    #[must_use]
    pub fn section(&self, subject: Subject) -> Option<SectionScore> {
        match subject {
            Subject::Physics => self.physics,
            Subject::Chemistry => self.chemistry,
            Subject::Biology => self.biology,
        }
    }

    #[must_use]
    pub fn subject_percentage(&self, subject: Subject) -> Option<f64> {
        self.section(subject).map(SectionScore::percentage)
    }
}

fn overall_percentage(score: u32, marks: u32) -> f64 {
    if marks == 0 {
        return 0.0;
    }
    round_to(f64::from(score) / f64::from(marks) * 100.0, 2)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{fixed_now, fixed_today};

    fn draft() -> TestScoreDraft {
        TestScoreDraft {
            user_id: UserId::new(1),
            name: "Mock 1".into(),
            date: fixed_today(),
            test_type: TestType::FullLength,
            physics: Some(SectionScore {
                score: 120,
                total: 180,
            }),
            chemistry: None,
            biology: None,
            total_score: 523,
            total_marks: 720,
            notes: None,
        }
    }

    #[test]
    fn percentage_rounds_to_two_places() {
        let score = draft().validate(fixed_now()).unwrap().assign_id(TestScoreId::new(1));
        assert!((score.percentage() - 72.64).abs() < 1e-9);
        assert_eq!(score.subject_percentage(Subject::Physics), Some(66.7));
        assert_eq!(score.subject_percentage(Subject::Biology), None);
    }

    #[test]
    fn score_above_marks_is_rejected() {
        let mut d = draft();
        d.total_score = 721;
        assert_eq!(
            d.validate(fixed_now()).unwrap_err(),
            TestScoreError::ScoreExceedsMarks
        );
    }

    #[test]
    fn section_above_total_is_rejected() {
        let mut d = draft();
        d.chemistry = Some(SectionScore {
            score: 190,
            total: 180,
        });
        assert_eq!(
            d.validate(fixed_now()).unwrap_err(),
            TestScoreError::SectionExceedsTotal {
                subject: Subject::Chemistry
            }
        );
    }

    #[test]
    fn zero_marks_are_rejected() {
        let mut d = draft();
        d.total_score = 0;
        d.total_marks = 0;
        assert_eq!(
            d.validate(fixed_now()).unwrap_err(),
            TestScoreError::TotalMarksRange(0)
        );
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut d = draft();
        d.name = "   ".into();
        assert_eq!(
            d.validate(fixed_now()).unwrap_err(),
            TestScoreError::NameLength { len: 0 }
        );
    }

    #[test]
    fn test_type_storage_form_round_trips() {
        for t in [
            TestType::FullLength,
            TestType::ChapterTest,
            TestType::SubjectTest,
            TestType::OnlineTest,
            TestType::OfflineTest,
            TestType::Other,
        ] {
            assert_eq!(t.as_str().parse::<TestType>().unwrap(), t);
        }
        assert!("weekly".parse::<TestType>().is_err());
    }
}
