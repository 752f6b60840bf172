//! Small aggregates over per-user row sets.

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::chapter::ChapterProgress;
use crate::model::study::StudySession;
use crate::model::subject::Subject;

/// Round half away from zero to `places` decimals.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `part / whole` as a percentage with one decimal, or 0 when `whole` is 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_to(part as f64 / whole as f64 * 100.0, 1)
}

/// Minutes expressed as hours with one decimal.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn minutes_to_hours(minutes: u64) -> f64 {
    round_to(minutes as f64 / 60.0, 1)
}

//
// ─── SYLLABUS PROGRESS ─────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectProgress {
    pub subject: Subject,
    pub total: usize,
    pub completed: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub total_chapters: usize,
    pub completed_chapters: usize,
    pub overall_percent: f64,
    pub subjects: Vec<SubjectProgress>,
}

impl ProgressSummary {
    #[must_use]
    pub fn from_chapters(chapters: &[ChapterProgress]) -> Self {
        let completed_chapters = chapters.iter().filter(|c| c.is_completed()).count();
        let subjects = Subject::ALL
            .iter()
            .map(|&subject| {
                let (total, completed) = chapters
                    .iter()
                    .filter(|c| c.subject() == subject)
                    .fold((0, 0), |(t, c), ch| (t + 1, c + usize::from(ch.is_completed())));
                SubjectProgress {
                    subject,
                    total,
                    completed,
                    percent: percentage(completed, total),
                }
            })
            .collect();

        Self {
            total_chapters: chapters.len(),
            completed_chapters,
            overall_percent: percentage(completed_chapters, chapters.len()),
            subjects,
        }
    }

    #[must_use]
    pub fn subject(&self, subject: Subject) -> Option<&SubjectProgress> {
        self.subjects.iter().find(|s| s.subject == subject)
    }
}

//
// ─── STUDY TIME ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudyTotals {
    pub session_count: u64,
    pub total_minutes: u64,
    pub total_hours: f64,
    pub average_hours: f64,
}

impl StudyTotals {
    /// Build from pre-aggregated counts, e.g. a `SUM`/`COUNT` query.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_totals(session_count: u64, total_minutes: u64) -> Self {
        let average_hours = if session_count == 0 {
            0.0
        } else {
            round_to(total_minutes as f64 / session_count as f64 / 60.0, 1)
        };
        Self {
            session_count,
            total_minutes,
            total_hours: minutes_to_hours(total_minutes),
            average_hours,
        }
    }
}

/// One point of a study-time chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyStudy {
    pub date: NaiveDate,
    pub minutes: u32,
}

/// Collapse sessions into per-day minute totals ordered by date.
#[must_use]
pub fn daily_series(sessions: &[StudySession]) -> Vec<DailyStudy> {
    let mut by_day: std::collections::BTreeMap<NaiveDate, u32> = std::collections::BTreeMap::new();
    for s in sessions {
        let entry = by_day.entry(s.date).or_default();
        *entry = entry.saturating_add(s.duration_minutes);
    }
    by_day
        .into_iter()
        .map(|(date, minutes)| DailyStudy { date, minutes })
        .collect()
}
