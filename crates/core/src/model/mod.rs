mod chapter;
mod focus;
mod ids;
mod revision;
pub mod stats;
mod study;
mod subject;
mod test_score;
mod user;

pub use ids::{ChapterId, ParseIdError, RevisionId, StudySessionId, TestScoreId, UserId};
pub use subject::{ParseSubjectError, Subject};

pub use chapter::{
    ChapterChecklist, ChapterError, ChapterProgress, ChapterUpdateOutcome, ChecklistUpdate,
    NewChapter, SyllabusEntry, evaluate_completion,
};
pub use focus::{FocusDay, FocusStats};
pub use revision::{
    ConfidenceLevel, NewRevisionLog, RevisionDraft, RevisionError, RevisionLog, RevisionNote,
};
pub use stats::{DailyStudy, ProgressSummary, StudyTotals, SubjectProgress};
pub use study::{
    MAX_STREAK_DAYS, NewStudySession, StudySession, StudySessionDraft, StudySessionError,
    compute_streak, streak_window_start,
};
pub use test_score::{
    NewTestScore, SectionScore, TestScore, TestScoreDraft, TestScoreError, TestType,
};
pub use user::{NewUser, RegistrationDraft, User, UserError, UserStatus};
