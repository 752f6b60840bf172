use std::sync::Arc;

use storage::repository::{ChapterRepository, RevisionRepository, StorageError};
use track_core::model::{
    ChapterId, ChapterProgress, ChapterUpdateOutcome, ChecklistUpdate, ProgressSummary,
    RevisionDraft, RevisionLog, Subject, UserId,
};

use crate::Clock;
use crate::access::{AccessMode, Actor, authorize};
use crate::error::ProgressError;

/// Chapter checklists, revision tracking, and syllabus progress.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    reminder_days: u32,
    chapters: Arc<dyn ChapterRepository>,
    revisions: Arc<dyn RevisionRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        reminder_days: u32,
        chapters: Arc<dyn ChapterRepository>,
        revisions: Arc<dyn RevisionRepository>,
    ) -> Self {
        Self {
            clock,
            reminder_days,
            chapters,
            revisions,
        }
    }

    /// Chapters of `user_id`, optionally restricted to one subject.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Access` if `actor` may not read the user's data.
    pub async fn chapters(
        &self,
        actor: &Actor,
        user_id: UserId,
        subject: Option<Subject>,
    ) -> Result<Vec<ChapterProgress>, ProgressError> {
        authorize(actor, user_id, AccessMode::Read)?;
        Ok(self.chapters.chapters_for_user(user_id, subject).await?)
    }

    /// Apply a partial checklist update.
    ///
    /// Marking a chapter revised for the first time since it was last cleared
    /// also appends a revision log entry.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::ChapterNotFound` for unknown chapters and
    /// `ProgressError::Access` if `actor` does not own the chapter.
    pub async fn update_chapter(
        &self,
        actor: &Actor,
        chapter_id: ChapterId,
        update: ChecklistUpdate,
    ) -> Result<ChapterUpdateOutcome, ProgressError> {
        self.load(actor, chapter_id, AccessMode::Write).await?;
        self.chapters
            .apply_update(chapter_id, update, self.clock.now())
            .await
            .map_err(chapter_gone)
    }

    /// Record an explicit revision pass with optional confidence and notes.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Validation` for out-of-range confidence or notes,
    /// and `ProgressError::Access` if `actor` does not own the chapter.
    pub async fn log_revision(
        &self,
        actor: &Actor,
        chapter_id: ChapterId,
        draft: RevisionDraft,
    ) -> Result<RevisionLog, ProgressError> {
        self.load(actor, chapter_id, AccessMode::Write).await?;
        let note = draft.validate()?;
        self.revisions
            .record_revision(chapter_id, note, self.clock.now())
            .await
            .map_err(chapter_gone)
    }

    /// Latest revisions across all of the user's chapters, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Access` if `actor` may not read the user's data.
    pub async fn recent_revisions(
        &self,
        actor: &Actor,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<RevisionLog>, ProgressError> {
        authorize(actor, user_id, AccessMode::Read)?;
        Ok(self.revisions.recent_revisions(user_id, limit).await?)
    }

    /// # Errors
    ///
    /// Returns `ProgressError::Access` if `actor` may not read the chapter.
    pub async fn revision_history(
        &self,
        actor: &Actor,
        chapter_id: ChapterId,
    ) -> Result<Vec<RevisionLog>, ProgressError> {
        self.load(actor, chapter_id, AccessMode::Read).await?;
        Ok(self.revisions.revisions_for_chapter(chapter_id).await?)
    }

    /// Revised chapters whose last revision is older than the reminder window.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Access` if `actor` may not read the user's data.
    pub async fn revision_due(
        &self,
        actor: &Actor,
        user_id: UserId,
    ) -> Result<Vec<ChapterProgress>, ProgressError> {
        let now = self.clock.now();
        let chapters = self.chapters(actor, user_id, None).await?;
        Ok(chapters
            .into_iter()
            .filter(|c| c.needs_revision(now, self.reminder_days))
            .collect())
    }

    /// # Errors
    ///
    /// Returns `ProgressError::Access` if `actor` may not read the user's data.
    pub async fn progress_summary(
        &self,
        actor: &Actor,
        user_id: UserId,
    ) -> Result<ProgressSummary, ProgressError> {
        let chapters = self.chapters(actor, user_id, None).await?;
        Ok(ProgressSummary::from_chapters(&chapters))
    }

    async fn load(
        &self,
        actor: &Actor,
        chapter_id: ChapterId,
        mode: AccessMode,
    ) -> Result<ChapterProgress, ProgressError> {
        let chapter = self
            .chapters
            .get_chapter(chapter_id)
            .await?
            .ok_or(ProgressError::ChapterNotFound)?;
        authorize(actor, chapter.user_id(), mode)?;
        Ok(chapter)
    }
}

fn chapter_gone(err: StorageError) -> ProgressError {
    match err {
        StorageError::NotFound => ProgressError::ChapterNotFound,
        other => ProgressError::Storage(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AccessError;
    use chrono::Duration;
    use storage::repository::{Storage, UserRepository};
    use track_core::model::{NewChapter, NewUser, RegistrationDraft, SyllabusEntry, User};
    use track_core::time::fixed_now;

    struct Fixture {
        service: ProgressService,
        storage: Storage,
        student: User,
        chapters: Vec<ChapterProgress>,
    }

    async fn fixture(clock: Clock) -> Fixture {
        let storage = Storage::in_memory();
        let admin = storage
            .users
            .insert_user(NewUser::admin("admin", fixed_now()).unwrap())
            .await
            .unwrap();
        let mut student = storage
            .users
            .insert_user(
                RegistrationDraft {
                    username: "asha".into(),
                    full_name: None,
                    target_exam_year: None,
                }
                .validate(fixed_now())
                .unwrap(),
            )
            .await
            .unwrap();
        student.approve(admin.id(), fixed_now()).unwrap();
        storage.users.update_user(&student).await.unwrap();

        let entries = SyllabusEntry::numbered(Subject::Physics, &["Optics", "Waves"]);
        let chapters = storage
            .chapters
            .insert_chapters(
                entries
                    .iter()
                    .map(|e| NewChapter::from_entry(student.id(), e, fixed_now()).unwrap())
                    .collect(),
            )
            .await
            .unwrap();

        let service = ProgressService::new(
            clock,
            7,
            Arc::clone(&storage.chapters),
            Arc::clone(&storage.revisions),
        );
        Fixture {
            service,
            storage,
            student,
            chapters,
        }
    }

    fn revised(flag: bool) -> ChecklistUpdate {
        ChecklistUpdate {
            revised: Some(flag),
            ..ChecklistUpdate::default()
        }
    }

    #[tokio::test]
    async fn revising_twice_counts_once() {
        let f = fixture(Clock::fixed(fixed_now())).await;
        let me = Actor::from(&f.student);
        let id = f.chapters[0].id();

        let first = f.service.update_chapter(&me, id, revised(true)).await.unwrap();
        let second = f.service.update_chapter(&me, id, revised(true)).await.unwrap();

        assert!(first.newly_revised);
        assert!(!second.newly_revised);
        assert_eq!(second.revision_count, 1);
        assert_eq!(f.service.revision_history(&me, id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn full_checklist_completes_chapter() {
        let f = fixture(Clock::fixed(fixed_now())).await;
        let me = Actor::from(&f.student);
        let update = ChecklistUpdate {
            material_read: Some(true),
            lecture_watched: Some(true),
            questions_solved: Some(true),
            revised: Some(true),
        };
        let outcome = f
            .service
            .update_chapter(&me, f.chapters[1].id(), update)
            .await
            .unwrap();
        assert!(outcome.is_completed);

        let summary = f.service.progress_summary(&me, f.student.id()).await.unwrap();
        assert_eq!(summary.completed_chapters, 1);
        assert_eq!(summary.overall_percent, 50.0);

        let stored = f
            .storage
            .chapters
            .get_chapter(f.chapters[1].id())
            .await
            .unwrap()
            .unwrap();
        assert!(stored.checklist().material_read);
    }

    #[tokio::test]
    async fn admin_reads_but_cannot_mutate() {
        let f = fixture(Clock::fixed(fixed_now())).await;
        let admin = f
            .storage
            .users
            .find_by_username("admin")
            .await
            .unwrap()
            .unwrap();
        let admin = Actor::from(&admin);

        assert_eq!(
            f.service
                .chapters(&admin, f.student.id(), None)
                .await
                .unwrap()
                .len(),
            2
        );
        assert!(matches!(
            f.service
                .update_chapter(&admin, f.chapters[0].id(), revised(true))
                .await,
            Err(ProgressError::Access(AccessError::Forbidden))
        ));
    }

    #[tokio::test]
    async fn revision_due_after_reminder_window() {
        let mut clock = Clock::fixed(fixed_now());
        let f = fixture(clock).await;
        let me = Actor::from(&f.student);
        f.service
            .log_revision(
                &me,
                f.chapters[0].id(),
                RevisionDraft {
                    confidence: Some(3),
                    notes: None,
                },
            )
            .await
            .unwrap();

        assert!(f.service.revision_due(&me, f.student.id()).await.unwrap().is_empty());

        clock.advance(Duration::days(8));
        let later = ProgressService::new(
            clock,
            7,
            Arc::clone(&f.storage.chapters),
            Arc::clone(&f.storage.revisions),
        );
        let due = later.revision_due(&me, f.student.id()).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id(), f.chapters[0].id());
    }

    #[tokio::test]
    async fn recent_revisions_span_chapters_newest_first() {
        let mut clock = Clock::fixed(fixed_now());
        let f = fixture(clock).await;
        let me = Actor::from(&f.student);

        f.service
            .update_chapter(&me, f.chapters[0].id(), revised(true))
            .await
            .unwrap();
        clock.advance(Duration::hours(2));
        let later = ProgressService::new(
            clock,
            7,
            Arc::clone(&f.storage.chapters),
            Arc::clone(&f.storage.revisions),
        );
        later
            .log_revision(
                &me,
                f.chapters[1].id(),
                RevisionDraft {
                    confidence: Some(2),
                    notes: Some("ray diagrams".into()),
                },
            )
            .await
            .unwrap();

        let recent = later.recent_revisions(&me, f.student.id(), 20).await.unwrap();
        let chapters: Vec<ChapterId> = recent.iter().map(|r| r.chapter_id).collect();
        assert_eq!(chapters, vec![f.chapters[1].id(), f.chapters[0].id()]);
        assert_eq!(recent[0].notes.as_deref(), Some("ray diagrams"));
        assert_eq!(later.recent_revisions(&me, f.student.id(), 1).await.unwrap().len(), 1);

        let outsider = Actor::from(&User::from_persisted(
            UserId::new(77),
            "ravi".into(),
            None,
            None,
            true,
            false,
            fixed_now(),
            None,
            None,
            None,
        ));
        assert!(matches!(
            later.recent_revisions(&outsider, f.student.id(), 20).await,
            Err(ProgressError::Access(AccessError::Forbidden))
        ));
    }

    #[tokio::test]
    async fn invalid_confidence_is_rejected() {
        let f = fixture(Clock::fixed(fixed_now())).await;
        let me = Actor::from(&f.student);
        let result = f
            .service
            .log_revision(
                &me,
                f.chapters[0].id(),
                RevisionDraft {
                    confidence: Some(6),
                    notes: None,
                },
            )
            .await;
        assert!(matches!(result, Err(ProgressError::Validation(_))));
    }
}
