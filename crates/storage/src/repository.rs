use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use track_core::model::{
    ChapterId, ChapterProgress, ChapterUpdateOutcome, ChecklistUpdate, FocusDay, NewChapter,
    NewStudySession, NewTestScore, NewUser, RevisionId, RevisionLog, RevisionNote, StudySession,
    StudySessionId, Subject, TestScore, TestScoreId, User, UserId, UserStatus,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── QUERY SHAPES ──────────────────────────────────────────────────────────────
//

/// Which student accounts a listing should include. Admins are never listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFilter {
    All,
    Pending,
    Active,
}

impl UserFilter {
    #[must_use]
    pub fn matches(self, user: &User) -> bool {
        match (self, user.status()) {
            (_, UserStatus::Admin) => false,
            (UserFilter::All, _) => true,
            (UserFilter::Pending, status) => status == UserStatus::Pending,
            (UserFilter::Active, status) => status == UserStatus::Active,
        }
    }
}

/// Student account counts for the admin overview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserCounts {
    pub total: u64,
    pub active: u64,
    pub pending: u64,
}

/// Aggregate study minutes for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MinutesSummary {
    pub session_count: u64,
    pub total_minutes: u64,
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the username is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StorageError>;

    /// Persist status and login fields of an existing account.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the account does not exist.
    async fn update_user(&self, user: &User) -> Result<(), StorageError>;

    /// Delete an account and everything it owns.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the account does not exist.
    async fn delete_user(&self, id: UserId) -> Result<(), StorageError>;

    /// Student accounts, newest registration first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_users(&self, filter: UserFilter, limit: u32) -> Result<Vec<User>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn count_users(&self) -> Result<UserCounts, StorageError>;
}

#[async_trait]
pub trait ChapterRepository: Send + Sync {
    /// Insert all chapters atomically, returning them with assigned IDs.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a chapter already exists for the user.
    async fn insert_chapters(
        &self,
        chapters: Vec<NewChapter>,
    ) -> Result<Vec<ChapterProgress>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_chapter(&self, id: ChapterId) -> Result<Option<ChapterProgress>, StorageError>;

    /// Apply a checklist update to the stored chapter as one atomic step.
    ///
    /// When the update newly marks the chapter revised, a revision log entry
    /// numbered with the new counter is written in the same step.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the chapter does not exist.
    async fn apply_update(
        &self,
        id: ChapterId,
        update: ChecklistUpdate,
        now: DateTime<Utc>,
    ) -> Result<ChapterUpdateOutcome, StorageError>;

    /// Chapters ordered by subject then syllabus order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn chapters_for_user(
        &self,
        user_id: UserId,
        subject: Option<Subject>,
    ) -> Result<Vec<ChapterProgress>, StorageError>;
}

#[async_trait]
pub trait StudySessionRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn insert_session(&self, session: NewStudySession)
    -> Result<StudySession, StorageError>;

    /// Sessions with `from <= date <= to`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn sessions_between(
        &self,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<StudySession>, StorageError>;

    /// Most recent sessions first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn recent_sessions(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<StudySession>, StorageError>;

    /// Count and total minutes, optionally restricted to `date >= since`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn minutes_summary(
        &self,
        user_id: UserId,
        since: Option<NaiveDate>,
    ) -> Result<MinutesSummary, StorageError>;

    /// Distinct days in `[from, to]` with at least one session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn study_dates_between(
        &self,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<HashSet<NaiveDate>, StorageError>;
}

#[async_trait]
pub trait TestScoreRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn insert_test(&self, test: NewTestScore) -> Result<TestScore, StorageError>;

    /// Tests newest first; `None` returns all of them.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn tests_for_user(
        &self,
        user_id: UserId,
        limit: Option<u32>,
    ) -> Result<Vec<TestScore>, StorageError>;
}

#[async_trait]
pub trait RevisionRepository: Send + Sync {
    /// Increment the chapter's revision counter and append the matching log
    /// entry as one atomic step.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the chapter does not exist.
    async fn record_revision(
        &self,
        chapter_id: ChapterId,
        note: RevisionNote,
        now: DateTime<Utc>,
    ) -> Result<RevisionLog, StorageError>;

    /// Most recent revisions first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn recent_revisions(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<RevisionLog>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn revisions_for_chapter(
        &self,
        chapter_id: ChapterId,
    ) -> Result<Vec<RevisionLog>, StorageError>;
}

#[async_trait]
pub trait FocusRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_focus_day(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<FocusDay>, StorageError>;

    /// Count one finished work interval on `date`, creating the row if needed.
    ///
    /// Concurrent calls for the same day all count.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn record_focus_session(
        &self,
        user_id: UserId,
        date: NaiveDate,
        work_minutes: u32,
        subject: Option<Subject>,
    ) -> Result<FocusDay, StorageError>;

    /// Focus days with `from <= date <= to`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn focus_days_between(
        &self,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<FocusDay>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    users: BTreeMap<UserId, User>,
    chapters: BTreeMap<ChapterId, ChapterProgress>,
    sessions: BTreeMap<StudySessionId, StudySession>,
    tests: BTreeMap<TestScoreId, TestScore>,
    revisions: BTreeMap<RevisionId, RevisionLog>,
    focus: BTreeMap<(UserId, NaiveDate), FocusDay>,
}

impl MemoryState {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// A single lock guards all tables so cascading deletes stay atomic.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn insert_user(&self, user: NewUser) -> Result<User, StorageError> {
        let mut guard = self.lock()?;
        if guard.users.values().any(|u| u.username() == user.username) {
            return Err(StorageError::Conflict);
        }
        let id = UserId::new(guard.allocate());
        let user = user.assign_id(id);
        guard.users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.username() == username)
            .cloned())
    }

    async fn update_user(&self, user: &User) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let slot = guard.users.get_mut(&user.id()).ok_or(StorageError::NotFound)?;
        *slot = user.clone();
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.users.remove(&id).is_none() {
            return Err(StorageError::NotFound);
        }
        guard.chapters.retain(|_, c| c.user_id() != id);
        guard.sessions.retain(|_, s| s.user_id != id);
        guard.tests.retain(|_, t| t.user_id != id);
        guard.revisions.retain(|_, r| r.user_id != id);
        guard.focus.retain(|(owner, _), _| *owner != id);
        Ok(())
    }

    async fn list_users(&self, filter: UserFilter, limit: u32) -> Result<Vec<User>, StorageError> {
        let guard = self.lock()?;
        let mut users: Vec<User> = guard
            .users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(b.id().cmp(&a.id())));
        users.truncate(limit as usize);
        Ok(users)
    }

    async fn count_users(&self) -> Result<UserCounts, StorageError> {
        let guard = self.lock()?;
        let mut counts = UserCounts::default();
        for user in guard.users.values() {
            match user.status() {
                UserStatus::Admin => continue,
                UserStatus::Active => counts.active += 1,
                UserStatus::Pending => counts.pending += 1,
            }
            counts.total += 1;
        }
        Ok(counts)
    }
}

#[async_trait]
impl ChapterRepository for InMemoryRepository {
    async fn insert_chapters(
        &self,
        chapters: Vec<NewChapter>,
    ) -> Result<Vec<ChapterProgress>, StorageError> {
        let mut guard = self.lock()?;
        let mut seen = HashSet::new();
        for ch in &chapters {
            let key = (ch.user_id, ch.subject, ch.chapter_name.clone());
            let exists = guard.chapters.values().any(|c| {
                c.user_id() == ch.user_id
                    && c.subject() == ch.subject
                    && c.chapter_name() == ch.chapter_name
            });
            if exists || !seen.insert(key) {
                return Err(StorageError::Conflict);
            }
        }

        let mut out = Vec::with_capacity(chapters.len());
        for ch in chapters {
            let id = ChapterId::new(guard.allocate());
            let stored = ch.assign_id(id);
            guard.chapters.insert(id, stored.clone());
            out.push(stored);
        }
        Ok(out)
    }

    async fn get_chapter(&self, id: ChapterId) -> Result<Option<ChapterProgress>, StorageError> {
        Ok(self.lock()?.chapters.get(&id).cloned())
    }

    async fn apply_update(
        &self,
        id: ChapterId,
        update: ChecklistUpdate,
        now: DateTime<Utc>,
    ) -> Result<ChapterUpdateOutcome, StorageError> {
        let mut guard = self.lock()?;
        let chapter = guard.chapters.get_mut(&id).ok_or(StorageError::NotFound)?;
        let outcome = chapter.apply_update(update, now);
        let owner = chapter.user_id();

        if outcome.newly_revised {
            let log_id = RevisionId::new(guard.allocate());
            let log = RevisionNote::default()
                .into_log(owner, id, outcome.revision_count, now)
                .assign_id(log_id);
            guard.revisions.insert(log_id, log);
        }
        Ok(outcome)
    }

    async fn chapters_for_user(
        &self,
        user_id: UserId,
        subject: Option<Subject>,
    ) -> Result<Vec<ChapterProgress>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<ChapterProgress> = guard
            .chapters
            .values()
            .filter(|c| c.user_id() == user_id && subject.is_none_or(|s| c.subject() == s))
            .cloned()
            .collect();
        out.sort_by_key(|c| (c.subject(), c.chapter_order(), c.id()));
        Ok(out)
    }
}

#[async_trait]
impl StudySessionRepository for InMemoryRepository {
    async fn insert_session(
        &self,
        session: NewStudySession,
    ) -> Result<StudySession, StorageError> {
        let mut guard = self.lock()?;
        let id = StudySessionId::new(guard.allocate());
        let session = session.assign_id(id);
        guard.sessions.insert(id, session.clone());
        Ok(session)
    }

    async fn sessions_between(
        &self,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<StudySession>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<StudySession> = guard
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && s.date >= from && s.date <= to)
            .cloned()
            .collect();
        out.sort_by_key(|s| (s.date, s.id));
        Ok(out)
    }

    async fn recent_sessions(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<StudySession>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<StudySession> = guard
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        out.truncate(limit as usize);
        Ok(out)
    }

    async fn minutes_summary(
        &self,
        user_id: UserId,
        since: Option<NaiveDate>,
    ) -> Result<MinutesSummary, StorageError> {
        let guard = self.lock()?;
        let mut summary = MinutesSummary::default();
        for s in guard
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && since.is_none_or(|d| s.date >= d))
        {
            summary.session_count += 1;
            summary.total_minutes += u64::from(s.duration_minutes);
        }
        Ok(summary)
    }

    async fn study_dates_between(
        &self,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<HashSet<NaiveDate>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && s.date >= from && s.date <= to)
            .map(|s| s.date)
            .collect())
    }
}

#[async_trait]
impl TestScoreRepository for InMemoryRepository {
    async fn insert_test(&self, test: NewTestScore) -> Result<TestScore, StorageError> {
        let mut guard = self.lock()?;
        let id = TestScoreId::new(guard.allocate());
        let test = test.assign_id(id);
        guard.tests.insert(id, test.clone());
        Ok(test)
    }

    async fn tests_for_user(
        &self,
        user_id: UserId,
        limit: Option<u32>,
    ) -> Result<Vec<TestScore>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<TestScore> = guard
            .tests
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        if let Some(limit) = limit {
            out.truncate(limit as usize);
        }
        Ok(out)
    }
}

#[async_trait]
impl RevisionRepository for InMemoryRepository {
    async fn record_revision(
        &self,
        chapter_id: ChapterId,
        note: RevisionNote,
        now: DateTime<Utc>,
    ) -> Result<RevisionLog, StorageError> {
        let mut guard = self.lock()?;
        let chapter = guard
            .chapters
            .get_mut(&chapter_id)
            .ok_or(StorageError::NotFound)?;
        let number = chapter.record_revision(now);
        let owner = chapter.user_id();

        let id = RevisionId::new(guard.allocate());
        let log = note.into_log(owner, chapter_id, number, now).assign_id(id);
        guard.revisions.insert(id, log.clone());
        Ok(log)
    }

    async fn recent_revisions(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<RevisionLog>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<RevisionLog> = guard
            .revisions
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.revised_at.cmp(&a.revised_at).then(b.id.cmp(&a.id)));
        out.truncate(limit as usize);
        Ok(out)
    }

    async fn revisions_for_chapter(
        &self,
        chapter_id: ChapterId,
    ) -> Result<Vec<RevisionLog>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .revisions
            .values()
            .filter(|r| r.chapter_id == chapter_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FocusRepository for InMemoryRepository {
    async fn get_focus_day(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<FocusDay>, StorageError> {
        Ok(self.lock()?.focus.get(&(user_id, date)).cloned())
    }

    async fn record_focus_session(
        &self,
        user_id: UserId,
        date: NaiveDate,
        work_minutes: u32,
        subject: Option<Subject>,
    ) -> Result<FocusDay, StorageError> {
        let mut guard = self.lock()?;
        let day = guard
            .focus
            .entry((user_id, date))
            .or_insert_with(|| FocusDay::empty(user_id, date));
        day.complete_session(work_minutes, subject);
        Ok(day.clone())
    }

    async fn focus_days_between(
        &self,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<FocusDay>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .focus
            .range((user_id, from)..=(user_id, to))
            .map(|(_, day)| day.clone())
            .collect())
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub chapters: Arc<dyn ChapterRepository>,
    pub study_sessions: Arc<dyn StudySessionRepository>,
    pub tests: Arc<dyn TestScoreRepository>,
    pub revisions: Arc<dyn RevisionRepository>,
    pub focus: Arc<dyn FocusRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Share one backend across every repository slot.
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: UserRepository
            + ChapterRepository
            + StudySessionRepository
            + TestScoreRepository
            + RevisionRepository
            + FocusRepository
            + Clone
            + 'static,
    {
        Self {
            users: Arc::new(repo.clone()),
            chapters: Arc::new(repo.clone()),
            study_sessions: Arc::new(repo.clone()),
            tests: Arc::new(repo.clone()),
            revisions: Arc::new(repo.clone()),
            focus: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use track_core::model::{
        ChecklistUpdate, RegistrationDraft, RevisionDraft, StudySessionDraft, SyllabusEntry,
    };
    use track_core::time::{fixed_now, fixed_today};

    async fn student(repo: &InMemoryRepository, name: &str) -> User {
        let draft = RegistrationDraft {
            username: name.to_owned(),
            full_name: None,
            target_exam_year: None,
        };
        repo.insert_user(draft.validate(fixed_now()).unwrap())
            .await
            .unwrap()
    }

    async fn enrol(repo: &InMemoryRepository, user: UserId) -> Vec<ChapterProgress> {
        let entries = SyllabusEntry::numbered(Subject::Physics, &["Vectors", "Waves"]);
        let chapters = entries
            .iter()
            .map(|e| NewChapter::from_entry(user, e, fixed_now()).unwrap())
            .collect();
        repo.insert_chapters(chapters).await.unwrap()
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let repo = InMemoryRepository::new();
        student(&repo, "asha").await;
        let again = RegistrationDraft {
            username: "asha".into(),
            full_name: None,
            target_exam_year: None,
        }
        .validate(fixed_now())
        .unwrap();
        assert!(matches!(
            repo.insert_user(again).await,
            Err(StorageError::Conflict)
        ));
    }

    #[tokio::test]
    async fn user_filters_follow_status() {
        let repo = InMemoryRepository::new();
        let asha = student(&repo, "asha").await;
        let mut ravi = student(&repo, "ravi").await;
        ravi.approve(asha.id(), fixed_now()).unwrap();
        repo.update_user(&ravi).await.unwrap();

        let pending = repo.list_users(UserFilter::Pending, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id(), asha.id());
        let active = repo.list_users(UserFilter::Active, 10).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id(), ravi.id());

        let counts = repo.count_users().await.unwrap();
        assert_eq!((counts.total, counts.active, counts.pending), (2, 1, 1));
    }

    #[tokio::test]
    async fn chapter_update_round_trips() {
        let repo = InMemoryRepository::new();
        let user = student(&repo, "asha").await;
        let chapters = enrol(&repo, user.id()).await;
        let id = chapters[0].id();
        let outcome = repo
            .apply_update(
                id,
                ChecklistUpdate {
                    material_read: Some(true),
                    ..ChecklistUpdate::default()
                },
                fixed_now(),
            )
            .await
            .unwrap();
        assert!(!outcome.newly_revised);

        let fetched = repo.get_chapter(id).await.unwrap().unwrap();
        assert!(fetched.checklist().material_read);
        assert_eq!(fetched.chapter_order(), 1);
        assert!(repo.revisions_for_chapter(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn newly_revised_update_writes_numbered_log() {
        let repo = InMemoryRepository::new();
        let user = student(&repo, "asha").await;
        let id = enrol(&repo, user.id()).await[0].id();
        let revised = ChecklistUpdate {
            revised: Some(true),
            ..ChecklistUpdate::default()
        };

        repo.apply_update(id, revised, fixed_now()).await.unwrap();
        repo.apply_update(id, revised, fixed_now()).await.unwrap();
        let note = RevisionDraft {
            confidence: Some(4),
            notes: None,
        }
        .validate()
        .unwrap();
        let log = repo.record_revision(id, note, fixed_now()).await.unwrap();

        assert_eq!(log.revision_number, 2);
        assert_eq!(log.user_id, user.id());
        let numbers: Vec<u32> = repo
            .revisions_for_chapter(id)
            .await
            .unwrap()
            .iter()
            .map(|r| r.revision_number)
            .collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(repo.get_chapter(id).await.unwrap().unwrap().revision_count(), 2);
    }

    #[tokio::test]
    async fn study_dates_are_distinct_and_bounded() {
        let repo = InMemoryRepository::new();
        let user = student(&repo, "asha").await;
        let today = fixed_today();
        for (date, minutes) in [(today, 30), (today, 45), (today.pred_opt().unwrap(), 20)] {
            let draft = StudySessionDraft {
                user_id: user.id(),
                date,
                subject: None,
                duration_minutes: minutes,
                notes: None,
            };
            repo.insert_session(draft.validate(fixed_now()).unwrap())
                .await
                .unwrap();
        }

        let dates = repo
            .study_dates_between(user.id(), today, today)
            .await
            .unwrap();
        assert_eq!(dates.len(), 1);

        let summary = repo.minutes_summary(user.id(), None).await.unwrap();
        assert_eq!(summary.session_count, 3);
        assert_eq!(summary.total_minutes, 95);
    }

    #[tokio::test]
    async fn delete_user_cascades() {
        let repo = InMemoryRepository::new();
        let user = student(&repo, "asha").await;
        let other = student(&repo, "ravi").await;
        let mut chapters = enrol(&repo, user.id()).await;
        enrol(&repo, other.id()).await;

        let ch = chapters.remove(0);
        repo.record_revision(ch.id(), RevisionNote::default(), fixed_now())
            .await
            .unwrap();

        repo.delete_user(user.id()).await.unwrap();
        assert!(repo.get_user(user.id()).await.unwrap().is_none());
        assert!(repo.chapters_for_user(user.id(), None).await.unwrap().is_empty());
        assert!(repo.recent_revisions(user.id(), 10).await.unwrap().is_empty());
        assert_eq!(repo.chapters_for_user(other.id(), None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn revision_of_missing_chapter_is_not_found() {
        let repo = InMemoryRepository::new();
        assert!(matches!(
            repo.record_revision(ChapterId::new(404), RevisionNote::default(), fixed_now())
                .await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn focus_days_range_is_per_user() {
        let repo = InMemoryRepository::new();
        let today = fixed_today();
        repo.record_focus_session(UserId::new(1), today, 25, Some(Subject::Physics))
            .await
            .unwrap();
        let mine = repo
            .record_focus_session(UserId::new(1), today, 25, None)
            .await
            .unwrap();
        repo.record_focus_session(UserId::new(2), today, 50, None)
            .await
            .unwrap();

        assert_eq!(mine.sessions_completed, 2);
        assert_eq!(mine.total_focus_minutes, 50);
        assert_eq!(mine.subject, Some(Subject::Physics));

        let days = repo
            .focus_days_between(UserId::new(1), today.pred_opt().unwrap(), today)
            .await
            .unwrap();
        assert_eq!(days, vec![mine]);
    }
}
