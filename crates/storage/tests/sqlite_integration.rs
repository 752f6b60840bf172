use chrono::{Days, Duration};
use storage::repository::{
    ChapterRepository, FocusRepository, RevisionRepository, StorageError, StudySessionRepository,
    TestScoreRepository, UserFilter, UserRepository,
};
use storage::sqlite::SqliteRepository;
use track_core::model::{
    ChecklistUpdate, NewChapter, NewUser, RegistrationDraft, RevisionDraft,
    SectionScore, StudySessionDraft, Subject, SyllabusEntry, TestScoreDraft, TestType, User,
    compute_streak, streak_window_start,
};
use track_core::time::{fixed_now, fixed_today};

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!(
        "sqlite:file:{name}?mode=memory&cache=shared"
    ))
    .await
    .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

async fn register(repo: &SqliteRepository, username: &str) -> User {
    let draft = RegistrationDraft {
        username: username.to_owned(),
        full_name: Some("Test Student".into()),
        target_exam_year: Some(2026),
    };
    repo.insert_user(draft.validate(fixed_now()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn sqlite_user_lifecycle() {
    let repo = connect("memdb_users").await;
    let admin = repo
        .insert_user(NewUser::admin("admin", fixed_now()).unwrap())
        .await
        .unwrap();
    let mut student = register(&repo, "asha").await;
    register(&repo, "ravi").await;

    let again = register_err(&repo, "asha").await;
    assert!(matches!(again, StorageError::Conflict));

    let pending = repo.list_users(UserFilter::Pending, 50).await.unwrap();
    assert_eq!(pending.len(), 2);
    assert!(pending.iter().all(|u| !u.is_admin()));

    student.approve(admin.id(), fixed_now()).unwrap();
    repo.update_user(&student).await.unwrap();

    let fetched = repo.find_by_username("asha").await.unwrap().unwrap();
    assert!(fetched.is_active());
    assert_eq!(fetched.approved_by(), Some(admin.id()));
    assert_eq!(fetched.target_exam_year(), Some(2026));

    let counts = repo.count_users().await.unwrap();
    assert_eq!((counts.total, counts.active, counts.pending), (2, 1, 1));
}

async fn register_err(repo: &SqliteRepository, username: &str) -> StorageError {
    let draft = RegistrationDraft {
        username: username.to_owned(),
        full_name: None,
        target_exam_year: None,
    };
    repo.insert_user(draft.validate(fixed_now()).unwrap())
        .await
        .unwrap_err()
}

#[tokio::test]
async fn sqlite_chapters_derive_completion_and_log_revisions() {
    let repo = connect("memdb_chapters").await;
    let user = register(&repo, "asha").await;

    let mut entries = SyllabusEntry::numbered(Subject::Biology, &["Genetics", "Evolution"]);
    entries.extend(SyllabusEntry::numbered(Subject::Physics, &["Kinematics"]));
    let chapters = entries
        .iter()
        .map(|e| NewChapter::from_entry(user.id(), e, fixed_now()).unwrap())
        .collect();
    let stored = repo.insert_chapters(chapters).await.unwrap();
    assert_eq!(stored.len(), 3);

    let listed = repo.chapters_for_user(user.id(), None).await.unwrap();
    let names: Vec<_> = listed.iter().map(|c| c.chapter_name().to_owned()).collect();
    assert_eq!(names, ["Kinematics", "Genetics", "Evolution"]);

    let chapter = listed[1].clone();
    let later = fixed_now() + Duration::hours(1);
    let outcome = repo
        .apply_update(
            chapter.id(),
            ChecklistUpdate {
                material_read: Some(true),
                lecture_watched: Some(true),
                questions_solved: Some(true),
                revised: None,
            },
            later,
        )
        .await
        .unwrap();
    assert!(!outcome.is_completed);

    let note = RevisionDraft {
        confidence: Some(4),
        notes: Some("Mendel's laws".into()),
    }
    .validate()
    .unwrap();
    let log = repo.record_revision(chapter.id(), note, later).await.unwrap();
    assert_eq!(log.revision_number, 1);
    assert_eq!(log.user_id, user.id());

    let fetched = repo.get_chapter(chapter.id()).await.unwrap().unwrap();
    assert!(fetched.is_completed());
    assert_eq!(fetched.revision_count(), 1);
    assert_eq!(fetched.last_revised_at(), Some(later));

    let history = repo.revisions_for_chapter(chapter.id()).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].confidence.map(|c| c.value()), Some(4));

    let biology = repo
        .chapters_for_user(user.id(), Some(Subject::Biology))
        .await
        .unwrap();
    assert_eq!(biology.len(), 2);
}

#[tokio::test]
async fn sqlite_study_dates_feed_streak() {
    let repo = connect("memdb_streak").await;
    let user = register(&repo, "asha").await;
    let today = fixed_today();

    for offset in [0_u64, 0, 1, 2, 4] {
        let draft = StudySessionDraft {
            user_id: user.id(),
            date: today.checked_sub_days(Days::new(offset)).unwrap(),
            subject: Some(Subject::Chemistry),
            duration_minutes: 60,
            notes: None,
        };
        repo.insert_session(draft.validate(fixed_now()).unwrap())
            .await
            .unwrap();
    }

    let dates = repo
        .study_dates_between(user.id(), streak_window_start(today), today)
        .await
        .unwrap();
    assert_eq!(dates.len(), 4);
    assert_eq!(compute_streak(&dates, today), 3);

    let summary = repo.minutes_summary(user.id(), Some(today)).await.unwrap();
    assert_eq!(summary.session_count, 2);
    assert_eq!(summary.total_minutes, 120);

    let recent = repo.recent_sessions(user.id(), 2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert!(recent.iter().all(|s| s.date == today));
}

#[tokio::test]
async fn sqlite_tests_and_focus_round_trip() {
    let repo = connect("memdb_tests_focus").await;
    let user = register(&repo, "asha").await;
    let today = fixed_today();

    for (offset, score) in [(2_u64, 400), (0, 550)] {
        let draft = TestScoreDraft {
            user_id: user.id(),
            name: format!("Mock {score}"),
            date: today.checked_sub_days(Days::new(offset)).unwrap(),
            test_type: TestType::FullLength,
            physics: Some(SectionScore {
                score: 100,
                total: 180,
            }),
            chemistry: None,
            biology: None,
            total_score: score,
            total_marks: 720,
            notes: None,
        };
        repo.insert_test(draft.validate(fixed_now()).unwrap())
            .await
            .unwrap();
    }

    let tests = repo.tests_for_user(user.id(), None).await.unwrap();
    assert_eq!(tests.len(), 2);
    assert_eq!(tests[0].total_score, 550);
    assert_eq!(tests[0].physics.map(|s| s.total), Some(180));
    assert!(tests[0].chemistry.is_none());
    assert_eq!(repo.tests_for_user(user.id(), Some(1)).await.unwrap().len(), 1);

    repo.record_focus_session(user.id(), today, 25, Some(Subject::Physics))
        .await
        .unwrap();
    let day = repo
        .record_focus_session(user.id(), today, 25, None)
        .await
        .unwrap();
    assert_eq!(day.sessions_completed, 2);

    let fetched = repo.get_focus_day(user.id(), today).await.unwrap().unwrap();
    assert_eq!(fetched.sessions_completed, 2);
    assert_eq!(fetched.total_focus_minutes, 50);
    assert_eq!(fetched.subject, Some(Subject::Physics));
}

#[tokio::test]
async fn sqlite_delete_user_cascades() {
    let repo = connect("memdb_cascade").await;
    let user = register(&repo, "asha").await;
    let entries = SyllabusEntry::numbered(Subject::Physics, &["Optics"]);
    let chapter = NewChapter::from_entry(user.id(), &entries[0], fixed_now()).unwrap();
    repo.insert_chapters(vec![chapter]).await.unwrap();
    repo.record_focus_session(user.id(), fixed_today(), 25, None)
        .await
        .unwrap();

    repo.delete_user(user.id()).await.unwrap();

    assert!(repo.get_user(user.id()).await.unwrap().is_none());
    assert!(
        repo.chapters_for_user(user.id(), None)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(
        repo.get_focus_day(user.id(), fixed_today())
            .await
            .unwrap()
            .is_none()
    );
    assert!(matches!(
        repo.delete_user(user.id()).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_recent_revisions_are_newest_first() {
    let repo = connect("memdb_recent_revisions").await;
    let user = register(&repo, "asha").await;
    let entries = SyllabusEntry::numbered(Subject::Chemistry, &["Bonding", "Redox"]);
    let chapters = repo
        .insert_chapters(
            entries
                .iter()
                .map(|e| NewChapter::from_entry(user.id(), e, fixed_now()).unwrap())
                .collect(),
        )
        .await
        .unwrap();

    for (hours, chapter) in [(1, &chapters[0]), (2, &chapters[1]), (3, &chapters[0])] {
        let at = fixed_now() + Duration::hours(hours);
        repo.record_revision(chapter.id(), RevisionDraft::default().validate().unwrap(), at)
            .await
            .unwrap();
    }

    let recent = repo.recent_revisions(user.id(), 2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].chapter_id, chapters[0].id());
    assert_eq!(recent[0].revision_number, 2);
    assert_eq!(recent[1].chapter_id, chapters[1].id());
    assert!(recent[0].revised_at > recent[1].revised_at);
}

#[tokio::test]
async fn sqlite_migrate_keeps_existing_rows() {
    let repo = connect("memdb_migrate_twice").await;
    let user = register(&repo, "asha").await;
    repo.migrate().await.expect("second migrate");
    let stored = repo.get_user(user.id()).await.unwrap().expect("user kept");
    assert_eq!(stored.username(), "asha");
}
