use chrono::{Days, Duration};
use services::{
    AccessError, Actor, AppServices, Clock, DashboardError, ProgressError, TrackerConfig,
};
use storage::repository::Storage;
use track_core::model::{
    ChecklistUpdate, RegistrationDraft, SectionScore, StudySessionDraft, Subject, SyllabusEntry,
    TestScoreDraft, TestType,
};
use track_core::time::{fixed_now, fixed_today};

fn syllabus() -> Vec<SyllabusEntry> {
    let mut entries = SyllabusEntry::numbered(Subject::Physics, &["Kinematics", "Optics"]);
    entries.extend(SyllabusEntry::numbered(Subject::Chemistry, &["Atomic Structure"]));
    entries.extend(SyllabusEntry::numbered(Subject::Biology, &["Genetics"]));
    entries
}

fn registration(username: &str) -> RegistrationDraft {
    RegistrationDraft {
        username: username.to_owned(),
        full_name: Some("Flow Student".into()),
        target_exam_year: Some(2026),
    }
}

#[tokio::test]
async fn student_flow_from_registration_to_dashboard() {
    let services = AppServices::new_sqlite(
        "sqlite:file:memdb_student_flow?mode=memory&cache=shared",
        Clock::fixed(fixed_now()),
        TrackerConfig::default(),
    )
    .await
    .expect("bootstrap services");
    let accounts = services.accounts();
    let admin = Actor::from(services.admin());

    let student = accounts
        .register(registration("asha"), &syllabus())
        .await
        .expect("register");
    assert!(accounts.sign_in("asha").await.is_err());

    let pending = accounts.list_pending(&admin, 10).await.expect("pending");
    assert_eq!(pending.len(), 1);
    accounts.approve(&admin, student.id()).await.expect("approve");

    let student = accounts.sign_in("asha").await.expect("sign in");
    let me = Actor::from(&student);

    let chapters = services
        .progress()
        .chapters(&me, student.id(), Some(Subject::Physics))
        .await
        .expect("chapters");
    assert_eq!(chapters.len(), 2);
    let done = ChecklistUpdate {
        material_read: Some(true),
        lecture_watched: Some(true),
        questions_solved: Some(true),
        revised: Some(true),
    };
    services
        .progress()
        .update_chapter(&me, chapters[0].id(), done)
        .await
        .expect("complete chapter");

    for days_ago in 0..3 {
        services
            .study()
            .log_session(
                &me,
                StudySessionDraft {
                    user_id: student.id(),
                    date: fixed_today().checked_sub_days(Days::new(days_ago)).unwrap(),
                    subject: Some(Subject::Physics),
                    duration_minutes: 60,
                    notes: None,
                },
            )
            .await
            .expect("log session");
    }

    services
        .tests()
        .record(
            &me,
            TestScoreDraft {
                user_id: student.id(),
                name: "Full Mock 1".into(),
                date: fixed_today(),
                test_type: TestType::FullLength,
                physics: Some(SectionScore {
                    score: 130,
                    total: 180,
                }),
                chemistry: None,
                biology: None,
                total_score: 523,
                total_marks: 720,
                notes: None,
            },
        )
        .await
        .expect("record test");

    services
        .focus()
        .complete_session(&me, student.id(), Some(Subject::Biology))
        .await
        .expect("focus");

    let dashboard = services
        .dashboard()
        .view(&me, student.id())
        .await
        .expect("dashboard");
    assert_eq!(dashboard.progress.total_chapters, 4);
    assert_eq!(dashboard.progress.completed_chapters, 1);
    assert_eq!(dashboard.progress.overall_percent, 25.0);
    assert_eq!(dashboard.streak_days, 3);
    assert_eq!(dashboard.study_hours_last_7_days, 3.0);
    assert_eq!(dashboard.recent_tests.len(), 1);
    assert_eq!(dashboard.focus_today.sessions_completed, 1);
    assert_eq!(dashboard.revision_due, 0);

    // Admins read student dashboards as-is.
    let as_admin = services
        .dashboard()
        .view(&admin, student.id())
        .await
        .expect("admin dashboard");
    assert_eq!(as_admin, dashboard);

    let json = serde_json::to_value(&dashboard).expect("serialize");
    assert_eq!(json["streak_days"], 3);
    assert_eq!(json["recent_tests"][0]["test_type"], "full_length");
}

#[tokio::test]
async fn students_are_isolated_and_admin_is_read_only() {
    let storage = Storage::in_memory();
    let services = AppServices::from_storage(
        &storage,
        Clock::fixed(fixed_now()),
        TrackerConfig::default(),
    )
    .await
    .expect("bootstrap services");
    let accounts = services.accounts();
    let admin = Actor::from(services.admin());

    let asha = accounts.register(registration("asha"), &syllabus()).await.unwrap();
    let ravi = accounts.register(registration("ravi"), &syllabus()).await.unwrap();
    let asha = accounts.approve(&admin, asha.id()).await.unwrap();
    let ravi = accounts.approve(&admin, ravi.id()).await.unwrap();

    let asha_chapter = services
        .progress()
        .chapters(&Actor::from(&asha), asha.id(), None)
        .await
        .unwrap()[0]
        .id();

    let ravi_actor = Actor::from(&ravi);
    assert!(matches!(
        services.progress().chapters(&ravi_actor, asha.id(), None).await,
        Err(ProgressError::Access(AccessError::Forbidden))
    ));
    assert!(matches!(
        services
            .progress()
            .update_chapter(&ravi_actor, asha_chapter, ChecklistUpdate::default())
            .await,
        Err(ProgressError::Access(AccessError::Forbidden))
    ));
    assert!(matches!(
        services
            .progress()
            .update_chapter(&admin, asha_chapter, ChecklistUpdate::default())
            .await,
        Err(ProgressError::Access(AccessError::Forbidden))
    ));
    assert!(matches!(
        services.dashboard().view(&ravi_actor, asha.id()).await,
        Err(DashboardError::Access(AccessError::Forbidden))
    ));
    assert!(matches!(
        services.dashboard().view(&admin, services.admin().id()).await,
        Err(DashboardError::NotAStudent)
    ));
}

#[tokio::test]
async fn revision_reminder_follows_config() {
    let storage = Storage::in_memory();
    let config = TrackerConfig {
        revision_reminder_days: 3,
        ..TrackerConfig::default()
    };
    let services = AppServices::from_storage(&storage, Clock::fixed(fixed_now()), config.clone())
        .await
        .unwrap();
    let admin = Actor::from(services.admin());
    let student = services
        .accounts()
        .register(registration("asha"), &syllabus())
        .await
        .unwrap();
    let student = services.accounts().approve(&admin, student.id()).await.unwrap();
    let me = Actor::from(&student);

    let chapter = services
        .progress()
        .chapters(&me, student.id(), None)
        .await
        .unwrap()[0]
        .id();
    services
        .progress()
        .update_chapter(
            &me,
            chapter,
            ChecklistUpdate {
                revised: Some(true),
                ..ChecklistUpdate::default()
            },
        )
        .await
        .unwrap();

    let mut clock = Clock::fixed(fixed_now());
    clock.advance(Duration::days(4));
    let later = AppServices::from_storage(&storage, clock, config).await.unwrap();
    let due = later.progress().revision_due(&me, student.id()).await.unwrap();
    assert_eq!(due.len(), 1);

    let dashboard = later.dashboard().view(&me, student.id()).await.unwrap();
    assert_eq!(dashboard.revision_due, 1);
}
