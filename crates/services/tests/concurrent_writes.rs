use std::sync::Arc;

use services::{Actor, AppServices, Clock, TrackerConfig};
use track_core::model::{
    ChecklistUpdate, RegistrationDraft, RevisionDraft, Subject, SyllabusEntry, User,
};
use track_core::time::fixed_now;

async fn bootstrap(name: &str) -> AppServices {
    AppServices::new_sqlite(
        &format!("sqlite:file:{name}?mode=memory&cache=shared"),
        Clock::fixed(fixed_now()),
        TrackerConfig::default(),
    )
    .await
    .expect("bootstrap services")
}

async fn approved_student(services: &AppServices) -> User {
    let admin = Actor::from(services.admin());
    let syllabus = SyllabusEntry::numbered(Subject::Physics, &["Kinematics", "Optics"]);
    let student = services
        .accounts()
        .register(
            RegistrationDraft {
                username: "asha".into(),
                full_name: None,
                target_exam_year: None,
            },
            &syllabus,
        )
        .await
        .expect("register");
    services
        .accounts()
        .approve(&admin, student.id())
        .await
        .expect("approve")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_focus_sessions_all_count() {
    let services = bootstrap("memdb_parallel_focus").await;
    let student = approved_student(&services).await;
    let me = Actor::from(&student);
    let focus = services.focus();

    let handles: Vec<_> = (0..40)
        .map(|_| {
            let focus = Arc::clone(&focus);
            tokio::spawn(async move { focus.complete_session(&me, me.id(), None).await })
        })
        .collect();
    for handle in handles {
        handle.await.expect("join").expect("complete session");
    }

    let today = focus.today(&me, student.id()).await.expect("today");
    assert_eq!(today.sessions_completed, 40);
    assert_eq!(today.total_focus_minutes, 40 * 25);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_revisions_get_distinct_numbers() {
    let services = bootstrap("memdb_parallel_revisions").await;
    let student = approved_student(&services).await;
    let me = Actor::from(&student);
    let progress = services.progress();
    let chapters = progress
        .chapters(&me, student.id(), None)
        .await
        .expect("chapters");
    let chapter = chapters[0].id();

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let progress = Arc::clone(&progress);
            tokio::spawn(async move {
                progress
                    .log_revision(&me, chapter, RevisionDraft::default())
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.expect("join").expect("log revision");
    }

    let stored = progress
        .chapters(&me, student.id(), None)
        .await
        .expect("chapters")
        .into_iter()
        .find(|c| c.id() == chapter)
        .expect("chapter still present");
    assert_eq!(stored.revision_count(), 20);

    let mut numbers: Vec<u32> = progress
        .revision_history(&me, chapter)
        .await
        .expect("history")
        .iter()
        .map(|r| r.revision_number)
        .collect();
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=20).collect::<Vec<u32>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_checklist_updates_keep_every_flag() {
    let services = bootstrap("memdb_parallel_checklist").await;
    let student = approved_student(&services).await;
    let me = Actor::from(&student);
    let progress = services.progress();
    let chapter = progress
        .chapters(&me, student.id(), None)
        .await
        .expect("chapters")[1]
        .id();

    let updates = [
        ChecklistUpdate {
            material_read: Some(true),
            ..ChecklistUpdate::default()
        },
        ChecklistUpdate {
            lecture_watched: Some(true),
            ..ChecklistUpdate::default()
        },
        ChecklistUpdate {
            questions_solved: Some(true),
            ..ChecklistUpdate::default()
        },
        ChecklistUpdate {
            revised: Some(true),
            ..ChecklistUpdate::default()
        },
    ];
    let handles: Vec<_> = updates
        .into_iter()
        .map(|update| {
            let progress = Arc::clone(&progress);
            tokio::spawn(async move { progress.update_chapter(&me, chapter, update).await })
        })
        .collect();
    for handle in handles {
        handle.await.expect("join").expect("update chapter");
    }

    let summary = progress
        .progress_summary(&me, student.id())
        .await
        .expect("summary");
    assert_eq!(summary.completed_chapters, 1);
    let history = progress
        .revision_history(&me, chapter)
        .await
        .expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].revision_number, 1);
}
