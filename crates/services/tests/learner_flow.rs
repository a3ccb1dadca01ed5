use std::sync::Arc;

use chrono::Duration;
use lms_core::model::{
    Course, CourseId, Lesson, LessonId, Level, Module, Question, Quiz, QuizOption, UserId,
    VideoSource,
};
use lms_core::scoring::Answers;
use lms_core::time::fixed_now;
use services::{
    AppServices, AppServicesConfig, Clock, LessonContent, LmsEvent, Principal, ProgressError,
    Role, StaticIdentity,
};
use storage::repository::Storage;
use tokio::sync::broadcast::Receiver;

fn question(id: &str, correct: &str) -> Question {
    Question {
        id: id.into(),
        prompt: format!("{id}?"),
        options: vec![QuizOption::new("a", "A"), QuizOption::new("b", "B")],
        correct_option_id: correct.into(),
        explanation: None,
    }
}

fn gated_course() -> Course {
    Course {
        id: CourseId::new("safety"),
        title: "Safety".into(),
        description: String::new(),
        level: Level::Beginner,
        category: "FUNDAMENTALS".into(),
        duration: "1 week".into(),
        modules: 2,
        progress: 0,
        modules_list: vec![
            Module::new(
                "m1",
                "Basics",
                vec![
                    Lesson::text("l1", "Read", "# Basics"),
                    Lesson::video("l2", "Watch", VideoSource::Youtube { id: "xyz".into() }),
                ],
            ),
            Module::new(
                "m2",
                "Final Assessment",
                vec![
                    Lesson::quiz(
                        "l3",
                        "Final",
                        Quiz::new(50, vec![question("q1", "a"), question("q2", "b")]),
                    )
                    .as_final_assessment(),
                ],
            ),
        ],
        prerequisites: Vec::new(),
    }
}

fn answers(pairs: &[(&str, &str)]) -> Answers {
    pairs.iter().map(|(q, o)| ((*q).into(), (*o).into())).collect()
}

fn drain_progress_events(events: &mut Receiver<LmsEvent>) -> usize {
    let mut count = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, LmsEvent::ProgressUpdated { .. }) {
            count += 1;
        }
    }
    count
}

async fn services(db: &str, principal: Principal) -> AppServices {
    let storage = Storage::sqlite(&format!("sqlite:file:{db}?mode=memory&cache=shared"))
        .await
        .expect("connect sqlite");
    AppServices::from_storage(
        &storage,
        AppServicesConfig {
            clock: Clock::fixed(fixed_now()),
            cache_max_age: Duration::minutes(5),
            remote: None,
            identity: Arc::new(StaticIdentity::new(Some(principal))),
        },
    )
    .await
    .expect("services")
}

#[tokio::test]
async fn learner_progresses_through_gated_course() {
    let admin = Principal::new(UserId::new("admin"), Role::Admin);
    let app = services("memdb_learner_flow", admin.clone()).await;

    let mut events = app.events().subscribe();

    app.catalog()
        .replace_catalog(Some(&admin), &[gated_course()])
        .await
        .expect("seed catalog");
    app.catalog_cache().refresh().await.expect("refresh");

    let progress = app.progress();
    let learner = UserId::new("learner");
    let course_id = CourseId::new("safety");
    let l1 = LessonId::new("l1");
    let l2 = LessonId::new("l2");
    let l3 = LessonId::new("l3");
    let all_correct = answers(&[("q1", "a"), ("q2", "b")]);

    let err = progress
        .submit_quiz(&learner, &course_id, &l3, &all_correct)
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressError::LessonLocked { remaining: 2, .. }));
    assert!(matches!(
        progress.open_lesson(&learner, &course_id, &l3).await,
        Err(ProgressError::LessonLocked { .. })
    ));

    let summary = progress.complete_lesson(&learner, &course_id, &l1).await.unwrap();
    assert_eq!(summary.percent, 33);
    assert_eq!(summary.next_lesson, Some(l2.clone()));
    assert!(progress.is_lesson_locked(&learner, &course_id, &l3).await);

    // Completing twice leaves the set unchanged.
    progress.complete_lesson(&learner, &course_id, &l1).await.unwrap();
    let summary = progress.complete_lesson(&learner, &course_id, &l2).await.unwrap();
    assert_eq!(summary.completed, 2);
    assert!(!progress.is_lesson_locked(&learner, &course_id, &l3).await);

    let view = progress.open_lesson(&learner, &course_id, &l3).await.unwrap();
    assert!(matches!(view.content, LessonContent::Quiz { passing_percent: 50, .. }));

    let failed = progress
        .submit_quiz(&learner, &course_id, &l3, &answers(&[("q1", "b")]))
        .await
        .unwrap();
    assert_eq!(failed.result.percent, 0);
    assert!(!failed.result.passed);
    assert_eq!(failed.progress.percent, 67);

    let passed = progress
        .submit_quiz(&learner, &course_id, &l3, &all_correct)
        .await
        .unwrap();
    assert!(passed.result.passed);
    assert_eq!(passed.progress.percent, 100);
    assert_eq!(passed.progress.final_score, Some(100));
    assert_eq!(passed.progress.final_passed, Some(true));

    let summaries = progress.course_summaries(&learner).await;
    assert_eq!(summaries.len(), 1);
    assert!(summaries[0].progress.is_complete());

    let stored = progress.load_progress(&learner).await;
    let record = stored.course(&course_id).expect("stored progress");
    assert_eq!(record.completed_count(), 3);

    // l1, l1 again, l2, passing quiz.
    assert_eq!(drain_progress_events(&mut events), 4);
}

#[tokio::test]
async fn completion_rejects_unknown_ids_and_quiz_shortcuts() {
    let admin = Principal::new(UserId::new("admin"), Role::Admin);
    let app = services("memdb_learner_errors", admin.clone()).await;
    app.catalog()
        .replace_catalog(Some(&admin), &[gated_course()])
        .await
        .unwrap();
    app.catalog_cache().refresh().await.unwrap();

    let progress = app.progress();
    let user = UserId::new("u");
    let course_id = CourseId::new("safety");

    assert!(matches!(
        progress
            .complete_lesson(&user, &CourseId::new("nope"), &LessonId::new("l1"))
            .await,
        Err(ProgressError::UnknownCourse(_))
    ));
    assert!(matches!(
        progress
            .complete_lesson(&user, &course_id, &LessonId::new("ghost"))
            .await,
        Err(ProgressError::UnknownLesson { .. })
    ));
    assert!(matches!(
        progress.complete_lesson(&user, &course_id, &LessonId::new("l3")).await,
        Err(ProgressError::QuizRequiresSubmission(_))
    ));
    assert!(matches!(
        progress
            .submit_quiz(&user, &course_id, &LessonId::new("l1"), &Answers::new())
            .await,
        Err(ProgressError::NotAQuiz(_))
    ));
    assert!(!progress.is_lesson_locked(&user, &CourseId::new("nope"), &LessonId::new("x")).await);
}

#[tokio::test]
async fn mark_lesson_complete_overwrites_score_only_when_given() {
    let admin = Principal::new(UserId::new("admin"), Role::Admin);
    let app = services("memdb_mark_complete", admin.clone()).await;
    app.catalog()
        .replace_catalog(Some(&admin), &[gated_course()])
        .await
        .unwrap();
    app.catalog_cache().refresh().await.unwrap();

    let progress = app.progress();
    let user = UserId::new("u");
    let course_id = CourseId::new("safety");
    let lesson = LessonId::new("l1");

    progress
        .mark_lesson_complete(&user, &course_id, &lesson, Some(40))
        .await
        .unwrap();
    progress
        .mark_lesson_complete(&user, &course_id, &lesson, None)
        .await
        .unwrap();
    let map = progress
        .mark_lesson_complete(&user, &course_id, &lesson, Some(90))
        .await
        .unwrap();

    let record = map.course(&course_id).unwrap();
    assert_eq!(record.completed_count(), 1);
    assert_eq!(record.final_score, Some(90));
    assert_eq!(progress.load_progress(&user).await, map);
}

#[tokio::test]
async fn mark_lesson_complete_respects_gating() {
    let admin = Principal::new(UserId::new("admin"), Role::Admin);
    let app = services("memdb_mark_gated", admin.clone()).await;
    app.catalog()
        .replace_catalog(Some(&admin), &[gated_course()])
        .await
        .unwrap();
    app.catalog_cache().refresh().await.unwrap();

    let progress = app.progress();
    let user = UserId::new("u");
    let course_id = CourseId::new("safety");
    let final_quiz = LessonId::new("l3");
    assert!(progress.is_lesson_locked(&user, &course_id, &final_quiz).await);

    let err = progress
        .mark_lesson_complete(&user, &course_id, &final_quiz, Some(100))
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressError::LessonLocked { remaining: 2, .. }));
    assert!(progress.load_progress(&user).await.is_empty());

    assert!(matches!(
        progress
            .mark_lesson_complete(&user, &CourseId::new("nope"), &final_quiz, None)
            .await,
        Err(ProgressError::UnknownCourse(_))
    ));

    for lesson in ["l1", "l2"] {
        progress
            .mark_lesson_complete(&user, &course_id, &LessonId::new(lesson), None)
            .await
            .unwrap();
    }
    let map = progress
        .mark_lesson_complete(&user, &course_id, &final_quiz, Some(100))
        .await
        .unwrap();
    assert_eq!(map.course(&course_id).unwrap().final_score, Some(100));
}
