use std::error::Error;

use lms_core::Clock;
use lms_core::authoring::{ensure_final_assessment, new_course};
use lms_core::model::{Course, UserId};
use lms_core::progress::CourseProgressSummary;
use lms_core::scoring::is_complete_submission;
use serde_json::Value;
use services::{AppServices, LessonContent, normalize_catalog_payload};

use crate::config::{ArgsError, Command};

type CommandResult = Result<(), Box<dyn Error>>;

pub async fn run(app: &AppServices, clock: Clock, remote: bool, command: Command) -> CommandResult {
    match command {
        Command::Catalog => catalog(app).await,
        Command::Import { file } => {
            let raw = std::fs::read_to_string(&file)?;
            import(app, remote, serde_json::from_str(&raw)?).await
        }
        Command::NewCourse { title } => create_course(app, clock, &title).await,
        Command::Progress => {
            let user = require_user(app, "progress")?;
            progress(app, &user).await
        }
        Command::Show {
            course_id,
            lesson_id,
        } => {
            let user = require_user(app, "show")?;
            sync_best_effort(app).await;
            let view = app
                .progress()
                .open_lesson(&user, &course_id, &lesson_id)
                .await?;

            println!("{} [{}]", view.title, view.kind.as_str());
            if view.completed {
                println!("(completed)");
            }
            match view.content {
                LessonContent::Text { markdown } => println!("\n{markdown}"),
                LessonContent::Video {
                    embed_url,
                    uploaded_key,
                } => match (embed_url, uploaded_key) {
                    (Some(url), _) => println!("video: {url}"),
                    (None, Some(key)) => println!("video: uploaded media {key} (not available here)"),
                    (None, None) => println!("video: no playable source"),
                },
                LessonContent::Quiz {
                    passing_percent,
                    questions,
                } => {
                    println!("pass mark: {passing_percent}%");
                    for (n, question) in questions.iter().enumerate() {
                        println!("\n{}. {} ({})", n + 1, question.prompt, question.id);
                        for option in &question.options {
                            println!("   {}={} {}", question.id, option.id, option.text);
                        }
                    }
                }
            }
            if let Some(next) = view.next {
                println!("\nnext: {next}");
            }
            Ok(())
        }
        Command::Complete {
            course_id,
            lesson_id,
        } => {
            let user = require_user(app, "complete")?;
            sync_best_effort(app).await;
            let summary = app
                .progress()
                .complete_lesson(&user, &course_id, &lesson_id)
                .await?;
            print_summary(&course_id.to_string(), &summary);
            Ok(())
        }
        Command::Quiz {
            course_id,
            lesson_id,
            answers,
        } => {
            let user = require_user(app, "quiz")?;
            sync_best_effort(app).await;

            let partial = app
                .catalog_cache()
                .course(&course_id)
                .await
                .and_then(|course| course.lesson(&lesson_id).and_then(|l| l.as_quiz().cloned()))
                .is_some_and(|quiz| !is_complete_submission(&quiz, &answers));
            if partial {
                eprintln!("note: not every question was answered; missing answers count as wrong");
            }

            let submission = app
                .progress()
                .submit_quiz(&user, &course_id, &lesson_id, &answers)
                .await?;
            let result = &submission.result;
            for answer in &result.breakdown {
                let mark = if answer.is_correct { "ok " } else { "x  " };
                print!("{mark}{}", answer.question_id);
                if !answer.is_correct {
                    print!(" (correct: {})", answer.correct_option_id);
                }
                match &answer.explanation {
                    Some(text) if !answer.is_correct => println!(" - {text}"),
                    _ => println!(),
                }
            }
            println!(
                "score {}% ({}/{}) {}",
                result.percent,
                result.correct,
                result.total,
                if result.passed { "PASSED" } else { "not passed" }
            );
            print_summary(&course_id.to_string(), &submission.progress);
            Ok(())
        }
    }
}

fn require_user(app: &AppServices, command: &'static str) -> Result<UserId, ArgsError> {
    app.current_user_id().ok_or(ArgsError::MissingArgument {
        command,
        what: "--user (or LMS_USER_ID)",
    })
}

/// Learner commands work off the cache; a failed sync only costs freshness.
async fn sync_best_effort(app: &AppServices) {
    if let Err(err) = app.catalog_cache().refresh_if_stale().await {
        tracing::warn!(error = %err, "catalog sync failed; using cached catalog");
    }
}

async fn catalog(app: &AppServices) -> CommandResult {
    let courses = app.catalog_cache().refresh().await?;
    if courses.is_empty() {
        println!("catalog is empty");
    }
    for course in &courses {
        print_course(course);
    }
    Ok(())
}

async fn import(app: &AppServices, remote: bool, payload: Value) -> CommandResult {
    // A bare array is accepted as shorthand for `{ "courses": [...] }`.
    let payload = match payload {
        Value::Array(items) => serde_json::json!({ "courses": items }),
        other => other,
    };

    let cache = app.catalog_cache();
    if remote {
        let courses = normalize_catalog_payload(&payload);
        let count = courses.len();
        cache.save_remote(courses).await?;
        println!("published {count} course(s)");
    } else {
        let principal = app.principal();
        let summary = app
            .catalog()
            .replace_catalog_payload(principal.as_ref(), &payload)
            .await?;
        cache.refresh().await?;
        println!(
            "catalog replaced: {} created, {} updated, {} deleted",
            summary.created, summary.updated, summary.deleted
        );
    }
    Ok(())
}

async fn create_course(app: &AppServices, clock: Clock, title: &str) -> CommandResult {
    let cache = app.catalog_cache();
    let mut courses = cache.refresh().await?;

    let mut course = new_course(title, &courses, &clock);
    let final_id = ensure_final_assessment(&mut course);
    println!("created {} with final assessment {final_id}", course.id);
    courses.push(course);

    cache.save_remote(courses).await?;
    Ok(())
}

async fn progress(app: &AppServices, user: &UserId) -> CommandResult {
    sync_best_effort(app).await;
    let summaries = app.progress().course_summaries(user).await;
    if summaries.is_empty() {
        println!("no courses cached; run `lms catalog` first");
    }
    for row in &summaries {
        print_summary(&format!("{} ({})", row.title, row.course_id), &row.progress);
    }
    Ok(())
}

fn print_course(course: &Course) {
    println!(
        "{:<28} {:<40} {:<12} {:>2} module(s) {:>3} lesson(s)",
        course.id.as_str(),
        course.title,
        course.level.as_str(),
        course.modules_list.len(),
        course.total_lessons()
    );
}

fn print_summary(label: &str, summary: &CourseProgressSummary) {
    print!(
        "{label}: {}% ({}/{} lessons)",
        summary.percent, summary.completed, summary.total
    );
    if let Some(score) = summary.final_score {
        print!(", score {score}%");
    }
    if summary.final_passed == Some(true) {
        print!(", final passed");
    }
    match &summary.next_lesson {
        Some(next) if !summary.is_complete() => println!(", next: {next}"),
        _ => println!(),
    }
}
