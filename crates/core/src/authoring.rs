//! Helpers for the admin editing flow: id generation, course templates, the
//! final-assessment module, and a lint pass over authored content.

use std::collections::HashSet;
use std::fmt;

use uuid::Uuid;

use crate::model::{
    Course, CourseId, Lesson, LessonId, Level, Module, ModuleId, OptionId, Question, QuestionId,
    Quiz, QuizOption,
};
use crate::time::Clock;

/// Lowercases, drops characters outside `[a-z0-9 -]`, and joins words with `-`.
#[must_use]
pub fn slugify(input: &str) -> String {
    let cleaned: String = input
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect();

    let mut slug = String::with_capacity(cleaned.len());
    for ch in cleaned.chars() {
        let ch = if ch.is_whitespace() { '-' } else { ch };
        if ch == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(ch);
    }
    slug
}

/// Course id derived from a title, unique among `existing`.
///
/// An empty slug falls back to `course-<unix millis>`. Collisions get `-2`, `-3`, …
#[must_use]
pub fn course_id_from_title(title: &str, existing: &[Course], clock: &Clock) -> CourseId {
    let mut base = slugify(title);
    if base.is_empty() {
        base = format!("course-{}", clock.unix_millis());
    }

    let taken: HashSet<&str> = existing.iter().map(|course| course.id.as_str()).collect();
    let mut candidate = base.clone();
    let mut n = 2;
    while taken.contains(candidate.as_str()) {
        candidate = format!("{base}-{n}");
        n += 1;
    }
    CourseId::new(candidate)
}

fn generated_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

/// A fresh course with one module holding a placeholder reading.
#[must_use]
pub fn new_course(title: &str, existing: &[Course], clock: &Clock) -> Course {
    let id = course_id_from_title(title, existing, clock);
    let module_id = format!("{id}_m1");
    let lesson = Lesson::text(
        LessonId::new(generated_id(&format!("{module_id}_t1"))),
        "Key Points (Notes)",
        format!("# {title}: Module 1\n\n## Notes\n- Add notes here.\n"),
    );

    let mut course = Course {
        id,
        title: title.to_owned(),
        description: "Edit description in Admin Panel.".to_owned(),
        level: Level::Beginner,
        category: "FUNDAMENTALS".to_owned(),
        duration: "4 weeks".to_owned(),
        modules: 0,
        progress: 0,
        modules_list: vec![Module::new(
            ModuleId::new(generated_id(&module_id)),
            "Module 1",
            vec![lesson],
        )],
        prerequisites: Vec::new(),
    };
    course.sync_module_count();
    course
}

/// Placeholder four-option question used by new quizzes.
#[must_use]
pub fn placeholder_question() -> Question {
    Question {
        id: QuestionId::new(generated_id("q")),
        prompt: "New question...".to_owned(),
        options: ["A", "B", "C", "D"]
            .into_iter()
            .map(|id| QuizOption::new(id, format!("Option {id}")))
            .collect(),
        correct_option_id: OptionId::new("A"),
        explanation: None,
    }
}

/// Makes sure the course ends with a gated final assessment.
///
/// Returns the id of the existing final assessment when there is one; otherwise
/// appends a "Final Assessment" module with a single quiz lesson and returns its id.
pub fn ensure_final_assessment(course: &mut Course) -> LessonId {
    if let Some(existing) = course.final_assessment() {
        return existing.id.clone();
    }

    let lesson_id = LessonId::new(generated_id(&format!("{}_final_quiz", course.id)));
    let mut quiz = Quiz::new(50, vec![placeholder_question()]);
    quiz.shuffle_questions = true;
    quiz.shuffle_options = true;

    let lesson = Lesson::quiz(
        lesson_id.clone(),
        format!("{}: Final Assessment", course.title),
        quiz,
    )
    .as_final_assessment();

    course.modules_list.push(Module::new(
        ModuleId::new(generated_id(&format!("{}_final_module", course.id))),
        "Final Assessment",
        vec![lesson],
    ));
    course.sync_module_count();
    lesson_id
}

//
// ─── LINT ──────────────────────────────────────────────────────────────────────
//

/// Authoring problem found in a course. Never blocks a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LintIssue {
    DuplicateLessonId { lesson_id: LessonId },
    TooFewOptions { lesson_id: LessonId, question_id: QuestionId },
    InvalidAnswerKey { lesson_id: LessonId, question_id: QuestionId },
    EmptyQuiz { lesson_id: LessonId },
    EmptyCourse,
}

impl fmt::Display for LintIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintIssue::DuplicateLessonId { lesson_id } => {
                write!(f, "lesson id {lesson_id} appears more than once")
            }
            LintIssue::TooFewOptions {
                lesson_id,
                question_id,
            } => write!(f, "question {question_id} in {lesson_id} has fewer than 2 options"),
            LintIssue::InvalidAnswerKey {
                lesson_id,
                question_id,
            } => write!(
                f,
                "question {question_id} in {lesson_id} has a correct option that does not match exactly one option"
            ),
            LintIssue::EmptyQuiz { lesson_id } => write!(f, "quiz {lesson_id} has no questions"),
            LintIssue::EmptyCourse => f.write_str("course has no lessons"),
        }
    }
}

#[must_use]
pub fn lint_course(course: &Course) -> Vec<LintIssue> {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();

    if course.total_lessons() == 0 {
        issues.push(LintIssue::EmptyCourse);
    }

    for lesson in course.flattened_lessons() {
        if !seen.insert(&lesson.id) {
            issues.push(LintIssue::DuplicateLessonId {
                lesson_id: lesson.id.clone(),
            });
        }

        let Some(quiz) = lesson.as_quiz() else {
            continue;
        };
        if quiz.questions.is_empty() {
            issues.push(LintIssue::EmptyQuiz {
                lesson_id: lesson.id.clone(),
            });
        }
        for question in &quiz.questions {
            if question.options.len() < 2 {
                issues.push(LintIssue::TooFewOptions {
                    lesson_id: lesson.id.clone(),
                    question_id: question.id.clone(),
                });
            }
            if !question.has_valid_answer_key() {
                issues.push(LintIssue::InvalidAnswerKey {
                    lesson_id: lesson.id.clone(),
                    question_id: question.id.clone(),
                });
            }
        }
    }
    issues
}
