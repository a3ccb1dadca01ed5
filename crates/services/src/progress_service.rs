use std::sync::Arc;

use lms_core::gating::{can_navigate_to, is_lesson_locked};
use lms_core::model::{Course, CourseId, Lesson, LessonBody, LessonId, ProgressMap, UserId};
use lms_core::progress::CourseProgressSummary;
use lms_core::scoring::{Answers, QuizResult, score_quiz};
use storage::repository::ProgressRepository;

use crate::cache::CatalogCache;
use crate::error::ProgressError;
use crate::events::{EventBus, LmsEvent};
use crate::lesson_view::LessonView;

/// Dashboard row for one course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSummary {
    pub course_id: CourseId,
    pub title: String,
    pub progress: CourseProgressSummary,
}

/// Result of a graded quiz attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSubmission {
    pub result: QuizResult,
    /// Course progress after the attempt was recorded.
    pub progress: CourseProgressSummary,
}

/// Per-user progress records, completion rules and dashboard data.
#[derive(Clone)]
pub struct ProgressService {
    progress: Arc<dyn ProgressRepository>,
    catalog: Arc<CatalogCache>,
    events: EventBus,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        progress: Arc<dyn ProgressRepository>,
        catalog: Arc<CatalogCache>,
        events: EventBus,
    ) -> Self {
        Self {
            progress,
            catalog,
            events,
        }
    }

    /// Stored progress for `user_id`.
    ///
    /// Never fails: a missing or unreadable record is an empty map.
    pub async fn load_progress(&self, user_id: &UserId) -> ProgressMap {
        match self.progress.load_progress(user_id).await {
            Ok(map) => map,
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "progress unavailable; starting empty");
                ProgressMap::new()
            }
        }
    }

    /// Replaces the stored map and announces the change.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the map cannot be stored.
    pub async fn save_progress(
        &self,
        user_id: &UserId,
        map: &ProgressMap,
    ) -> Result<(), ProgressError> {
        self.progress.save_progress(user_id, map).await?;
        self.events.publish(LmsEvent::ProgressUpdated {
            user_id: user_id.clone(),
        });
        Ok(())
    }

    /// Records a completion, optionally with a score.
    ///
    /// Idempotent on the lesson set; a supplied `final_score` always replaces the
    /// previous one. Gated lessons must be unlocked first.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCourse`/`UnknownLesson` for ids missing from the cached
    /// catalog, `LessonLocked` while earlier lessons are outstanding, and
    /// `Storage` if saving fails.
    pub async fn mark_lesson_complete(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        lesson_id: &LessonId,
        final_score: Option<u8>,
    ) -> Result<ProgressMap, ProgressError> {
        let course = self.course(course_id).await?;
        find_lesson(&course, lesson_id)?;

        let mut map = self.load_progress(user_id).await;
        ensure_unlocked(&course, &map, lesson_id)?;

        map.mark_lesson_complete(course_id.clone(), lesson_id.clone(), final_score);
        self.save_progress(user_id, &map).await?;
        Ok(map)
    }

    /// Whether `lesson_id` is currently locked for the user. Unknown courses and
    /// lessons are unlocked.
    pub async fn is_lesson_locked(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        lesson_id: &LessonId,
    ) -> bool {
        let Some(course) = self.catalog.course(course_id).await else {
            return false;
        };
        let map = self.load_progress(user_id).await;
        is_lesson_locked(&course, map.course(course_id), lesson_id)
    }

    /// Completes a reading or video lesson.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCourse`/`UnknownLesson` for ids missing from the cached
    /// catalog, `QuizRequiresSubmission` for quiz lessons, `LessonLocked` while
    /// earlier lessons are outstanding, and `Storage` if saving fails.
    pub async fn complete_lesson(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        lesson_id: &LessonId,
    ) -> Result<CourseProgressSummary, ProgressError> {
        let course = self.course(course_id).await?;
        let lesson = find_lesson(&course, lesson_id)?;
        if matches!(lesson.body, LessonBody::Quiz { .. }) {
            return Err(ProgressError::QuizRequiresSubmission(lesson_id.clone()));
        }

        let mut map = self.load_progress(user_id).await;
        ensure_unlocked(&course, &map, lesson_id)?;

        map.mark_lesson_complete(course_id.clone(), lesson_id.clone(), None);
        self.save_progress(user_id, &map).await?;
        tracing::info!(user_id = %user_id, course_id = %course_id, lesson_id = %lesson_id, "lesson completed");

        Ok(CourseProgressSummary::compute(&course, map.course(course_id)))
    }

    /// Grades a quiz attempt. A passing attempt completes the lesson and records
    /// the score in one save; for the final assessment it also records the pass.
    /// A failing attempt changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCourse`/`UnknownLesson`, `NotAQuiz`, `LessonLocked`, or
    /// `Storage` if saving fails.
    pub async fn submit_quiz(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        lesson_id: &LessonId,
        answers: &Answers,
    ) -> Result<QuizSubmission, ProgressError> {
        let course = self.course(course_id).await?;
        let lesson = find_lesson(&course, lesson_id)?;
        let quiz = lesson
            .as_quiz()
            .ok_or_else(|| ProgressError::NotAQuiz(lesson_id.clone()))?;

        let mut map = self.load_progress(user_id).await;
        ensure_unlocked(&course, &map, lesson_id)?;

        let result = score_quiz(quiz, answers);
        tracing::info!(
            user_id = %user_id,
            lesson_id = %lesson_id,
            percent = result.percent,
            passed = result.passed,
            "quiz graded"
        );

        if result.passed {
            map.mark_lesson_complete(course_id.clone(), lesson_id.clone(), Some(result.percent));
            if lesson.is_final_assessment {
                map.course_mut(course_id.clone()).final_passed = Some(true);
            }
            self.save_progress(user_id, &map).await?;
        }

        let progress = CourseProgressSummary::compute(&course, map.course(course_id));
        Ok(QuizSubmission { result, progress })
    }

    /// Opens a lesson for display, refusing gated lessons that are still locked.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCourse`/`UnknownLesson` for ids missing from the cached
    /// catalog and `LessonLocked` while earlier lessons are outstanding.
    pub async fn open_lesson(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        lesson_id: &LessonId,
    ) -> Result<LessonView, ProgressError> {
        let course = self.course(course_id).await?;
        let lesson = find_lesson(&course, lesson_id)?;
        let map = self.load_progress(user_id).await;
        ensure_unlocked(&course, &map, lesson_id)?;
        Ok(LessonView::build(
            &course,
            lesson,
            map.course(course_id),
            &mut rand::rng(),
        ))
    }

    /// Progress summary for every cached course, in catalog order.
    pub async fn course_summaries(&self, user_id: &UserId) -> Vec<CourseSummary> {
        let map = self.load_progress(user_id).await;
        self.catalog
            .courses()
            .await
            .iter()
            .map(|course| CourseSummary {
                course_id: course.id.clone(),
                title: course.title.clone(),
                progress: CourseProgressSummary::compute(course, map.course(&course.id)),
            })
            .collect()
    }

    async fn course(&self, course_id: &CourseId) -> Result<Course, ProgressError> {
        self.catalog
            .course(course_id)
            .await
            .ok_or_else(|| ProgressError::UnknownCourse(course_id.clone()))
    }
}

fn find_lesson<'a>(course: &'a Course, lesson_id: &LessonId) -> Result<&'a Lesson, ProgressError> {
    course
        .lesson(lesson_id)
        .ok_or_else(|| ProgressError::UnknownLesson {
            course_id: course.id.clone(),
            lesson_id: lesson_id.clone(),
        })
}

fn ensure_unlocked(
    course: &Course,
    map: &ProgressMap,
    lesson_id: &LessonId,
) -> Result<(), ProgressError> {
    can_navigate_to(course, map.course(&course.id), lesson_id).map_err(|blocked| {
        ProgressError::LessonLocked {
            lesson_id: lesson_id.clone(),
            remaining: blocked.remaining,
        }
    })
}
