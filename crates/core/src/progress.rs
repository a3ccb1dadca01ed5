//! Completion percentage and "continue where you left off" lookups.
//!
//! Everything here is a pure function over the course document and the user's
//! progress record. Missing progress is the same as an empty record.

use crate::model::{Course, Lesson, LessonId, UserCourseProgress};

/// Percentage of a course's lessons the user has completed, in `0..=100`.
///
/// The completed count is the size of the stored set. Ids of lessons that were
/// later deleted from the course still count; the clamp keeps the result in range.
/// A course without lessons reports 0.
#[must_use]
pub fn percent_complete(course: &Course, progress: Option<&UserCourseProgress>) -> u8 {
    let total = course.total_lessons();
    if total == 0 {
        return 0;
    }
    let done = progress.map_or(0, UserCourseProgress::completed_count);
    ratio_percent(done, total)
}

/// Rounded `part / whole` as a percentage clamped to `0..=100`. `whole` of 0 yields 0.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn ratio_percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let pct = (part as f64 / whole as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// First lesson in flattened order the user has not completed.
///
/// Falls back to the first lesson when everything is complete, so a "continue"
/// action always has a target. Returns `None` only for a course without lessons.
#[must_use]
pub fn next_incomplete_lesson<'a>(
    course: &'a Course,
    progress: Option<&UserCourseProgress>,
) -> Option<&'a Lesson> {
    let mut lessons = course.flattened_lessons();
    let first = lessons.next()?;
    let is_done = |lesson: &Lesson| progress.is_some_and(|p| p.is_completed(&lesson.id));

    if !is_done(first) {
        return Some(first);
    }
    lessons.find(|lesson| !is_done(*lesson)).or(Some(first))
}

/// Previous and next lessons around `lesson_id` in flattened order.
///
/// Both sides are `None` when the lesson is not part of the course.
#[must_use]
pub fn lesson_neighbors<'a>(
    course: &'a Course,
    lesson_id: &LessonId,
) -> (Option<&'a Lesson>, Option<&'a Lesson>) {
    let lessons: Vec<&Lesson> = course.flattened_lessons().collect();
    let Some(index) = lessons.iter().position(|lesson| &lesson.id == lesson_id) else {
        return (None, None);
    };
    let prev = index.checked_sub(1).and_then(|i| lessons.get(i).copied());
    let next = lessons.get(index + 1).copied();
    (prev, next)
}

/// Dashboard figures for one course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseProgressSummary {
    pub percent: u8,
    /// Completed lessons that still exist in the course.
    pub completed: usize,
    pub total: usize,
    pub final_score: Option<u8>,
    pub final_passed: Option<bool>,
    pub next_lesson: Option<LessonId>,
}

impl CourseProgressSummary {
    #[must_use]
    pub fn compute(course: &Course, progress: Option<&UserCourseProgress>) -> Self {
        let completed = progress.map_or(0, |p| {
            course
                .flattened_lessons()
                .filter(|lesson| p.is_completed(&lesson.id))
                .count()
        });
        Self {
            percent: percent_complete(course, progress),
            completed,
            total: course.total_lessons(),
            final_score: progress.and_then(|p| p.final_score),
            final_passed: progress.and_then(|p| p.final_passed),
            next_lesson: next_incomplete_lesson(course, progress).map(|lesson| lesson.id.clone()),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}
