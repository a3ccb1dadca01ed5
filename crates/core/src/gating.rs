//! Lesson access rules.
//!
//! Lock state is never stored. It is recomputed from the progress record on every
//! check, so a lesson unlocks as soon as the last prerequisite completion lands.

use crate::error::NavigationBlocked;
use crate::model::{Course, LessonId, UserCourseProgress};

/// Access state of a single lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    Unlocked,
    /// `remaining` counts earlier lessons that are not yet complete.
    Locked { remaining: usize },
}

impl GateStatus {
    #[must_use]
    pub fn is_locked(self) -> bool {
        matches!(self, GateStatus::Locked { .. })
    }
}

/// Access state for `lesson_id`.
///
/// A lesson is locked when it is a final assessment or carries
/// `requires_all_previous_lessons`, and at least one lesson strictly before it in
/// flattened order is incomplete. Unknown lessons are unlocked.
#[must_use]
pub fn gate_status(
    course: &Course,
    progress: Option<&UserCourseProgress>,
    lesson_id: &LessonId,
) -> GateStatus {
    let mut remaining = 0;
    for lesson in course.flattened_lessons() {
        if &lesson.id == lesson_id {
            if !lesson.is_gated() || remaining == 0 {
                return GateStatus::Unlocked;
            }
            return GateStatus::Locked { remaining };
        }
        if !progress.is_some_and(|p| p.is_completed(&lesson.id)) {
            remaining += 1;
        }
    }
    GateStatus::Unlocked
}

#[must_use]
pub fn is_lesson_locked(
    course: &Course,
    progress: Option<&UserCourseProgress>,
    lesson_id: &LessonId,
) -> bool {
    gate_status(course, progress, lesson_id).is_locked()
}

/// Checks whether the learner may select `lesson_id`.
///
/// # Errors
///
/// Returns `NavigationBlocked` carrying the number of lessons left to complete.
pub fn can_navigate_to(
    course: &Course,
    progress: Option<&UserCourseProgress>,
    lesson_id: &LessonId,
) -> Result<(), NavigationBlocked> {
    match gate_status(course, progress, lesson_id) {
        GateStatus::Unlocked => Ok(()),
        GateStatus::Locked { remaining } => Err(NavigationBlocked { remaining }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CourseId, Lesson, LessonGate, Level, Module, Quiz};

    fn gated_course() -> Course {
        Course {
            id: CourseId::new("c1"),
            title: "Course".into(),
            description: String::new(),
            level: Level::Beginner,
            category: String::new(),
            duration: String::new(),
            modules: 2,
            progress: 0,
            modules_list: vec![
                Module::new(
                    "m1",
                    "Basics",
                    vec![Lesson::text("L1", "One", ""), Lesson::text("L2", "Two", "")],
                ),
                Module::new(
                    "final",
                    "Final Assessment",
                    vec![Lesson::quiz("L3", "Final", Quiz::default()).as_final_assessment()],
                ),
            ],
            prerequisites: Vec::new(),
        }
    }

    fn done(ids: &[&str]) -> UserCourseProgress {
        let mut progress = UserCourseProgress::default();
        for id in ids {
            progress.complete(LessonId::new(*id));
        }
        progress
    }

    #[test]
    fn final_locked_until_previous_complete() {
        let course = gated_course();
        let target = LessonId::new("L3");

        assert!(is_lesson_locked(&course, Some(&done(&["L1"])), &target));
        assert!(!is_lesson_locked(&course, Some(&done(&["L1", "L2"])), &target));
    }

    #[test]
    fn no_progress_locks_final_with_full_count() {
        let course = gated_course();
        assert_eq!(
            gate_status(&course, None, &LessonId::new("L3")),
            GateStatus::Locked { remaining: 2 }
        );
    }

    #[test]
    fn ungated_lessons_are_always_open() {
        let course = gated_course();
        assert!(!is_lesson_locked(&course, None, &LessonId::new("L2")));
    }

    #[test]
    fn explicit_gate_without_final_flag_locks() {
        let mut course = gated_course();
        let lesson = &mut course.modules_list[0].lessons[1];
        lesson.gate = Some(LessonGate {
            requires_all_previous_lessons: true,
        });
        assert!(is_lesson_locked(&course, None, &LessonId::new("L2")));
        assert!(!is_lesson_locked(&course, Some(&done(&["L1"])), &LessonId::new("L2")));
    }

    #[test]
    fn unknown_lesson_is_not_locked() {
        assert!(!is_lesson_locked(&gated_course(), None, &LessonId::new("missing")));
    }

    #[test]
    fn navigation_reports_remaining_count() {
        let course = gated_course();
        let err = can_navigate_to(&course, Some(&done(&["L2"])), &LessonId::new("L3")).unwrap_err();
        assert_eq!(err.remaining, 1);
        assert!(err.to_string().contains("1 remaining"));
        assert!(can_navigate_to(&course, Some(&done(&["L1", "L2"])), &LessonId::new("L3")).is_ok());
    }
}
