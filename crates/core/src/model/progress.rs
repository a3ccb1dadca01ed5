use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::ids::{CourseId, LessonId};

/// Completion state for one user in one course.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCourseProgress {
    #[serde(default)]
    pub completed_lesson_ids: BTreeSet<LessonId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_passed: Option<bool>,
}

impl UserCourseProgress {
    #[must_use]
    pub fn is_completed(&self, lesson_id: &LessonId) -> bool {
        self.completed_lesson_ids.contains(lesson_id)
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed_lesson_ids.len()
    }

    /// Adds the lesson to the completed set. Returns `false` if it was already there.
    pub fn complete(&mut self, lesson_id: LessonId) -> bool {
        self.completed_lesson_ids.insert(lesson_id)
    }

    /// Records a final score, replacing any previous one.
    pub fn record_score(&mut self, score: u8) {
        self.final_score = Some(score.min(100));
    }
}

/// Per-user map from course id to completion state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressMap(BTreeMap<CourseId, UserCourseProgress>);

impl ProgressMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress for a course, or `None` if the user has never touched it.
    #[must_use]
    pub fn course(&self, course_id: &CourseId) -> Option<&UserCourseProgress> {
        self.0.get(course_id)
    }

    /// Progress for a course, defaulting to an empty record.
    #[must_use]
    pub fn course_or_default(&self, course_id: &CourseId) -> UserCourseProgress {
        self.0.get(course_id).cloned().unwrap_or_default()
    }

    pub fn course_mut(&mut self, course_id: CourseId) -> &mut UserCourseProgress {
        self.0.entry(course_id).or_default()
    }

    pub fn insert(&mut self, course_id: CourseId, progress: UserCourseProgress) {
        self.0.insert(course_id, progress);
    }

    /// Idempotent completion: re-adding a lesson leaves the set unchanged, while a
    /// supplied score always replaces the stored one.
    pub fn mark_lesson_complete(
        &mut self,
        course_id: CourseId,
        lesson_id: LessonId,
        final_score: Option<u8>,
    ) {
        let entry = self.course_mut(course_id);
        entry.complete(lesson_id);
        if let Some(score) = final_score {
            entry.record_score(score);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CourseId, &UserCourseProgress)> {
        self.0.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(CourseId, UserCourseProgress)> for ProgressMap {
    fn from_iter<T: IntoIterator<Item = (CourseId, UserCourseProgress)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ProgressMap {
    type Item = (CourseId, UserCourseProgress);
    type IntoIter = std::collections::btree_map::IntoIter<CourseId, UserCourseProgress>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marking_twice_keeps_set_size() {
        let mut map = ProgressMap::new();
        let course = CourseId::new("c1");
        map.mark_lesson_complete(course.clone(), LessonId::new("l1"), None);
        map.mark_lesson_complete(course.clone(), LessonId::new("l1"), None);
        assert_eq!(map.course(&course).unwrap().completed_count(), 1);
    }

    #[test]
    fn score_always_overwrites() {
        let mut map = ProgressMap::new();
        let course = CourseId::new("c1");
        map.mark_lesson_complete(course.clone(), LessonId::new("quiz"), Some(90));
        map.mark_lesson_complete(course.clone(), LessonId::new("quiz"), Some(60));
        assert_eq!(map.course(&course).unwrap().final_score, Some(60));
    }

    #[test]
    fn missing_score_keeps_previous_one() {
        let mut map = ProgressMap::new();
        let course = CourseId::new("c1");
        map.mark_lesson_complete(course.clone(), LessonId::new("quiz"), Some(80));
        map.mark_lesson_complete(course.clone(), LessonId::new("l2"), None);
        assert_eq!(map.course(&course).unwrap().final_score, Some(80));
    }

    #[test]
    fn json_shape_matches_stored_blobs() {
        let json = r#"{ "intro": { "completedLessonIds": ["b", "a", "a"], "finalScore": 75 } }"#;
        let map: ProgressMap = serde_json::from_str(json).unwrap();
        let progress = map.course(&CourseId::new("intro")).unwrap();
        assert_eq!(progress.completed_count(), 2);
        assert_eq!(progress.final_score, Some(75));
        assert_eq!(progress.final_passed, None);
    }
}
