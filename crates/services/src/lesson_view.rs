use rand::Rng;
use rand::seq::SliceRandom;
use url::Url;

use lms_core::model::{
    Course, Lesson, LessonBody, LessonId, LessonKind, Question, Quiz, UserCourseProgress, VideoSource,
};
use lms_core::progress::lesson_neighbors;

/// What the presentation layer needs to render one lesson.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonView {
    pub lesson_id: LessonId,
    pub title: String,
    pub kind: LessonKind,
    pub content: LessonContent,
    pub completed: bool,
    pub is_final_assessment: bool,
    pub previous: Option<LessonId>,
    pub next: Option<LessonId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LessonContent {
    Text { markdown: String },
    /// `embed_url` is `None` for uploaded media and for unusable sources.
    Video { embed_url: Option<Url>, uploaded_key: Option<String> },
    Quiz { passing_percent: u8, questions: Vec<Question> },
}

impl LessonView {
    pub fn build<R: Rng + ?Sized>(
        course: &Course,
        lesson: &Lesson,
        progress: Option<&UserCourseProgress>,
        rng: &mut R,
    ) -> Self {
        let (previous, next) = lesson_neighbors(course, &lesson.id);
        let content = match &lesson.body {
            LessonBody::Text { content } => LessonContent::Text {
                markdown: content.clone(),
            },
            LessonBody::Video { video } => LessonContent::Video {
                embed_url: video.as_ref().and_then(|v| v.embed_url()),
                uploaded_key: video.as_ref().and_then(|v| match v {
                    VideoSource::Uploaded { key, .. } => Some(key.clone()),
                    _ => None,
                }),
            },
            LessonBody::Quiz { quiz } => LessonContent::Quiz {
                passing_percent: quiz.passing_percent,
                questions: presentation_order(quiz, rng),
            },
        };

        Self {
            lesson_id: lesson.id.clone(),
            title: lesson.title.clone(),
            kind: lesson.kind(),
            content,
            completed: progress.is_some_and(|p| p.is_completed(&lesson.id)),
            is_final_assessment: lesson.is_final_assessment,
            previous: previous.map(|l| l.id.clone()),
            next: next.map(|l| l.id.clone()),
        }
    }
}

/// Questions in the order a learner sees them, honouring the quiz's shuffle flags.
///
/// Only order changes; ids and answer keys are untouched, so grading is unaffected.
pub fn presentation_order<R: Rng + ?Sized>(quiz: &Quiz, rng: &mut R) -> Vec<Question> {
    let mut questions = quiz.questions.clone();
    if quiz.shuffle_questions {
        questions.shuffle(rng);
    }
    if quiz.shuffle_options {
        for question in &mut questions {
            question.options.shuffle(rng);
        }
    }
    questions
}

#[cfg(test)]
mod tests {
    use super::*;
    use lms_core::model::{CourseId, Level, Module, QuizOption};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::BTreeSet;

    fn question(id: &str) -> Question {
        Question {
            id: id.into(),
            prompt: format!("{id}?"),
            options: ["a", "b", "c", "d"].into_iter().map(|o| QuizOption::new(o, o)).collect(),
            correct_option_id: "a".into(),
            explanation: None,
        }
    }

    #[test]
    fn unshuffled_quiz_keeps_authored_order() {
        let quiz = Quiz::new(50, vec![question("q1"), question("q2"), question("q3")]);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(presentation_order(&quiz, &mut rng), quiz.questions);
    }

    #[test]
    fn shuffling_preserves_question_and_option_sets() {
        let mut quiz = Quiz::new(50, (1..=8).map(|i| question(&format!("q{i}"))).collect());
        quiz.shuffle_questions = true;
        quiz.shuffle_options = true;

        let mut rng = StdRng::seed_from_u64(42);
        let shown = presentation_order(&quiz, &mut rng);

        let ids = |qs: &[Question]| qs.iter().map(|q| q.id.clone()).collect::<BTreeSet<_>>();
        assert_eq!(ids(&shown), ids(&quiz.questions));
        for q in &shown {
            assert_eq!(q.options.len(), 4);
            assert!(q.has_valid_answer_key());
        }
    }

    #[test]
    fn view_carries_neighbors_and_embed_url() {
        let course = Course {
            id: CourseId::new("c"),
            title: "C".into(),
            description: String::new(),
            level: Level::Beginner,
            category: String::new(),
            duration: String::new(),
            modules: 1,
            progress: 0,
            modules_list: vec![Module::new(
                "m",
                "M",
                vec![
                    Lesson::text("l1", "Read", "# Hi"),
                    Lesson::video("l2", "Watch", VideoSource::Youtube { id: "abc".into() }),
                    Lesson::video(
                        "l3",
                        "Upload",
                        VideoSource::Uploaded { key: "vid_1".into(), filename: None },
                    ),
                ],
            )],
            prerequisites: Vec::new(),
        };
        let mut rng = StdRng::seed_from_u64(1);

        let lesson = course.lesson(&LessonId::new("l2")).unwrap();
        let view = LessonView::build(&course, lesson, None, &mut rng);
        assert_eq!(view.previous, Some(LessonId::new("l1")));
        assert_eq!(view.next, Some(LessonId::new("l3")));
        assert!(!view.completed);
        match view.content {
            LessonContent::Video { embed_url: Some(url), uploaded_key: None } => {
                assert_eq!(url.as_str(), "https://www.youtube.com/embed/abc?rel=0&modestbranding=1");
            }
            other => panic!("unexpected content: {other:?}"),
        }

        let upload = course.lesson(&LessonId::new("l3")).unwrap();
        let view = LessonView::build(&course, upload, None, &mut rng);
        assert_eq!(
            view.content,
            LessonContent::Video { embed_url: None, uploaded_key: Some("vid_1".into()) }
        );
    }
}
