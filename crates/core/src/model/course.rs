use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::model::ids::{CourseId, LessonId, ModuleId};
use crate::model::quiz::Quiz;

const YOUTUBE_EMBED_BASE: &str = "https://www.youtube.com/embed";

//
// ─── LEVEL ─────────────────────────────────────────────────────────────────────
//

/// Difficulty level shown on the course card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Level {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
        }
    }

    /// Parses a level case-insensitively; anything unrecognized is `Beginner`.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "intermediate" => Level::Intermediate,
            "advanced" => Level::Advanced,
            _ => Level::Beginner,
        }
    }
}

impl From<String> for Level {
    fn from(value: String) -> Self {
        Self::parse_lenient(&value)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── VIDEO ─────────────────────────────────────────────────────────────────────
//

/// Where a video lesson's media lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VideoSource {
    /// Directly playable remote file.
    Mp4 { url: String },
    /// Video hosted on YouTube, referenced by its video id.
    Youtube { id: String },
    /// Locally uploaded blob, resolved by the presentation layer.
    #[serde(rename = "idb")]
    Uploaded {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },
}

impl VideoSource {
    /// Playable URL for remote sources.
    ///
    /// Returns `None` for uploaded blobs and for sources whose URL or id is blank
    /// or unparseable.
    #[must_use]
    pub fn embed_url(&self) -> Option<Url> {
        match self {
            VideoSource::Mp4 { url } => Url::parse(url.trim()).ok(),
            VideoSource::Youtube { id } => {
                let id = id.trim();
                if id.is_empty() {
                    return None;
                }
                let mut url = Url::parse(YOUTUBE_EMBED_BASE).ok()?;
                url.path_segments_mut().ok()?.push(id);
                url.query_pairs_mut()
                    .append_pair("rel", "0")
                    .append_pair("modestbranding", "1");
                Some(url)
            }
            VideoSource::Uploaded { .. } => None,
        }
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// Access rule attached to a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonGate {
    #[serde(default)]
    pub requires_all_previous_lessons: bool,
}

/// Type-specific lesson payload, tagged by the wire field `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LessonBody {
    /// Markdown reading.
    Text {
        #[serde(default)]
        content: String,
    },
    Video {
        #[serde(default, alias = "source", skip_serializing_if = "Option::is_none")]
        video: Option<VideoSource>,
    },
    Quiz {
        #[serde(default)]
        quiz: Quiz,
    },
}

impl LessonBody {
    #[must_use]
    pub fn kind(&self) -> LessonKind {
        match self {
            LessonBody::Text { .. } => LessonKind::Text,
            LessonBody::Video { .. } => LessonKind::Video,
            LessonBody::Quiz { .. } => LessonKind::Quiz,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LessonKind {
    Text,
    Video,
    Quiz,
}

impl LessonKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LessonKind::Text => "text",
            LessonKind::Video => "video",
            LessonKind::Quiz => "quiz",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: LessonId,
    #[serde(default)]
    pub title: String,
    #[serde(flatten)]
    pub body: LessonBody,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_final_assessment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<LessonGate>,
}

impl Lesson {
    #[must_use]
    pub fn text(id: impl Into<LessonId>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: LessonBody::Text {
                content: content.into(),
            },
            is_final_assessment: false,
            gate: None,
        }
    }

    #[must_use]
    pub fn video(id: impl Into<LessonId>, title: impl Into<String>, video: VideoSource) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: LessonBody::Video { video: Some(video) },
            is_final_assessment: false,
            gate: None,
        }
    }

    #[must_use]
    pub fn quiz(id: impl Into<LessonId>, title: impl Into<String>, quiz: Quiz) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: LessonBody::Quiz { quiz },
            is_final_assessment: false,
            gate: None,
        }
    }

    /// Flags the lesson as the course's final assessment, gated on all previous lessons.
    #[must_use]
    pub fn as_final_assessment(mut self) -> Self {
        self.is_final_assessment = true;
        self.gate = Some(LessonGate {
            requires_all_previous_lessons: true,
        });
        self
    }

    #[must_use]
    pub fn kind(&self) -> LessonKind {
        self.body.kind()
    }

    /// True when access depends on every earlier lesson being complete.
    #[must_use]
    pub fn is_gated(&self) -> bool {
        self.is_final_assessment
            || self
                .gate
                .is_some_and(|gate| gate.requires_all_previous_lessons)
    }

    #[must_use]
    pub fn as_quiz(&self) -> Option<&Quiz> {
        match &self.body {
            LessonBody::Quiz { quiz } => Some(quiz),
            _ => None,
        }
    }
}

//
// ─── MODULE & COURSE ───────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Module {
    #[must_use]
    pub fn new(id: impl Into<ModuleId>, title: impl Into<String>, lessons: Vec<Lesson>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            lessons,
        }
    }
}

/// A course with its modules and lessons embedded as one document.
///
/// `modules` and `progress` are display aggregates carried for compatibility with
/// existing catalogs; neither is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub level: Level,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub modules: u32,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub modules_list: Vec<Module>,
    #[serde(default)]
    pub prerequisites: Vec<CourseId>,
}

impl Course {
    /// Lessons in navigation order: module order, then lesson order within each module.
    pub fn flattened_lessons(&self) -> impl Iterator<Item = &Lesson> + '_ {
        self.modules_list
            .iter()
            .flat_map(|module| module.lessons.iter())
    }

    #[must_use]
    pub fn total_lessons(&self) -> usize {
        self.modules_list.iter().map(|m| m.lessons.len()).sum()
    }

    #[must_use]
    pub fn lesson(&self, id: &LessonId) -> Option<&Lesson> {
        self.flattened_lessons().find(|lesson| &lesson.id == id)
    }

    /// Zero-based position of the lesson in flattened order.
    #[must_use]
    pub fn lesson_position(&self, id: &LessonId) -> Option<usize> {
        self.flattened_lessons().position(|lesson| &lesson.id == id)
    }

    #[must_use]
    pub fn final_assessment(&self) -> Option<&Lesson> {
        self.flattened_lessons()
            .find(|lesson| lesson.is_final_assessment)
    }

    /// Recomputes the display `modules` count from the embedded module list.
    pub fn sync_module_count(&mut self) {
        self.modules = u32::try_from(self.modules_list.len()).unwrap_or(u32::MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lesson_wire_format_uses_type_tag() {
        let json = r##"{
            "id": "l1",
            "title": "Intro",
            "type": "text",
            "content": "# Hello",
            "completed": false
        }"##;
        let lesson: Lesson = serde_json::from_str(json).unwrap();
        assert_eq!(lesson.kind(), LessonKind::Text);
        assert!(!lesson.is_gated());
    }

    #[test]
    fn quiz_lesson_tolerates_missing_question_list() {
        let json = r#"{
            "id": "final",
            "title": "Final",
            "type": "quiz",
            "isFinalAssessment": true,
            "quiz": { "passingPercent": 70 }
        }"#;
        let lesson: Lesson = serde_json::from_str(json).unwrap();
        let quiz = lesson.as_quiz().unwrap();
        assert_eq!(quiz.passing_percent, 70);
        assert!(quiz.questions.is_empty());
        assert!(lesson.is_gated());
    }

    #[test]
    fn video_lesson_reads_legacy_source_field() {
        let json = r#"{
            "id": "v1",
            "title": "Clip",
            "type": "video",
            "source": { "kind": "youtube", "id": "abc123" }
        }"#;
        let lesson: Lesson = serde_json::from_str(json).unwrap();
        match lesson.body {
            LessonBody::Video { video: Some(VideoSource::Youtube { id }) } => {
                assert_eq!(id, "abc123");
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn youtube_embed_url_carries_player_params() {
        let source = VideoSource::Youtube {
            id: "abc123".into(),
        };
        let url = source.embed_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.youtube.com/embed/abc123?rel=0&modestbranding=1"
        );
    }

    #[test]
    fn uploaded_and_blank_sources_have_no_embed_url() {
        let uploaded = VideoSource::Uploaded {
            key: "vid_1".into(),
            filename: None,
        };
        assert!(uploaded.embed_url().is_none());
        assert!(VideoSource::Mp4 { url: "  ".into() }.embed_url().is_none());
    }

    #[test]
    fn course_defaults_missing_lists_and_counts() {
        let json = r#"{ "id": "c1", "title": "Course", "level": "advanced" }"#;
        let course: Course = serde_json::from_str(json).unwrap();
        assert_eq!(course.level, Level::Advanced);
        assert!(course.modules_list.is_empty());
        assert!(course.prerequisites.is_empty());
        assert_eq!(course.total_lessons(), 0);
    }

    #[test]
    fn unknown_level_falls_back_to_beginner() {
        assert_eq!(Level::parse_lenient(""), Level::Beginner);
        assert_eq!(Level::parse_lenient("Expert"), Level::Beginner);
        assert_eq!(Level::parse_lenient("INTERMEDIATE"), Level::Intermediate);
    }

    #[test]
    fn flattened_order_follows_modules_then_lessons() {
        let course = Course {
            id: CourseId::new("c"),
            title: String::new(),
            description: String::new(),
            level: Level::Beginner,
            category: String::new(),
            duration: String::new(),
            modules: 2,
            progress: 0,
            modules_list: vec![
                Module::new("m1", "M1", vec![Lesson::text("a", "A", ""), Lesson::text("b", "B", "")]),
                Module::new("m2", "M2", vec![Lesson::text("c", "C", "")]),
            ],
            prerequisites: Vec::new(),
        };
        let order: Vec<&str> = course.flattened_lessons().map(|l| l.id.as_str()).collect();
        assert_eq!(order, ["a", "b", "c"]);
        assert_eq!(course.lesson_position(&LessonId::new("c")), Some(2));
    }
}
