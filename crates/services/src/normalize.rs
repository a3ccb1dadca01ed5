//! Lenient coercion of catalog payloads coming from authoring tools or remote
//! endpoints.
//!
//! Nothing here rejects a payload. Missing or mistyped scalar fields fall back to
//! empty strings and zeros, mistyped lists become empty lists, and entries that
//! cannot be identified at all are dropped with a warning.

use lms_core::model::{
    Course, CourseId, DEFAULT_PASSING_PERCENT, Lesson, LessonBody, LessonGate, LessonId,
    LessonKind, Level, Module, ModuleId, OptionId, Question, QuestionId, Quiz, QuizOption,
    VideoSource,
};
use serde_json::{Map, Value};

/// Reads the `courses` list out of a `{ "courses": [...] }` payload.
///
/// A missing or non-list `courses` field yields an empty catalog.
#[must_use]
pub fn normalize_catalog_payload(payload: &Value) -> Vec<Course> {
    match payload.get("courses") {
        Some(courses @ Value::Array(_)) => normalize_courses(courses),
        other => {
            tracing::warn!(
                found = other.map_or("nothing", value_kind),
                "catalog payload has no course list; treating it as empty"
            );
            Vec::new()
        }
    }
}

/// Normalizes a JSON array of courses. Non-arrays yield an empty list.
#[must_use]
pub fn normalize_courses(raw: &Value) -> Vec<Course> {
    let Value::Array(items) = raw else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(fields) => normalize_course(fields),
            other => {
                tracing::warn!(kind = value_kind(other), "skipping non-object course entry");
                None
            }
        })
        .collect()
}

fn normalize_course(fields: &Map<String, Value>) -> Option<Course> {
    let Some(id) = id_field(fields, "id") else {
        tracing::warn!("skipping course without an id");
        return None;
    };

    let modules_list = match fields.get("modulesList") {
        Some(Value::Array(modules)) => modules.iter().filter_map(normalize_module).collect(),
        _ => Vec::new(),
    };
    let modules = u32_field(fields, "modules")
        .unwrap_or_else(|| u32::try_from(modules_list.len()).unwrap_or(u32::MAX));

    let prerequisites = match fields.get("prerequisites") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(scalar_string)
            .filter_map(|raw| raw.parse::<CourseId>().ok())
            .collect(),
        _ => Vec::new(),
    };

    Some(Course {
        id: CourseId::new(id),
        title: string_field(fields, "title"),
        description: string_field(fields, "description"),
        level: Level::parse_lenient(&string_field(fields, "level")),
        category: string_field(fields, "category"),
        duration: string_field(fields, "duration"),
        modules,
        progress: u32_field(fields, "progress").unwrap_or(0),
        modules_list,
        prerequisites,
    })
}

fn normalize_module(raw: &Value) -> Option<Module> {
    let Value::Object(fields) = raw else {
        return None;
    };
    let Some(id) = id_field(fields, "id") else {
        tracing::warn!("skipping module without an id");
        return None;
    };

    let lessons = match fields.get("lessons") {
        Some(Value::Array(lessons)) => lessons
            .iter()
            .filter_map(|lesson| normalize_lesson(&id, lesson))
            .collect(),
        _ => Vec::new(),
    };

    Some(Module::new(ModuleId::new(id), string_field(fields, "title"), lessons))
}

//
// ─── LESSONS ───────────────────────────────────────────────────────────────────
//

/// Coerces one lesson. Only a lesson without an id is dropped; an unknown `type`
/// is read from whichever payload the lesson carries, falling back to text.
fn normalize_lesson(module_id: &str, raw: &Value) -> Option<Lesson> {
    let Value::Object(fields) = raw else {
        tracing::warn!(module_id, kind = value_kind(raw), "skipping non-object lesson entry");
        return None;
    };
    let Some(id) = id_field(fields, "id") else {
        tracing::warn!(module_id, "skipping lesson without an id");
        return None;
    };

    let declared = string_field(fields, "type").trim().to_ascii_lowercase();
    let kind = match declared.as_str() {
        "text" => LessonKind::Text,
        "video" => LessonKind::Video,
        "quiz" => LessonKind::Quiz,
        other => {
            let inferred = if fields.get("quiz").is_some_and(Value::is_object) {
                LessonKind::Quiz
            } else if video_field(fields).is_some() {
                LessonKind::Video
            } else {
                LessonKind::Text
            };
            tracing::warn!(
                module_id,
                lesson_id = %id,
                declared = other,
                inferred = inferred.as_str(),
                "lesson type not recognised"
            );
            inferred
        }
    };

    let body = match kind {
        LessonKind::Text => LessonBody::Text {
            content: string_field(fields, "content"),
        },
        LessonKind::Video => LessonBody::Video {
            video: video_field(fields).and_then(normalize_video),
        },
        LessonKind::Quiz => LessonBody::Quiz {
            quiz: match fields.get("quiz") {
                Some(Value::Object(quiz)) => normalize_quiz(quiz),
                _ => Quiz::default(),
            },
        },
    };

    let gate = match fields.get("gate") {
        Some(Value::Object(gate)) => Some(LessonGate {
            requires_all_previous_lessons: bool_field(gate, "requiresAllPreviousLessons"),
        }),
        _ => None,
    };

    Some(Lesson {
        id: LessonId::new(id),
        title: string_field(fields, "title"),
        body,
        is_final_assessment: bool_field(fields, "isFinalAssessment"),
        gate,
    })
}

fn video_field(fields: &Map<String, Value>) -> Option<&Map<String, Value>> {
    ["video", "source"]
        .iter()
        .find_map(|key| fields.get(*key).and_then(Value::as_object))
}

fn normalize_video(fields: &Map<String, Value>) -> Option<VideoSource> {
    match string_field(fields, "kind").trim().to_ascii_lowercase().as_str() {
        "mp4" => Some(VideoSource::Mp4 {
            url: string_field(fields, "url"),
        }),
        "youtube" => Some(VideoSource::Youtube {
            id: string_field(fields, "id"),
        }),
        "idb" => Some(VideoSource::Uploaded {
            key: string_field(fields, "key"),
            filename: fields.get("filename").and_then(scalar_string),
        }),
        other => {
            tracing::warn!(kind = other, "video source kind not recognised; leaving it unset");
            None
        }
    }
}

fn normalize_quiz(fields: &Map<String, Value>) -> Quiz {
    let passing_percent = u32_field(fields, "passingPercent")
        .map_or(DEFAULT_PASSING_PERCENT, |percent| {
            u8::try_from(percent.min(100)).unwrap_or(100)
        });
    let questions = match fields.get("questions") {
        Some(Value::Array(questions)) => questions.iter().filter_map(normalize_question).collect(),
        _ => Vec::new(),
    };

    Quiz {
        passing_percent,
        shuffle_questions: bool_field(fields, "shuffleQuestions"),
        shuffle_options: bool_field(fields, "shuffleOptions"),
        questions,
    }
}

/// A question keeps a blank answer key when none is given; scoring then never
/// counts it correct.
fn normalize_question(raw: &Value) -> Option<Question> {
    let fields = raw.as_object()?;
    let Some(id) = id_field(fields, "id") else {
        tracing::warn!("skipping quiz question without an id");
        return None;
    };

    let options = match fields.get("options") {
        Some(Value::Array(options)) => options
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|option| {
                let id = id_field(option, "id")?;
                Some(QuizOption::new(id, string_field(option, "text")))
            })
            .collect(),
        _ => Vec::new(),
    };

    Some(Question {
        id: QuestionId::new(id),
        prompt: string_field(fields, "prompt"),
        options,
        correct_option_id: OptionId::new(id_field(fields, "correctOptionId").unwrap_or_default()),
        explanation: fields.get("explanation").and_then(scalar_string),
    })
}

//
// ─── SCALARS ───────────────────────────────────────────────────────────────────
//

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn string_field(fields: &Map<String, Value>, key: &str) -> String {
    fields.get(key).and_then(scalar_string).unwrap_or_default()
}

fn bool_field(fields: &Map<String, Value>, key: &str) -> bool {
    match fields.get(key) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}

fn id_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(scalar_string)
        .map(|id| id.trim().to_owned())
        .filter(|id| !id.is_empty())
}

/// Non-negative integer, accepting numeric strings. Fractions truncate.
fn u32_field(fields: &Map<String, Value>, key: &str) -> Option<u32> {
    let number = match fields.get(key)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let value = number.clamp(0.0, f64::from(u32::MAX)) as u32;
    Some(value)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_list_courses_become_empty_catalog() {
        assert!(normalize_catalog_payload(&json!({ "courses": "oops" })).is_empty());
        assert!(normalize_catalog_payload(&json!({})).is_empty());
        assert!(normalize_catalog_payload(&json!(null)).is_empty());
    }

    #[test]
    fn scalar_fields_fall_back_to_defaults() {
        let courses = normalize_catalog_payload(&json!({
            "courses": [{
                "id": 42,
                "title": null,
                "level": "ADVANCED",
                "modules": "3",
                "progress": -5,
                "modulesList": "not a list",
                "prerequisites": ["intro", 7, null, ""]
            }]
        }));

        assert_eq!(courses.len(), 1);
        let course = &courses[0];
        assert_eq!(course.id.as_str(), "42");
        assert_eq!(course.title, "");
        assert_eq!(course.duration, "");
        assert_eq!(course.level, Level::Advanced);
        assert_eq!(course.modules, 3);
        assert_eq!(course.progress, 0);
        assert!(course.modules_list.is_empty());
        let prereqs: Vec<&str> = course.prerequisites.iter().map(|p| p.as_str()).collect();
        assert_eq!(prereqs, ["intro", "7"]);
    }

    #[test]
    fn module_count_defaults_to_module_list_length() {
        let courses = normalize_courses(&json!([{
            "id": "c1",
            "modulesList": [
                { "id": "m1", "title": "One", "lessons": [
                    { "id": "l1", "type": "text", "title": "Intro", "content": "# Hi" },
                    { "id": "l2", "type": "hologram" },
                    { "id": "l3", "type": "quiz", "title": "Check" }
                ]},
                { "title": "no id" },
                { "id": "m2", "lessons": null }
            ]
        }]));

        let course = &courses[0];
        assert_eq!(course.modules, 2);
        let kinds: Vec<LessonKind> = course.modules_list[0].lessons.iter().map(Lesson::kind).collect();
        assert_eq!(kinds, [LessonKind::Text, LessonKind::Text, LessonKind::Quiz]);
        assert!(course.modules_list[1].lessons.is_empty());
    }

    #[test]
    fn malformed_lesson_fields_are_coerced_not_dropped() {
        let courses = normalize_courses(&json!([{
            "id": "c1",
            "modulesList": [{ "id": "m1", "lessons": [
                { "id": "l1", "type": "text", "title": null, "content": 12 },
                { "id": "l2", "type": "quiz", "quiz": { "passingPercent": "70", "questions": [] } },
                { "id": "l3", "type": "quiz", "isFinalAssessment": "true", "quiz": {
                    "passingPercent": 300,
                    "shuffleOptions": 1,
                    "questions": [
                        { "id": "q1", "prompt": "Pick", "correctOptionId": "a",
                          "options": [{ "id": "a", "text": null }, { "text": "no id" }, { "id": "b" }] },
                        { "prompt": "no id" }
                    ]
                }},
                { "id": "l4", "type": "video", "video": { "kind": "youtube", "id": "abc" } },
                { "title": "no id", "type": "text" }
            ]}]
        }]));

        let lessons = &courses[0].modules_list[0].lessons;
        let ids: Vec<&str> = lessons.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["l1", "l2", "l3", "l4"]);

        assert_eq!(lessons[0].title, "");
        assert_eq!(lessons[0].body, LessonBody::Text { content: "12".into() });
        assert_eq!(lessons[1].as_quiz().unwrap().passing_percent, 70);

        let final_quiz = lessons[2].as_quiz().unwrap();
        assert!(lessons[2].is_final_assessment);
        assert_eq!(final_quiz.passing_percent, 100);
        assert!(final_quiz.shuffle_options);
        assert!(!final_quiz.shuffle_questions);
        assert_eq!(final_quiz.questions.len(), 1);
        let options: Vec<(&str, &str)> = final_quiz.questions[0]
            .options
            .iter()
            .map(|o| (o.id.as_str(), o.text.as_str()))
            .collect();
        assert_eq!(options, [("a", ""), ("b", "")]);
        assert!(final_quiz.questions[0].has_valid_answer_key());

        assert_eq!(
            lessons[3].body,
            LessonBody::Video { video: Some(VideoSource::Youtube { id: "abc".into() }) }
        );
    }

    #[test]
    fn quiz_without_settings_gets_default_threshold() {
        let courses = normalize_courses(&json!([{
            "id": "c1",
            "modulesList": [{ "id": "m1", "lessons": [
                { "id": "q", "type": "quiz", "quiz": { "passingPercent": -20 } },
                { "id": "r", "type": "quiz" }
            ]}]
        }]));
        let lessons = &courses[0].modules_list[0].lessons;
        assert_eq!(lessons[0].as_quiz().unwrap().passing_percent, 0);
        assert_eq!(lessons[1].as_quiz().unwrap().passing_percent, DEFAULT_PASSING_PERCENT);
    }

    #[test]
    fn courses_without_ids_are_dropped() {
        let courses = normalize_courses(&json!([{ "title": "ghost" }, "junk", { "id": "ok" }]));
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].id.as_str(), "ok");
    }
}
