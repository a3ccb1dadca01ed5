mod course;
mod ids;
mod progress;
mod quiz;

pub use course::{
    Course, Lesson, LessonBody, LessonGate, LessonKind, Level, Module, VideoSource,
};
pub use ids::{CourseId, LessonId, ModuleId, OptionId, ParseIdError, QuestionId, UserId};
pub use progress::{ProgressMap, UserCourseProgress};
pub use quiz::{DEFAULT_PASSING_PERCENT, Question, Quiz, QuizOption};
