use serde::{Deserialize, Serialize};

use crate::model::ids::{OptionId, QuestionId};

/// Passing threshold applied when an authored quiz does not set one.
pub const DEFAULT_PASSING_PERCENT: u8 = 50;

fn default_passing_percent() -> u8 {
    DEFAULT_PASSING_PERCENT
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOption {
    pub id: OptionId,
    #[serde(default)]
    pub text: String,
}

impl QuizOption {
    #[must_use]
    pub fn new(id: impl Into<OptionId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<QuizOption>,
    pub correct_option_id: OptionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    /// True when `correct_option_id` names exactly one of the options.
    ///
    /// Questions failing this check can never be answered correctly.
    #[must_use]
    pub fn has_valid_answer_key(&self) -> bool {
        self.options
            .iter()
            .filter(|option| option.id == self.correct_option_id)
            .count()
            == 1
    }
}

/// Question set attached to a quiz lesson.
///
/// The shuffle flags only affect presentation order; scoring ignores them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    #[serde(default = "default_passing_percent")]
    pub passing_percent: u8,
    #[serde(default)]
    pub shuffle_questions: bool,
    #[serde(default)]
    pub shuffle_options: bool,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Default for Quiz {
    fn default() -> Self {
        Self {
            passing_percent: DEFAULT_PASSING_PERCENT,
            shuffle_questions: false,
            shuffle_options: false,
            questions: Vec::new(),
        }
    }
}

impl Quiz {
    #[must_use]
    pub fn new(passing_percent: u8, questions: Vec<Question>) -> Self {
        Self {
            passing_percent: passing_percent.min(100),
            questions,
            ..Self::default()
        }
    }
}
