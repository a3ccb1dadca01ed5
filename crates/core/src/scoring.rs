use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{OptionId, QuestionId, Quiz};
use crate::progress::ratio_percent;

/// Learner's selections keyed by question id.
pub type Answers = HashMap<QuestionId, OptionId>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub question_id: QuestionId,
    pub selected: Option<OptionId>,
    pub correct_option_id: OptionId,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub percent: u8,
    pub passed: bool,
    pub correct: usize,
    pub total: usize,
    pub breakdown: Vec<AnswerResult>,
}

/// Grades `answers` against the quiz's answer key.
///
/// Unanswered questions count as wrong, as do questions whose answer key does not
/// name exactly one option. A quiz without questions scores 0. The pass mark is
/// inclusive.
#[must_use]
pub fn score_quiz(quiz: &Quiz, answers: &Answers) -> QuizResult {
    let breakdown: Vec<AnswerResult> = quiz
        .questions
        .iter()
        .map(|question| {
            let selected = answers.get(&question.id).cloned();
            let is_correct = question.has_valid_answer_key()
                && selected.as_ref() == Some(&question.correct_option_id);
            AnswerResult {
                question_id: question.id.clone(),
                selected,
                correct_option_id: question.correct_option_id.clone(),
                is_correct,
                explanation: question.explanation.clone(),
            }
        })
        .collect();

    let total = breakdown.len();
    let correct = breakdown.iter().filter(|answer| answer.is_correct).count();
    let percent = ratio_percent(correct, total);

    QuizResult {
        percent,
        passed: total > 0 && percent >= quiz.passing_percent,
        correct,
        total,
        breakdown,
    }
}

/// True once every question has a selection; mirrors the submit button rule.
#[must_use]
pub fn is_complete_submission(quiz: &Quiz, answers: &Answers) -> bool {
    !quiz.questions.is_empty()
        && quiz
            .questions
            .iter()
            .all(|question| answers.contains_key(&question.id))
}
