//! crates/donatello_quiz_core/src/validation.rs
//!
//! Schema validation for quiz content coming back from a provider. A payload either
//! becomes a list of `QuizQuestion`s or is rejected as a whole.

use std::collections::HashSet;

use crate::domain::{QuizDraft, QuizQuestion};

pub const MIN_OPTIONS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    #[error("the quiz contains no questions")]
    Empty,
    #[error("question {index} has no text")]
    MissingQuestion { index: usize },
    #[error("question {index} has {count} options, at least {MIN_OPTIONS} are required")]
    TooFewOptions { index: usize, count: usize },
    #[error("question {index} repeats the option '{option}'")]
    DuplicateOption { index: usize, option: String },
    #[error("the answer of question {index} is not one of its options")]
    AnswerNotInOptions { index: usize },
}

/// Validates every draft, trimming surrounding whitespace from all text fields.
pub fn validate_quiz(
    drafts: impl IntoIterator<Item = QuizDraft>,
) -> Result<Vec<QuizQuestion>, ContentError> {
    let questions = drafts
        .into_iter()
        .enumerate()
        .map(|(index, draft)| validate_question(index, draft))
        .collect::<Result<Vec<_>, _>>()?;

    if questions.is_empty() {
        return Err(ContentError::Empty);
    }
    Ok(questions)
}

fn validate_question(index: usize, draft: QuizDraft) -> Result<QuizQuestion, ContentError> {
    let question = draft.question.trim().to_string();
    if question.is_empty() {
        return Err(ContentError::MissingQuestion { index });
    }

    let options: Vec<String> = draft
        .options
        .iter()
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();
    if options.len() < MIN_OPTIONS {
        return Err(ContentError::TooFewOptions {
            index,
            count: options.len(),
        });
    }

    let mut seen = HashSet::new();
    if let Some(dup) = options.iter().find(|o| !seen.insert(o.as_str())) {
        return Err(ContentError::DuplicateOption {
            index,
            option: dup.clone(),
        });
    }

    let answer = draft.answer.trim().to_string();
    if !options.contains(&answer) {
        return Err(ContentError::AnswerNotInOptions { index });
    }

    Ok(QuizQuestion {
        question,
        options,
        answer,
    })
}
