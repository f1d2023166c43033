//! Input rules for poll drafts and vote selections.
//!
//! Everything here runs before storage is touched, so a rejected request
//! never leaves partial state behind.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::poll_models::Poll;
use crate::polls::code_generator::is_valid_code;

pub const NAME_LEN: (usize, usize) = (3, 50);
pub const QUESTION_LEN: (usize, usize) = (5, 200);
pub const ANSWER_COUNT: (usize, usize) = (2, 10);
pub const ANSWER_LEN: (usize, usize) = (1, 50);
pub const DURATION_HOURS: (i64, i64) = (1, 24 * 365);

/// Raw input for a new poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollDraft {
    pub name: String,
    pub question: String,
    pub answers: Vec<String>,
    pub multiple_choices: bool,
    /// Voting window in hours; `None` means the configured default.
    pub duration_hours: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|e| e.field.as_str())
    }

    pub fn into_inner(self) -> Vec<FieldError> {
        self.0
    }

    fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.iter().map(|e| e.message.as_str()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

/// Why a vote's `selected` list was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRejection {
    Empty,
    MultipleNotAllowed,
    OutOfRange,
    Duplicate,
}

impl SelectionRejection {
    pub fn code(&self) -> &'static str {
        match self {
            SelectionRejection::Empty => "EMPTY_SELECTION",
            SelectionRejection::MultipleNotAllowed => "MULTIPLE_CHOICE_NOT_ALLOWED",
            SelectionRejection::OutOfRange => "INVALID_SELECTION",
            SelectionRejection::Duplicate => "DUPLICATE_SELECTION",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            SelectionRejection::Empty => "At least one answer must be selected",
            SelectionRejection::MultipleNotAllowed => "This poll does not allow multiple choices",
            SelectionRejection::OutOfRange => "Invalid answer selection",
            SelectionRejection::Duplicate => "Duplicate selections are not allowed",
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn check_length(
    errors: &mut ValidationErrors,
    field: &str,
    label: &str,
    value: &str,
    (min, max): (usize, usize),
) {
    let len = char_len(value);
    if len == 0 {
        errors.push(field, format!("{label} is required"));
    } else if len < min {
        errors.push(field, format!("{label} must be at least {min} characters long"));
    } else if len > max {
        errors.push(field, format!("{label} cannot exceed {max} characters"));
    }
}

/// Trims and checks a draft, collecting every field problem at once.
pub fn validate_poll_draft(draft: PollDraft) -> Result<PollDraft, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let name = draft.name.trim().to_string();
    let question = draft.question.trim().to_string();
    let answers: Vec<String> = draft
        .answers
        .iter()
        .map(|answer| answer.trim().to_string())
        .collect();

    check_length(&mut errors, "name", "Name", &name, NAME_LEN);
    check_length(&mut errors, "question", "Question", &question, QUESTION_LEN);

    if answers.len() < ANSWER_COUNT.0 || answers.len() > ANSWER_COUNT.1 {
        errors.push(
            "answers",
            format!(
                "Poll must have between {} and {} answers",
                ANSWER_COUNT.0, ANSWER_COUNT.1
            ),
        );
    }
    if answers
        .iter()
        .any(|a| char_len(a) < ANSWER_LEN.0 || char_len(a) > ANSWER_LEN.1)
    {
        errors.push(
            "answers",
            format!(
                "Each answer must be between {} and {} characters long",
                ANSWER_LEN.0, ANSWER_LEN.1
            ),
        );
    }

    if let Some(hours) = draft.duration_hours {
        if hours < DURATION_HOURS.0 || hours > DURATION_HOURS.1 {
            errors.push(
                "duration",
                format!(
                    "Duration must be between {} and {} hours",
                    DURATION_HOURS.0, DURATION_HOURS.1
                ),
            );
        }
    }

    errors.into_result(PollDraft {
        name,
        question,
        answers,
        multiple_choices: draft.multiple_choices,
        duration_hours: draft.duration_hours,
    })
}

/// Stored-shape invariants, checked on the fully built record.
pub fn check_poll_invariants(poll: &Poll) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    if !is_valid_code(&poll.code) {
        errors.push("code", "Code must be exactly 8 alphanumeric characters");
    }
    if poll.answers.len() < ANSWER_COUNT.0 || poll.answers.len() > ANSWER_COUNT.1 {
        errors.push("answers", "Poll must have between 2 and 10 answers");
    }
    if poll.valid_till < poll.created_at {
        errors.push("validTill", "Poll cannot close before it is created");
    }
    if poll.expires_at < poll.valid_till {
        errors.push("expiresAt", "Poll cannot expire before it closes");
    }

    errors.into_result(())
}

/// Checks `selected` against the poll's rules. The first failing rule wins,
/// in this order: empty, too many for a single-choice poll, out of range,
/// duplicated.
pub fn validate_selection(poll: &Poll, selected: &[i64]) -> Result<Vec<u32>, SelectionRejection> {
    if selected.is_empty() {
        return Err(SelectionRejection::Empty);
    }
    if !poll.multiple_choices && selected.len() > 1 {
        return Err(SelectionRejection::MultipleNotAllowed);
    }

    let answer_count = poll.answers.len() as i64;
    if selected.iter().any(|&i| i < 0 || i >= answer_count) {
        return Err(SelectionRejection::OutOfRange);
    }

    let mut seen = HashSet::with_capacity(selected.len());
    if !selected.iter().all(|i| seen.insert(*i)) {
        return Err(SelectionRejection::Duplicate);
    }

    Ok(selected.iter().map(|&i| i as u32).collect())
}
