use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::db::{Storage, StoreError};
use crate::models::poll_models::Poll;
use crate::polls::code_generator::{is_valid_code, CodeGenerator};
use crate::polls::validation::{self, PollDraft, ValidationErrors};
use crate::utils::clock::Clock;
use crate::utils::error::{AppError, AppResult};

/// How long a closed poll stays readable before it may be purged.
pub const EXPIRY_GRACE_HOURS: i64 = 24;

#[derive(Clone)]
pub struct PollStore {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    codes: CodeGenerator,
    default_duration_hours: i64,
}

impl PollStore {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>, default_duration_hours: u32) -> Self {
        Self {
            storage,
            clock,
            codes: CodeGenerator,
            default_duration_hours: i64::from(default_duration_hours),
        }
    }

    /// Validates the draft, fills in the voting window and persists the poll
    /// under a freshly reserved code.
    pub async fn create(&self, draft: PollDraft) -> AppResult<Poll> {
        let draft = validation::validate_poll_draft(draft)?;

        let created_at = self.clock.now();
        let hours = draft.duration_hours.unwrap_or(self.default_duration_hours);
        let (valid_till, expires_at) = voting_window(created_at, hours)?;

        let mut reservation = self.codes.reservation(self.storage.as_ref());
        loop {
            let code = reservation.next_code().await?;
            let poll = Poll {
                id: ObjectId::new().to_hex(),
                code,
                name: draft.name.clone(),
                question: draft.question.clone(),
                answers: draft.answers.clone(),
                multiple_choices: draft.multiple_choices,
                created_at,
                valid_till,
                expires_at,
            };
            validation::check_poll_invariants(&poll)?;

            match self.storage.insert_poll(&poll).await {
                Ok(()) => {
                    info!(code = %poll.code, answers = poll.answers.len(), "poll created");
                    return Ok(poll);
                }
                Err(StoreError::DuplicateKey) => {
                    warn!(
                        code = %poll.code,
                        attempt = reservation.attempts(),
                        "poll code taken at insert, redrawing"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub async fn find_by_code(&self, code: &str) -> AppResult<Poll> {
        if !is_valid_code(code) {
            return Err(AppError::poll_not_found());
        }
        self.storage
            .find_poll_by_code(code)
            .await?
            .ok_or_else(AppError::poll_not_found)
    }

    pub fn is_active(&self, poll: &Poll) -> bool {
        poll.is_active(self.clock.now())
    }
}

/// Closing and expiry instants for a poll opened at `from`.
fn voting_window(from: DateTime<Utc>, hours: i64) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let window = Duration::try_hours(hours)
        .and_then(|open| from.checked_add_signed(open))
        .and_then(|valid_till| {
            let grace = Duration::try_hours(EXPIRY_GRACE_HOURS)?;
            Some((valid_till, valid_till.checked_add_signed(grace)?))
        });

    window.ok_or_else(|| {
        let mut errors = ValidationErrors::default();
        errors.push("duration", "Duration is out of range");
        AppError::ValidationFailed(errors)
    })
}
