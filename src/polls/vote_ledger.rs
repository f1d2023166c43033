use std::sync::Arc;

use bson::oid::ObjectId;
use tracing::{debug, info};

use crate::db::{Storage, StoreError};
use crate::models::{poll_models::Poll, vote_record_models::Vote};
use crate::polls::poll_store::PollStore;
use crate::polls::validation;
use crate::utils::clock::Clock;
use crate::utils::error::{AppError, AppResult};

/// A vote that made it into storage, with the poll it was cast in.
#[derive(Debug, Clone)]
pub struct Admission {
    pub poll: Poll,
    pub vote: Vote,
}

#[derive(Clone)]
pub struct VoteLedger {
    polls: PollStore,
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
}

impl VoteLedger {
    pub fn new(polls: PollStore, storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            polls,
            storage,
            clock,
        }
    }

    /// Admits at most one vote per device and poll.
    ///
    /// Checks run in a fixed order and the first failure is returned: the
    /// poll exists, it is still active, then the selection rules. Only then
    /// is the vote inserted, and the insert itself is the duplicate check.
    pub async fn submit(&self, code: &str, device_id: &str, selected: &[i64]) -> AppResult<Admission> {
        let poll = self.polls.find_by_code(code).await?;

        let now = self.clock.now();
        if !poll.is_active(now) {
            return Err(AppError::PollInactive);
        }

        let selected = validation::validate_selection(&poll, selected)?;

        let vote = Vote {
            id: ObjectId::new().to_hex(),
            poll_id: poll.id.clone(),
            device_id: device_id.to_string(),
            selected,
            voted_at: now,
        };

        match self.storage.insert_vote(&vote).await {
            Ok(()) => {
                info!(code = %poll.code, selected = ?vote.selected, "vote recorded");
                Ok(Admission { poll, vote })
            }
            Err(StoreError::DuplicateKey) => {
                debug!(code = %poll.code, "repeat vote from device rejected");
                Err(AppError::AlreadyVoted)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn find_vote(&self, poll: &Poll, device_id: &str) -> AppResult<Option<Vote>> {
        Ok(self.storage.find_vote(&poll.id, device_id).await?)
    }
}
