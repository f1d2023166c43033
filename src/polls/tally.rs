use std::sync::Arc;

use serde::Serialize;

use crate::db::Storage;
use crate::models::{poll_models::Poll, vote_record_models::Vote};
use crate::utils::error::AppResult;

/// Per-answer counts plus the number of votes cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub counts: Vec<u64>,
    pub total: u64,
}

impl Tally {
    /// `counts[i]` is the number of votes whose selection contains `i`;
    /// `total` counts votes, not selections.
    pub fn compute(answer_count: usize, votes: &[Vote]) -> Self {
        let counts = (0..answer_count)
            .map(|index| {
                let index = index as u32;
                votes
                    .iter()
                    .filter(|vote| vote.selected.contains(&index))
                    .count() as u64
            })
            .collect();

        Self {
            counts,
            total: votes.len() as u64,
        }
    }
}

/// Recomputes tallies from the live vote set on every call.
#[derive(Clone)]
pub struct TallyEngine {
    storage: Arc<dyn Storage>,
}

impl TallyEngine {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn tally(&self, poll: &Poll) -> AppResult<Tally> {
        let votes = self.storage.votes_for_poll(&poll.id).await?;
        Ok(Tally::compute(poll.answers.len(), &votes))
    }
}
