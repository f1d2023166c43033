use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{PurgeReport, Storage, StoreError};
use crate::models::{poll_models::Poll, vote_record_models::Vote};

#[derive(Debug, Default)]
struct Collections {
    /// Polls by id
    polls: HashMap<String, Poll>,
    /// code -> poll id
    codes: HashMap<String, String>,
    /// Votes by poll id
    votes: HashMap<String, Vec<Vote>>,
    /// (poll id, device id) pairs that hold a vote
    ballots: HashSet<(String, String)>,
}

/// In-process store. Every check-and-insert runs under one write lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn poll_count(&self) -> usize {
        self.inner.read().polls.len()
    }

    pub fn vote_count(&self) -> usize {
        self.inner.read().votes.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn insert_poll(&self, poll: &Poll) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.codes.contains_key(&poll.code) || inner.polls.contains_key(&poll.id) {
            return Err(StoreError::DuplicateKey);
        }
        inner.codes.insert(poll.code.clone(), poll.id.clone());
        inner.polls.insert(poll.id.clone(), poll.clone());
        Ok(())
    }

    async fn code_exists(&self, code: &str) -> Result<bool, StoreError> {
        Ok(self.inner.read().codes.contains_key(code))
    }

    async fn find_poll_by_code(&self, code: &str) -> Result<Option<Poll>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .codes
            .get(code)
            .and_then(|id| inner.polls.get(id))
            .cloned())
    }

    async fn insert_vote(&self, vote: &Vote) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let ballot = (vote.poll_id.clone(), vote.device_id.clone());
        if !inner.ballots.insert(ballot) {
            return Err(StoreError::DuplicateKey);
        }
        inner
            .votes
            .entry(vote.poll_id.clone())
            .or_default()
            .push(vote.clone());
        Ok(())
    }

    async fn find_vote(
        &self,
        poll_id: &str,
        device_id: &str,
    ) -> Result<Option<Vote>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .votes
            .get(poll_id)
            .and_then(|votes| votes.iter().find(|v| v.device_id == device_id))
            .cloned())
    }

    async fn votes_for_poll(&self, poll_id: &str) -> Result<Vec<Vote>, StoreError> {
        Ok(self
            .inner
            .read()
            .votes
            .get(poll_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<PurgeReport, StoreError> {
        let mut inner = self.inner.write();

        let expired: Vec<String> = inner
            .polls
            .values()
            .filter(|poll| poll.is_expired(now))
            .map(|poll| poll.id.clone())
            .collect();

        let mut report = PurgeReport::default();
        for id in &expired {
            if let Some(poll) = inner.polls.remove(id) {
                inner.codes.remove(&poll.code);
                report.polls += 1;
            }
            if let Some(votes) = inner.votes.remove(id) {
                report.votes += votes.len() as u64;
            }
        }
        inner.ballots.retain(|(poll_id, _)| !expired.contains(poll_id));

        Ok(report)
    }
}
