//! Persistence for polls and votes.
//!
//! Both uniqueness rules live here as hard constraints: a poll `code` may be
//! stored once, and a `(poll_id, device_id)` pair may hold one vote. A
//! conflicting insert fails with [`StoreError::DuplicateKey`] and leaves
//! nothing behind, so callers never need a read-then-write check.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{poll_models::Poll, vote_record_models::Vote};

pub mod connection;
pub mod memory_store;
pub mod mongo_store;

pub use memory_store::MemoryStore;
pub use mongo_store::MongoStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key")]
    DuplicateKey,

    #[error("{0}")]
    Unavailable(String),
}

/// What an expiry sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub polls: u64,
    pub votes: u64,
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Inserts a poll, failing with `DuplicateKey` if its code is taken.
    async fn insert_poll(&self, poll: &Poll) -> Result<(), StoreError>;

    async fn code_exists(&self, code: &str) -> Result<bool, StoreError>;

    async fn find_poll_by_code(&self, code: &str) -> Result<Option<Poll>, StoreError>;

    /// Inserts a vote, failing with `DuplicateKey` if the device already
    /// voted in that poll.
    async fn insert_vote(&self, vote: &Vote) -> Result<(), StoreError>;

    async fn find_vote(&self, poll_id: &str, device_id: &str)
        -> Result<Option<Vote>, StoreError>;

    async fn votes_for_poll(&self, poll_id: &str) -> Result<Vec<Vote>, StoreError>;

    /// Deletes polls with `expires_at < now` together with their votes.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<PurgeReport, StoreError>;
}
