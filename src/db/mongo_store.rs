use async_trait::async_trait;
use bson::{doc, Bson, Document};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Collection, Database, IndexModel,
};
use tracing::info;

use super::{PurgeReport, Storage, StoreError};
use crate::models::{poll_models::Poll, vote_record_models::Vote};

pub const POLLS: &str = "polls";
pub const VOTES: &str = "votes";

/// Server error code for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write_error))
                if write_error.code == DUPLICATE_KEY_CODE =>
            {
                StoreError::DuplicateKey
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn polls(&self) -> Collection<Poll> {
        self.db.collection::<Poll>(POLLS)
    }

    fn votes(&self) -> Collection<Vote> {
        self.db.collection::<Vote>(VOTES)
    }

    /// Creates the unique indexes both admission rules depend on.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let unique = || IndexOptions::builder().unique(true).build();

        self.polls()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "code": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;

        self.polls()
            .create_index(IndexModel::builder().keys(doc! { "expires_at": 1 }).build())
            .await?;

        self.votes()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "poll_id": 1, "device_id": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;

        info!("database indexes ensured");
        Ok(())
    }
}

#[async_trait]
impl Storage for MongoStore {
    async fn insert_poll(&self, poll: &Poll) -> Result<(), StoreError> {
        self.polls().insert_one(poll).await?;
        Ok(())
    }

    async fn code_exists(&self, code: &str) -> Result<bool, StoreError> {
        let existing = self
            .db
            .collection::<Document>(POLLS)
            .find_one(doc! { "code": code })
            .projection(doc! { "_id": 1 })
            .await?;
        Ok(existing.is_some())
    }

    async fn find_poll_by_code(&self, code: &str) -> Result<Option<Poll>, StoreError> {
        Ok(self.polls().find_one(doc! { "code": code }).await?)
    }

    async fn insert_vote(&self, vote: &Vote) -> Result<(), StoreError> {
        self.votes().insert_one(vote).await?;
        Ok(())
    }

    async fn find_vote(
        &self,
        poll_id: &str,
        device_id: &str,
    ) -> Result<Option<Vote>, StoreError> {
        Ok(self
            .votes()
            .find_one(doc! { "poll_id": poll_id, "device_id": device_id })
            .await?)
    }

    async fn votes_for_poll(&self, poll_id: &str) -> Result<Vec<Vote>, StoreError> {
        let cursor = self.votes().find(doc! { "poll_id": poll_id }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<PurgeReport, StoreError> {
        let cutoff = bson::DateTime::from_chrono(now);

        let expired: Vec<Document> = self
            .db
            .collection::<Document>(POLLS)
            .find(doc! { "expires_at": { "$lt": cutoff } })
            .projection(doc! { "_id": 1 })
            .await?
            .try_collect()
            .await?;

        let ids: Vec<Bson> = expired
            .iter()
            .filter_map(|d| d.get_str("_id").ok())
            .map(|id| Bson::String(id.to_string()))
            .collect();
        if ids.is_empty() {
            return Ok(PurgeReport::default());
        }

        // Votes before polls, so an interrupted sweep never orphans votes.
        let votes = self
            .votes()
            .delete_many(doc! { "poll_id": { "$in": ids.clone() } })
            .await?;
        let polls = self
            .polls()
            .delete_many(doc! { "_id": { "$in": ids } })
            .await?;

        Ok(PurgeReport {
            polls: polls.deleted_count,
            votes: votes.deleted_count,
        })
    }
}
